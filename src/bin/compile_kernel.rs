//! `compile-kernel` builds the cipher kernel for the first OpenCL device and writes the device
//! binary, which `aes-bench cl --kernel-binary <PATH>` loads without recompiling.

use aes_bench::gpu::{KernelSource, OpenClDevice};
use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process;

/// Compile the AES-128 OpenCL kernel to a device binary.
#[derive(Parser)]
#[command(name = "compile-kernel", version)]
struct Args {
    /// Where to write the binary
    #[arg(default_value = "bin/aes_cl.bin")]
    output: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if err.use_stderr() => {
            println!("{}", err);
            process::exit(-1);
        }
        Err(err) => err.exit(),
    };

    if let Err(err) = run(&args) {
        println!("Error: {:#}", err);
        process::exit(-1);
    }
}

fn run(args: &Args) -> Result<()> {
    let device = OpenClDevice::new(&KernelSource::builtin())?;
    let binary = device.compile_binary()?;

    if let Some(parent) = args.output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&args.output, &binary)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!("Wrote {} byte kernel binary to {}", binary.len(), args.output.display());
    Ok(())
}
