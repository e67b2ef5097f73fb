//! `aes-bench` encrypts a file with one backend and reports how long it took.
//!
//! ```text
//! aes-bench <BACKEND> <INPUT> <OUTPUT> [THREADS]
//! ```
//!
//! The input size must be a positive multiple of 16 bytes. Any failure prints a diagnostic to
//! standard output and exits with status -1.

use aes_bench::gpu::{Device, HostDevice};
use aes_bench::utils::{average, compare_bytes, median, throughput_mib_s};
use aes_bench::{AlignedBlocks, Direction, Engine, Key, Mode, FIPS_197_KEY};
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::process;
use std::time::Instant;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    /// Portable table-driven cipher
    Cpu,
    /// AES-NI instructions
    Ni,
    /// OpenCL device
    Cl,
    /// OpenCL kernel semantics emulated on the host
    ClHost,
    /// RustCrypto `aes` crate
    Reference,
}

impl BackendArg {
    fn is_gpu(self) -> bool {
        matches!(self, BackendArg::Cl | BackendArg::ClHost)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Ecb,
    Counter,
    Ctr,
}

/// Benchmark AES-128 on one backend.
#[derive(Parser)]
#[command(name = "aes-bench", version)]
struct Args {
    #[arg(value_enum)]
    backend: BackendArg,

    /// File to encrypt, a positive multiple of 16 bytes
    input: PathBuf,

    /// File to write the result to
    output: PathBuf,

    /// Worker threads for CPU backends
    threads: Option<usize>,

    /// Cipher key as 32 hex digits (default: the FIPS-197 example key)
    #[arg(long)]
    key: Option<String>,

    /// Block construction. GPU backends always use `counter`
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Counter base for `counter`, nonce for `ctr`
    #[arg(long, default_value_t = 0)]
    nonce: u128,

    /// Decrypt instead of encrypt
    #[arg(long)]
    decrypt: bool,

    /// Upper bound on a single device allocation, in bytes
    #[arg(long)]
    max_alloc_bytes: Option<u64>,

    /// Precompiled kernel written by `compile-kernel`
    #[arg(long)]
    kernel_binary: Option<PathBuf>,

    /// Check the output against the reference backend
    #[arg(long)]
    verify: bool,

    /// Number of timed runs
    #[arg(long, default_value_t = 1)]
    repeat: usize,
}

fn main() {
    init_logging();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if err.use_stderr() => {
            println!("{}", err);
            process::exit(-1);
        }
        Err(err) => err.exit(),
    };

    if let Err(err) = run(args) {
        println!("Error: {:#}", err);
        process::exit(-1);
    }
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
    debug!("Logging initialized");
}

fn run(args: Args) -> Result<()> {
    let key = parse_key(args.key.as_deref())?;

    let threads = match args.threads {
        Some(threads) => threads,
        None => {
            println!("No thread count given, using 1 thread");
            1
        }
    };
    if args.repeat == 0 {
        bail!("--repeat must be at least 1");
    }

    let mode = select_mode(&args);
    let direction = if args.decrypt {
        Direction::Decrypt
    } else {
        Direction::Encrypt
    };

    let input = AlignedBlocks::read_file(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let mut output = AlignedBlocks::zeroed(input.len());

    let engine = build_engine(&args, &key)?;
    info!(
        "{} backend, {:?} {:?}, {} blocks, {} thread(s)",
        engine.backend(),
        direction,
        mode,
        input.len(),
        threads
    );

    let mut samples = Vec::with_capacity(args.repeat);
    for _ in 0..args.repeat {
        let start = Instant::now();
        engine.run(&input, &mut output, mode, direction, threads)?;
        samples.push(start.elapsed());
    }

    let bytes = input.as_bytes().len();
    if let [elapsed] = samples[..] {
        println!(
            "{}: {} bytes in {:?} ({:.2} MiB/s)",
            engine.backend(),
            bytes,
            elapsed,
            throughput_mib_s(bytes, elapsed)
        );
    } else if let (Some(mean), Some(mid)) = (average(&samples), median(&mut samples)) {
        println!(
            "{}: {} runs of {} bytes, average {:.0} ns, median {:?} ({:.2} MiB/s)",
            engine.backend(),
            args.repeat,
            bytes,
            mean,
            mid,
            throughput_mib_s(bytes, mid)
        );
    }

    if args.verify {
        let mut expected = AlignedBlocks::zeroed(input.len());
        Engine::reference(&key).run(&input, &mut expected, mode, direction, 1)?;
        let mismatches = compare_bytes(input.as_bytes(), output.as_bytes(), expected.as_bytes());
        if mismatches > 0 {
            bail!("{} block(s) differ from the reference implementation", mismatches);
        }
        println!("Output matches the reference implementation");
    }

    output
        .write_file(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    Ok(())
}

fn parse_key(hex_key: Option<&str>) -> Result<Key> {
    match hex_key {
        None => Ok(Key::new(FIPS_197_KEY)),
        Some(hex_key) => {
            let bytes = hex::decode(hex_key).context("key is not valid hex")?;
            Ok(Key::from_slice(&bytes)?)
        }
    }
}

fn select_mode(args: &Args) -> Mode {
    if args.backend.is_gpu() {
        if !matches!(args.mode, None | Some(ModeArg::Counter)) || args.nonce != 0 {
            warn!("GPU backends always run counter mode from 0");
        }
        return Mode::Counter { base: 0 };
    }
    match args.mode.unwrap_or(ModeArg::Ecb) {
        ModeArg::Ecb => Mode::Ecb,
        ModeArg::Counter => Mode::Counter { base: args.nonce },
        ModeArg::Ctr => Mode::Ctr { nonce: args.nonce },
    }
}

fn build_engine(args: &Args, key: &Key) -> Result<Engine> {
    let engine = match args.backend {
        BackendArg::Cpu => Engine::table_driven(key),
        BackendArg::Ni => Engine::vector_accelerated(key)?,
        BackendArg::Reference => Engine::reference(key),
        BackendArg::ClHost => Engine::gpu(Box::new(HostDevice::new()), key, args.max_alloc_bytes),
        BackendArg::Cl => Engine::gpu(open_cl_device(args)?, key, args.max_alloc_bytes),
    };
    Ok(engine)
}

#[cfg(feature = "opencl")]
fn open_cl_device(args: &Args) -> Result<Box<dyn Device>> {
    use aes_bench::gpu::{KernelSource, OpenClDevice};

    let source = match &args.kernel_binary {
        Some(path) => KernelSource::Binary(
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?,
        ),
        None => KernelSource::builtin(),
    };
    Ok(Box::new(OpenClDevice::new(&source)?))
}

#[cfg(not(feature = "opencl"))]
fn open_cl_device(args: &Args) -> Result<Box<dyn Device>> {
    if args.kernel_binary.is_some() {
        warn!("--kernel-binary has no effect without OpenCL support");
    }
    bail!("this build has no OpenCL support, rebuild with `--features opencl`")
}
