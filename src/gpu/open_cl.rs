use super::{Device, DeviceSession, KERNEL_NAME};
use crate::error::{Error, Result};
use crate::key_schedule::KeySchedule;
use crate::{blocks_as_bytes, blocks_as_bytes_mut, Block, BLOCK_SIZE};
use log::{debug, info};
use ocl::{
    core::{
        build_program, create_buffer, create_command_queue, create_context, create_kernel,
        create_program_with_binary, create_program_with_source, enqueue_kernel,
        enqueue_read_buffer, enqueue_write_buffer, finish, get_program_info, set_kernel_arg,
        ArgVal, CommandQueue, Context, ContextProperties, DeviceInfo, DeviceInfoResult, Event,
        Kernel, Mem, Program, ProgramInfo, ProgramInfoResult,
    },
    flags, Platform,
};
use std::ffi::CString;

const AES_OPEN_CL: &str = include_str!("aes.cl");

/// Where the kernel program comes from.
#[derive(Debug, Clone)]
pub enum KernelSource {
    /// OpenCL C, compiled for the device at load time.
    Source(String),
    /// A device binary produced earlier by [`OpenClDevice::compile_binary`].
    Binary(Vec<u8>),
}

impl KernelSource {
    /// The cipher kernel shipped with the crate.
    pub fn builtin() -> Self {
        KernelSource::Source(AES_OPEN_CL.to_string())
    }
}

/// First device of the first OpenCL platform, with the cipher program built for it.
pub struct OpenClDevice {
    device: ocl::Device,
    context: Context,
    program: Program,
    name: String,
}

impl OpenClDevice {
    /// Build failures come back as [`Error::KernelBuild`] carrying the compiler log.
    pub fn new(source: &KernelSource) -> Result<Self> {
        let platform = Platform::first().map_err(ocl::Error::from)?;
        let device = ocl::Device::first(platform).map_err(ocl::Error::from)?;
        let name = device.name().map_err(ocl::Error::from)?;

        let context_properties = ContextProperties::new().platform(platform);
        let context = create_context(Some(&context_properties), &[&device], None, None)
            .map_err(ocl::Error::from)?;

        let program = load_program(&context, &device, source)?;
        let options = CString::new("").map_err(ocl::Error::from)?;
        build_program(&program, Some(&[&device]), &options, None, None).map_err(|err| {
            Error::KernelBuild {
                log: err.to_string(),
            }
        })?;
        info!("built {} for {}", KERNEL_NAME, name);

        Ok(Self {
            device,
            context,
            program,
            name,
        })
    }

    /// The device binary of the built program, loadable through [`KernelSource::Binary`].
    pub fn compile_binary(&self) -> Result<Vec<u8>> {
        let binaries = get_program_info(&self.program, ProgramInfo::Binaries)
            .map_err(ocl::Error::from)?;
        match binaries {
            ProgramInfoResult::Binaries(mut binaries) if !binaries.is_empty() => {
                Ok(binaries.swap_remove(0))
            }
            _ => Err(Error::Device("program has no device binary".to_string())),
        }
    }

    fn open(&self, schedule: &KeySchedule, tile_blocks: usize) -> ocl::Result<OpenClSession> {
        let queue = create_command_queue(&self.context, &self.device, None)?;
        let kernel = create_kernel(&self.program, KERNEL_NAME)?;

        let tile_bytes = tile_blocks * BLOCK_SIZE;
        let schedule_bytes = schedule.to_bytes();
        let (input, output, round_keys) = unsafe {
            (
                create_buffer(&self.context, flags::MEM_READ_ONLY, tile_bytes, None::<&[u8]>)?,
                create_buffer(&self.context, flags::MEM_WRITE_ONLY, tile_bytes, None::<&[u8]>)?,
                create_buffer(
                    &self.context,
                    flags::MEM_READ_ONLY,
                    schedule_bytes.len(),
                    None::<&[u8]>,
                )?,
            )
        };

        unsafe {
            enqueue_write_buffer(
                &queue,
                &round_keys,
                true,
                0,
                &schedule_bytes,
                None::<Event>,
                None::<&mut Event>,
            )?;
        }

        set_kernel_arg(&kernel, 0, ArgVal::mem(&input))?;
        set_kernel_arg(&kernel, 1, ArgVal::mem(&output))?;
        set_kernel_arg(&kernel, 2, ArgVal::mem(&round_keys))?;

        Ok(OpenClSession {
            queue,
            kernel,
            input,
            output,
            _round_keys: round_keys,
        })
    }
}

impl Device for OpenClDevice {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn max_alloc_bytes(&self) -> Result<u64> {
        let answer = self
            .device
            .info(DeviceInfo::MaxMemAllocSize)
            .map_err(ocl::Error::from)?;
        match answer {
            DeviceInfoResult::MaxMemAllocSize(bytes) => Ok(bytes),
            other => Err(Error::Device(format!(
                "unexpected answer to a max allocation query: {:?}",
                other
            ))),
        }
    }

    fn open_session<'a>(
        &'a self,
        schedule: &KeySchedule,
        tile_blocks: usize,
    ) -> Result<Box<dyn DeviceSession + 'a>> {
        debug!("{}: allocating two {} block buffers", self.name, tile_blocks);
        Ok(Box::new(self.open(schedule, tile_blocks)?))
    }
}

/// Device objects are reference counted and released when the session drops.
struct OpenClSession {
    queue: CommandQueue,
    kernel: Kernel,
    input: Mem,
    output: Mem,
    _round_keys: Mem,
}

impl OpenClSession {
    fn write(&mut self, blocks: &[Block]) -> ocl::Result<()> {
        unsafe {
            enqueue_write_buffer(
                &self.queue,
                &self.input,
                true,
                0,
                blocks_as_bytes(blocks),
                None::<Event>,
                None::<&mut Event>,
            )?;
        }
        Ok(())
    }

    fn run(&mut self, work_items: usize, block_offset: u64) -> ocl::Result<()> {
        set_kernel_arg(&self.kernel, 3, ArgVal::scalar(&block_offset))?;
        unsafe {
            enqueue_kernel(
                &self.queue,
                &self.kernel,
                1,
                None,
                &[work_items, 0, 0],
                None,
                None::<Event>,
                None::<&mut Event>,
            )?;
        }
        finish(&self.queue)?;
        Ok(())
    }

    fn read(&mut self, blocks: &mut [Block]) -> ocl::Result<()> {
        unsafe {
            enqueue_read_buffer(
                &self.queue,
                &self.output,
                true,
                0,
                blocks_as_bytes_mut(blocks),
                None::<Event>,
                None::<&mut Event>,
            )?;
        }
        Ok(())
    }
}

impl DeviceSession for OpenClSession {
    fn write_input(&mut self, blocks: &[Block]) -> Result<()> {
        Ok(self.write(blocks)?)
    }

    fn launch(&mut self, work_items: usize, block_offset: u64) -> Result<()> {
        Ok(self.run(work_items, block_offset)?)
    }

    fn read_output(&mut self, blocks: &mut [Block]) -> Result<()> {
        Ok(self.read(blocks)?)
    }
}

fn load_program(
    context: &Context,
    device: &ocl::Device,
    source: &KernelSource,
) -> ocl::Result<Program> {
    let program = match source {
        KernelSource::Source(source) => {
            create_program_with_source(context, &[CString::new(source.as_str())?])?
        }
        KernelSource::Binary(binary) => {
            create_program_with_binary(context, &[device], &[binary.as_slice()])?
        }
    };
    Ok(program)
}
