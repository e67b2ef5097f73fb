//! Batch dispatch of the counter-mode cipher kernel to a device with a bounded allocation size.
//!
//! A buffer larger than the device can hold in one allocation is streamed through it in tiles.
//! The kernel encrypts block `gid` of a launch with counter `block_offset + gid`, and the
//! dispatcher passes the number of blocks already processed as `block_offset`, so the tiled
//! output is identical to a single launch over the whole buffer.

pub mod host;
#[cfg(feature = "opencl")]
pub mod open_cl;

use crate::cipher::{Backend, Direction, Mode};
use crate::error::{Error, Result};
use crate::key_schedule::KeySchedule;
use crate::{Block, Key, BLOCK_SIZE};
use log::{debug, warn};

pub use host::HostDevice;
#[cfg(feature = "opencl")]
pub use open_cl::{KernelSource, OpenClDevice};

/// Name of the cipher kernel entry point.
pub const KERNEL_NAME: &str = "AesCipher128";

/// A compute device able to run the cipher kernel.
pub trait Device {
    fn name(&self) -> String;

    /// Largest single buffer the device can allocate, in bytes.
    fn max_alloc_bytes(&self) -> Result<u64>;

    /// Allocates input and output buffers of `tile_blocks` blocks and uploads `schedule`.
    /// Everything the session holds is released when it is dropped.
    fn open_session<'a>(
        &'a self,
        schedule: &KeySchedule,
        tile_blocks: usize,
    ) -> Result<Box<dyn DeviceSession + 'a>>;
}

impl<D: Device + ?Sized> Device for Box<D> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn max_alloc_bytes(&self) -> Result<u64> {
        (**self).max_alloc_bytes()
    }

    fn open_session<'a>(
        &'a self,
        schedule: &KeySchedule,
        tile_blocks: usize,
    ) -> Result<Box<dyn DeviceSession + 'a>> {
        (**self).open_session(schedule, tile_blocks)
    }
}

/// Buffers and queue of one dispatch call.
pub trait DeviceSession {
    /// Copies `blocks` to the start of the device input buffer.
    fn write_input(&mut self, blocks: &[Block]) -> Result<()>;

    /// Runs `work_items` kernel instances and waits for them to finish.
    fn launch(&mut self, work_items: usize, block_offset: u64) -> Result<()>;

    /// Copies the first `blocks.len()` blocks of the device output buffer back.
    fn read_output(&mut self, blocks: &mut [Block]) -> Result<()>;
}

/// Outcome of one dispatch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DispatchSummary {
    pub tile_blocks: usize,
    pub tiles: usize,
}

pub struct GpuBatchDispatcher<D: Device> {
    device: D,
    schedule: KeySchedule,
    max_alloc_override: Option<u64>,
}

impl<D: Device> GpuBatchDispatcher<D> {
    pub fn new(device: D, key: &Key) -> Self {
        Self {
            device,
            schedule: KeySchedule::expand(key),
            max_alloc_override: None,
        }
    }

    /// Caps the allocation size below what the device reports. The smaller value wins.
    pub fn with_max_alloc_bytes(mut self, bytes: u64) -> Self {
        self.max_alloc_override = Some(bytes);
        self
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Allocation ceiling in whole blocks.
    pub fn ceiling_blocks(&self) -> Result<usize> {
        let mut bytes = self.device.max_alloc_bytes()?;
        if let Some(limit) = self.max_alloc_override {
            if limit > bytes {
                warn!(
                    "{}: requested allocation limit of {} bytes exceeds the device's {}",
                    self.device.name(),
                    limit,
                    bytes
                );
            }
            bytes = bytes.min(limit);
        }
        let blocks = bytes / BLOCK_SIZE as u64;
        if blocks == 0 {
            return Err(Error::Device(format!(
                "allocation ceiling of {} bytes cannot hold a single block",
                bytes
            )));
        }
        Ok(usize::try_from(blocks).unwrap_or(usize::MAX))
    }

    pub fn tile_blocks(&self, blocks: usize) -> Result<usize> {
        Ok(blocks.min(self.ceiling_blocks()?))
    }

    /// Only counter mode starting at zero in the encrypt direction matches what the kernel does.
    pub fn check_mode(mode: Mode, direction: Direction) -> Result<()> {
        match (mode, direction) {
            (Mode::Counter { base: 0 }, Direction::Encrypt) => Ok(()),
            _ => Err(Error::UnsupportedMode {
                backend: Backend::GpuOffloaded,
                mode,
                direction,
            }),
        }
    }

    /// Encrypts `input` into `output` with counter `i` for block `i`.
    pub fn encrypt(&self, input: &[Block], output: &mut [Block]) -> Result<DispatchSummary> {
        if input.len() != output.len() {
            return Err(Error::LengthMismatch {
                input: input.len(),
                output: output.len(),
            });
        }
        if input.is_empty() {
            return Err(Error::InvalidBufferLength(0));
        }

        let total = input.len();
        let tile_blocks = self.tile_blocks(total)?;
        debug!(
            "{}: {} blocks in tiles of {}",
            self.device.name(),
            total,
            tile_blocks
        );

        let mut session = self.device.open_session(&self.schedule, tile_blocks)?;
        let mut processed = 0;
        let mut tiles = 0;
        while processed < total {
            let len = tile_blocks.min(total - processed);
            let tile = processed..processed + len;

            session.write_input(&input[tile.clone()])?;
            session.launch(len, processed as u64)?;
            session.read_output(&mut output[tile])?;

            processed += len;
            tiles += 1;
        }

        Ok(DispatchSummary { tile_blocks, tiles })
    }

    /// Like [`GpuBatchDispatcher::encrypt`], writing the ciphertext back over `blocks`.
    pub fn encrypt_in_place(&self, blocks: &mut [Block]) -> Result<DispatchSummary> {
        let input = blocks.to_vec();
        self.encrypt(&input, blocks)
    }
}
