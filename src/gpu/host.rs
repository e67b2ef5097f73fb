//! Runs the kernel's work-items on the host thread pool. Behaves like a device with a fixed
//! allocation ceiling, which makes the dispatcher testable without OpenCL.

use super::{Device, DeviceSession};
use crate::cipher::{CipherEngine, SoftAes128};
use crate::error::{Error, Result};
use crate::key_schedule::KeySchedule;
use crate::Block;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

const DEFAULT_MAX_ALLOC_BYTES: u64 = 1 << 30;

#[derive(Debug)]
pub struct HostDevice {
    max_alloc_bytes: u64,
    launches: AtomicUsize,
    schedule_uploads: AtomicUsize,
}

impl HostDevice {
    pub fn new() -> Self {
        Self::with_max_alloc_bytes(DEFAULT_MAX_ALLOC_BYTES)
    }

    pub fn with_max_alloc_bytes(max_alloc_bytes: u64) -> Self {
        Self {
            max_alloc_bytes,
            launches: AtomicUsize::new(0),
            schedule_uploads: AtomicUsize::new(0),
        }
    }

    /// Kernel launches since construction.
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::Relaxed)
    }

    /// Sessions opened since construction, each of which uploads the schedule once.
    pub fn schedule_uploads(&self) -> usize {
        self.schedule_uploads.load(Ordering::Relaxed)
    }
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for HostDevice {
    fn name(&self) -> String {
        "host".to_string()
    }

    fn max_alloc_bytes(&self) -> Result<u64> {
        Ok(self.max_alloc_bytes)
    }

    fn open_session<'a>(
        &'a self,
        schedule: &KeySchedule,
        tile_blocks: usize,
    ) -> Result<Box<dyn DeviceSession + 'a>> {
        if (tile_blocks as u64).saturating_mul(crate::BLOCK_SIZE as u64) > self.max_alloc_bytes {
            return Err(Error::Device(format!(
                "{} blocks exceed the {} byte allocation limit",
                tile_blocks, self.max_alloc_bytes
            )));
        }
        self.schedule_uploads.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(HostSession {
            device: self,
            cipher: SoftAes128::with_schedule(*schedule),
            input: vec![[0u8; 16]; tile_blocks],
            output: vec![[0u8; 16]; tile_blocks],
        }))
    }
}

struct HostSession<'a> {
    device: &'a HostDevice,
    cipher: SoftAes128,
    input: Vec<Block>,
    output: Vec<Block>,
}

impl<'a> HostSession<'a> {
    fn check_fits(&self, blocks: usize) -> Result<()> {
        if blocks > self.input.len() {
            return Err(Error::Device(format!(
                "{} blocks do not fit a {} block device buffer",
                blocks,
                self.input.len()
            )));
        }
        Ok(())
    }
}

impl<'a> DeviceSession for HostSession<'a> {
    fn write_input(&mut self, blocks: &[Block]) -> Result<()> {
        self.check_fits(blocks.len())?;
        self.input[..blocks.len()].copy_from_slice(blocks);
        Ok(())
    }

    fn launch(&mut self, work_items: usize, block_offset: u64) -> Result<()> {
        self.check_fits(work_items)?;
        let cipher = &self.cipher;
        self.output[..work_items]
            .par_iter_mut()
            .zip(self.input[..work_items].par_iter())
            .enumerate()
            .for_each(|(gid, (output, input))| {
                *output = *input;
                cipher.encrypt_block(output, Some(block_offset as u128 + gid as u128));
            });
        self.device.launches.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn read_output(&mut self, blocks: &mut [Block]) -> Result<()> {
        self.check_fits(blocks.len())?;
        blocks.copy_from_slice(&self.output[..blocks.len()]);
        Ok(())
    }
}
