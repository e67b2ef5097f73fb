//! Splits a block buffer into equal, cache-line-aligned slices and runs one worker thread per
//! slice. Workers share the engine read-only and write disjoint output ranges, so no
//! synchronization is needed beyond the join at the end of the scope.

use crate::cipher::{CipherEngine, Direction, Mode};
use crate::error::{Error, Result};
use crate::{Block, CACHE_LINE_SIZE, CACHE_LINE_SIZE_BLOCKS};
use crossbeam_utils::thread;
use log::debug;

/// The contiguous range of blocks one worker owns.
pub struct ThreadSlice<'a> {
    pub input: &'a [Block],
    pub output: &'a mut [Block],
    /// Index of the first block within the whole buffer.
    pub offset: usize,
}

impl<'a> ThreadSlice<'a> {
    pub fn len(&self) -> usize {
        self.input.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    fn run<E>(self, engine: &E, mode: Mode, direction: Direction) -> Result<()>
    where
        E: CipherEngine + ?Sized,
    {
        engine.process(self.input, self.output, mode, direction, self.offset as u64)
    }
}

/// Runs a [`CipherEngine`] over a buffer on a fixed number of threads.
#[derive(Debug, Copy, Clone)]
pub struct ParallelEncryptor {
    threads: usize,
}

impl ParallelEncryptor {
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(Error::InvalidThreadCount(threads));
        }
        Ok(Self { threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Checks the partitioning rules and splits the buffers into one slice per thread.
    ///
    /// A single thread accepts any positive length. With more threads the block count must
    /// divide evenly, every slice must be a whole number of cache lines, and both buffers must
    /// start on a cache line so that no two workers ever write the same line.
    pub fn partition<'a>(
        &self,
        input: &'a [Block],
        output: &'a mut [Block],
    ) -> Result<Vec<ThreadSlice<'a>>> {
        let blocks = check_lengths(input, output)?;

        if self.threads == 1 {
            return Ok(vec![ThreadSlice {
                input,
                output,
                offset: 0,
            }]);
        }

        let blocks_per_thread = self.check_partition(blocks)?;
        check_alignment("input", input.as_ptr())?;
        check_alignment("output", output.as_ptr())?;

        Ok(input
            .chunks(blocks_per_thread)
            .zip(output.chunks_mut(blocks_per_thread))
            .enumerate()
            .map(|(thread, (input, output))| ThreadSlice {
                input,
                output,
                offset: thread * blocks_per_thread,
            })
            .collect())
    }

    /// Processes `input` into `output`. All checks happen before any block is touched.
    pub fn run<E>(
        &self,
        engine: &E,
        input: &[Block],
        output: &mut [Block],
        mode: Mode,
        direction: Direction,
    ) -> Result<()>
    where
        E: CipherEngine + ?Sized,
    {
        let slices = self.partition(input, output)?;
        debug!(
            "{} backend: {} blocks on {} thread(s)",
            engine.backend(),
            input.len(),
            slices.len()
        );

        if slices.len() == 1 {
            for slice in slices {
                slice.run(engine, mode, direction)?;
            }
            return Ok(());
        }

        thread::scope(|s| -> Result<()> {
            let mut workers = Vec::with_capacity(slices.len());
            for (index, slice) in slices.into_iter().enumerate() {
                let worker = s
                    .builder()
                    .name(format!("aes-worker-{}", index))
                    .spawn(move |_| slice.run(engine, mode, direction))?;
                workers.push(worker);
            }
            for worker in workers {
                worker.join().map_err(|_| Error::ThreadPanicked)??;
            }
            Ok(())
        })
        .map_err(|_| Error::ThreadPanicked)?
    }

    /// Like [`ParallelEncryptor::run`], writing the result back over `blocks`.
    pub fn run_in_place<E>(
        &self,
        engine: &E,
        blocks: &mut [Block],
        mode: Mode,
        direction: Direction,
    ) -> Result<()>
    where
        E: CipherEngine + ?Sized,
    {
        if blocks.is_empty() {
            return Err(Error::InvalidBufferLength(0));
        }
        let blocks_per_thread = if self.threads == 1 {
            blocks.len()
        } else {
            let blocks_per_thread = self.check_partition(blocks.len())?;
            check_alignment("in-place", blocks.as_ptr())?;
            blocks_per_thread
        };
        debug!(
            "{} backend: {} blocks in place on {} thread(s)",
            engine.backend(),
            blocks.len(),
            self.threads
        );

        if self.threads == 1 {
            engine.process_in_place(blocks, mode, direction, 0);
            return Ok(());
        }

        thread::scope(|s| -> Result<()> {
            for (index, chunk) in blocks.chunks_mut(blocks_per_thread).enumerate() {
                let offset = (index * blocks_per_thread) as u64;
                s.builder()
                    .name(format!("aes-worker-{}", index))
                    .spawn(move |_| engine.process_in_place(chunk, mode, direction, offset))?;
            }
            Ok(())
        })
        .map_err(|_| Error::ThreadPanicked)?
    }

    pub fn encrypt<E>(&self, engine: &E, input: &[Block], output: &mut [Block], mode: Mode) -> Result<()>
    where
        E: CipherEngine + ?Sized,
    {
        self.run(engine, input, output, mode, Direction::Encrypt)
    }

    pub fn decrypt<E>(&self, engine: &E, input: &[Block], output: &mut [Block], mode: Mode) -> Result<()>
    where
        E: CipherEngine + ?Sized,
    {
        self.run(engine, input, output, mode, Direction::Decrypt)
    }

    fn check_partition(&self, blocks: usize) -> Result<usize> {
        if blocks % self.threads != 0 {
            return Err(Error::UnevenPartition {
                blocks,
                threads: self.threads,
            });
        }
        let blocks_per_thread = blocks / self.threads;
        if blocks_per_thread % CACHE_LINE_SIZE_BLOCKS != 0 {
            return Err(Error::CacheLinePartition {
                blocks_per_thread,
                line_blocks: CACHE_LINE_SIZE_BLOCKS,
            });
        }
        Ok(blocks_per_thread)
    }
}

fn check_lengths(input: &[Block], output: &[Block]) -> Result<usize> {
    if input.len() != output.len() {
        return Err(Error::LengthMismatch {
            input: input.len(),
            output: output.len(),
        });
    }
    if input.is_empty() {
        return Err(Error::InvalidBufferLength(0));
    }
    Ok(input.len())
}

fn check_alignment(buffer: &'static str, pointer: *const Block) -> Result<()> {
    let address = pointer as usize;
    if address % CACHE_LINE_SIZE != 0 {
        return Err(Error::Misaligned {
            buffer,
            address,
            line_size: CACHE_LINE_SIZE,
        });
    }
    Ok(())
}
