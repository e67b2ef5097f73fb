pub mod aes_ni;
pub mod reference;
pub mod soft;

use crate::error::{Error, Result};
use crate::{xor_block, Block};
use std::fmt;

pub use aes_ni::AesNi128;
pub use reference::ReferenceAes128;
pub use soft::SoftAes128;

/// Execution backends. Callers pick one when building an [`crate::Engine`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Portable table-driven cipher.
    TableDriven,
    /// AES-NI instructions.
    VectorAccelerated,
    /// OpenCL kernel, tiled through device memory.
    GpuOffloaded,
    /// RustCrypto `aes`, used for cross-checking.
    Reference,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::TableDriven => "table-driven",
            Backend::VectorAccelerated => "AES-NI",
            Backend::GpuOffloaded => "GPU",
            Backend::Reference => "reference",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

/// How consecutive blocks of a buffer are processed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Every block independently, no counter.
    Ecb,
    /// Block `i` has `base + i` XORed in before the first round key.
    Counter { base: u128 },
    /// Block `i` is XORed with the encryption of `nonce + i`. Its own inverse.
    Ctr { nonce: u128 },
}

/// Counter values occupy the block as a little-endian 128-bit integer.
pub fn counter_block(counter: u128) -> Block {
    counter.to_le_bytes()
}

/// A single-block AES-128 cipher holding a derived key schedule.
pub trait CipherEngine: Send + Sync {
    fn backend(&self) -> Backend;

    /// Encrypts `block` in place, first XORing `counter` into it when present.
    fn encrypt_block(&self, block: &mut Block, counter: Option<u128>);

    /// Inverse of [`CipherEngine::encrypt_block`] for the same counter.
    fn decrypt_block(&self, block: &mut Block, counter: Option<u128>);

    /// Processes one block that sits at position `index` of the whole buffer.
    fn process_block(&self, block: &mut Block, mode: Mode, direction: Direction, index: u64) {
        match (mode, direction) {
            (Mode::Ecb, Direction::Encrypt) => self.encrypt_block(block, None),
            (Mode::Ecb, Direction::Decrypt) => self.decrypt_block(block, None),
            (Mode::Counter { base }, Direction::Encrypt) => {
                self.encrypt_block(block, Some(base.wrapping_add(index as u128)))
            }
            (Mode::Counter { base }, Direction::Decrypt) => {
                self.decrypt_block(block, Some(base.wrapping_add(index as u128)))
            }
            (Mode::Ctr { nonce }, _) => {
                let mut keystream = counter_block(nonce.wrapping_add(index as u128));
                self.encrypt_block(&mut keystream, None);
                xor_block(block, &keystream);
            }
        }
    }

    /// Processes `blocks` in place. `first_index` is the position of `blocks[0]` in the whole
    /// buffer, which keeps counters continuous across slices.
    fn process_in_place(&self, blocks: &mut [Block], mode: Mode, direction: Direction, first_index: u64) {
        for (index, block) in (first_index..).zip(blocks.iter_mut()) {
            self.process_block(block, mode, direction, index);
        }
    }

    /// Processes `input` into `output`. Buffers of different lengths are rejected before
    /// `output` is written.
    fn process(
        &self,
        input: &[Block],
        output: &mut [Block],
        mode: Mode,
        direction: Direction,
        first_index: u64,
    ) -> Result<()> {
        if input.len() != output.len() {
            return Err(Error::LengthMismatch {
                input: input.len(),
                output: output.len(),
            });
        }
        output.copy_from_slice(input);
        self.process_in_place(output, mode, direction, first_index);
        Ok(())
    }
}
