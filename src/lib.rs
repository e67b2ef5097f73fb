pub mod buffer;
pub mod cipher;
pub mod engine;
pub mod error;
pub mod gf;
pub mod gpu;
pub mod key_schedule;
pub mod parallel;
pub mod tables;
pub mod utils;

pub use buffer::AlignedBlocks;
pub use cipher::{Backend, CipherEngine, Direction, Mode};
pub use engine::Engine;
pub use error::{Error, Result};
pub use key_schedule::KeySchedule;
pub use parallel::ParallelEncryptor;

pub const BLOCK_SIZE: usize = 16;
pub const KEY_SIZE: usize = 16;
pub const WORD_SIZE: usize = 4;
pub const NUM_ROUNDS: usize = 10;
pub const ROUND_KEYS: usize = NUM_ROUNDS + 1;
pub const SCHEDULE_WORDS: usize = ROUND_KEYS * WORD_SIZE;
pub const CACHE_LINE_SIZE: usize = 64;
pub const CACHE_LINE_SIZE_BLOCKS: usize = CACHE_LINE_SIZE / BLOCK_SIZE;

/// One 128-bit cipher state in the standard's column-major byte order.
pub type Block = [u8; BLOCK_SIZE];

/// FIPS-197 Appendix B key, used by the benchmark binaries when no key is given.
pub const FIPS_197_KEY: [u8; KEY_SIZE] = [
    0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f, 0x3c,
];

/// An AES-128 cipher key.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Key([u8; KEY_SIZE]);

impl Key {
    pub const fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Key(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(Error::InvalidKeyLength(bytes.len()));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Key(key))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl From<[u8; KEY_SIZE]> for Key {
    fn from(bytes: [u8; KEY_SIZE]) -> Self {
        Key(bytes)
    }
}

// Keys stay out of logs.
impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Key(..)")
    }
}

/// XORs `other` into `block` in place.
#[inline]
pub fn xor_block(block: &mut Block, other: &Block) {
    for (byte, other_byte) in block.iter_mut().zip(other.iter()) {
        *byte ^= *other_byte;
    }
}

/// Views a byte buffer as blocks. Fails unless the length is a positive multiple of 16.
pub fn as_blocks(bytes: &[u8]) -> Result<&[Block]> {
    check_buffer_len(bytes.len())?;
    // SAFETY: `Block` is a byte array with alignment 1, and the length was checked.
    Ok(unsafe {
        std::slice::from_raw_parts(bytes.as_ptr() as *const Block, bytes.len() / BLOCK_SIZE)
    })
}

/// Mutable counterpart of [`as_blocks`].
pub fn as_blocks_mut(bytes: &mut [u8]) -> Result<&mut [Block]> {
    check_buffer_len(bytes.len())?;
    // SAFETY: as in `as_blocks`; the borrow is exclusive for the returned lifetime.
    Ok(unsafe {
        std::slice::from_raw_parts_mut(bytes.as_mut_ptr() as *mut Block, bytes.len() / BLOCK_SIZE)
    })
}

/// Flattens blocks back into their bytes.
pub fn blocks_as_bytes(blocks: &[Block]) -> &[u8] {
    // SAFETY: `[Block]` is a contiguous run of `len * 16` bytes.
    unsafe { std::slice::from_raw_parts(blocks.as_ptr() as *const u8, blocks.len() * BLOCK_SIZE) }
}

/// Mutable counterpart of [`blocks_as_bytes`].
pub fn blocks_as_bytes_mut(blocks: &mut [Block]) -> &mut [u8] {
    unsafe {
        std::slice::from_raw_parts_mut(blocks.as_mut_ptr() as *mut u8, blocks.len() * BLOCK_SIZE)
    }
}

fn check_buffer_len(len: usize) -> Result<()> {
    if len == 0 || len % BLOCK_SIZE != 0 {
        return Err(Error::InvalidBufferLength(len));
    }
    Ok(())
}
