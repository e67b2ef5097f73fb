use crate::error::Result;
use crate::{Block, BLOCK_SIZE, CACHE_LINE_SIZE, CACHE_LINE_SIZE_BLOCKS};
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::Path;

#[derive(Copy, Clone)]
#[repr(C, align(64))]
struct CacheLine([Block; CACHE_LINE_SIZE_BLOCKS]);

const _: () = assert!(std::mem::size_of::<CacheLine>() == CACHE_LINE_SIZE);
const _: () = assert!(std::mem::align_of::<CacheLine>() == CACHE_LINE_SIZE);

/// Owned block buffer whose first block starts on a cache line boundary, the guarantee the
/// parallel encryptor requires of its input and output.
#[derive(Clone)]
pub struct AlignedBlocks {
    lines: Vec<CacheLine>,
    len: usize,
}

impl AlignedBlocks {
    pub fn zeroed(len: usize) -> Self {
        let line_count = (len + CACHE_LINE_SIZE_BLOCKS - 1) / CACHE_LINE_SIZE_BLOCKS;
        Self {
            lines: vec![CacheLine([[0u8; BLOCK_SIZE]; CACHE_LINE_SIZE_BLOCKS]); line_count],
            len,
        }
    }

    pub fn from_blocks(blocks: &[Block]) -> Self {
        let mut buffer = Self::zeroed(blocks.len());
        buffer.copy_from_slice(blocks);
        buffer
    }

    /// Copies `bytes` in. The length must be a positive multiple of the block size.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_blocks(crate::as_blocks(bytes)?))
    }

    /// Reads a whole file whose size is a positive multiple of the block size.
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Writes the blocks out, truncating any existing file.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.as_bytes())?;
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        crate::blocks_as_bytes(self)
    }
}

impl Deref for AlignedBlocks {
    type Target = [Block];

    fn deref(&self) -> &[Block] {
        // SAFETY: `CacheLine` is `repr(C)` over an array of blocks, so the lines form one
        // contiguous run of at least `len` blocks
        unsafe { std::slice::from_raw_parts(self.lines.as_ptr() as *const Block, self.len) }
    }
}

impl DerefMut for AlignedBlocks {
    fn deref_mut(&mut self) -> &mut [Block] {
        unsafe { std::slice::from_raw_parts_mut(self.lines.as_mut_ptr() as *mut Block, self.len) }
    }
}
