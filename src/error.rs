use crate::cipher::{Backend, Direction, Mode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid key length: needed 16 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("buffer of {0} bytes is not a positive multiple of 16 bytes")]
    InvalidBufferLength(usize),

    #[error("input has {input} blocks but output has {output}")]
    LengthMismatch { input: usize, output: usize },

    #[error("thread count must be at least 1, got {0}")]
    InvalidThreadCount(usize),

    #[error("{blocks} blocks cannot be evenly divided across {threads} threads")]
    UnevenPartition { blocks: usize, threads: usize },

    #[error("{blocks_per_thread} blocks per thread is not a multiple of the cache line size ({line_blocks} blocks)")]
    CacheLinePartition {
        blocks_per_thread: usize,
        line_blocks: usize,
    },

    #[error("{buffer} buffer at {address:#x} is not aligned to {line_size} bytes")]
    Misaligned {
        buffer: &'static str,
        address: usize,
        line_size: usize,
    },

    #[error("{backend} backend does not support {direction:?} in {mode:?}")]
    UnsupportedMode {
        backend: Backend,
        mode: Mode,
        direction: Direction,
    },

    #[error("{0} is not supported on this CPU")]
    Unsupported(&'static str),

    #[error("worker thread panicked")]
    ThreadPanicked,

    #[error("kernel build failed:\n{log}")]
    KernelBuild { log: String },

    #[error("device error: {0}")]
    Device(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(feature = "opencl")]
impl From<ocl::Error> for Error {
    fn from(err: ocl::Error) -> Self {
        Error::Device(err.to_string())
    }
}

