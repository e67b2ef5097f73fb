//! Backend selection. An [`Engine`] is built once for a key and a backend, and every bulk call
//! goes through it without further branching at the call sites.

use crate::cipher::{AesNi128, Backend, CipherEngine, Direction, Mode, ReferenceAes128, SoftAes128};
use crate::error::Result;
use crate::gpu::{Device, DispatchSummary, GpuBatchDispatcher};
use crate::parallel::ParallelEncryptor;
use crate::{Block, Key};
use log::{debug, warn};

pub enum Engine {
    TableDriven(SoftAes128),
    VectorAccelerated(AesNi128),
    GpuOffloaded(GpuBatchDispatcher<Box<dyn Device>>),
    Reference(ReferenceAes128),
}

impl Engine {
    pub fn table_driven(key: &Key) -> Self {
        Engine::TableDriven(SoftAes128::new(key))
    }

    /// Fails when the CPU lacks AES-NI.
    pub fn vector_accelerated(key: &Key) -> Result<Self> {
        Ok(Engine::VectorAccelerated(AesNi128::new(key)?))
    }

    pub fn reference(key: &Key) -> Self {
        Engine::Reference(ReferenceAes128::new(key))
    }

    /// `max_alloc_bytes` lowers the ceiling the device reports, never raises it.
    pub fn gpu(device: Box<dyn Device>, key: &Key, max_alloc_bytes: Option<u64>) -> Self {
        let mut dispatcher = GpuBatchDispatcher::new(device, key);
        if let Some(bytes) = max_alloc_bytes {
            dispatcher = dispatcher.with_max_alloc_bytes(bytes);
        }
        Engine::GpuOffloaded(dispatcher)
    }

    pub fn backend(&self) -> Backend {
        match self {
            Engine::TableDriven(_) => Backend::TableDriven,
            Engine::VectorAccelerated(_) => Backend::VectorAccelerated,
            Engine::GpuOffloaded(_) => Backend::GpuOffloaded,
            Engine::Reference(_) => Backend::Reference,
        }
    }

    /// The single-block cipher behind a CPU backend.
    pub fn cipher(&self) -> Option<&dyn CipherEngine> {
        match self {
            Engine::TableDriven(cipher) => Some(cipher),
            Engine::VectorAccelerated(cipher) => Some(cipher),
            Engine::Reference(cipher) => Some(cipher),
            Engine::GpuOffloaded(_) => None,
        }
    }

    /// Processes `input` into `output`. CPU backends split the work over `threads` workers;
    /// the GPU backend streams it through the device and ignores `threads`.
    pub fn run(
        &self,
        input: &[Block],
        output: &mut [Block],
        mode: Mode,
        direction: Direction,
        threads: usize,
    ) -> Result<()> {
        match self {
            Engine::GpuOffloaded(dispatcher) => {
                GpuBatchDispatcher::<Box<dyn Device>>::check_mode(mode, direction)?;
                if threads > 1 {
                    warn!("GPU backend ignores the thread count of {}", threads);
                }
                let DispatchSummary { tile_blocks, tiles } = dispatcher.encrypt(input, output)?;
                debug!("dispatched {} tile(s) of up to {} blocks", tiles, tile_blocks);
                Ok(())
            }
            Engine::TableDriven(cipher) => {
                ParallelEncryptor::new(threads)?.run(cipher, input, output, mode, direction)
            }
            Engine::VectorAccelerated(cipher) => {
                ParallelEncryptor::new(threads)?.run(cipher, input, output, mode, direction)
            }
            Engine::Reference(cipher) => {
                ParallelEncryptor::new(threads)?.run(cipher, input, output, mode, direction)
            }
        }
    }

    pub fn encrypt(&self, input: &[Block], output: &mut [Block], mode: Mode, threads: usize) -> Result<()> {
        self.run(input, output, mode, Direction::Encrypt, threads)
    }

    pub fn decrypt(&self, input: &[Block], output: &mut [Block], mode: Mode, threads: usize) -> Result<()> {
        self.run(input, output, mode, Direction::Decrypt, threads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HostDevice;
    use crate::{AlignedBlocks, Error, FIPS_197_KEY};

    fn key() -> Key {
        Key::new(FIPS_197_KEY)
    }

    #[test]
    fn backends_agree_on_counter_mode() {
        let input = AlignedBlocks::from_blocks(&(0..32u8).map(|i| [i; 16]).collect::<Vec<_>>());
        let mode = Mode::Counter { base: 0 };

        let mut expected = AlignedBlocks::zeroed(32);
        Engine::table_driven(&key())
            .encrypt(&input, &mut expected, mode, 1)
            .unwrap();

        let mut engines = vec![
            Engine::reference(&key()),
            Engine::gpu(Box::new(HostDevice::new()), &key(), Some(16 * 5)),
        ];
        if let Ok(engine) = Engine::vector_accelerated(&key()) {
            engines.push(engine);
        }
        for engine in engines {
            let mut output = AlignedBlocks::zeroed(32);
            engine.encrypt(&input, &mut output, mode, 2).unwrap();
            assert_eq!(&output[..], &expected[..], "{}", engine.backend());
        }
    }

    #[test]
    fn gpu_rejects_other_modes() {
        let engine = Engine::gpu(Box::new(HostDevice::new()), &key(), None);
        assert!(engine.cipher().is_none());
        let input = vec![[0u8; 16]; 4];
        let mut output = vec![[0u8; 16]; 4];
        assert!(matches!(
            engine.encrypt(&input, &mut output, Mode::Ecb, 1),
            Err(Error::UnsupportedMode { .. })
        ));
        assert!(matches!(
            engine.decrypt(&input, &mut output, Mode::Counter { base: 0 }, 1),
            Err(Error::UnsupportedMode { .. })
        ));
    }

    #[test]
    fn zero_threads_is_a_configuration_error() {
        let input = vec![[0u8; 16]; 4];
        let mut output = vec![[0u8; 16]; 4];
        assert!(matches!(
            Engine::table_driven(&key()).encrypt(&input, &mut output, Mode::Ecb, 0),
            Err(Error::InvalidThreadCount(0))
        ));
    }
}
