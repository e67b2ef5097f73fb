//! AES-128 on the AES-NI instructions. Bulk calls keep eight blocks in flight so the `aesenc`
//! latency of one block overlaps with the others.

use super::{counter_block, Backend, CipherEngine, Direction, Mode};
use crate::error::Result;
use crate::key_schedule::{aes_ni as schedule_ni, KeySchedule};
use crate::{Block, Key};

#[cfg(target_arch = "x86_64")]
use crate::{NUM_ROUNDS, ROUND_KEYS};
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

#[cfg(target_arch = "x86_64")]
const PIPELINE: usize = 8;

pub struct AesNi128 {
    encrypt_schedule: KeySchedule,
    decrypt_schedule: KeySchedule,
}

impl AesNi128 {
    /// Fails with [`crate::Error::Unsupported`] when the CPU has no AES instructions.
    pub fn new(key: &Key) -> Result<Self> {
        Ok(Self {
            encrypt_schedule: schedule_ni::expand(key)?,
            decrypt_schedule: schedule_ni::expand_inverse(key)?,
        })
    }

    pub fn schedule(&self) -> &KeySchedule {
        &self.encrypt_schedule
    }

    /// The `aesimc`-transformed schedule used by decryption.
    pub fn inverse_schedule(&self) -> &KeySchedule {
        &self.decrypt_schedule
    }

    fn schedule_for(&self, direction: Direction) -> &KeySchedule {
        match direction {
            Direction::Encrypt => &self.encrypt_schedule,
            Direction::Decrypt => &self.decrypt_schedule,
        }
    }
}

#[cfg(target_arch = "x86_64")]
impl CipherEngine for AesNi128 {
    fn backend(&self) -> Backend {
        Backend::VectorAccelerated
    }

    fn encrypt_block(&self, block: &mut Block, counter: Option<u128>) {
        // SAFETY: construction succeeded, so the CPU supports AES-NI
        unsafe {
            let keys = schedule_ni::load(&self.encrypt_schedule);
            process_blocks(&keys, std::slice::from_mut(block), counter, Direction::Encrypt);
        }
    }

    fn decrypt_block(&self, block: &mut Block, counter: Option<u128>) {
        unsafe {
            let keys = schedule_ni::load(&self.decrypt_schedule);
            process_blocks(&keys, std::slice::from_mut(block), counter, Direction::Decrypt);
        }
    }

    fn process_in_place(&self, blocks: &mut [Block], mode: Mode, direction: Direction, first_index: u64) {
        let base = match mode {
            Mode::Ecb => None,
            Mode::Counter { base } => Some(base.wrapping_add(first_index as u128)),
            Mode::Ctr { .. } => {
                for (index, block) in (first_index..).zip(blocks.iter_mut()) {
                    self.process_block(block, mode, direction, index);
                }
                return;
            }
        };

        unsafe {
            let keys = schedule_ni::load(self.schedule_for(direction));
            process_blocks(&keys, blocks, base, direction);
        }
    }
}

// Never constructed off x86_64: `AesNi128::new` fails first.
#[cfg(not(target_arch = "x86_64"))]
impl CipherEngine for AesNi128 {
    fn backend(&self) -> Backend {
        Backend::VectorAccelerated
    }

    fn encrypt_block(&self, block: &mut Block, counter: Option<u128>) {
        if let Some(counter) = counter {
            crate::xor_block(block, &counter_block(counter));
        }
        super::soft::encrypt(block, &self.encrypt_schedule);
    }

    fn decrypt_block(&self, block: &mut Block, counter: Option<u128>) {
        super::soft::decrypt(block, &self.encrypt_schedule);
        if let Some(counter) = counter {
            crate::xor_block(block, &counter_block(counter));
        }
    }
}

/// Encrypts or decrypts `blocks` in place. With a counter base, block `i` uses counter
/// `base + i`, XORed in before encryption or after decryption.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "aes,sse2")]
unsafe fn process_blocks(
    keys: &[__m128i; ROUND_KEYS],
    blocks: &mut [Block],
    base: Option<u128>,
    direction: Direction,
) {
    let mut counter = base;
    let mut chunks = blocks.chunks_exact_mut(PIPELINE);
    for chunk in &mut chunks {
        process_lanes(keys, chunk, &mut counter, direction);
    }
    let remainder = chunks.into_remainder();
    if !remainder.is_empty() {
        process_lanes(keys, remainder, &mut counter, direction);
    }
}

#[cfg(target_arch = "x86_64")]
#[inline]
#[target_feature(enable = "aes,sse2")]
unsafe fn process_lanes(
    keys: &[__m128i; ROUND_KEYS],
    blocks: &mut [Block],
    counter: &mut Option<u128>,
    direction: Direction,
) {
    let lanes = blocks.len();
    let mut b = [_mm_setzero_si128(); PIPELINE];
    let mut c = [_mm_setzero_si128(); PIPELINE];

    for lane in 0..lanes {
        b[lane] = _mm_loadu_si128(blocks[lane].as_ptr() as *const __m128i);
        if let Some(value) = counter {
            c[lane] = _mm_loadu_si128(counter_block(*value).as_ptr() as *const __m128i);
            *value = value.wrapping_add(1);
        }
    }

    match direction {
        Direction::Encrypt => {
            for lane in 0..lanes {
                b[lane] = _mm_xor_si128(_mm_xor_si128(b[lane], c[lane]), keys[0]);
            }
            for key in &keys[1..NUM_ROUNDS] {
                for lane in 0..lanes {
                    b[lane] = _mm_aesenc_si128(b[lane], *key);
                }
            }
            for lane in 0..lanes {
                b[lane] = _mm_aesenclast_si128(b[lane], keys[NUM_ROUNDS]);
            }
        }
        Direction::Decrypt => {
            for lane in 0..lanes {
                b[lane] = _mm_xor_si128(b[lane], keys[NUM_ROUNDS]);
            }
            for key in keys[1..NUM_ROUNDS].iter().rev() {
                for lane in 0..lanes {
                    b[lane] = _mm_aesdec_si128(b[lane], *key);
                }
            }
            for lane in 0..lanes {
                b[lane] = _mm_xor_si128(_mm_aesdeclast_si128(b[lane], keys[0]), c[lane]);
            }
        }
    }

    for lane in 0..lanes {
        _mm_storeu_si128(blocks[lane].as_mut_ptr() as *mut __m128i, b[lane]);
    }
}
