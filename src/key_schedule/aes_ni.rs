//! Key expansion with the AES-NI round key generation instruction, after the sequence in Intel's
//! AES-NI white paper.

use super::KeySchedule;
use crate::error::{Error, Result};
use crate::Key;

#[cfg(target_arch = "x86_64")]
use crate::{Block, BLOCK_SIZE, NUM_ROUNDS, ROUND_KEYS};
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

/// Whether this CPU has the AES instructions.
pub fn is_supported() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        is_x86_feature_detected!("aes") && is_x86_feature_detected!("sse2")
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        false
    }
}

/// Same schedule as [`KeySchedule::expand`], derived with `aeskeygenassist`.
#[cfg(target_arch = "x86_64")]
pub fn expand(key: &Key) -> Result<KeySchedule> {
    if !is_supported() {
        return Err(Error::Unsupported("AES-NI key expansion"));
    }
    let round_keys = unsafe { store(&expand_keys(key.as_bytes())) };
    Ok(KeySchedule::from_round_keys(round_keys))
}

/// Schedule in the form `aesdec` expects: `aesimc` applied to round keys 1 through 9.
#[cfg(target_arch = "x86_64")]
pub fn expand_inverse(key: &Key) -> Result<KeySchedule> {
    if !is_supported() {
        return Err(Error::Unsupported("AES-NI key expansion"));
    }
    let round_keys = unsafe { store(&inverse_keys(&expand_keys(key.as_bytes()))) };
    Ok(KeySchedule::from_round_keys(round_keys))
}

#[cfg(not(target_arch = "x86_64"))]
pub fn expand(_key: &Key) -> Result<KeySchedule> {
    Err(Error::Unsupported("AES-NI key expansion"))
}

#[cfg(not(target_arch = "x86_64"))]
pub fn expand_inverse(_key: &Key) -> Result<KeySchedule> {
    Err(Error::Unsupported("AES-NI key expansion"))
}

#[cfg(target_arch = "x86_64")]
macro_rules! expand_round {
    ($keys:expr, $pos:expr, $rcon:expr) => {
        let assist = _mm_aeskeygenassist_si128($keys[$pos - 1], $rcon);
        $keys[$pos] = key_expansion_assist($keys[$pos - 1], assist);
    };
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn key_expansion_assist(mut key: __m128i, assist: __m128i) -> __m128i {
    let assist = _mm_shuffle_epi32(assist, 0xff);
    let mut shifted = _mm_slli_si128(key, 0x04);
    key = _mm_xor_si128(key, shifted);
    shifted = _mm_slli_si128(shifted, 0x04);
    key = _mm_xor_si128(key, shifted);
    shifted = _mm_slli_si128(shifted, 0x04);
    key = _mm_xor_si128(key, shifted);
    _mm_xor_si128(key, assist)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "aes,sse2")]
pub(crate) unsafe fn expand_keys(key: &[u8; BLOCK_SIZE]) -> [__m128i; ROUND_KEYS] {
    let mut keys = [_mm_setzero_si128(); ROUND_KEYS];
    keys[0] = _mm_loadu_si128(key.as_ptr() as *const __m128i);

    expand_round!(keys, 1, 0x01);
    expand_round!(keys, 2, 0x02);
    expand_round!(keys, 3, 0x04);
    expand_round!(keys, 4, 0x08);
    expand_round!(keys, 5, 0x10);
    expand_round!(keys, 6, 0x20);
    expand_round!(keys, 7, 0x40);
    expand_round!(keys, 8, 0x80);
    expand_round!(keys, 9, 0x1b);
    expand_round!(keys, 10, 0x36);

    keys
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "aes,sse2")]
pub(crate) unsafe fn inverse_keys(keys: &[__m128i; ROUND_KEYS]) -> [__m128i; ROUND_KEYS] {
    let mut inverse = *keys;
    for key in inverse.iter_mut().take(NUM_ROUNDS).skip(1) {
        *key = _mm_aesimc_si128(*key);
    }
    inverse
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
pub(crate) unsafe fn load(schedule: &KeySchedule) -> [__m128i; ROUND_KEYS] {
    let mut keys = [_mm_setzero_si128(); ROUND_KEYS];
    for (key, round_key) in keys.iter_mut().zip(schedule.round_keys().iter()) {
        *key = _mm_loadu_si128(round_key.as_ptr() as *const __m128i);
    }
    keys
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn store(keys: &[__m128i; ROUND_KEYS]) -> [Block; ROUND_KEYS] {
    let mut round_keys = [[0u8; BLOCK_SIZE]; ROUND_KEYS];
    for (round_key, key) in round_keys.iter_mut().zip(keys.iter()) {
        _mm_storeu_si128(round_key.as_mut_ptr() as *mut __m128i, *key);
    }
    round_keys
}
