pub mod aes_ni;

use crate::cipher::soft;
use crate::tables::{RCON, SBOX};
use crate::{Block, Key, BLOCK_SIZE, NUM_ROUNDS, ROUND_KEYS, SCHEDULE_WORDS, WORD_SIZE};
use byteorder::{BigEndian, ByteOrder};

/// Words in an AES-128 key.
const KEY_WORDS: usize = 4;

/// Eleven round keys derived from one [`Key`]. Read-only once derived, so a single schedule is
/// shared by every worker thread and every device tile.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct KeySchedule {
    round_keys: [Block; ROUND_KEYS],
}

impl KeySchedule {
    /// Table-driven expansion following the recurrence of FIPS-197 section 5.2.
    pub fn expand(key: &Key) -> Self {
        // The recurrence operates on big-endian words regardless of host byte order
        let mut words = [0u32; SCHEDULE_WORDS];
        for (word, chunk) in words.iter_mut().zip(key.as_bytes().chunks_exact(WORD_SIZE)) {
            *word = BigEndian::read_u32(chunk);
        }

        for i in KEY_WORDS..SCHEDULE_WORDS {
            let mut temp = words[i - 1];
            if i % KEY_WORDS == 0 {
                temp = sub_word(rot_word(temp)) ^ RCON[i / KEY_WORDS];
            }
            words[i] = words[i - KEY_WORDS] ^ temp;
        }

        Self::from_words(&words)
    }

    pub fn from_round_keys(round_keys: [Block; ROUND_KEYS]) -> Self {
        Self { round_keys }
    }

    fn from_words(words: &[u32; SCHEDULE_WORDS]) -> Self {
        let mut round_keys = [[0u8; BLOCK_SIZE]; ROUND_KEYS];
        for (round_key, round_words) in round_keys.iter_mut().zip(words.chunks_exact(KEY_WORDS)) {
            BigEndian::write_u32_into(round_words, round_key);
        }
        Self { round_keys }
    }

    pub fn round_key(&self, round: usize) -> &Block {
        &self.round_keys[round]
    }

    pub fn round_keys(&self) -> &[Block; ROUND_KEYS] {
        &self.round_keys
    }

    /// The schedule as 44 words with the standard's big-endian interpretation.
    pub fn words(&self) -> [u32; SCHEDULE_WORDS] {
        let mut words = [0u32; SCHEDULE_WORDS];
        for (round_words, round_key) in words.chunks_exact_mut(KEY_WORDS).zip(self.round_keys.iter()) {
            BigEndian::read_u32_into(round_key, round_words);
        }
        words
    }

    /// Round keys laid out back to back, the format the OpenCL kernel reads.
    pub fn to_bytes(&self) -> [u8; ROUND_KEYS * BLOCK_SIZE] {
        let mut bytes = [0u8; ROUND_KEYS * BLOCK_SIZE];
        for (chunk, round_key) in bytes.chunks_exact_mut(BLOCK_SIZE).zip(self.round_keys.iter()) {
            chunk.copy_from_slice(round_key);
        }
        bytes
    }

    /// Schedule for the equivalent inverse cipher: rounds 1 through 9 pass through the inverse
    /// column mix, rounds 0 and 10 are kept as they are.
    pub fn equivalent_inverse(&self) -> Self {
        let mut round_keys = self.round_keys;
        for round_key in round_keys.iter_mut().take(NUM_ROUNDS).skip(1) {
            soft::inv_mix_columns(round_key);
        }
        Self { round_keys }
    }
}

impl std::fmt::Debug for KeySchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeySchedule(..)")
    }
}

fn rot_word(word: u32) -> u32 {
    word.rotate_left(8)
}

fn sub_word(word: u32) -> u32 {
    let mut bytes = word.to_be_bytes();
    for byte in bytes.iter_mut() {
        *byte = SBOX[*byte as usize];
    }
    u32::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FIPS_197_KEY;

    #[test]
    fn fips_197_appendix_a1_words() {
        let words = KeySchedule::expand(&Key::new(FIPS_197_KEY)).words();
        assert_eq!(words[0], 0x2b7e_1516);
        assert_eq!(words[3], 0x09cf_4f3c);
        assert_eq!(words[4], 0xa0fa_fe17);
        assert_eq!(words[5], 0x8854_2cb1);
        assert_eq!(words[8], 0xf2c2_95f2);
        assert_eq!(words[20], 0xd4d1_c6f8);
        assert_eq!(words[36], 0xac77_66f3);
        assert_eq!(words[40], 0xd014_f9a8);
        assert_eq!(words[43], 0xb663_0ca6);
    }

    #[test]
    fn round_keys_are_big_endian_words() {
        let schedule = KeySchedule::expand(&Key::new(FIPS_197_KEY));
        assert_eq!(schedule.round_key(0), &FIPS_197_KEY);
        assert_eq!(
            hex::encode(schedule.round_key(10)),
            "d014f9a8c9ee2589e13f0cc8b6630ca6"
        );
        let bytes = schedule.to_bytes();
        assert_eq!(&bytes[160..], &schedule.round_key(10)[..]);
    }

    #[test]
    fn schedule_satisfies_recurrence() {
        let key = Key::new(*b"recurrence-check");
        let words = KeySchedule::expand(&key).words();
        for i in KEY_WORDS..SCHEDULE_WORDS {
            let previous = if i % KEY_WORDS == 0 {
                sub_word(rot_word(words[i - 1])) ^ RCON[i / KEY_WORDS]
            } else {
                words[i - 1]
            };
            assert_eq!(words[i], words[i - KEY_WORDS] ^ previous);
        }
    }

    #[test]
    fn equivalent_inverse_keeps_outer_rounds() {
        let schedule = KeySchedule::expand(&Key::new(FIPS_197_KEY));
        let inverse = schedule.equivalent_inverse();
        assert_eq!(inverse.round_key(0), schedule.round_key(0));
        assert_eq!(inverse.round_key(10), schedule.round_key(10));
        for round in 1..NUM_ROUNDS {
            assert_ne!(inverse.round_key(round), schedule.round_key(round));
            let mut restored = *inverse.round_key(round);
            soft::mix_columns(&mut restored);
            assert_eq!(&restored, schedule.round_key(round));
        }
    }

    #[test]
    fn sub_word_and_rot_word() {
        assert_eq!(rot_word(0x09cf_4f3c), 0xcf4f_3c09);
        assert_eq!(sub_word(0xcf4f_3c09), 0x8a84_eb01);
    }
}
