//! Portable table-driven AES-128. The state is 16 bytes in column-major order, so byte
//! `column * 4 + row` holds row `row` of column `column`.

use super::{counter_block, Backend, CipherEngine};
use crate::gf::{MUL_BY_11, MUL_BY_13, MUL_BY_14, MUL_BY_2, MUL_BY_3, MUL_BY_9};
use crate::key_schedule::KeySchedule;
use crate::tables::{INV_SBOX, SBOX};
use crate::{xor_block, Block, Key, NUM_ROUNDS, WORD_SIZE};

// new[i] = old[SHIFT_ROWS[i]]
const SHIFT_ROWS: [usize; 16] = [0, 5, 10, 15, 4, 9, 14, 3, 8, 13, 2, 7, 12, 1, 6, 11];
const INV_SHIFT_ROWS: [usize; 16] = [0, 13, 10, 7, 4, 1, 14, 11, 8, 5, 2, 15, 12, 9, 6, 3];

pub struct SoftAes128 {
    schedule: KeySchedule,
}

impl SoftAes128 {
    pub fn new(key: &Key) -> Self {
        Self::with_schedule(KeySchedule::expand(key))
    }

    pub fn with_schedule(schedule: KeySchedule) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &KeySchedule {
        &self.schedule
    }
}

impl CipherEngine for SoftAes128 {
    fn backend(&self) -> Backend {
        Backend::TableDriven
    }

    fn encrypt_block(&self, block: &mut Block, counter: Option<u128>) {
        if let Some(counter) = counter {
            xor_block(block, &counter_block(counter));
        }
        encrypt(block, &self.schedule);
    }

    fn decrypt_block(&self, block: &mut Block, counter: Option<u128>) {
        decrypt(block, &self.schedule);
        if let Some(counter) = counter {
            xor_block(block, &counter_block(counter));
        }
    }
}

/// Runs the ten AES-128 rounds over `state`.
pub fn encrypt(state: &mut Block, schedule: &KeySchedule) {
    add_round_key(state, schedule.round_key(0));

    for round in 1..NUM_ROUNDS {
        sub_bytes(state);
        shift_rows(state);
        mix_columns(state);
        add_round_key(state, schedule.round_key(round));
    }

    // The final round has no column mix
    sub_bytes(state);
    shift_rows(state);
    add_round_key(state, schedule.round_key(NUM_ROUNDS));
}

/// Inverse cipher, taking the same (forward) schedule as [`encrypt`].
pub fn decrypt(state: &mut Block, schedule: &KeySchedule) {
    add_round_key(state, schedule.round_key(NUM_ROUNDS));

    for round in (1..NUM_ROUNDS).rev() {
        inv_shift_rows(state);
        inv_sub_bytes(state);
        add_round_key(state, schedule.round_key(round));
        inv_mix_columns(state);
    }

    inv_shift_rows(state);
    inv_sub_bytes(state);
    add_round_key(state, schedule.round_key(0));
}

pub fn sub_bytes(state: &mut Block) {
    for byte in state.iter_mut() {
        *byte = SBOX[*byte as usize];
    }
}

pub fn inv_sub_bytes(state: &mut Block) {
    for byte in state.iter_mut() {
        *byte = INV_SBOX[*byte as usize];
    }
}

pub fn shift_rows(state: &mut Block) {
    permute(state, &SHIFT_ROWS);
}

pub fn inv_shift_rows(state: &mut Block) {
    permute(state, &INV_SHIFT_ROWS);
}

fn permute(state: &mut Block, mask: &[usize; 16]) {
    let old = *state;
    for (byte, &source) in state.iter_mut().zip(mask.iter()) {
        *byte = old[source];
    }
}

/// Multiplies every column by the MDS matrix [[2,3,1,1],[1,2,3,1],[1,1,2,3],[3,1,1,2]].
pub fn mix_columns(state: &mut Block) {
    for column in state.chunks_exact_mut(WORD_SIZE) {
        let b = [
            column[0] as usize,
            column[1] as usize,
            column[2] as usize,
            column[3] as usize,
        ];
        column[0] = MUL_BY_2[b[0]] ^ MUL_BY_3[b[1]] ^ b[2] as u8 ^ b[3] as u8;
        column[1] = b[0] as u8 ^ MUL_BY_2[b[1]] ^ MUL_BY_3[b[2]] ^ b[3] as u8;
        column[2] = b[0] as u8 ^ b[1] as u8 ^ MUL_BY_2[b[2]] ^ MUL_BY_3[b[3]];
        column[3] = MUL_BY_3[b[0]] ^ b[1] as u8 ^ b[2] as u8 ^ MUL_BY_2[b[3]];
    }
}

pub fn inv_mix_columns(state: &mut Block) {
    for column in state.chunks_exact_mut(WORD_SIZE) {
        let b = [
            column[0] as usize,
            column[1] as usize,
            column[2] as usize,
            column[3] as usize,
        ];
        column[0] = MUL_BY_14[b[0]] ^ MUL_BY_11[b[1]] ^ MUL_BY_13[b[2]] ^ MUL_BY_9[b[3]];
        column[1] = MUL_BY_9[b[0]] ^ MUL_BY_14[b[1]] ^ MUL_BY_11[b[2]] ^ MUL_BY_13[b[3]];
        column[2] = MUL_BY_13[b[0]] ^ MUL_BY_9[b[1]] ^ MUL_BY_14[b[2]] ^ MUL_BY_11[b[3]];
        column[3] = MUL_BY_11[b[0]] ^ MUL_BY_13[b[1]] ^ MUL_BY_9[b[2]] ^ MUL_BY_14[b[3]];
    }
}

#[inline]
pub fn add_round_key(state: &mut Block, round_key: &Block) {
    xor_block(state, round_key);
}
