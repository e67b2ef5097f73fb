//! The RustCrypto `aes` crate behind [`CipherEngine`], so any backend can be checked against an
//! independent implementation.

use super::{counter_block, Backend, CipherEngine};
use crate::{xor_block, Block, Key};
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;

pub struct ReferenceAes128 {
    cipher: Aes128,
}

impl ReferenceAes128 {
    pub fn new(key: &Key) -> Self {
        Self {
            cipher: Aes128::new(GenericArray::from_slice(key.as_bytes())),
        }
    }
}

impl CipherEngine for ReferenceAes128 {
    fn backend(&self) -> Backend {
        Backend::Reference
    }

    fn encrypt_block(&self, block: &mut Block, counter: Option<u128>) {
        if let Some(counter) = counter {
            xor_block(block, &counter_block(counter));
        }
        self.cipher
            .encrypt_block(GenericArray::from_mut_slice(&mut block[..]));
    }

    fn decrypt_block(&self, block: &mut Block, counter: Option<u128>) {
        self.cipher
            .decrypt_block(GenericArray::from_mut_slice(&mut block[..]));
        if let Some(counter) = counter {
            xor_block(block, &counter_block(counter));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{Direction, Mode, SoftAes128};
    use rand::Rng;

    #[test]
    fn table_driven_agrees_with_reference() {
        let mut rng = rand::thread_rng();
        for _ in 0..64 {
            let key = Key::new(rng.gen());
            let soft = SoftAes128::new(&key);
            let reference = ReferenceAes128::new(&key);
            let input: Vec<Block> = (0..8).map(|_| rng.gen()).collect();
            let mode = Mode::Ctr { nonce: rng.gen() };

            let mut expected = vec![[0u8; 16]; input.len()];
            let mut actual = vec![[0u8; 16]; input.len()];
            reference.process(&input, &mut expected, mode, Direction::Encrypt, 0).unwrap();
            soft.process(&input, &mut actual, mode, Direction::Encrypt, 0).unwrap();
            assert_eq!(actual, expected);
        }
    }
}
