//! Property-based tests for the cipher and its supporting arithmetic

use aes_bench::cipher::{soft, AesNi128, CipherEngine, ReferenceAes128, SoftAes128};
use aes_bench::gf::{multiply, MUL_BY_2, MUL_BY_3};
use aes_bench::key_schedule::{aes_ni, KeySchedule};
use aes_bench::{AlignedBlocks, Block, Direction, Key, Mode, ParallelEncryptor};
use proptest::prelude::*;

fn mode() -> impl Strategy<Value = Mode> {
    prop_oneof![
        Just(Mode::Ecb),
        any::<u128>().prop_map(|base| Mode::Counter { base }),
        any::<u128>().prop_map(|nonce| Mode::Ctr { nonce }),
    ]
}

/// Multiples of 16 blocks, so 1, 2 and 4 threads all get whole cache lines
fn blocks() -> impl Strategy<Value = Vec<Block>> {
    (1usize..=8).prop_flat_map(|groups| prop::collection::vec(any::<[u8; 16]>(), groups * 16))
}

proptest! {
    #[test]
    fn multiplication_tables_agree(a in any::<u8>()) {
        prop_assert_eq!(MUL_BY_2[a as usize], multiply(2, a));
        prop_assert_eq!(MUL_BY_3[a as usize], multiply(3, a));
    }

    #[test]
    fn block_round_trip(key in any::<[u8; 16]>(), block in any::<[u8; 16]>(), counter in any::<Option<u128>>()) {
        let engine = SoftAes128::new(&Key::new(key));
        let mut state = block;
        engine.encrypt_block(&mut state, counter);
        engine.decrypt_block(&mut state, counter);
        prop_assert_eq!(state, block);
    }

    #[test]
    fn table_driven_matches_reference(key in any::<[u8; 16]>(), block in any::<[u8; 16]>()) {
        let key = Key::new(key);
        let mut soft_state = block;
        let mut reference_state = block;
        SoftAes128::new(&key).encrypt_block(&mut soft_state, None);
        ReferenceAes128::new(&key).encrypt_block(&mut reference_state, None);
        prop_assert_eq!(soft_state, reference_state);
    }

    #[test]
    fn schedules_agree_across_paths(key in any::<[u8; 16]>()) {
        let key = Key::new(key);
        let schedule = KeySchedule::expand(&key);
        if aes_ni::is_supported() {
            prop_assert_eq!(aes_ni::expand(&key).unwrap(), schedule);
            prop_assert_eq!(aes_ni::expand_inverse(&key).unwrap(), schedule.equivalent_inverse());
        }
        let inverse = schedule.equivalent_inverse();
        prop_assert_eq!(inverse.round_key(0), schedule.round_key(0));
        prop_assert_eq!(inverse.round_key(10), schedule.round_key(10));
    }

    #[test]
    fn mix_columns_is_invertible(block in any::<[u8; 16]>()) {
        let mut state = block;
        soft::mix_columns(&mut state);
        soft::inv_mix_columns(&mut state);
        prop_assert_eq!(state, block);
    }

    #[test]
    fn parallel_round_trip(
        key in any::<[u8; 16]>(),
        mode in mode(),
        plaintext in blocks(),
        threads in prop::sample::select(vec![1usize, 2, 4]),
    ) {
        let key = Key::new(key);
        let mut engines: Vec<Box<dyn CipherEngine>> = vec![Box::new(SoftAes128::new(&key))];
        if let Ok(engine) = AesNi128::new(&key) {
            engines.push(Box::new(engine));
        }

        let plaintext = AlignedBlocks::from_blocks(&plaintext);
        let encryptor = ParallelEncryptor::new(threads).unwrap();
        for engine in &engines {
            let mut ciphertext = AlignedBlocks::zeroed(plaintext.len());
            encryptor.run(engine.as_ref(), &plaintext, &mut ciphertext, mode, Direction::Encrypt).unwrap();
            let mut decrypted = AlignedBlocks::zeroed(plaintext.len());
            encryptor.run(engine.as_ref(), &ciphertext, &mut decrypted, mode, Direction::Decrypt).unwrap();
            prop_assert_eq!(&decrypted[..], &plaintext[..]);
        }
    }
}
