use aes_bench::cipher::{AesNi128, CipherEngine, ReferenceAes128, SoftAes128};
use aes_bench::{
    AlignedBlocks, Block, Direction, Error, Key, Mode, ParallelEncryptor, CACHE_LINE_SIZE_BLOCKS,
};
use rand::Rng;

fn random_buffer(blocks: usize) -> AlignedBlocks {
    let mut rng = rand::thread_rng();
    AlignedBlocks::from_blocks(&(0..blocks).map(|_| rng.gen()).collect::<Vec<Block>>())
}

#[test]
fn every_thread_count_produces_the_same_output() {
    let key = Key::new(rand::thread_rng().gen());
    let engine = SoftAes128::new(&key);
    let input = random_buffer(256);

    for &mode in &[Mode::Ecb, Mode::Counter { base: 3 }, Mode::Ctr { nonce: 1 << 70 }] {
        let mut expected = AlignedBlocks::zeroed(256);
        ParallelEncryptor::new(1)
            .unwrap()
            .encrypt(&engine, &input, &mut expected, mode)
            .unwrap();

        for &threads in &[2, 4, 8, 16, 32, 64] {
            let mut output = AlignedBlocks::zeroed(256);
            ParallelEncryptor::new(threads)
                .unwrap()
                .encrypt(&engine, &input, &mut output, mode)
                .unwrap();
            assert_eq!(&output[..], &expected[..], "{:?} on {} threads", mode, threads);
        }
    }
}

#[test]
fn threaded_round_trip_on_every_backend() {
    let key = Key::new(rand::thread_rng().gen());
    let mut engines: Vec<Box<dyn CipherEngine>> =
        vec![Box::new(SoftAes128::new(&key)), Box::new(ReferenceAes128::new(&key))];
    if let Ok(engine) = AesNi128::new(&key) {
        engines.push(Box::new(engine));
    }

    let plaintext = random_buffer(128);
    let encryptor = ParallelEncryptor::new(4).unwrap();
    for engine in &engines {
        for &mode in &[Mode::Ecb, Mode::Counter { base: 0 }, Mode::Ctr { nonce: 42 }] {
            let mut ciphertext = AlignedBlocks::zeroed(128);
            encryptor
                .encrypt(engine.as_ref(), &plaintext, &mut ciphertext, mode)
                .unwrap();
            let mut decrypted = AlignedBlocks::zeroed(128);
            encryptor
                .decrypt(engine.as_ref(), &ciphertext, &mut decrypted, mode)
                .unwrap();
            assert_eq!(&decrypted[..], &plaintext[..], "{} {:?}", engine.backend(), mode);
        }
    }
}

#[test]
fn in_place_matches_separate_output() {
    let engine = SoftAes128::new(&Key::new(rand::thread_rng().gen()));
    let input = random_buffer(64);
    let encryptor = ParallelEncryptor::new(4).unwrap();

    let mut output = AlignedBlocks::zeroed(64);
    encryptor
        .run(&engine, &input, &mut output, Mode::Counter { base: 9 }, Direction::Encrypt)
        .unwrap();

    let mut in_place = input.clone();
    encryptor
        .run_in_place(&engine, &mut in_place, Mode::Counter { base: 9 }, Direction::Encrypt)
        .unwrap();
    assert_eq!(&in_place[..], &output[..]);
}

#[test]
fn slices_are_whole_cache_lines() {
    let input = AlignedBlocks::zeroed(64);
    let mut output = AlignedBlocks::zeroed(64);
    let slices = ParallelEncryptor::new(16)
        .unwrap()
        .partition(&input, &mut output)
        .unwrap();

    let mut next = 0;
    for slice in &slices {
        assert_eq!(slice.offset, next);
        assert_eq!(slice.len() % CACHE_LINE_SIZE_BLOCKS, 0);
        assert_eq!(slice.output.as_ptr() as usize % 64, 0);
        next += slice.len();
    }
    assert_eq!(next, 64);
}

#[test]
fn partition_violations_are_reported() {
    let engine = SoftAes128::new(&Key::new([0u8; 16]));
    let input = AlignedBlocks::zeroed(40);
    let mut output = AlignedBlocks::zeroed(40);

    let result = ParallelEncryptor::new(3)
        .unwrap()
        .encrypt(&engine, &input, &mut output, Mode::Ecb);
    assert!(matches!(result, Err(Error::UnevenPartition { .. })));

    let result = ParallelEncryptor::new(20)
        .unwrap()
        .encrypt(&engine, &input, &mut output, Mode::Ecb);
    assert!(matches!(result, Err(Error::CacheLinePartition { .. })));

    let result = ParallelEncryptor::new(2)
        .unwrap()
        .encrypt(&engine, &input[..16], &mut output[1..17], Mode::Ecb);
    assert!(matches!(
        result,
        Err(Error::Misaligned {
            buffer: "output",
            ..
        })
    ));
    assert!(output.iter().all(|block| *block == [0u8; 16]));
}
