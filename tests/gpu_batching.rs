//! Tiling through a device whose allocation ceiling is smaller than, equal to and larger than
//! the buffer must not change the output.

use aes_bench::cipher::{CipherEngine, ReferenceAes128};
use aes_bench::gpu::{GpuBatchDispatcher, HostDevice};
use aes_bench::{Block, Direction, Key, Mode};
use rand::Rng;

const BLOCKS: usize = 100;

fn expected(key: &Key, input: &[Block]) -> Vec<Block> {
    let mut output = vec![[0u8; 16]; input.len()];
    ReferenceAes128::new(key).process(
        input,
        &mut output,
        Mode::Counter { base: 0 },
        Direction::Encrypt,
        0,
    )
    .unwrap();
    output
}

#[test]
fn output_is_independent_of_the_ceiling() {
    let mut rng = rand::thread_rng();
    let key = Key::new(rng.gen());
    let input: Vec<Block> = (0..BLOCKS).map(|_| rng.gen()).collect();
    let expected = expected(&key, &input);

    for &(ceiling_blocks, tiles) in &[(1, 100), (7, 15), (33, 4), (50, 2), (99, 2), (100, 1), (101, 1), (4096, 1)] {
        let dispatcher = GpuBatchDispatcher::new(
            HostDevice::with_max_alloc_bytes(ceiling_blocks as u64 * 16),
            &key,
        );
        let mut output = vec![[0u8; 16]; BLOCKS];
        let summary = dispatcher.encrypt(&input, &mut output).unwrap();

        assert_eq!(summary.tile_blocks, ceiling_blocks.min(BLOCKS));
        assert_eq!(summary.tiles, tiles, "ceiling {}", ceiling_blocks);
        assert_eq!(output, expected, "ceiling {}", ceiling_blocks);
        assert_eq!(dispatcher.device().launches(), tiles);
        assert_eq!(dispatcher.device().schedule_uploads(), 1);
    }
}

#[test]
fn override_only_lowers_the_device_ceiling() {
    let key = Key::new([3u8; 16]);
    let device = HostDevice::with_max_alloc_bytes(16 * 8);

    let dispatcher = GpuBatchDispatcher::new(device, &key).with_max_alloc_bytes(16 * 1000);
    assert_eq!(dispatcher.ceiling_blocks().unwrap(), 8);

    let dispatcher = dispatcher.with_max_alloc_bytes(16 * 2);
    assert_eq!(dispatcher.ceiling_blocks().unwrap(), 2);
}

#[test]
fn in_place_dispatch() {
    let key = Key::new([5u8; 16]);
    let input: Vec<Block> = (0..20u8).map(|i| [i; 16]).collect();
    let dispatcher = GpuBatchDispatcher::new(HostDevice::with_max_alloc_bytes(16 * 6), &key);

    let mut blocks = input.clone();
    dispatcher.encrypt_in_place(&mut blocks).unwrap();
    assert_eq!(blocks, expected(&key, &input));
}

#[test]
fn length_mismatch_is_rejected() {
    let dispatcher = GpuBatchDispatcher::new(HostDevice::new(), &Key::new([0u8; 16]));
    let input = vec![[0u8; 16]; 4];
    let mut output = vec![[0u8; 16]; 3];
    assert!(dispatcher.encrypt(&input, &mut output).is_err());
    assert_eq!(dispatcher.device().launches(), 0);
}
