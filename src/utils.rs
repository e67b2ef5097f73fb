use crate::BLOCK_SIZE;
use itertools::izip;
use std::time::Duration;

/// Prints every block where `actual` and `expected` differ next to the input block, and
/// returns how many differ.
pub fn compare_bytes(input: &[u8], actual: &[u8], expected: &[u8]) -> usize {
    let mut mismatches = 0;
    let zipped = izip!(
        input.chunks(BLOCK_SIZE),
        actual.chunks(BLOCK_SIZE),
        expected.chunks(BLOCK_SIZE)
    );
    for (i, (input, actual, expected)) in zipped.enumerate() {
        if actual != expected {
            println!(
                "Block {}:\t {} \t{} \t{}",
                i,
                hex::encode(input),
                hex::encode(actual),
                hex::encode(expected)
            );
            mismatches += 1;
        }
    }
    mismatches + actual.len().max(expected.len()) / BLOCK_SIZE
        - actual.len().min(expected.len()) / BLOCK_SIZE
}

/// Mean in nanoseconds, `None` for no samples.
pub fn average(samples: &[Duration]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let total: u128 = samples.iter().map(Duration::as_nanos).sum();
    Some(total as f64 / samples.len() as f64)
}

pub fn median(samples: &mut [Duration]) -> Option<Duration> {
    if samples.is_empty() {
        return None;
    }
    samples.sort();
    Some(samples[samples.len() / 2])
}

/// Bytes per second expressed in MiB/s.
pub fn throughput_mib_s(bytes: usize, elapsed: Duration) -> f64 {
    let seconds = elapsed.as_secs_f64();
    if seconds == 0.0 {
        return f64::INFINITY;
    }
    bytes as f64 / (1024.0 * 1024.0) / seconds
}
