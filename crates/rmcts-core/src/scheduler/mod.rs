//! 探索 iteration の実行方式
//!
//! - [`sequential`]: iteration 全体を呼び出しスレッドで実行
//! - [`pool`]: playout をワーカープールで実行。選択と逆伝播は呼び出しスレッド
//!   （コーディネータ）に残るので、木は共有しない

pub mod pool;
pub mod sequential;

pub use pool::{PoolOptions, run_concurrent};
pub use sequential::run_sequential;

/// 探索の seed から導くワーカーごとの seed（SplitMix64 の finalizer）
///
/// ワーカー 0 もコーディネータと同じ乱数列を使わない。
pub(crate) fn worker_seed(base: u64, worker_id: usize) -> u64 {
    fn mix(mut x: u64) -> u64 {
        x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = x;
        z ^= z >> 30;
        z = z.wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z ^= z >> 27;
        z = z.wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
    mix(base ^ mix(worker_id as u64 + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_seeds_differ_per_worker_and_are_stable() {
        let seeds: Vec<u64> = (0..8).map(|id| worker_seed(42, id)).collect();
        for (i, a) in seeds.iter().enumerate() {
            assert_ne!(*a, 42);
            for b in &seeds[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(worker_seed(42, 3), seeds[3]);
    }
}
