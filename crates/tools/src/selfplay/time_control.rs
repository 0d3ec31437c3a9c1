use rmcts_core::SearchLimit;

use super::types::Side;

/// 残り約20手を想定して1手あたりの持ち時間を配分する。
const TIME_ALLOCATION_MOVES: u64 = 20;
const MIN_THINK_MS: u64 = 10;

/// 1手ごとの探索予算を決めるヘルパー。
///
/// 持ち時間が 0 の側は各エンジンの固定予算（`per_move`）で探索する。
#[derive(Debug, Clone, Copy)]
pub struct TimeControl {
    pub remaining: [u64; 2],
    pub increment: u64,
    pub per_move: [SearchLimit; 2],
}

impl TimeControl {
    /// 固定予算のみ（持ち時間なし）
    pub fn fixed(first: SearchLimit, second: SearchLimit) -> Self {
        Self {
            remaining: [0, 0],
            increment: 0,
            per_move: [first, second],
        }
    }

    /// 両者に `total_ms` の持ち時間。`total_ms == 0` なら固定予算と同じ。
    pub fn with_clock(total_ms: u64, increment: u64, per_move: [SearchLimit; 2]) -> Self {
        Self {
            remaining: [total_ms, total_ms],
            increment,
            per_move,
        }
    }

    /// 次の1手の探索予算。
    pub fn limit_for(&self, side: Side) -> SearchLimit {
        let remaining = self.remaining[side.index()];
        if remaining == 0 {
            return self.per_move[side.index()];
        }
        let per_move_budget = remaining / TIME_ALLOCATION_MOVES;
        let candidate = per_move_budget.saturating_add(self.increment);
        let lower = MIN_THINK_MS.min(remaining);
        SearchLimit::TimeMs(candidate.clamp(lower, remaining))
    }

    pub fn update_after_move(&mut self, side: Side, elapsed_ms: u64) {
        let slot = &mut self.remaining[side.index()];
        if *slot == 0 {
            return;
        }
        // 持ち時間を使い切っても 0 にはせず最低 1ms 残す（0 は固定予算を意味するため）
        *slot = slot.saturating_sub(elapsed_ms).saturating_add(self.increment).max(1);
    }
}
