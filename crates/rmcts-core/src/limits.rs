//! 探索予算
//!
//! 予算はソフトな制限。iteration の開始（dispatch）前にだけ確認し、playout の途中では
//! 止めない。

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// 新しい iteration を始めなくなる条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchLimit {
    /// 経過時間の予算（ミリ秒）
    TimeMs(u64),
    /// 固定 iteration 数（決定的なテスト用）
    Iterations(u64),
}

impl SearchLimit {
    pub fn time(budget: Duration) -> Self {
        SearchLimit::TimeMs(budget.as_millis().min(u128::from(u64::MAX)) as u64)
    }

    /// 0 の予算は設定の検証で弾かれる。
    pub fn is_zero(&self) -> bool {
        matches!(self, SearchLimit::TimeMs(0) | SearchLimit::Iterations(0))
    }
}

impl Default for SearchLimit {
    fn default() -> Self {
        SearchLimit::TimeMs(1000)
    }
}

/// 探索開始時点からの予算を追跡する
#[derive(Debug, Clone, Copy)]
pub struct SearchClock {
    start: Instant,
    limit: SearchLimit,
}

impl SearchClock {
    pub fn start(limit: SearchLimit) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    /// `started` 回開始した後で、さらに iteration を始めてよいか。
    ///
    /// 1回目は常に許可するので、どの探索も必ず手を返す。
    #[inline]
    pub fn allows(&self, started: u64) -> bool {
        if started == 0 {
            return true;
        }
        match self.limit {
            SearchLimit::TimeMs(ms) => self.start.elapsed() < Duration::from_millis(ms),
            SearchLimit::Iterations(n) => started < n,
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    #[inline]
    pub fn limit(&self) -> SearchLimit {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_budget_is_exact() {
        let clock = SearchClock::start(SearchLimit::Iterations(3));
        assert!(clock.allows(0));
        assert!(clock.allows(2));
        assert!(!clock.allows(3));
    }

    #[test]
    fn first_iteration_always_allowed() {
        let clock = SearchClock::start(SearchLimit::Iterations(0));
        assert!(clock.allows(0));
        assert!(!clock.allows(1));

        let expired = SearchClock::start(SearchLimit::TimeMs(0));
        assert!(expired.allows(0));
        assert!(!expired.allows(1));
    }

    #[test]
    fn time_budget_expires() {
        let clock = SearchClock::start(SearchLimit::TimeMs(5));
        std::thread::sleep(Duration::from_millis(10));
        assert!(!clock.allows(1));
        assert!(clock.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn duration_conversion_and_zero_check() {
        assert_eq!(SearchLimit::time(Duration::from_secs(2)), SearchLimit::TimeMs(2000));
        assert!(SearchLimit::TimeMs(0).is_zero());
        assert!(!SearchLimit::Iterations(1).is_zero());
        assert_eq!(SearchLimit::default(), SearchLimit::TimeMs(1000));
    }
}
