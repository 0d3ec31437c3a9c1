//! エンジン設定
//!
//! `MctsConfig` はただのデータ。tools から TOML で読めるよう serde 対応し、
//! エンジン生成時に [`MctsConfig::validate`] で一度だけ検証する。

use std::num::NonZeroUsize;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::error::{MctsError, MctsResult};
use crate::limits::SearchLimit;

pub const DEFAULT_EXPLORATION_WEIGHT: f64 = 1.0;
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: usize = 32;
/// dispatch サイクル間でコーディネータが待つ時間（ms）
pub const DEFAULT_DISPATCH_POLL_MS: u64 = 10;

/// ハードウェアスレッド数（最低 1）
pub fn available_parallelism() -> usize {
    thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}

fn default_batch_size() -> usize {
    1
}

/// iteration の実行方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyMode {
    /// 選択・simulation・逆伝播をすべて呼び出しスレッドで行う
    #[default]
    Sequential,
    /// playout はワーカープール、木の更新は呼び出しスレッド
    Concurrent {
        /// ワーカー数。0 ならハードウェアスレッド数
        #[serde(default)]
        pool_size: usize,
        /// 葉1つあたりの playout 数。平均を1訪問として数える
        #[serde(default = "default_batch_size")]
        batch_size: usize,
    },
}

impl ConcurrencyMode {
    /// ハードウェアスレッド数のプール、葉1つに playout 1回
    pub fn concurrent() -> Self {
        ConcurrencyMode::Concurrent {
            pool_size: available_parallelism(),
            batch_size: 1,
        }
    }
}

/// 予算を使い切った後に返す手の基準
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalSelection {
    /// 降下中と同じ UCT 式
    #[default]
    Uct,
    /// 訪問数最大の子
    MostVisited,
    /// 平均報酬最大の子
    BestAverage,
}

/// 降下中の exploitation 項を誰の視点で読むか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPerspective {
    /// 常にルート手番（`child.average_value()` をそのまま使う）
    #[default]
    RootPlayer,
    /// 親で手を選ぶ側（相手手番ではルート手番の報酬を反転）
    PlayerToMove,
}

/// 探索パラメータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MctsConfig {
    /// UCT の探索重み `C`（> 0）
    pub exploration_weight: f64,
    pub limit: SearchLimit,
    pub concurrency: ConcurrencyMode,
    pub final_selection: FinalSelection,
    pub perspective: SelectionPerspective,
    /// 探索を打ち切るまでに許す playout の連続失敗数
    pub max_consecutive_failures: usize,
    /// この手数を超えた playout は引き分け扱い
    pub playout_ply_limit: Option<u32>,
    /// 固定シード。探索ごとにここから始める。`None` なら探索ごとに乱数で決める
    pub seed: Option<u64>,
    pub dispatch_poll_ms: u64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            exploration_weight: DEFAULT_EXPLORATION_WEIGHT,
            limit: SearchLimit::default(),
            concurrency: ConcurrencyMode::Sequential,
            final_selection: FinalSelection::Uct,
            perspective: SelectionPerspective::RootPlayer,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            playout_ply_limit: None,
            seed: None,
            dispatch_poll_ms: DEFAULT_DISPATCH_POLL_MS,
        }
    }
}

impl MctsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 探索できない値を弾く。
    pub fn validate(&self) -> MctsResult<()> {
        if !self.exploration_weight.is_finite() || self.exploration_weight <= 0.0 {
            return Err(MctsError::InvalidConfig(format!(
                "exploration_weight must be a positive finite number, got {}",
                self.exploration_weight
            )));
        }
        if self.limit.is_zero() {
            return Err(MctsError::InvalidConfig(format!("search limit must be positive, got {:?}", self.limit)));
        }
        if let ConcurrencyMode::Concurrent { batch_size: 0, .. } = self.concurrency {
            return Err(MctsError::InvalidConfig("batch_size must be at least 1".to_string()));
        }
        if self.max_consecutive_failures == 0 {
            return Err(MctsError::InvalidConfig("max_consecutive_failures must be at least 1".to_string()));
        }
        if self.playout_ply_limit == Some(0) {
            return Err(MctsError::InvalidConfig("playout_ply_limit must be at least 1 when set".to_string()));
        }
        Ok(())
    }

    /// 並列モードのワーカー数。0 はハードウェアスレッド数に解決する。
    pub fn pool_size(&self) -> Option<usize> {
        match self.concurrency {
            ConcurrencyMode::Sequential => None,
            ConcurrencyMode::Concurrent { pool_size: 0, .. } => Some(available_parallelism()),
            ConcurrencyMode::Concurrent { pool_size, .. } => Some(pool_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MctsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.concurrency, ConcurrencyMode::Sequential);
        assert_eq!(config.pool_size(), None);
        assert_eq!(config.final_selection, FinalSelection::Uct);
        assert_eq!(config.perspective, SelectionPerspective::RootPlayer);
    }

    #[test]
    fn rejects_bad_exploration_weight() {
        for weight in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = MctsConfig {
                exploration_weight: weight,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(MctsError::InvalidConfig(_))), "weight {weight}");
        }
    }

    #[test]
    fn rejects_zero_budgets() {
        let config = MctsConfig {
            limit: SearchLimit::Iterations(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MctsConfig {
            concurrency: ConcurrencyMode::Concurrent {
                pool_size: 2,
                batch_size: 0,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MctsConfig {
            max_consecutive_failures: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MctsConfig {
            playout_ply_limit: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_pool_size_means_hardware_threads() {
        let config = MctsConfig {
            concurrency: ConcurrencyMode::Concurrent {
                pool_size: 0,
                batch_size: 1,
            },
            ..Default::default()
        };
        assert_eq!(config.pool_size(), Some(available_parallelism()));
        assert!(available_parallelism() >= 1);
        assert_eq!(
            ConcurrencyMode::concurrent(),
            ConcurrencyMode::Concurrent {
                pool_size: available_parallelism(),
                batch_size: 1
            }
        );
    }
}
