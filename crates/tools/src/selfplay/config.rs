use std::path::Path;

use anyhow::{Context, Result};
use rmcts_core::{ConcurrencyMode, MctsConfig, SearchLimit};

/// `--config` で渡された TOML を `MctsConfig` として読む。省略したキーは既定値。
pub fn load_search_config(path: &Path) -> Result<MctsConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: MctsConfig =
        toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))?;
    config.validate().with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// コマンドラインで上書きする探索設定（`None` はファイル / 既定値を維持）
#[derive(Debug, Clone, Default)]
pub struct SearchOverrides {
    pub time_ms: Option<u64>,
    pub iterations: Option<u64>,
    pub exploration: Option<f64>,
    pub threads: Option<usize>,
    pub batch: Option<usize>,
    pub playout_ply_limit: Option<u32>,
    pub seed: Option<u64>,
}

impl SearchOverrides {
    /// `base` に上書きを適用する。`iterations` は `time_ms` より優先。
    pub fn apply(&self, base: &MctsConfig) -> Result<MctsConfig> {
        let mut config = base.clone();
        if let Some(ms) = self.time_ms {
            config.limit = SearchLimit::TimeMs(ms);
        }
        if let Some(n) = self.iterations {
            config.limit = SearchLimit::Iterations(n);
        }
        if let Some(weight) = self.exploration {
            config.exploration_weight = weight;
        }
        match (self.threads, self.batch) {
            (Some(0 | 1), None) => config.concurrency = ConcurrencyMode::Sequential,
            (Some(threads), batch) => {
                config.concurrency = ConcurrencyMode::Concurrent {
                    pool_size: threads,
                    batch_size: batch.unwrap_or(1),
                };
            }
            (None, Some(batch)) => {
                config.concurrency = match config.concurrency {
                    ConcurrencyMode::Concurrent { pool_size, .. } => ConcurrencyMode::Concurrent {
                        pool_size,
                        batch_size: batch,
                    },
                    ConcurrencyMode::Sequential => ConcurrencyMode::Concurrent {
                        pool_size: 1,
                        batch_size: batch,
                    },
                };
            }
            (None, None) => {}
        }
        if let Some(limit) = self.playout_ply_limit {
            config.playout_ply_limit = Some(limit);
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        config.validate().context("invalid search options")?;
        Ok(config)
    }
}
