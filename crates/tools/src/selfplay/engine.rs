use anyhow::{Context, Result};
use clap::ValueEnum;
use rmcts_core::{
    DecisivePolicy, GameState, MctsConfig, MctsEngine, RolloutPolicy, SearchLimit, SearchReport,
    UniformRandomPolicy,
};
use serde::{Deserialize, Serialize};

/// 実行時に切り替えるロールアウト方策
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    Random,
    Decisive,
}

impl PolicyKind {
    pub fn label(self) -> &'static str {
        match self {
            PolicyKind::Random => "random",
            PolicyKind::Decisive => "decisive",
        }
    }

    pub fn build<S: GameState>(self) -> Box<dyn RolloutPolicy<S> + Send + Sync> {
        match self {
            PolicyKind::Random => Box::new(UniformRandomPolicy),
            PolicyKind::Decisive => Box::new(DecisivePolicy),
        }
    }
}

/// 片側のエンジン設定
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineConfig {
    pub search: MctsConfig,
    pub policy: PolicyKind,
}

/// 1手番を担当する MCTS エンジン。
pub struct SelfplayEngine<S: GameState> {
    engine: MctsEngine<S, Box<dyn RolloutPolicy<S> + Send + Sync>>,
    pub label: String,
}

impl<S> SelfplayEngine<S>
where
    S: GameState + Send,
    S::Player: Sync,
{
    pub fn new(cfg: &EngineConfig, label: String) -> Result<Self> {
        let engine = MctsEngine::new(cfg.search.clone(), cfg.policy.build::<S>())
            .with_context(|| format!("invalid search configuration for {label}"))?;
        Ok(Self { engine, label })
    }

    /// `limit` で1手探索する。
    pub fn search(&mut self, state: &S, limit: SearchLimit) -> Result<SearchReport<S::Action>> {
        self.engine.set_limit(limit).with_context(|| format!("{}: bad search limit", self.label))?;
        self.engine.search(state).with_context(|| format!("{}: search failed", self.label))
    }

    pub fn config(&self) -> &MctsConfig {
        self.engine.config()
    }
}
