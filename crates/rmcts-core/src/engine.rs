//! 公開エントリポイント
//!
//! [`MctsEngine`] は設定とロールアウト方策を所有する。[`MctsEngine::choose`] のたびに
//! 与えられた局面から新しい木を作るので、探索間で共有するのは方策だけ。

use std::marker::PhantomData;
use std::time::Duration;

use log::{debug, info};
use rand::Rng;

use crate::config::{ConcurrencyMode, MctsConfig};
use crate::error::{MctsError, MctsResult};
use crate::game::GameState;
use crate::limits::{SearchClock, SearchLimit};
use crate::node::SearchTree;
use crate::policy::RolloutPolicy;
use crate::scheduler::{PoolOptions, run_concurrent, run_sequential};
use crate::search::SearchLoop;
use crate::stats::{SearchReport, SearchStats, summarize_root};
use crate::uct::UctSelector;

/// ゲーム `S` を方策 `P` で simulation する MCTS エンジン
///
/// 探索は `&mut self` を取るので、1つのエンジンで同時に走る探索は1つだけ。
pub struct MctsEngine<S, P> {
    config: MctsConfig,
    policy: P,
    last_stats: Option<SearchStats>,
    _game: PhantomData<fn() -> S>,
}

impl<S, P> MctsEngine<S, P>
where
    S: GameState + Send,
    S::Player: Sync,
    P: RolloutPolicy<S> + Sync,
{
    /// `config` を検証してエンジンを作る。
    pub fn new(config: MctsConfig, policy: P) -> MctsResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            policy,
            last_stats: None,
            _game: PhantomData,
        })
    }

    /// `root` から探索し、選ばれた手を返す。
    pub fn choose(&mut self, root: &S) -> MctsResult<S::Action> {
        self.search(root).map(|report| report.best_action)
    }

    /// [`choose`](Self::choose) と同じだが、ルートの子の統計も返す。
    ///
    /// # Errors
    /// - [`MctsError::InvalidState`]: `root` が終局、または合法手なし
    /// - [`MctsError::SearchAborted`]: playout が連続して失敗しすぎた
    /// - [`MctsError::WorkerSpawn`]: ワーカープールを起動できない
    /// - [`MctsError::TreeFull`]: ノード数が `NodeId` の範囲を超えた
    pub fn search(&mut self, root: &S) -> MctsResult<SearchReport<S::Action>> {
        if root.is_terminal() {
            return Err(MctsError::InvalidState("root state is terminal".to_string()));
        }
        if root.legal_actions().is_empty() {
            return Err(MctsError::InvalidState("root state has no legal actions".to_string()));
        }

        let seed = self.config.seed.unwrap_or_else(|| rand::rng().random());
        let selector = UctSelector::new(self.config.exploration_weight, self.config.perspective);
        let search = SearchLoop::new(selector, &self.policy, root.to_move(), self.config.playout_ply_limit);
        let mut tree = SearchTree::new(root.clone());
        let clock = SearchClock::start(self.config.limit);
        let mut stats = SearchStats::default();

        let outcome = match self.config.concurrency {
            ConcurrencyMode::Sequential => run_sequential(
                &mut tree,
                &search,
                &clock,
                seed,
                self.config.max_consecutive_failures,
                &mut stats,
            ),
            ConcurrencyMode::Concurrent { batch_size, .. } => {
                let options = PoolOptions {
                    pool_size: self.config.pool_size().unwrap_or(1),
                    batch_size,
                    poll_interval: Duration::from_millis(self.config.dispatch_poll_ms),
                    max_consecutive_failures: self.config.max_consecutive_failures,
                    seed,
                };
                run_concurrent(&mut tree, &search, &clock, options, &mut stats)
            }
        };

        stats.finish(&tree, clock.elapsed());
        debug!(
            "search finished: iterations={} completed={} failed={} root_visits={} nodes={} depth={} elapsed={:?} ({:.0} it/s)",
            stats.iterations,
            stats.completed_playouts,
            stats.failed_playouts,
            stats.root_visits,
            stats.tree_size,
            stats.max_depth,
            stats.elapsed,
            stats.iterations_per_second()
        );
        self.last_stats = Some(stats.clone());
        outcome?;

        let best = search
            .selector()
            .select_final(&tree, tree.root(), self.config.final_selection)
            .ok_or_else(|| MctsError::InvalidState("search produced no root children".to_string()))?;
        let node = tree.node(best);
        let best_action = node
            .incoming_action()
            .cloned()
            .ok_or_else(|| MctsError::InvalidState("chosen node has no incoming action".to_string()))?;
        info!(
            "chose {best_action:?}: visits={} average={:?}",
            node.visit_count(),
            node.average_value()
        );

        Ok(SearchReport {
            best_action,
            children: summarize_root(&tree),
            stats,
        })
    }

    /// 直近の探索の統計（中断した探索も含む）
    pub fn last_stats(&self) -> Option<&SearchStats> {
        self.last_stats.as_ref()
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// 以降の探索で使う予算を置き換える。
    pub fn set_limit(&mut self, limit: SearchLimit) -> MctsResult<()> {
        if limit.is_zero() {
            return Err(MctsError::InvalidConfig(format!("search limit must be positive, got {limit:?}")));
        }
        self.config.limit = limit;
        Ok(())
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }
}
