//! 選択 → 展開 → simulation → 逆伝播
//!
//! [`SearchLoop`] は木以外で1 iteration に必要なもの（選択器、ロールアウト方策、
//! 報酬の視点、playout の手数上限）をまとめる。逐次実行では iteration 全体を回し、
//! ワーカープールでは [`SearchLoop::simulate`] だけをコーディネータの外で使う。

use crate::error::{MctsResult, RolloutError};
use crate::game::GameState;
use crate::node::{NodeId, SearchTree};
use crate::policy::{RolloutPolicy, SearchRng};
use crate::uct::UctSelector;

/// 引き分け（または手数上限に達した playout）の報酬
pub const DRAW_REWARD: f64 = 0.5;

/// 木以外で1 iteration に必要なもの
pub struct SearchLoop<'p, S: GameState, P> {
    selector: UctSelector,
    policy: &'p P,
    /// ルートの手番。探索中は固定
    perspective: S::Player,
    playout_ply_limit: Option<u32>,
}

impl<'p, S, P> SearchLoop<'p, S, P>
where
    S: GameState,
    P: RolloutPolicy<S>,
{
    pub fn new(
        selector: UctSelector,
        policy: &'p P,
        perspective: S::Player,
        playout_ply_limit: Option<u32>,
    ) -> Self {
        Self {
            selector,
            policy,
            perspective,
            playout_ply_limit,
        }
    }

    #[inline]
    pub fn selector(&self) -> &UctSelector {
        &self.selector
    }

    #[inline]
    pub fn perspective(&self) -> S::Player {
        self.perspective
    }

    /// ルートから降りて simulation する葉を返す。
    ///
    /// 未展開の手が残る最初のノードで子を1つ作り、それを葉とする。終局ノード
    /// （と手のない非終局ノード）はそのまま返す。
    pub fn select(&self, tree: &mut SearchTree<S>) -> MctsResult<NodeId> {
        let mut current = tree.root();
        loop {
            let node = tree.node(current);
            if node.is_terminal() {
                return Ok(current);
            }
            if !node.is_fully_expanded() {
                return tree.expand_one_unexplored_child(current);
            }
            match self.selector.select_best_child(tree, current) {
                Some(child) => current = child,
                None => return Ok(current),
            }
        }
    }

    /// 終局していれば報酬、対局中なら `None`
    #[inline]
    pub fn terminal_reward(&self, state: &S) -> Option<f64> {
        state.outcome().map(|outcome| outcome.reward_for(&self.perspective))
    }

    /// `state` の複製を終局まで進める。
    pub fn simulate(&self, state: &S, rng: &mut SearchRng) -> Result<f64, RolloutError> {
        playout(state, self.policy, &self.perspective, self.playout_ply_limit, rng)
    }

    /// `tree` 上で1 iteration を丸ごと実行する。
    ///
    /// 外側の `Result` は木のエラー（致命的）。内側は playout の結果で、失敗した
    /// playout は木を変更しない。
    pub fn run_iteration(
        &self,
        tree: &mut SearchTree<S>,
        rng: &mut SearchRng,
    ) -> MctsResult<Result<f64, RolloutError>> {
        let leaf = self.select(tree)?;
        let result = self.simulate(tree.node(leaf).state(), rng);
        if let Ok(reward) = result {
            tree.backpropagate(leaf, reward);
        }
        Ok(result)
    }
}

/// `policy` で `state` を終局まで進め、`perspective` から見た報酬を返す。
///
/// 方策が返す手は毎回合法手リストと照合する。`ply_limit` を超えても終わらない
/// 対局は引き分け。
pub fn playout<S, P>(
    state: &S,
    policy: &P,
    perspective: &S::Player,
    ply_limit: Option<u32>,
    rng: &mut SearchRng,
) -> Result<f64, RolloutError>
where
    S: GameState,
    P: RolloutPolicy<S> + ?Sized,
{
    let mut state = state.clone();
    let mut plies = 0u32;
    loop {
        if let Some(outcome) = state.outcome() {
            return Ok(outcome.reward_for(perspective));
        }
        if ply_limit.is_some_and(|limit| plies >= limit) {
            return Ok(DRAW_REWARD);
        }
        let legal = state.legal_actions();
        if legal.is_empty() {
            return Err(RolloutError::NoLegalActions);
        }
        let action = policy.pick_action(&state, rng)?;
        if !legal.contains(&action) {
            return Err(RolloutError::IllegalAction(format!("{action:?}")));
        }
        state = state.apply(&action);
        plies += 1;
    }
}
