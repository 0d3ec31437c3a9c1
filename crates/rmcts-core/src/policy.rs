//! ロールアウト方策
//!
//! simulation の各手でどの手を指すかを決める。探索が依存するのは [`RolloutPolicy`]
//! だけで、ここにある既製の方策は自由に差し替えられる。

use std::sync::Arc;

use rand::seq::IndexedRandom;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::error::RolloutError;
use crate::game::{GameState, Outcome};

/// ロールアウト方策に渡す乱数生成器。制御スレッドごとに1つ。
pub type SearchRng = Xoshiro256PlusPlus;

/// playout の1手を選ぶ
pub trait RolloutPolicy<S: GameState> {
    /// Returns an action from `state.legal_actions()`. Only called on non-terminal states.
    fn pick_action(&self, state: &S, rng: &mut SearchRng) -> Result<S::Action, RolloutError>;
}

impl<S: GameState, P: RolloutPolicy<S> + ?Sized> RolloutPolicy<S> for &P {
    #[inline]
    fn pick_action(&self, state: &S, rng: &mut SearchRng) -> Result<S::Action, RolloutError> {
        (**self).pick_action(state, rng)
    }
}

impl<S: GameState, P: RolloutPolicy<S> + ?Sized> RolloutPolicy<S> for Box<P> {
    #[inline]
    fn pick_action(&self, state: &S, rng: &mut SearchRng) -> Result<S::Action, RolloutError> {
        (**self).pick_action(state, rng)
    }
}

impl<S: GameState, P: RolloutPolicy<S> + ?Sized> RolloutPolicy<S> for Arc<P> {
    #[inline]
    fn pick_action(&self, state: &S, rng: &mut SearchRng) -> Result<S::Action, RolloutError> {
        (**self).pick_action(state, rng)
    }
}

/// 合法手を一様ランダムに選ぶ
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformRandomPolicy;

impl<S: GameState> RolloutPolicy<S> for UniformRandomPolicy {
    fn pick_action(&self, state: &S, rng: &mut SearchRng) -> Result<S::Action, RolloutError> {
        state.legal_actions().choose(rng).cloned().ok_or(RolloutError::NoLegalActions)
    }
}

/// 即勝ちの手があればそれを、なければランダムな手を指す。
///
/// `legal_actions` の順に試し、最初に見つかった勝ちの手を指す。1手ごとに合法手の数だけ
/// `apply` する。
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisivePolicy;

impl<S: GameState> RolloutPolicy<S> for DecisivePolicy {
    fn pick_action(&self, state: &S, rng: &mut SearchRng) -> Result<S::Action, RolloutError> {
        let mover = state.to_move();
        let actions = state.legal_actions();
        let decisive = actions.iter().find(|action| {
            matches!(state.apply(action).outcome(), Some(Outcome::Win(winner)) if winner == mover)
        });
        match decisive {
            Some(action) => Ok(action.clone()),
            None => actions.choose(rng).cloned().ok_or(RolloutError::NoLegalActions),
        }
    }
}
