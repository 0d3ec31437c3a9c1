//! 探索が利用するゲームの契約
//!
//! エンジンはこのトレイト以外のゲームの意味を見ない。ルール、表記、手の検証は
//! 実装側の責任。

use std::fmt::Debug;
use std::hash::Hash;

/// 終局した対局の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome<P> {
    /// 指定プレイヤーの勝ち
    Win(P),
    /// 引き分け
    Draw,
}

impl<P: PartialEq> Outcome<P> {
    /// `perspective` から見た報酬。勝ち 1.0、負け 0.0、引き分け 0.5。
    #[inline]
    pub fn reward_for(&self, perspective: &P) -> f64 {
        match self {
            Outcome::Win(winner) if winner == perspective => 1.0,
            Outcome::Win(_) => 0.0,
            Outcome::Draw => 0.5,
        }
    }
}

/// 二人・完全情報・手番制ゲームの局面
///
/// `Clone` は独立した深いコピーであること。playout は複製上で、別スレッドでも動く。
pub trait GameState: Clone {
    /// Transition from one state to the next
    type Action: Clone + Eq + Hash + Debug;
    /// Player identity
    type Player: Copy + Eq + Debug;

    /// 全合法手（順序固定）。空になるのは終局のみ。
    fn legal_actions(&self) -> Vec<Self::Action>;

    /// `action` を指した後の局面。`action` は `legal_actions` の要素。
    fn apply(&self, action: &Self::Action) -> Self;

    /// 対局結果。対局中は `None`。
    fn outcome(&self) -> Option<Outcome<Self::Player>>;

    /// 次に指すプレイヤー
    fn to_move(&self) -> Self::Player;

    #[inline]
    fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_encoding_from_fixed_perspective() {
        assert_eq!(Outcome::Win(1u8).reward_for(&1), 1.0);
        assert_eq!(Outcome::Win(2u8).reward_for(&1), 0.0);
        assert_eq!(Outcome::<u8>::Draw.reward_for(&1), 0.5);
        assert_eq!(Outcome::<u8>::Draw.reward_for(&2), 0.5);
    }
}
