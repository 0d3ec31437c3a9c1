//! 1山の Nim（最後の石を取った側の勝ち）
//!
//! 交互に 1..=max_take 個の石を取る。山が `max_take + 1` の倍数の局面は手番側の負け。

use std::fmt;

use rmcts_core::{GameState, Outcome};
use serde::{Deserialize, Serialize};

/// Player seat, `First` moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    #[inline]
    pub const fn opponent(self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seat::First => f.write_str("first"),
            Seat::Second => f.write_str("second"),
        }
    }
}

/// Nim position. The action is the number of stones taken.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nim {
    pile: u32,
    max_take: u32,
    to_move: Seat,
}

impl Nim {
    /// `pile` stones, `First` to move. `max_take` is clamped to at least 1.
    pub fn new(pile: u32, max_take: u32) -> Self {
        Self {
            pile,
            max_take: max_take.max(1),
            to_move: Seat::First,
        }
    }

    #[inline]
    pub fn pile(&self) -> u32 {
        self.pile
    }

    #[inline]
    pub fn max_take(&self) -> u32 {
        self.max_take
    }

    /// Take that leaves the opponent a lost position, if any.
    pub fn winning_take(&self) -> Option<u32> {
        let take = self.pile % (self.max_take + 1);
        (take > 0).then_some(take)
    }
}

impl GameState for Nim {
    type Action = u32;
    type Player = Seat;

    fn legal_actions(&self) -> Vec<u32> {
        (1..=self.max_take.min(self.pile)).collect()
    }

    fn apply(&self, action: &u32) -> Self {
        Self {
            pile: self.pile.saturating_sub(*action),
            max_take: self.max_take,
            to_move: self.to_move.opponent(),
        }
    }

    fn outcome(&self) -> Option<Outcome<Seat>> {
        // The seat that just moved emptied the pile.
        (self.pile == 0).then(|| Outcome::Win(self.to_move.opponent()))
    }

    fn to_move(&self) -> Seat {
        self.to_move
    }
}

impl fmt::Display for Nim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pile={} max_take={} to_move={}", self.pile, self.max_take, self.to_move)
    }
}
