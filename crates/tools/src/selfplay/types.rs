use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 対局上の手番（開始局面で手番だった側が First）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    First,
    Second,
}

impl Side {
    #[inline]
    pub const fn opponent(self) -> Side {
        match self {
            Side::First => Side::Second,
            Side::Second => Side::First,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Side::First => 0,
            Side::Second => 1,
        }
    }
}

pub fn side_label(side: Side) -> char {
    if side == Side::First { 'f' } else { 's' }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    InProgress,
    FirstWin,
    SecondWin,
    Draw,
}

impl GameOutcome {
    pub fn label(self) -> &'static str {
        match self {
            GameOutcome::InProgress => "in_progress",
            GameOutcome::FirstWin => "first_win",
            GameOutcome::SecondWin => "second_win",
            GameOutcome::Draw => "draw",
        }
    }

    pub fn win_for(side: Side) -> Self {
        match side {
            Side::First => GameOutcome::FirstWin,
            Side::Second => GameOutcome::SecondWin,
        }
    }
}

/// 1手分の探索統計（JSONL の move 行に埋め込む）
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SearchLog {
    pub iterations: u64,
    pub completed_playouts: u64,
    #[serde(skip_serializing_if = "is_zero", default)]
    pub failed_playouts: u64,
    pub root_visits: u64,
    pub tree_size: usize,
    pub max_depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_visits: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_average: Option<f64>,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

pub fn duration_to_millis(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}
