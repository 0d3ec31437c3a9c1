//! rmcts エンジン用のリファレンスゲーム
//!
//! 自己対局ハーネス、エンジンの結合テスト、ベンチマークで使う小さな既知のゲーム。

pub mod nim;
pub mod tictactoe;

pub use nim::{Nim, Seat};
pub use tictactoe::{Mark, TicTacToe};

/// Error parsing a textual position.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected 9 cells, got {0}")]
    CellCount(usize),

    #[error("invalid cell character {0:?}")]
    InvalidCell(char),

    #[error("position cannot arise in play: {0}")]
    Unreachable(String),
}
