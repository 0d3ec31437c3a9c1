//! 3x3 の三目並べ
//!
//! マスは左上から行ごとに 0..9 と番号を振る。X が常に先手なので、手番は盤上の
//! 記号の数から決まる。

use std::fmt;
use std::str::FromStr;

use rmcts_core::{GameState, Outcome};
use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Player mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    #[inline]
    pub const fn opponent(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    pub const fn symbol(self) -> char {
        match self {
            Mark::X => 'X',
            Mark::O => 'O',
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Tic-tac-toe position. The action is the index of the cell to mark.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TicTacToe {
    cells: [Option<Mark>; 9],
    to_move: Mark,
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl TicTacToe {
    /// Empty board, X to move.
    pub fn new() -> Self {
        Self {
            cells: [None; 9],
            to_move: Mark::X,
        }
    }

    /// Parses nine cells row by row: `X`, `O`, and `.` (or `-`) for empty,
    /// e.g. `"XX.OO...."`. Whitespace and `/` separators are ignored.
    pub fn from_cells(text: &str) -> Result<Self, ParseError> {
        let mut cells = [None; 9];
        let mut count = 0usize;
        for ch in text.chars().filter(|c| !c.is_whitespace() && *c != '/') {
            if count == 9 {
                return Err(ParseError::CellCount(count + 1));
            }
            cells[count] = match ch.to_ascii_uppercase() {
                'X' => Some(Mark::X),
                'O' => Some(Mark::O),
                '.' | '-' => None,
                other => return Err(ParseError::InvalidCell(other)),
            };
            count += 1;
        }
        if count != 9 {
            return Err(ParseError::CellCount(count));
        }

        let xs = cells.iter().filter(|c| **c == Some(Mark::X)).count();
        let os = cells.iter().filter(|c| **c == Some(Mark::O)).count();
        let to_move = match xs.checked_sub(os) {
            Some(0) => Mark::X,
            Some(1) => Mark::O,
            _ => return Err(ParseError::Unreachable(format!("{xs} X marks against {os} O marks"))),
        };
        Ok(Self { cells, to_move })
    }

    #[inline]
    pub fn cell(&self, index: usize) -> Option<Mark> {
        self.cells.get(index).copied().flatten()
    }

    fn winner(&self) -> Option<Mark> {
        LINES.iter().find_map(|&[a, b, c]| match (self.cells[a], self.cells[b], self.cells[c]) {
            (Some(x), Some(y), Some(z)) if x == y && y == z => Some(x),
            _ => None,
        })
    }
}

impl GameState for TicTacToe {
    type Action = usize;
    type Player = Mark;

    fn legal_actions(&self) -> Vec<usize> {
        if self.winner().is_some() {
            return Vec::new();
        }
        (0..9).filter(|&i| self.cells[i].is_none()).collect()
    }

    fn apply(&self, action: &usize) -> Self {
        let mut next = self.clone();
        next.cells[*action] = Some(self.to_move);
        next.to_move = self.to_move.opponent();
        next
    }

    fn outcome(&self) -> Option<Outcome<Mark>> {
        match self.winner() {
            Some(mark) => Some(Outcome::Win(mark)),
            None if self.cells.iter().all(Option::is_some) => Some(Outcome::Draw),
            None => None,
        }
    }

    fn to_move(&self) -> Mark {
        self.to_move
    }
}

impl FromStr for TicTacToe {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_cells(s)
    }
}

impl fmt::Display for TicTacToe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, chunk) in self.cells.chunks(3).enumerate() {
            if row > 0 {
                writeln!(f)?;
            }
            for cell in chunk {
                write!(f, "{}", cell.map_or('.', Mark::symbol))?;
            }
        }
        Ok(())
    }
}
