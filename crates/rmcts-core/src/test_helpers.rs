//! Small games and policies shared by the unit tests.

use crate::error::RolloutError;
use crate::game::{GameState, Outcome};
use crate::policy::{RolloutPolicy, SearchRng};

/// Take-away game: remove 1..=max_take stones, whoever takes the last stone wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TakeAway {
    pub pile: u8,
    pub max_take: u8,
    pub to_move: u8,
}

impl TakeAway {
    pub fn new(pile: u8, max_take: u8) -> Self {
        Self {
            pile,
            max_take,
            to_move: 0,
        }
    }
}

impl GameState for TakeAway {
    type Action = u8;
    type Player = u8;

    fn legal_actions(&self) -> Vec<u8> {
        (1..=self.max_take.min(self.pile)).collect()
    }

    fn apply(&self, action: &u8) -> Self {
        Self {
            pile: self.pile - action,
            max_take: self.max_take,
            to_move: 1 - self.to_move,
        }
    }

    fn outcome(&self) -> Option<Outcome<u8>> {
        // The player who emptied the pile is the one not to move.
        (self.pile == 0).then(|| Outcome::Win(1 - self.to_move))
    }

    fn to_move(&self) -> u8 {
        self.to_move
    }
}

/// Game whose rules engine reports the same action twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stutter {
    pub done: bool,
}

impl GameState for Stutter {
    type Action = char;
    type Player = u8;

    fn legal_actions(&self) -> Vec<char> {
        if self.done { Vec::new() } else { vec!['a', 'b', 'a', 'c', 'b'] }
    }

    fn apply(&self, _action: &char) -> Self {
        Self { done: true }
    }

    fn outcome(&self) -> Option<Outcome<u8>> {
        self.done.then_some(Outcome::Draw)
    }

    fn to_move(&self) -> u8 {
        0
    }
}

/// Always plays the first legal action.
pub struct FirstLegalPolicy;

impl<S: GameState> RolloutPolicy<S> for FirstLegalPolicy {
    fn pick_action(&self, state: &S, _rng: &mut SearchRng) -> Result<S::Action, RolloutError> {
        state.legal_actions().into_iter().next().ok_or(RolloutError::NoLegalActions)
    }
}

/// Never produces an action.
pub struct FailingPolicy;

impl<S: GameState> RolloutPolicy<S> for FailingPolicy {
    fn pick_action(&self, _state: &S, _rng: &mut SearchRng) -> Result<S::Action, RolloutError> {
        Err(RolloutError::Policy("scripted failure".to_string()))
    }
}
