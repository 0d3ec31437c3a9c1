use std::fmt::Display;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use rmcts_core::{GameState, Outcome};
use rmcts_games::{Nim, TicTacToe};
use serde::Serialize;

use super::engine::SelfplayEngine;
use super::time_control::TimeControl;
use super::types::{GameOutcome, SearchLog, Side, duration_to_millis};

/// 対局対象のゲーム
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    Tictactoe,
    Nim,
}

/// selfplay で扱えるゲームの追加要件（開始局面の解析と表示）
pub trait SelfplayGame: GameState + Display + Send + Sized {
    const NAME: &'static str;

    /// 開始局面を文字列から作る。`None` なら既定の開始局面。
    fn parse_start(text: Option<&str>) -> Result<Self>;

    fn action_label(action: &Self::Action) -> String;
}

impl SelfplayGame for TicTacToe {
    const NAME: &'static str = "tictactoe";

    fn parse_start(text: Option<&str>) -> Result<Self> {
        match text {
            None => Ok(TicTacToe::new()),
            Some(cells) => TicTacToe::from_cells(cells).with_context(|| format!("bad tic-tac-toe board {cells:?}")),
        }
    }

    fn action_label(action: &usize) -> String {
        action.to_string()
    }
}

/// Nim の開始局面は `PILE/MAX_TAKE`（例: `21/3`）。
impl SelfplayGame for Nim {
    const NAME: &'static str = "nim";

    fn parse_start(text: Option<&str>) -> Result<Self> {
        let Some(text) = text else {
            return Ok(Nim::new(21, 3));
        };
        let (pile, max_take) = text.split_once('/').unwrap_or((text, "3"));
        let pile: u32 = pile.trim().parse().with_context(|| format!("bad Nim pile in {text:?}"))?;
        let max_take: u32 =
            max_take.trim().parse().with_context(|| format!("bad Nim max take in {text:?}"))?;
        if max_take == 0 {
            bail!("Nim max take must be at least 1: {text:?}");
        }
        Ok(Nim::new(pile, max_take))
    }

    fn action_label(action: &u32) -> String {
        action.to_string()
    }
}

/// ゲーム設定
pub struct GameConfig {
    /// この手数で打ち切り引き分け
    pub max_moves: u32,
}

/// 1手ごとに呼ばれるイベント
#[derive(Debug, Clone, Serialize)]
pub struct MoveEvent {
    pub ply: u32,
    pub side: Side,
    pub position_before: String,
    pub action: String,
    pub engine: String,
    pub elapsed_ms: u64,
    pub search: SearchLog,
}

/// 対局結果
#[derive(Debug, Clone)]
pub struct GameResult {
    pub outcome: GameOutcome,
    pub reason: String,
    pub plies: u32,
}

/// 1局を実行する。
///
/// - `first`: 開始局面で手番の側を受け持つエンジン
/// - `second`: もう一方のエンジン
/// - `tc`: 時間管理（コピーして内部で更新）
/// - `on_move`: 1手ごとに呼ばれるコールバック
pub fn run_game<S>(
    first: &mut SelfplayEngine<S>,
    second: &mut SelfplayEngine<S>,
    start: &S,
    tc: TimeControl,
    config: &GameConfig,
    on_move: &mut dyn FnMut(&MoveEvent) -> Result<()>,
) -> Result<GameResult>
where
    S: SelfplayGame,
    S::Player: Sync,
{
    let first_player = start.to_move();
    let side_of = |player: S::Player| if player == first_player { Side::First } else { Side::Second };

    let mut state = start.clone();
    let mut tc = tc;
    let mut plies_played = 0u32;

    while plies_played < config.max_moves {
        if let Some(outcome) = state.outcome() {
            return Ok(finished(outcome, side_of, plies_played));
        }
        let side = side_of(state.to_move());
        let engine = if side == Side::First { &mut *first } else { &mut *second };
        let limit = tc.limit_for(side);

        let started = Instant::now();
        let report = engine
            .search(&state, limit)
            .with_context(|| format!("ply {} of {}", plies_played + 1, S::NAME))?;
        let elapsed_ms = duration_to_millis(started.elapsed());
        tc.update_after_move(side, elapsed_ms);

        let best = report.best_child();
        let event = MoveEvent {
            ply: plies_played + 1,
            side,
            position_before: state.to_string(),
            action: S::action_label(&report.best_action),
            engine: engine.label.clone(),
            elapsed_ms,
            search: SearchLog {
                iterations: report.stats.iterations,
                completed_playouts: report.stats.completed_playouts,
                failed_playouts: report.stats.failed_playouts,
                root_visits: report.stats.root_visits,
                tree_size: report.stats.tree_size,
                max_depth: report.stats.max_depth,
                best_visits: best.map(|child| child.visits),
                best_average: best.and_then(|child| child.average),
            },
        };
        on_move(&event)?;

        state = state.apply(&report.best_action);
        plies_played += 1;
    }

    Ok(match state.outcome() {
        Some(outcome) => finished(outcome, side_of, plies_played),
        None => GameResult {
            outcome: GameOutcome::Draw,
            reason: "max_moves".to_string(),
            plies: plies_played,
        },
    })
}

fn finished<P>(outcome: Outcome<P>, side_of: impl Fn(P) -> Side, plies: u32) -> GameResult {
    match outcome {
        Outcome::Win(player) => GameResult {
            outcome: GameOutcome::win_for(side_of(player)),
            reason: "win".to_string(),
            plies,
        },
        Outcome::Draw => GameResult {
            outcome: GameOutcome::Draw,
            reason: "draw".to_string(),
            plies,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selfplay::engine::{EngineConfig, PolicyKind};
    use rmcts_core::{FinalSelection, MctsConfig, SearchLimit};

    fn engine<S: SelfplayGame>(label: &str) -> SelfplayEngine<S>
    where
        S::Player: Sync,
    {
        let cfg = EngineConfig {
            search: MctsConfig {
                final_selection: FinalSelection::MostVisited,
                seed: Some(5),
                ..Default::default()
            },
            policy: PolicyKind::Decisive,
        };
        SelfplayEngine::new(&cfg, label.to_string()).unwrap()
    }

    #[test]
    fn parses_start_positions() {
        assert_eq!(Nim::parse_start(Some("10/2")).unwrap(), Nim::new(10, 2));
        assert_eq!(Nim::parse_start(Some("7")).unwrap(), Nim::new(7, 3));
        assert_eq!(Nim::parse_start(None).unwrap(), Nim::new(21, 3));
        assert!(Nim::parse_start(Some("7/0")).is_err());
        assert!(Nim::parse_start(Some("x/2")).is_err());

        assert_eq!(TicTacToe::parse_start(None).unwrap(), TicTacToe::new());
        assert!(TicTacToe::parse_start(Some("XXXX")).is_err());
    }

    #[test]
    fn first_player_wins_nim_mate_in_one() {
        let mut first = engine::<Nim>("first");
        let mut second = engine::<Nim>("second");
        let mut events = Vec::new();
        let result = run_game(
            &mut first,
            &mut second,
            &Nim::new(3, 3),
            TimeControl::fixed(SearchLimit::Iterations(200), SearchLimit::Iterations(200)),
            &GameConfig { max_moves: 10 },
            &mut |event: &MoveEvent| {
                events.push(event.clone());
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(result.outcome, GameOutcome::FirstWin);
        assert_eq!(result.reason, "win");
        assert_eq!(result.plies, 1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "3");
        assert_eq!(events[0].engine, "first");
        assert_eq!(events[0].search.iterations, 200);
    }

    #[test]
    fn move_cap_ends_in_a_draw() {
        let mut first = engine::<TicTacToe>("first");
        let mut second = engine::<TicTacToe>("second");
        let mut sides = Vec::new();
        let result = run_game(
            &mut first,
            &mut second,
            &TicTacToe::new(),
            TimeControl::fixed(SearchLimit::Iterations(50), SearchLimit::Iterations(50)),
            &GameConfig { max_moves: 2 },
            &mut |event: &MoveEvent| {
                sides.push(event.side);
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(result.outcome, GameOutcome::Draw);
        assert_eq!(result.reason, "max_moves");
        assert_eq!(result.plies, 2);
        assert_eq!(sides, vec![Side::First, Side::Second]);
    }
}
