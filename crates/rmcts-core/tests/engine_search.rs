//! End-to-end searches on the reference games.

use rmcts_core::{
    ConcurrencyMode, DecisivePolicy, FinalSelection, GameState, MctsConfig, MctsEngine, MctsError,
    RolloutError, RolloutPolicy, SearchLimit, SearchRng, SelectionPerspective, UniformRandomPolicy,
};
use rmcts_games::{Mark, Nim, Seat, TicTacToe};

/// 既定の設定に予算とシードだけを与える
fn default_with(iterations: u64, seed: u64) -> MctsConfig {
    MctsConfig {
        limit: SearchLimit::Iterations(iterations),
        seed: Some(seed),
        ..Default::default()
    }
}

/// 手番側視点の選択 + 訪問数最大で最終手を決める
fn sequential(iterations: u64, seed: u64) -> MctsConfig {
    MctsConfig {
        final_selection: FinalSelection::MostVisited,
        perspective: SelectionPerspective::PlayerToMove,
        ..default_with(iterations, seed)
    }
}

fn concurrent(iterations: u64, pool_size: usize, batch_size: usize) -> MctsConfig {
    MctsConfig {
        concurrency: ConcurrencyMode::Concurrent { pool_size, batch_size },
        dispatch_poll_ms: 2,
        ..sequential(iterations, 11)
    }
}

#[test]
fn fixed_seed_is_deterministic() {
    let board = TicTacToe::new();
    let mut first = MctsEngine::new(sequential(400, 99), UniformRandomPolicy).unwrap();
    let mut second = MctsEngine::new(sequential(400, 99), UniformRandomPolicy).unwrap();

    let a = first.search(&board).unwrap();
    let b = second.search(&board).unwrap();
    let c = first.search(&board).unwrap();
    assert_eq!(a.best_action, b.best_action);
    assert_eq!(a.children, b.children);
    assert_eq!(a.children, c.children);
    assert_eq!(a.stats.tree_size, c.stats.tree_size);
}

#[test]
fn nim_mate_in_one() {
    let mut engine = MctsEngine::new(sequential(200, 3), DecisivePolicy).unwrap();
    assert_eq!(engine.choose(&Nim::new(3, 3)).unwrap(), 3);
}

#[test]
fn tictactoe_completes_the_open_row() {
    let board = TicTacToe::from_cells("XX.OO....").unwrap();
    let mut engine = MctsEngine::new(sequential(1_500, 5), DecisivePolicy).unwrap();
    let report = engine.search(&board).unwrap();
    assert_eq!(report.best_action, 2);
    assert_eq!(report.best_child().and_then(|child| child.average), Some(1.0));
}

// Both positions below only reach play-outs where a winning move exists, so
// DecisivePolicy never draws a random number and every reward is fixed.
const MATE_IN_ONE_ITERATIONS: u64 = 520;

#[test]
fn nim_mate_in_one_with_default_config() {
    let mut engine = MctsEngine::new(default_with(MATE_IN_ONE_ITERATIONS, 3), DecisivePolicy).unwrap();
    let report = engine.search(&Nim::new(3, 3)).unwrap();
    assert_eq!(report.best_action, 3);
    assert_eq!(report.best_child().and_then(|child| child.average), Some(1.0));
    // Taking two hands the opponent the last stone.
    let take_two = report.children.iter().find(|child| child.action == 2).unwrap();
    assert_eq!(take_two.average, Some(0.0));
}

#[test]
fn tictactoe_completes_the_open_row_with_default_config() {
    // X wins at 2; playing 5 or 8 lets O complete the 2-4-6 diagonal.
    let board = TicTacToe::from_cells("XX.OO.OX.").unwrap();
    assert_eq!(board.to_move(), Mark::X);
    let mut engine = MctsEngine::new(default_with(MATE_IN_ONE_ITERATIONS, 5), DecisivePolicy).unwrap();
    let report = engine.search(&board).unwrap();
    assert_eq!(report.best_action, 2);
    assert_eq!(report.best_child().and_then(|child| child.average), Some(1.0));
    assert_eq!(report.stats.root_visits, MATE_IN_ONE_ITERATIONS);
}

#[test]
fn concurrent_default_config_finds_mate_in_one() {
    for pool_size in [2, 4] {
        let config = MctsConfig {
            concurrency: ConcurrencyMode::Concurrent { pool_size, batch_size: 1 },
            ..default_with(MATE_IN_ONE_ITERATIONS, 11)
        };
        let mut engine = MctsEngine::new(config.clone(), DecisivePolicy).unwrap();
        assert_eq!(engine.choose(&Nim::new(3, 3)).unwrap(), 3, "pool {pool_size}");

        let board = TicTacToe::from_cells("XX.OO.OX.").unwrap();
        let mut engine = MctsEngine::new(config, DecisivePolicy).unwrap();
        let report = engine.search(&board).unwrap();
        assert_eq!(report.best_action, 2, "pool {pool_size}");
        assert_eq!(report.stats.root_visits, MATE_IN_ONE_ITERATIONS);
    }
}

#[test]
fn tictactoe_blocks_as_second_player() {
    // O to move; X threatens the top row.
    let board = TicTacToe::from_cells("XX..O....").unwrap();
    assert_eq!(board.to_move(), Mark::O);
    let mut engine = MctsEngine::new(sequential(3_000, 8), DecisivePolicy).unwrap();
    assert_eq!(engine.choose(&board).unwrap(), 2);
}

#[test]
fn concurrent_matches_sequential_on_lopsided_position() {
    // Taking one stone leaves a lost pile of four; anything else loses at once.
    let game = Nim::new(5, 3);
    let mut seq = MctsEngine::new(sequential(600, 21), DecisivePolicy).unwrap();
    let mut par = MctsEngine::new(concurrent(600, 4, 1), DecisivePolicy).unwrap();
    assert_eq!(seq.choose(&game).unwrap(), 1);
    assert_eq!(par.choose(&game).unwrap(), 1);

    let board = TicTacToe::from_cells("XX.OO....").unwrap();
    let mut par = MctsEngine::new(concurrent(1_500, 4, 2), DecisivePolicy).unwrap();
    assert_eq!(par.choose(&board).unwrap(), 2);
}

#[test]
fn concurrent_root_visits_equal_dispatched_leaves() {
    let mut engine = MctsEngine::new(concurrent(500, 4, 1), UniformRandomPolicy).unwrap();
    let report = engine.search(&TicTacToe::new()).unwrap();
    let stats = &report.stats;
    assert_eq!(stats.iterations, 500);
    assert_eq!(stats.root_visits, 500);
    assert_eq!(stats.completed_playouts + stats.failed_playouts, 500);
    let child_visits: u64 = report.children.iter().map(|child| child.visits).sum();
    assert_eq!(child_visits, 500);
}

#[test]
fn batched_playouts_credit_one_visit_per_leaf() {
    let mut engine = MctsEngine::new(concurrent(200, 3, 4), UniformRandomPolicy).unwrap();
    let report = engine.search(&TicTacToe::new()).unwrap();
    assert_eq!(report.stats.root_visits, 200);
    assert!(report.stats.completed_playouts > 200);
    for child in &report.children {
        if let Some(average) = child.average {
            assert!((0.0..=1.0).contains(&average));
        }
    }
}

#[test]
fn time_budget_returns_an_action() {
    let config = MctsConfig {
        limit: SearchLimit::TimeMs(30),
        ..Default::default()
    };
    let mut engine = MctsEngine::new(config.clone(), UniformRandomPolicy).unwrap();
    let action = engine.choose(&TicTacToe::new()).unwrap();
    assert!(action < 9);
    assert!(engine.last_stats().map(|stats| stats.iterations).unwrap_or(0) >= 1);

    let mut engine = MctsEngine::new(
        MctsConfig {
            concurrency: ConcurrencyMode::Concurrent { pool_size: 2, batch_size: 1 },
            ..config
        },
        UniformRandomPolicy,
    )
    .unwrap();
    let report = engine.search(&TicTacToe::new()).unwrap();
    assert_eq!(report.stats.root_visits, report.stats.iterations);
}

struct Panicking;

impl RolloutPolicy<Nim> for Panicking {
    fn pick_action(&self, _state: &Nim, _rng: &mut SearchRng) -> Result<u32, RolloutError> {
        panic!("policy exploded");
    }
}

#[test]
fn panicking_workers_abort_the_search() {
    let config = MctsConfig {
        max_consecutive_failures: 6,
        ..concurrent(1_000, 2, 1)
    };
    let mut engine = MctsEngine::new(config, Panicking).unwrap();
    match engine.choose(&Nim::new(12, 3)) {
        Err(MctsError::SearchAborted { failures, source: RolloutError::Panicked(message) }) => {
            assert!(failures >= 6);
            assert!(message.contains("policy exploded"));
        }
        other => panic!("expected an aborted search, got {other:?}"),
    }
    let stats = engine.last_stats().unwrap();
    assert_eq!(stats.completed_playouts, 0);
    assert_eq!(stats.root_visits, stats.iterations);
}

#[test]
fn terminal_and_dead_roots_are_rejected() {
    let mut engine = MctsEngine::new(sequential(10, 1), UniformRandomPolicy).unwrap();
    let finished = TicTacToe::from_cells("XXXOO....").unwrap();
    assert!(matches!(engine.choose(&finished), Err(MctsError::InvalidState(_))));

    let mut engine = MctsEngine::new(sequential(10, 1), UniformRandomPolicy).unwrap();
    let empty = Nim::new(0, 3);
    assert_eq!(empty.outcome(), Some(rmcts_core::Outcome::Win(Seat::Second)));
    assert!(matches!(engine.choose(&empty), Err(MctsError::InvalidState(_))));
}
