use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use clap::Parser;
use log::info;
use rmcts_core::MctsConfig;
use rmcts_games::{Nim, TicTacToe};
use serde::Serialize;
use tools::selfplay::{
    EngineConfig, GameConfig, GameKind, GameOutcome, JsonlWriter, MoveEvent, PolicyKind,
    SearchOverrides, SelfplayEngine, SelfplayGame, TimeControl, default_summary_path,
    load_search_config, load_start_positions, pick_start, resolve_output_path, side_label,
};

/// MCTS エンジン同士の自己対局ハーネス。
///
/// # よく使うコマンド例
///
/// - 三目並べの詰み一手問題を 1000 反復で 10 局:
///   `cargo run -p tools --bin mcts_selfplay -- --game tictactoe --position XX.OO.... --games 10 --iterations 1000 --policy decisive`
///
/// - Nim で探索定数の比較（先手 C=0.3 / 後手 C=1.4、1手 200ms）:
///   `cargo run -p tools --bin mcts_selfplay -- --game nim --position 21/3 --games 20 --time-ms 200 --exploration 0.3 --exploration-second 1.4`
///
/// - 4 スレッド・バッチ 2 で TOML 設定を読み込む:
///   `cargo run -p tools --bin mcts_selfplay -- --config search.toml --threads 4 --batch 2`
///
/// `--out` 未指定時は `runs/selfplay/<timestamp>-selfplay.jsonl` に書き出し、サマリは同名 `.summary.jsonl`。
#[derive(Parser, Debug)]
#[command(author, version, about = "rmcts selfplay harness (engine vs engine)")]
struct Cli {
    /// Game to play
    #[arg(long, value_enum, default_value_t = GameKind::Tictactoe)]
    game: GameKind,

    /// Start position (tic-tac-toe cells such as "XX.OO....", Nim "PILE/MAX_TAKE")
    #[arg(long)]
    position: Option<String>,

    /// Start position file (one position per line, cycled across games)
    #[arg(long)]
    startpos_file: Option<PathBuf>,

    /// Number of games to run
    #[arg(long, default_value_t = 1)]
    games: u32,

    /// Maximum plies per game before declaring a draw
    #[arg(long, default_value_t = 200)]
    max_moves: u32,

    /// Per-move time budget in milliseconds
    #[arg(long)]
    time_ms: Option<u64>,

    /// Per-move iteration budget (overrides --time-ms)
    #[arg(long)]
    iterations: Option<u64>,

    /// Total thinking time per side in milliseconds (0 = fixed per-move budget)
    #[arg(long, default_value_t = 0)]
    total_time_ms: u64,

    /// Increment per move in milliseconds when --total-time-ms is set
    #[arg(long, default_value_t = 0)]
    increment_ms: u64,

    /// UCT exploration weight (default for both sides)
    #[arg(long)]
    exploration: Option<f64>,

    /// UCT exploration weight for the second player (overrides --exploration)
    #[arg(long)]
    exploration_second: Option<f64>,

    /// Rollout worker threads (1 = sequential search)
    #[arg(long)]
    threads: Option<usize>,

    /// Play-outs per selected leaf in concurrent mode
    #[arg(long)]
    batch: Option<usize>,

    /// Rollout policy (default for both sides)
    #[arg(long, value_enum, default_value_t = PolicyKind::Random)]
    policy: PolicyKind,

    /// Rollout policy for the second player (overrides --policy)
    #[arg(long, value_enum)]
    policy_second: Option<PolicyKind>,

    /// Play-outs longer than this many plies are scored as draws
    #[arg(long)]
    playout_ply_limit: Option<u32>,

    /// Fixed search seed (the second player uses seed + 1)
    #[arg(long)]
    seed: Option<u64>,

    /// Search configuration file (TOML, MctsConfig)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Search configuration file for the second player (overrides --config)
    #[arg(long)]
    config_second: Option<PathBuf>,

    /// Output path (defaults to runs/selfplay/<timestamp>-selfplay.jsonl)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Flush game log on every move (safer, but slower)
    #[arg(long, default_value_t = false)]
    flush_each_move: bool,
}

#[derive(Serialize)]
struct MetaLog<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: String,
    game: GameKind,
    games: u32,
    max_moves: u32,
    total_time_ms: u64,
    increment_ms: u64,
    engine_first: &'a EngineConfig,
    engine_second: &'a EngineConfig,
    start_positions: &'a [String],
    output: String,
}

#[derive(Serialize)]
struct MoveLog<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    game_id: u32,
    side_to_move: char,
    #[serde(flatten)]
    event: &'a MoveEvent,
}

#[derive(Serialize)]
struct ResultLog<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    game_id: u32,
    start_position: &'a str,
    outcome: &'a str,
    reason: &'a str,
    plies: u32,
}

/// 対局セッション全体のサマリ
#[derive(Serialize)]
struct SummaryLog {
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: String,
    total_games: u32,
    first_wins: u32,
    second_wins: u32,
    draws: u32,
    first_win_rate: f64,
    second_win_rate: f64,
    draw_rate: f64,
    policy_first: &'static str,
    policy_second: &'static str,
    exploration_first: f64,
    exploration_second: f64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    if cli.games == 0 {
        bail!("--games must be >= 1");
    }
    if cli.max_moves == 0 {
        bail!("--max-moves must be >= 1");
    }

    let timestamp = Local::now();
    match cli.game {
        GameKind::Tictactoe => run_selfplay::<TicTacToe>(&cli, &timestamp),
        GameKind::Nim => run_selfplay::<Nim>(&cli, &timestamp),
    }
}

/// 片側分の探索設定を組み立てる（設定ファイル → コマンドライン上書き）。
fn engine_config(
    cli: &Cli,
    config_path: Option<&PathBuf>,
    exploration: Option<f64>,
    policy: PolicyKind,
    seed: Option<u64>,
) -> Result<EngineConfig> {
    let base = match config_path {
        Some(path) => load_search_config(path)?,
        None => MctsConfig::default(),
    };
    let overrides = SearchOverrides {
        time_ms: cli.time_ms,
        iterations: cli.iterations,
        exploration,
        threads: cli.threads,
        batch: cli.batch,
        playout_ply_limit: cli.playout_ply_limit,
        seed,
    };
    Ok(EngineConfig {
        search: overrides.apply(&base)?,
        policy,
    })
}

fn run_selfplay<S>(cli: &Cli, timestamp: &DateTime<Local>) -> Result<()>
where
    S: SelfplayGame,
    S::Player: Sync,
{
    let (start_positions, start_descriptions) =
        load_start_positions::<S>(cli.startpos_file.as_deref(), cli.position.as_deref())?;

    let first_cfg = engine_config(cli, cli.config.as_ref(), cli.exploration, cli.policy, cli.seed)?;
    let second_cfg = engine_config(
        cli,
        cli.config_second.as_ref().or(cli.config.as_ref()),
        cli.exploration_second.or(cli.exploration),
        cli.policy_second.unwrap_or(cli.policy),
        cli.seed.map(|seed| seed.wrapping_add(1)),
    )?;
    let mut first = SelfplayEngine::<S>::new(&first_cfg, "first".to_string())?;
    let mut second = SelfplayEngine::<S>::new(&second_cfg, "second".to_string())?;

    let output_path = resolve_output_path(cli.out.as_deref(), timestamp);
    let mut writer = JsonlWriter::create(&output_path, cli.flush_each_move)?;
    writer.write(&MetaLog {
        kind: "meta",
        timestamp: timestamp.to_rfc3339(),
        game: cli.game,
        games: cli.games,
        max_moves: cli.max_moves,
        total_time_ms: cli.total_time_ms,
        increment_ms: cli.increment_ms,
        engine_first: &first_cfg,
        engine_second: &second_cfg,
        start_positions: &start_descriptions,
        output: output_path.display().to_string(),
    })?;

    let game_config = GameConfig {
        max_moves: cli.max_moves,
    };
    let tc = TimeControl::with_clock(
        cli.total_time_ms,
        cli.increment_ms,
        [first_cfg.search.limit, second_cfg.search.limit],
    );

    let mut first_wins = 0u32;
    let mut second_wins = 0u32;
    let mut draws = 0u32;

    for game_idx in 0..cli.games {
        let game_id = game_idx + 1;
        let start = pick_start(&start_positions, game_idx as usize)?;
        let description = &start_descriptions[game_idx as usize % start_descriptions.len()];
        info!("game {game_id}/{}: {} from {description}", cli.games, S::NAME);

        let mut on_move = |event: &MoveEvent| -> Result<()> {
            writer.write(&MoveLog {
                kind: "move",
                game_id,
                side_to_move: side_label(event.side),
                event,
            })
        };
        let result = tools::selfplay::run_game(
            &mut first,
            &mut second,
            start,
            tc,
            &game_config,
            &mut on_move,
        )
        .with_context(|| format!("game {game_id} failed"))?;

        match result.outcome {
            GameOutcome::FirstWin => first_wins += 1,
            GameOutcome::SecondWin => second_wins += 1,
            GameOutcome::Draw | GameOutcome::InProgress => draws += 1,
        }
        writer.write(&ResultLog {
            kind: "result",
            game_id,
            start_position: description,
            outcome: result.outcome.label(),
            reason: &result.reason,
            plies: result.plies,
        })?;
        writer.flush()?;
        println!(
            "game {game_id}: {} ({}, {} plies)",
            result.outcome.label(),
            result.reason,
            result.plies
        );
    }
    writer.flush()?;

    let rate = |n: u32| (n as f64 / cli.games as f64) * 100.0;
    let summary = SummaryLog {
        kind: "summary",
        timestamp: timestamp.to_rfc3339(),
        total_games: cli.games,
        first_wins,
        second_wins,
        draws,
        first_win_rate: rate(first_wins),
        second_win_rate: rate(second_wins),
        draw_rate: rate(draws),
        policy_first: first_cfg.policy.label(),
        policy_second: second_cfg.policy.label(),
        exploration_first: first_cfg.search.exploration_weight,
        exploration_second: second_cfg.search.exploration_weight,
    };
    let summary_path = default_summary_path(&output_path);
    let mut summary_writer = JsonlWriter::create(&summary_path, false)?;
    summary_writer.write(&summary)?;
    summary_writer.flush()?;

    println!();
    println!("=== Selfplay Summary ({}) ===", S::NAME);
    println!("Games: {}", cli.games);
    println!("First wins:  {first_wins} ({:.1}%)", summary.first_win_rate);
    println!("Second wins: {second_wins} ({:.1}%)", summary.second_win_rate);
    println!("Draws:       {draws} ({:.1}%)", summary.draw_rate);
    println!("=======================");
    println!("selfplay log written to {}", output_path.display());
    println!("summary written to {}", summary_path.display());
    Ok(())
}
