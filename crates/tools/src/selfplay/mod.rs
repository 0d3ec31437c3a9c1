pub mod config;
pub mod engine;
pub mod game;
pub mod output;
pub mod position;
pub mod time_control;
pub mod types;

pub use config::{SearchOverrides, load_search_config};
pub use engine::{EngineConfig, PolicyKind, SelfplayEngine};
pub use game::{GameConfig, GameKind, GameResult, MoveEvent, SelfplayGame, run_game};
pub use output::{JsonlWriter, default_summary_path, resolve_output_path};
pub use position::{load_start_positions, pick_start};
pub use time_control::TimeControl;
pub use types::{GameOutcome, SearchLog, Side, duration_to_millis, side_label};
