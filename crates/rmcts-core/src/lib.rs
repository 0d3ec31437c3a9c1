//! # rmcts-core
//!
//! 二人零和・完全情報・手番制ゲーム向けのモンテカルロ木探索（UCT）。
//!
//! 時間または iteration 数の予算内で木を探索し、統計的に最善の手を返す。
//! ゲームのルールはクレートの外に置く。局面型に [`GameState`] を実装し、
//! [`RolloutPolicy`] を選ぶだけで使える。
//!
//! ## モジュール構成
//!
//! - `node`: アリーナ上の探索木と訪問統計
//! - `uct`: UCT による子ノード選択と最終手の決定
//! - `search`: 選択 → 展開 → simulation → 逆伝播の1 iteration
//! - `scheduler`: 逐次実行とワーカープールによる並列 playout
//! - `engine`: 設定の検証と探索全体を束ねる [`MctsEngine`]
//!
//! ```
//! use rmcts_core::{DecisivePolicy, MctsConfig, MctsEngine, SearchLimit};
//! use rmcts_games::Nim;
//!
//! let config = MctsConfig {
//!     limit: SearchLimit::Iterations(520),
//!     seed: Some(1),
//!     ..Default::default()
//! };
//! let mut engine = MctsEngine::new(config, DecisivePolicy)?;
//! let action = engine.choose(&Nim::new(3, 3))?;
//! assert_eq!(action, 3);
//! # Ok::<(), rmcts_core::MctsError>(())
//! ```
//!
//! 探索は呼び出しスレッド上か、playout をワーカープールに分散して行う
//! （[`ConcurrencyMode`] を参照）。

pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod limits;
pub mod node;
pub mod policy;
pub mod scheduler;
pub mod search;
pub mod stats;
pub mod uct;

#[cfg(test)]
mod test_helpers;

pub use config::{ConcurrencyMode, FinalSelection, MctsConfig, SelectionPerspective};
pub use engine::MctsEngine;
pub use error::{MctsError, MctsResult, RolloutError};
pub use game::{GameState, Outcome};
pub use limits::SearchLimit;
pub use node::{NodeId, SearchNode, SearchTree};
pub use policy::{DecisivePolicy, RolloutPolicy, SearchRng, UniformRandomPolicy};
pub use search::DRAW_REWARD;
pub use stats::{ChildSummary, SearchReport, SearchStats};
pub use uct::UctSelector;
