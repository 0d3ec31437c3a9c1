//! UCT による子ノード選択
//!
//! ```text
//! score(child) = exploitation(child) + C * sqrt( ln(parent.visits) / child.visits )
//! ```
//!
//! 報酬はルート手番から見た値で保存する。既定の [`SelectionPerspective::RootPlayer`]
//! では exploitation は `child.average_value()` そのもの。
//! [`SelectionPerspective::PlayerToMove`] では親で手を選ぶ側から見た値に読み替える。
//!
//! 並列探索中の仮の訪問（報酬未確定）は、どちらの視点でも手を選ぶ側の負けとして数える。

use crate::config::{FinalSelection, SelectionPerspective};
use crate::game::GameState;
use crate::node::{NodeId, SearchTree};

/// UCT 式で子ノードを採点する
#[derive(Debug, Clone, Copy)]
pub struct UctSelector {
    exploration_weight: f64,
    perspective: SelectionPerspective,
}

impl UctSelector {
    pub fn new(exploration_weight: f64, perspective: SelectionPerspective) -> Self {
        Self {
            exploration_weight,
            perspective,
        }
    }

    #[inline]
    pub fn exploration_weight(&self) -> f64 {
        self.exploration_weight
    }

    /// UCT スコア。未訪問の子（または未訪問の親）は `+∞`。
    #[inline]
    pub fn score(&self, parent_visits: u64, exploitation: f64, child_visits: u64) -> f64 {
        if parent_visits == 0 || child_visits == 0 {
            return f64::INFINITY;
        }
        let exploration = ((parent_visits as f64).ln() / child_visits as f64).sqrt();
        exploitation + self.exploration_weight * exploration
    }

    /// UCT スコア最大の子。同点は先に展開された方。
    ///
    /// `parent` に子がなければ `None`。
    pub fn select_best_child<S: GameState>(&self, tree: &SearchTree<S>, parent: NodeId) -> Option<NodeId> {
        let parent_visits = tree.node(parent).visit_count();
        argmax_first(tree, parent, |child| match self.exploitation(tree, parent, child) {
            Some(exploitation) => self.score(parent_visits, exploitation, tree.node(child).visit_count()),
            None => f64::INFINITY,
        })
    }

    /// 予算を使い切った後に返す子
    pub fn select_final<S: GameState>(
        &self,
        tree: &SearchTree<S>,
        parent: NodeId,
        criterion: FinalSelection,
    ) -> Option<NodeId> {
        match criterion {
            FinalSelection::Uct => self.select_best_child(tree, parent),
            FinalSelection::MostVisited => {
                argmax_first(tree, parent, |child| tree.node(child).visit_count() as f64)
            }
            FinalSelection::BestAverage => argmax_first(tree, parent, |child| {
                self.exploitation(tree, parent, child).unwrap_or(f64::NEG_INFINITY)
            }),
        }
    }

    /// `parent` で手を選ぶ側から見た `child` の平均報酬。未訪問なら `None`。
    ///
    /// 報酬未確定の訪問は 0 として平均に入るので、ルート手番には負けに見える。
    /// 相手手番で反転するときも、その分は相手の負けとして数える。
    fn exploitation<S: GameState>(&self, tree: &SearchTree<S>, parent: NodeId, child: NodeId) -> Option<f64> {
        let node = tree.node(child);
        let average = node.average_value()?;
        match self.perspective {
            SelectionPerspective::RootPlayer => Some(average),
            SelectionPerspective::PlayerToMove => {
                let chooser = tree.node(parent).state().to_move();
                let root_player = tree.node(tree.root()).state().to_move();
                if chooser == root_player {
                    Some(average)
                } else {
                    let pending = node.unrewarded_visits() as f64;
                    Some(1.0 - (node.cumulative_reward() + pending) / node.visit_count() as f64)
                }
            }
        }
    }
}

/// キー最大の子。厳密比較なので同点は先に見た方が残る。
fn argmax_first<S: GameState>(
    tree: &SearchTree<S>,
    parent: NodeId,
    mut key: impl FnMut(NodeId) -> f64,
) -> Option<NodeId> {
    let mut best: Option<(NodeId, f64)> = None;
    for (_, child) in tree.node(parent).children() {
        let value = key(child);
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((child, value)),
        }
    }
    best.map(|(child, _)| child)
}
