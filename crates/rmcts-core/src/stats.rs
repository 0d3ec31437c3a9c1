//! 探索統計と `MctsEngine::search` が返すレポート

use std::time::Duration;

use crate::game::GameState;
use crate::node::SearchTree;

/// 1回の探索のカウンタ
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchStats {
    /// 選んだ葉の数（逐次なら iteration、並列なら dispatch ごとに1）
    pub iterations: u64,
    /// 報酬を返した playout 数（終局の葉を含む）
    pub completed_playouts: u64,
    /// 報酬を捨てた playout 数
    pub failed_playouts: u64,
    /// 探索終了時のルート訪問数
    pub root_visits: u64,
    /// 木のノード数（ルートを含む）
    pub tree_size: usize,
    pub max_depth: u32,
    pub elapsed: Duration,
}

impl SearchStats {
    /// 探索終了後に木から得られる数値を写す。
    pub(crate) fn finish<S: GameState>(&mut self, tree: &SearchTree<S>, elapsed: Duration) {
        self.root_visits = tree.node(tree.root()).visit_count();
        self.tree_size = tree.len();
        self.max_depth = tree.max_depth();
        self.elapsed = elapsed;
    }

    pub fn iterations_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { self.iterations as f64 / secs } else { 0.0 }
    }
}

/// ルートの子1つの統計
#[derive(Debug, Clone, PartialEq)]
pub struct ChildSummary<A> {
    pub action: A,
    pub visits: u64,
    /// ルート手番から見た平均報酬。未訪問なら `None`
    pub average: Option<f64>,
}

/// 探索結果。選んだ手とその根拠
#[derive(Debug, Clone)]
pub struct SearchReport<A> {
    pub best_action: A,
    /// ルートの子（展開順）
    pub children: Vec<ChildSummary<A>>,
    pub stats: SearchStats,
}

impl<A> SearchReport<A> {
    /// 選んだ手の要約
    pub fn best_child(&self) -> Option<&ChildSummary<A>>
    where
        A: PartialEq,
    {
        self.children.iter().find(|child| child.action == self.best_action)
    }
}

pub(crate) fn summarize_root<S: GameState>(tree: &SearchTree<S>) -> Vec<ChildSummary<S::Action>> {
    tree.node(tree.root())
        .children()
        .map(|(action, child)| {
            let node = tree.node(child);
            ChildSummary {
                action: action.clone(),
                visits: node.visit_count(),
                average: node.average_value(),
            }
        })
        .collect()
}
