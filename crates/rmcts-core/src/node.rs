//! 探索木の管理
//!
//! ノードは [`SearchTree`] が所有するアリーナに置く。親 → 子の所有はアリーナ経由で、
//! 親へのリンクは逆伝播で上に辿るためだけの [`NodeId`]。アリーナは `choose` 1回ごとに
//! 木と一緒に破棄される。

use std::collections::HashSet;
use std::iter;

use crate::error::{MctsError, MctsResult};
use crate::game::GameState;

/// [`SearchTree`] 内のノードを指すハンドル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// ルートは常にアリーナの先頭
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }

    /// `index` 番目のノードの ID。`u32` に収まらなければ木が満杯。
    fn from_index(index: usize) -> MctsResult<Self> {
        u32::try_from(index).map(NodeId).map_err(|_| MctsError::TreeFull(index))
    }
}

/// 探索済みの1局面
#[derive(Debug)]
pub struct SearchNode<S: GameState> {
    state: S,
    incoming_action: Option<S::Action>,
    parent: Option<NodeId>,
    /// (action, child) を展開順に保持
    children: Vec<(S::Action, NodeId)>,
    /// 生成時に確定（重複除去済み、ルールエンジンの順序）。終局なら空。
    legal_actions: Vec<S::Action>,
    terminal: bool,
    depth: u32,
    visit_count: u64,
    cumulative_reward: f64,
    /// 報酬が未確定の訪問数（virtual loss 中、または失敗した playout）
    unrewarded_visits: u64,
}

impl<S: GameState> SearchNode<S> {
    fn new(state: S, incoming_action: Option<S::Action>, parent: Option<NodeId>, depth: u32) -> Self {
        let terminal = state.is_terminal();
        let legal_actions = if terminal { Vec::new() } else { dedup_actions(state.legal_actions()) };
        Self {
            state,
            incoming_action,
            parent,
            children: Vec::with_capacity(legal_actions.len()),
            legal_actions,
            terminal,
            depth,
            visit_count: 0,
            cumulative_reward: 0.0,
            unrewarded_visits: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// このノードに至った手。ルートは `None`。
    #[inline]
    pub fn incoming_action(&self) -> Option<&S::Action> {
        self.incoming_action.as_ref()
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// 展開順の子ノード
    pub fn children(&self) -> impl ExactSizeIterator<Item = (&S::Action, NodeId)> + '_ {
        self.children.iter().map(|(action, id)| (action, *id))
    }

    /// `action` で到達する子（展開済みの場合）
    pub fn child(&self, action: &S::Action) -> Option<NodeId> {
        self.children.iter().find(|(a, _)| a == action).map(|(_, id)| *id)
    }

    #[inline]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub fn legal_actions(&self) -> &[S::Action] {
        &self.legal_actions
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    #[inline]
    pub fn is_fully_expanded(&self) -> bool {
        self.children.len() == self.legal_actions.len()
    }

    /// ルートからの深さ（ルート = 0）
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn visit_count(&self) -> u64 {
        self.visit_count
    }

    #[inline]
    pub fn cumulative_reward(&self) -> f64 {
        self.cumulative_reward
    }

    /// `visit_count` のうち報酬が加算されていない訪問数。
    ///
    /// 並列探索中の playout と、報酬を失った playout がここに残る。
    #[inline]
    pub fn unrewarded_visits(&self) -> u64 {
        self.unrewarded_visits
    }

    /// 訪問あたりの平均報酬。未訪問なら `None`。
    #[inline]
    pub fn average_value(&self) -> Option<f64> {
        (self.visit_count > 0).then(|| self.cumulative_reward / self.visit_count as f64)
    }

    /// 完了した simulation 1回分をこのノードだけに加える。
    #[inline]
    pub fn record_visit(&mut self, reward: f64) {
        debug_assert!((0.0..=1.0).contains(&reward), "reward out of range: {reward}");
        self.visit_count += 1;
        self.cumulative_reward += reward;
    }
}

/// 順序を保ったまま、各手の最初の出現だけを残す。
fn dedup_actions<A: Clone + Eq + std::hash::Hash>(mut actions: Vec<A>) -> Vec<A> {
    let mut seen = HashSet::with_capacity(actions.len());
    actions.retain(|action| seen.insert(action.clone()));
    actions
}

/// 1回の探索の全ノードを保持するアリーナ
#[derive(Debug)]
pub struct SearchTree<S: GameState> {
    nodes: Vec<SearchNode<S>>,
    max_depth: u32,
}

impl<S: GameState> SearchTree<S> {
    /// `root_state` をルートに持つ木を作る。
    pub fn new(root_state: S) -> Self {
        Self {
            nodes: vec![SearchNode::new(root_state, None, None, 0)],
            max_depth: 0,
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// # Panics
    /// 別の木の `id` で範囲外を指した場合。
    #[inline]
    pub fn node(&self, id: NodeId) -> &SearchNode<S> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut SearchNode<S> {
        &mut self.nodes[id.index()]
    }

    /// ルートを含むノード数
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 常に false（ルートは必ずある）
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// これまでに作られた最も深いノードの深さ
    #[inline]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// 全ノードの ID（生成順）
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        // 各ノードは NodeId::from_index を通って作られるので u32 に収まる
        (0..self.nodes.len()).map(|index| NodeId(index as u32))
    }

    /// `id` から祖先を辿り、ルートで終わる。
    pub fn path_to_root(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        iter::successors(Some(id), move |current| self.node(*current).parent)
    }

    /// まだ子を持たない最初の合法手について子ノードを作る。
    ///
    /// 展開し尽くしたノードでは [`MctsError::ExhaustedActions`]、ノード数が `u32` の
    /// 範囲を超える場合は [`MctsError::TreeFull`]。
    pub fn expand_one_unexplored_child(&mut self, id: NodeId) -> MctsResult<NodeId> {
        let parent = self.node(id);
        // legal_actions は重複除去済みで子は順に作るので、次の未展開手は展開済みの直後
        let Some(action) = parent.legal_actions.get(parent.children.len()).cloned() else {
            return Err(MctsError::ExhaustedActions);
        };
        let child_id = NodeId::from_index(self.nodes.len())?;
        let child_state = parent.state.apply(&action);
        let depth = parent.depth + 1;

        self.nodes.push(SearchNode::new(child_state, Some(action.clone()), Some(id), depth));
        self.node_mut(id).children.push((action, child_id));
        self.max_depth = self.max_depth.max(depth);
        Ok(child_id)
    }

    /// `id` とルートまでの全祖先に `record_visit(reward)`
    pub fn backpropagate(&mut self, id: NodeId, reward: f64) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node_mut(node_id);
            node.record_visit(reward);
            current = node.parent;
        }
    }

    /// 報酬が分かる前に `id` と祖先の訪問だけを数える（virtual loss）。
    ///
    /// 報酬は触らないので、後続の選択からは仮の訪問が負けに見え、別の葉に散る。
    pub fn propagate_visit_only(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node_mut(node_id);
            node.visit_count += 1;
            node.unrewarded_visits += 1;
            current = node.parent;
        }
    }

    /// 訪問数は増やさずに `id` と祖先へ `reward` を加える。
    ///
    /// [`Self::propagate_visit_only`] で数えた仮の訪問を確定させる。
    pub fn credit_reward(&mut self, id: NodeId, reward: f64) {
        debug_assert!((0.0..=1.0).contains(&reward), "reward out of range: {reward}");
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node_mut(node_id);
            debug_assert!(node.unrewarded_visits > 0, "credit without a provisional visit");
            node.cumulative_reward += reward;
            node.unrewarded_visits = node.unrewarded_visits.saturating_sub(1);
            current = node.parent;
        }
    }
}
