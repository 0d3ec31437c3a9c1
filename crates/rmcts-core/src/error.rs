//! 探索エンジンのエラー型
//!
//! `MctsError` は `choose` 1回を失敗させる。`RolloutError` は playout 1回分の失敗で、
//! 探索はその訪問の報酬を捨てて続行する。

/// 探索が返すエラー
#[derive(thiserror::Error, Debug)]
pub enum MctsError {
    /// ルート局面を探索できない（終局、または合法手なし）
    #[error("invalid root state: {0}")]
    InvalidState(String),

    /// 全ての手に子があるノードを展開しようとした
    #[error("expansion attempted on a fully expanded node")]
    ExhaustedActions,

    /// ノード数が `NodeId` の範囲を超えた
    #[error("search tree is full: node index {0} does not fit a NodeId")]
    TreeFull(usize),

    /// 設定の検証に失敗
    #[error("invalid search configuration: {0}")]
    InvalidConfig(String),

    /// playout が連続して失敗しすぎた
    #[error("search aborted after {failures} consecutive play-out failures")]
    SearchAborted {
        failures: usize,
        #[source]
        source: RolloutError,
    },

    /// ワーカースレッドを起動できなかった
    #[error("failed to spawn rollout worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

/// playout 1回分の失敗。その訪問は逆伝播されない。
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RolloutError {
    /// ロールアウト方策がエラーを返した
    #[error("rollout policy failed: {0}")]
    Policy(String),

    /// ロールアウト方策が非合法手を返した
    #[error("rollout policy returned an illegal action: {0}")]
    IllegalAction(String),

    /// 終局でないのに合法手がない
    #[error("non-terminal state has no legal actions")]
    NoLegalActions,

    /// ワーカー上の playout が panic した
    #[error("play-out panicked: {0}")]
    Panicked(String),
}

/// 探索操作の Result 型
pub type MctsResult<T> = Result<T, MctsError>;
