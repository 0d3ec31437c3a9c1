//! ワーカープールによる探索
//!
//! 木はコーディネータ（呼び出しスレッド）が所有する。空いているワーカー枠ごとに葉を選び、
//! 仮の訪問を数えて（virtual loss）葉の局面をキューに積む。ワーカーは複製した局面で
//! playout し、dispatch チケット付きで報酬を返す。コーディネータはチケットのノード経由で
//! 報酬を加える。ワーカーは木に触れないのでロックは不要。
//!
//! 予算は dispatch サイクルの間でだけ確認する。予算切れの時点でキューにある playout は
//! 最後まで実行し、報酬を加えてからワーカーを join する。

use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};
use rand::SeedableRng;

use super::worker_seed;
use crate::error::{MctsError, MctsResult, RolloutError};
use crate::game::GameState;
use crate::limits::SearchClock;
use crate::node::{NodeId, SearchTree};
use crate::policy::{RolloutPolicy, SearchRng};
use crate::search::SearchLoop;
use crate::stats::SearchStats;

/// 1回の探索のプール設定
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub pool_size: usize,
    /// 葉1つあたりの playout 数
    pub batch_size: usize,
    /// 報告待ちでコーディネータが待つ時間
    pub poll_interval: Duration,
    pub max_consecutive_failures: usize,
    pub seed: u64,
}

struct RolloutJob<S> {
    ticket: usize,
    state: S,
}

struct RolloutReport {
    ticket: usize,
    worker_id: usize,
    result: Result<f64, RolloutError>,
}

/// dispatch 済みの葉1つと、未完了の playout
struct Ticket {
    node: NodeId,
    outstanding: usize,
    reward_sum: f64,
    successes: u64,
    last_error: Option<RolloutError>,
}

/// `options.pool_size` 本の scoped スレッドで探索する。
///
/// 予算を使い切る（または連続失敗の上限に達する）と、実行中の playout を全て
/// 回収してから戻る。
pub fn run_concurrent<S, P>(
    tree: &mut SearchTree<S>,
    search: &SearchLoop<'_, S, P>,
    clock: &SearchClock,
    options: PoolOptions,
    stats: &mut SearchStats,
) -> MctsResult<()>
where
    S: GameState + Send,
    S::Player: Sync,
    P: RolloutPolicy<S> + Sync,
{
    let pool_size = options.pool_size.max(1);
    thread::scope(|scope| -> MctsResult<()> {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<RolloutJob<S>>();
        let (report_tx, report_rx) = crossbeam_channel::unbounded::<RolloutReport>();

        for worker_id in 0..pool_size {
            let jobs = job_rx.clone();
            let reports = report_tx.clone();
            let seed = worker_seed(options.seed, worker_id);
            // 失敗時は return で job_tx が落ち、起動済みのワーカーは抜ける
            thread::Builder::new()
                .name(format!("mcts-rollout-{worker_id}"))
                .spawn_scoped(scope, move || worker_loop(search, jobs, reports, worker_id, seed))?;
        }
        drop(job_rx);
        drop(report_tx);
        debug!("rollout pool started: workers={pool_size} batch={}", options.batch_size);

        let mut coordinator = Coordinator::new(clock, options, pool_size, stats);
        let outcome = coordinator.run(tree, search, &job_tx, &report_rx);
        // job チャネルを閉じると待機中のワーカーがループを抜け、scope が join できる
        drop(job_tx);
        outcome
    })
}

fn worker_loop<S, P>(
    search: &SearchLoop<'_, S, P>,
    jobs: Receiver<RolloutJob<S>>,
    reports: Sender<RolloutReport>,
    worker_id: usize,
    seed: u64,
) where
    S: GameState,
    P: RolloutPolicy<S>,
{
    let mut rng = SearchRng::seed_from_u64(seed);
    while let Ok(RolloutJob { ticket, state }) = jobs.recv() {
        let result = panic::catch_unwind(AssertUnwindSafe(|| search.simulate(&state, &mut rng)))
            .unwrap_or_else(|payload| Err(RolloutError::Panicked(panic_message(payload.as_ref()))));
        if reports.send(RolloutReport { ticket, worker_id, result }).is_err() {
            break;
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// 探索中の状態。探索ごとに作り、コーディネータが所有する。
struct Coordinator<'a> {
    clock: &'a SearchClock,
    options: PoolOptions,
    pool_size: usize,
    stats: &'a mut SearchStats,
    /// チケット ID で引く未完了チケット
    tickets: Vec<Option<Ticket>>,
    free_tickets: Vec<usize>,
    /// キュー中または実行中の playout 数
    in_flight: usize,
    consecutive_failures: usize,
    abort: Option<RolloutError>,
    workers_gone: bool,
}

impl<'a> Coordinator<'a> {
    fn new(clock: &'a SearchClock, options: PoolOptions, pool_size: usize, stats: &'a mut SearchStats) -> Self {
        Self {
            clock,
            options,
            pool_size,
            stats,
            tickets: Vec::with_capacity(pool_size),
            free_tickets: Vec::new(),
            in_flight: 0,
            consecutive_failures: 0,
            abort: None,
            workers_gone: false,
        }
    }

    fn run<S, P>(
        &mut self,
        tree: &mut SearchTree<S>,
        search: &SearchLoop<'_, S, P>,
        job_tx: &Sender<RolloutJob<S>>,
        report_rx: &Receiver<RolloutReport>,
    ) -> MctsResult<()>
    where
        S: GameState,
        P: RolloutPolicy<S>,
    {
        loop {
            if self.may_dispatch() {
                // 1サイクルで枠数までしか選ばない。終局ノードばかり選ばれても報告を回収できる
                let mut attempts = 0;
                while attempts < self.pool_size && self.in_flight < self.pool_size && self.may_dispatch() {
                    attempts += 1;
                    self.dispatch(tree, search, job_tx)?;
                }
            }

            if self.in_flight == 0 {
                if self.may_dispatch() {
                    continue;
                }
                break;
            }

            match report_rx.recv_timeout(self.options.poll_interval) {
                Ok(report) => {
                    self.absorb(tree, report);
                    while let Ok(report) = report_rx.try_recv() {
                        self.absorb(tree, report);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("rollout workers disconnected with {} play-outs in flight", self.in_flight);
                    break;
                }
            }
        }

        match self.abort.take() {
            Some(source) => Err(MctsError::SearchAborted {
                failures: self.consecutive_failures,
                source,
            }),
            None => Ok(()),
        }
    }

    #[inline]
    fn may_dispatch(&self) -> bool {
        self.abort.is_none() && !self.workers_gone && self.clock.allows(self.stats.iterations)
    }

    /// 葉を1つ選び、終局ならその場で採点、そうでなければ `batch_size` 回の playout を積む。
    fn dispatch<S, P>(
        &mut self,
        tree: &mut SearchTree<S>,
        search: &SearchLoop<'_, S, P>,
        job_tx: &Sender<RolloutJob<S>>,
    ) -> MctsResult<()>
    where
        S: GameState,
        P: RolloutPolicy<S>,
    {
        let leaf = search.select(tree)?;
        self.stats.iterations += 1;

        if let Some(reward) = search.terminal_reward(tree.node(leaf).state()) {
            tree.backpropagate(leaf, reward);
            self.stats.completed_playouts += 1;
            self.consecutive_failures = 0;
            return Ok(());
        }

        tree.propagate_visit_only(leaf);
        let ticket = self.open_ticket(leaf);
        #[cfg(feature = "diagnostics")]
        log::trace!(
            "dispatch ticket={ticket} node={leaf:?} depth={} batch={}",
            tree.node(leaf).depth(),
            self.options.batch_size
        );

        let mut queued = 0;
        for _ in 0..self.options.batch_size {
            let job = RolloutJob {
                ticket,
                state: tree.node(leaf).state().clone(),
            };
            if job_tx.send(job).is_err() {
                warn!("rollout workers are gone; stopping dispatch");
                self.workers_gone = true;
                break;
            }
            queued += 1;
        }
        self.in_flight += queued;

        if queued < self.options.batch_size {
            // キューに積めなかったジョブは報告が来ない
            let closed = match self.tickets[ticket].as_mut() {
                Some(open) => {
                    open.outstanding = queued;
                    queued == 0
                }
                None => false,
            };
            if closed {
                self.close_ticket(tree, ticket);
            }
        }
        Ok(())
    }

    fn open_ticket(&mut self, node: NodeId) -> usize {
        let ticket = Ticket {
            node,
            outstanding: self.options.batch_size,
            reward_sum: 0.0,
            successes: 0,
            last_error: None,
        };
        match self.free_tickets.pop() {
            Some(id) => {
                self.tickets[id] = Some(ticket);
                id
            }
            None => {
                self.tickets.push(Some(ticket));
                self.tickets.len() - 1
            }
        }
    }

    /// ワーカーの報告をチケットに反映する。
    fn absorb<S: GameState>(&mut self, tree: &mut SearchTree<S>, report: RolloutReport) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let Some(ticket) = self.tickets.get_mut(report.ticket).and_then(Option::as_mut) else {
            warn!("report for unknown ticket {} from worker {}", report.ticket, report.worker_id);
            return;
        };
        match report.result {
            Ok(reward) => {
                ticket.reward_sum += reward;
                ticket.successes += 1;
            }
            Err(err) => {
                warn!("play-out failed on worker {}: {err}", report.worker_id);
                self.stats.failed_playouts += 1;
                ticket.last_error = Some(err);
            }
        }
        ticket.outstanding = ticket.outstanding.saturating_sub(1);
        if ticket.outstanding == 0 {
            self.close_ticket(tree, report.ticket);
        }
    }

    /// 完了したチケットの平均報酬を加える。成功が1つもなければ失敗として数える。
    fn close_ticket<S: GameState>(&mut self, tree: &mut SearchTree<S>, id: usize) {
        let Some(ticket) = self.tickets[id].take() else {
            return;
        };
        self.free_tickets.push(id);

        if ticket.successes > 0 {
            let mean = ticket.reward_sum / ticket.successes as f64;
            tree.credit_reward(ticket.node, mean);
            self.stats.completed_playouts += ticket.successes;
            self.consecutive_failures = 0;
            return;
        }

        // 仮の訪問は数えたまま（報酬未確定のまま残る）。失うのは報酬だけ
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.options.max_consecutive_failures && self.abort.is_none() {
            warn!(
                "aborting search after {} consecutive failed leaves; draining {} play-outs",
                self.consecutive_failures, self.in_flight
            );
            self.abort = Some(ticket.last_error.unwrap_or(RolloutError::Panicked(
                "worker pool stopped before reporting".to_string(),
            )));
        }
    }
}
