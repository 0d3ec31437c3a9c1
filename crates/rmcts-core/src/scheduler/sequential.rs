//! 逐次探索。iteration を順番に実行する

use log::warn;
use rand::SeedableRng;

use crate::error::{MctsError, MctsResult};
use crate::game::GameState;
use crate::limits::SearchClock;
use crate::node::SearchTree;
use crate::policy::{RolloutPolicy, SearchRng};
use crate::search::SearchLoop;
use crate::stats::SearchStats;

/// `clock` が尽きるまで iteration を回す。
///
/// 失敗した playout は捨てて続行する。`max_consecutive_failures` 回連続で失敗したら
/// 探索を中断する。
pub fn run_sequential<S, P>(
    tree: &mut SearchTree<S>,
    search: &SearchLoop<'_, S, P>,
    clock: &SearchClock,
    seed: u64,
    max_consecutive_failures: usize,
    stats: &mut SearchStats,
) -> MctsResult<()>
where
    S: GameState,
    P: RolloutPolicy<S>,
{
    let mut rng = SearchRng::seed_from_u64(seed);
    let mut consecutive_failures = 0usize;

    while clock.allows(stats.iterations) {
        stats.iterations += 1;
        match search.run_iteration(tree, &mut rng)? {
            Ok(_) => {
                stats.completed_playouts += 1;
                consecutive_failures = 0;
            }
            Err(err) => {
                stats.failed_playouts += 1;
                consecutive_failures += 1;
                warn!("play-out failed (iteration {}): {err}", stats.iterations);
                if consecutive_failures >= max_consecutive_failures {
                    return Err(MctsError::SearchAborted {
                        failures: consecutive_failures,
                        source: err,
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectionPerspective;
    use crate::error::RolloutError;
    use crate::limits::SearchLimit;
    use crate::policy::UniformRandomPolicy;
    use crate::test_helpers::{FailingPolicy, TakeAway};
    use crate::uct::UctSelector;
    use std::cell::Cell;

    fn selector() -> UctSelector {
        UctSelector::new(1.0, SelectionPerspective::PlayerToMove)
    }

    #[test]
    fn runs_exactly_the_iteration_budget() {
        let mut tree = SearchTree::new(TakeAway::new(9, 3));
        let search = SearchLoop::new(selector(), &UniformRandomPolicy, 0, None);
        let clock = SearchClock::start(SearchLimit::Iterations(25));
        let mut stats = SearchStats::default();

        run_sequential(&mut tree, &search, &clock, 1, 8, &mut stats).unwrap();
        assert_eq!(stats.iterations, 25);
        assert_eq!(stats.completed_playouts, 25);
        assert_eq!(tree.node(tree.root()).visit_count(), 25);
    }

    #[test]
    fn aborts_after_consecutive_failures() {
        let mut tree = SearchTree::new(TakeAway::new(9, 3));
        let search = SearchLoop::new(selector(), &FailingPolicy, 0, None);
        let clock = SearchClock::start(SearchLimit::Iterations(100));
        let mut stats = SearchStats::default();

        let err = run_sequential(&mut tree, &search, &clock, 1, 4, &mut stats).unwrap_err();
        assert!(matches!(
            err,
            MctsError::SearchAborted { failures: 4, source: RolloutError::Policy(_) }
        ));
        assert_eq!(stats.failed_playouts, 4);
        assert_eq!(tree.node(tree.root()).visit_count(), 0);
    }

    #[test]
    fn intermittent_failures_are_skipped() {
        // Fails every tenth pick.
        struct Flaky(Cell<u32>);
        impl RolloutPolicy<TakeAway> for Flaky {
            fn pick_action(&self, state: &TakeAway, rng: &mut SearchRng) -> Result<u8, RolloutError> {
                let n = self.0.get() + 1;
                self.0.set(n);
                if n % 10 == 0 {
                    Err(RolloutError::Policy("flaky".to_string()))
                } else {
                    UniformRandomPolicy.pick_action(state, rng)
                }
            }
        }

        let policy = Flaky(Cell::new(0));
        let mut tree = SearchTree::new(TakeAway::new(9, 3));
        let search = SearchLoop::new(selector(), &policy, 0, None);
        let clock = SearchClock::start(SearchLimit::Iterations(30));
        let mut stats = SearchStats::default();

        run_sequential(&mut tree, &search, &clock, 3, 30, &mut stats).unwrap();
        assert_eq!(stats.iterations, 30);
        assert_eq!(stats.completed_playouts + stats.failed_playouts, 30);
        assert!(stats.failed_playouts > 0);
        assert_eq!(tree.node(tree.root()).visit_count(), stats.completed_playouts);
    }
}
