use alloy_primitives::U256;
use cow_operator_types::{FixedDecimal, PossibleResult, Task};
use serde::Serialize;
use tracing::debug;

use crate::{
    evaluate_partition_at_price, is_structurally_possible, partitions, price_from_sqrt_x96,
    MatchingError, ResultSelector, MAX_PARTITION_TASKS,
};

/// Counters gathered while searching one batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SolveStats {
    pub partitions_generated: usize,
    /// Rejected by the direction check before any arithmetic
    pub partitions_filtered: usize,
    pub partitions_evaluated: usize,
    pub feasible_results: usize,
}

/// Best outcome for a batch, if any, and how it was found
#[derive(Clone, Debug)]
pub struct BatchSolution {
    pub best: Option<PossibleResult>,
    pub stats: SolveStats,
}

/// Searches every partition of a single-pool batch for the best CoW outcome
#[derive(Clone, Debug)]
pub struct MatchingEngine {
    max_tasks: usize,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self {
            max_tasks: MAX_PARTITION_TASKS,
        }
    }

    /// Engine refusing batches larger than `max_tasks` (never above [`MAX_PARTITION_TASKS`])
    pub fn with_max_tasks(max_tasks: usize) -> Self {
        Self {
            max_tasks: max_tasks.min(MAX_PARTITION_TASKS),
        }
    }

    pub fn max_tasks(&self) -> usize {
        self.max_tasks
    }

    /// Solve a batch at the pool's current `sqrtPriceX96`
    pub fn solve(&self, tasks: &[Task], sqrt_price_x96: U256) -> Result<BatchSolution, MatchingError> {
        let spot = price_from_sqrt_x96(sqrt_price_x96);
        self.solve_at_price(tasks, &spot)
    }

    /// Solve a batch at a linear spot price.
    ///
    /// Partitions are generated, filtered, evaluated and offered to the
    /// selector one at a time.
    pub fn solve_at_price(
        &self,
        tasks: &[Task],
        spot: &FixedDecimal,
    ) -> Result<BatchSolution, MatchingError> {
        self.validate(tasks)?;

        let mut stats = SolveStats::default();
        let mut selector = ResultSelector::new();

        for partition in partitions(tasks)? {
            stats.partitions_generated += 1;
            if !is_structurally_possible(&partition) {
                stats.partitions_filtered += 1;
                continue;
            }

            let result = evaluate_partition_at_price(&partition, spot)?;
            stats.partitions_evaluated += 1;
            if result.feasible {
                stats.feasible_results += 1;
                selector.offer(result);
            }
        }

        debug!(
            tasks = tasks.len(),
            spot = %spot,
            generated = stats.partitions_generated,
            filtered = stats.partitions_filtered,
            evaluated = stats.partitions_evaluated,
            feasible = stats.feasible_results,
            "Partition search complete"
        );

        Ok(BatchSolution {
            best: selector.into_best(),
            stats,
        })
    }

    fn validate(&self, tasks: &[Task]) -> Result<(), MatchingError> {
        if tasks.len() > self.max_tasks {
            return Err(MatchingError::BatchTooLarge {
                count: tasks.len(),
                max: self.max_tasks,
            });
        }
        if let Some(first) = tasks.first() {
            if let Some(other) = tasks.iter().find(|t| t.pool_id != first.pool_id) {
                return Err(MatchingError::MixedPools {
                    expected: first.pool_id,
                    found: other.pool_id,
                });
            }
        }
        Ok(())
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, I256};
    use cow_operator_types::{Feasibility, PoolKey, RawTask, TaskId};

    const ONE: u128 = 1_000_000_000_000_000_000;

    fn make_task(task_id: TaskId, zero_for_one: bool, amount: u128, output: u128) -> Task {
        let mut task = Task::from_raw(
            RawTask {
                task_id,
                zero_for_one,
                amount_specified: -I256::from_raw(U256::from(amount)),
                // Limits far from spot in the direction each side tolerates
                sqrt_price_limit_x96: if zero_for_one {
                    U256::from(4295128740u64)
                } else {
                    U256::from(1u64) << 160
                },
                sender: Address::repeat_byte(task_id as u8),
                pool_id: B256::repeat_byte(0x11),
                task_created_block: 1,
            },
            PoolKey {
                currency0: Address::repeat_byte(0x01),
                currency1: Address::repeat_byte(0x02),
                fee: 3000,
                tick_spacing: 60,
                hooks: Address::ZERO,
            },
        );
        task.pool_input_amount = Some(U256::from(amount));
        task.pool_output_amount = Some(U256::from(output));
        task
    }

    fn spot() -> FixedDecimal {
        FixedDecimal::from_integer(2500)
    }

    #[test]
    fn test_empty_batch_has_no_solution() {
        let solution = MatchingEngine::new().solve_at_price(&[], &spot()).unwrap();
        assert!(solution.best.is_none());
        assert_eq!(solution.stats, SolveStats::default());
    }

    #[test]
    fn test_opposing_pair_is_netted() {
        let tasks = vec![
            make_task(1, true, ONE, 2_490 * ONE),
            make_task(2, false, 2_500 * ONE, ONE * 996 / 1000),
        ];
        let solution = MatchingEngine::new().solve_at_price(&tasks, &spot()).unwrap();

        let best = solution.best.unwrap();
        assert_eq!(best.matchings.len(), 1);
        assert_eq!(best.matchings[0].feasibility, Feasibility::Ideal);
        assert_eq!(solution.stats.partitions_generated, 2);
        assert_eq!(solution.stats.feasible_results, 2);
    }

    #[test]
    fn test_same_direction_pair_swaps_separately() {
        let tasks = vec![
            make_task(1, true, ONE, 2_490 * ONE),
            make_task(2, true, 2 * ONE, 4_970 * ONE),
        ];
        let solution = MatchingEngine::new().solve_at_price(&tasks, &spot()).unwrap();

        assert_eq!(solution.stats.partitions_generated, 2);
        assert_eq!(solution.stats.partitions_filtered, 1);
        let best = solution.best.unwrap();
        assert_eq!(best.matchings.len(), 2);
        assert!(best
            .matchings
            .iter()
            .all(|m| m.feasibility == Feasibility::SwapEachTask));
    }

    #[test]
    fn test_stats_account_for_every_partition() {
        let tasks = vec![
            make_task(1, true, ONE, 2_490 * ONE),
            make_task(2, false, 2_500 * ONE, ONE * 996 / 1000),
            make_task(3, true, ONE, 2_490 * ONE),
            make_task(4, false, 1_250 * ONE, ONE * 498 / 1000),
        ];
        let solution = MatchingEngine::new().solve_at_price(&tasks, &spot()).unwrap();
        let stats = solution.stats;

        assert_eq!(stats.partitions_generated, 15);
        assert_eq!(
            stats.partitions_generated,
            stats.partitions_filtered + stats.partitions_evaluated
        );
        assert!(stats.feasible_results <= stats.partitions_evaluated);
        assert!(solution.best.is_some());
    }

    #[test]
    fn test_batch_size_limit() {
        let tasks: Vec<Task> = (1..=4).map(|i| make_task(i, true, ONE, ONE)).collect();
        let engine = MatchingEngine::with_max_tasks(3);
        assert!(matches!(
            engine.solve_at_price(&tasks, &spot()),
            Err(MatchingError::BatchTooLarge { count: 4, max: 3 })
        ));
        assert_eq!(MatchingEngine::with_max_tasks(100).max_tasks(), MAX_PARTITION_TASKS);
    }

    #[test]
    fn test_mixed_pools_rejected() {
        let mut other = make_task(2, false, ONE, ONE);
        other.pool_id = B256::repeat_byte(0x22);
        let tasks = vec![make_task(1, true, ONE, ONE), other];
        assert!(matches!(
            MatchingEngine::new().solve_at_price(&tasks, &spot()),
            Err(MatchingError::MixedPools { .. })
        ));
    }
}
