use cow_operator_types::PossibleResult;

/// True when `candidate` pays out strictly more of both tokens than `incumbent`
pub fn dominates(candidate: &PossibleResult, incumbent: &PossibleResult) -> bool {
    candidate.totals.token0_output > incumbent.totals.token0_output
        && candidate.totals.token1_output > incumbent.totals.token1_output
}

/// Streaming pick of the best feasible result.
///
/// The first feasible result offered becomes the incumbent and is replaced
/// only by a later result that strictly dominates it on both output totals.
/// When no result dominates another the earliest one wins, so the outcome
/// depends on offer order.
#[derive(Debug, Default)]
pub struct ResultSelector {
    best: Option<PossibleResult>,
    offered: usize,
}

impl ResultSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consider a result; returns true if it became the incumbent.
    /// Infeasible results are ignored.
    pub fn offer(&mut self, candidate: PossibleResult) -> bool {
        if !candidate.feasible {
            return false;
        }
        self.offered += 1;

        let replace = match &self.best {
            None => true,
            Some(incumbent) => dominates(&candidate, incumbent),
        };
        if replace {
            self.best = Some(candidate);
        }
        replace
    }

    /// Feasible results considered so far
    pub fn offered(&self) -> usize {
        self.offered
    }

    pub fn best(&self) -> Option<&PossibleResult> {
        self.best.as_ref()
    }

    pub fn into_best(self) -> Option<PossibleResult> {
        self.best
    }
}

/// Pick the best of `results` in iteration order
pub fn select_best<I>(results: I) -> Option<PossibleResult>
where
    I: IntoIterator<Item = PossibleResult>,
{
    let mut selector = ResultSelector::new();
    for result in results {
        selector.offer(result);
    }
    selector.into_best()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use cow_operator_types::{FixedDecimal, TokenTotals};

    fn result(token0_output: u64, token1_output: u64) -> PossibleResult {
        PossibleResult {
            matchings: vec![],
            pool_spot_price: FixedDecimal::zero(),
            pool_totals: TokenTotals::default(),
            pool_average_price: FixedDecimal::zero(),
            totals: TokenTotals {
                token0_output: U256::from(token0_output),
                token1_output: U256::from(token1_output),
                ..TokenTotals::default()
            },
            matching_average_price: FixedDecimal::zero(),
            feasible: true,
        }
    }

    #[test]
    fn test_empty_input_selects_nothing() {
        assert!(select_best(Vec::new()).is_none());
    }

    #[test]
    fn test_strict_dominance_replaces() {
        let best = select_best(vec![result(10, 10), result(11, 11)]).unwrap();
        assert_eq!(best.totals.token0_output, U256::from(11u64));
    }

    #[test]
    fn test_one_axis_improvement_keeps_incumbent() {
        let best = select_best(vec![result(10, 10), result(100, 10), result(10, 100)]).unwrap();
        assert_eq!(best.totals.token0_output, U256::from(10u64));
        assert_eq!(best.totals.token1_output, U256::from(10u64));
    }

    #[test]
    fn test_first_seen_wins_ties() {
        let best = select_best(vec![result(5, 20), result(20, 5)]).unwrap();
        assert_eq!(best.totals.token0_output, U256::from(5u64));

        let best = select_best(vec![result(20, 5), result(5, 20)]).unwrap();
        assert_eq!(best.totals.token0_output, U256::from(20u64));
    }

    #[test]
    fn test_infeasible_results_ignored() {
        let mut infeasible = result(100, 100);
        infeasible.feasible = false;

        let mut selector = ResultSelector::new();
        assert!(!selector.offer(infeasible));
        assert!(selector.offer(result(1, 1)));
        assert_eq!(selector.offered(), 1);
        assert_eq!(selector.best().unwrap().totals.token0_output, U256::from(1u64));
    }
}
