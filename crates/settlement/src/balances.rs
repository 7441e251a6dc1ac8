//! Turns a chosen [`PossibleResult`] into the transfers and swaps the hook executes.
//!
//! Pool-routed tasks become one swap each. Tasks in a netted matching are paid
//! directly: each task takes its pro-rata share of what its side receives, and
//! must end up with at least what the pool alone quoted it.

use alloy_primitives::U256;
use cow_operator_types::{
    u256_to_bigint, Feasibility, FixedDecimal, Matching, PossibleResult, Settlement, SwapBalance,
    Task, TransferBalance,
};
use tracing::debug;

use crate::SettlementError;

/// Compute the settlement for `result`.
///
/// Fails without partial output if any matching is infeasible, a task lacks a
/// quote, or the computed transfers would break conservation.
pub fn compute_settlement(result: &PossibleResult) -> Result<Settlement, SettlementError> {
    let mut settlement = Settlement::default();

    for matching in &result.matchings {
        match matching.feasibility {
            Feasibility::None => return Err(SettlementError::InfeasibleMatching),
            Feasibility::SwapEachTask => settle_through_pool(matching, &mut settlement)?,
            Feasibility::Ideal | Feasibility::IdealZeroForOne | Feasibility::IdealOneForZero => {
                settle_side(matching, true, &mut settlement)?;
                settle_side(matching, false, &mut settlement)?;
            }
        }
    }

    debug!(
        matchings = result.matchings.len(),
        transfers = settlement.transfers.len(),
        swaps = settlement.swaps.len(),
        "Settlement computed"
    );

    Ok(settlement)
}

fn settle_through_pool(
    matching: &Matching,
    settlement: &mut Settlement,
) -> Result<(), SettlementError> {
    for task in &matching.tasks {
        let (input, output) = quoted(task)?;

        settlement.swaps.push(SwapBalance {
            amount_specified: task.amount_specified,
            zero_for_one: task.zero_for_one,
            sqrt_price_limit_x96: task.sqrt_price_limit_x96,
        });
        settlement.analysis.insert(
            task.task_id,
            format!(
                "Task {} got swapped through AMM. Receiving {} tokens for {} tokens",
                task.task_id,
                format_units(output),
                format_units(input)
            ),
        );
    }
    Ok(())
}

/// Pay every task selling in direction `zero_for_one` out of the opposite side's flow
fn settle_side(
    matching: &Matching,
    zero_for_one: bool,
    settlement: &mut Settlement,
) -> Result<(), SettlementError> {
    let tasks: Vec<&Task> = matching
        .tasks
        .iter()
        .filter(|t| t.zero_for_one == zero_for_one)
        .collect();
    let Some(first) = tasks.first() else {
        return Ok(());
    };

    let (declared_input, declared_output) = if zero_for_one {
        (matching.totals.token0_input, matching.totals.token1_output)
    } else {
        (matching.totals.token1_input, matching.totals.token0_output)
    };

    let mut quoted_input = U256::ZERO;
    for task in &tasks {
        quoted_input += quoted(task)?.0;
    }
    if quoted_input != declared_input {
        return Err(SettlementError::InputMismatch {
            currency: first.input_currency(),
            quoted: quoted_input,
            declared: declared_input,
        });
    }

    let side_input = FixedDecimal::from_u256(declared_input);
    let side_output = FixedDecimal::from_u256(declared_output);
    let currency = first.output_currency();
    let mut paid = U256::ZERO;

    for task in &tasks {
        let (input, quoted_output) = quoted(task)?;
        let share = FixedDecimal::from_u256(input)
            .div_floor(&side_input)
            .unwrap_or_default();
        let amount = share.mul_floor(&side_output).floor_to_u256()?;

        if amount < quoted_output {
            return Err(SettlementError::NegativeSurplus {
                task_id: task.task_id,
                transfer: amount,
                quoted: quoted_output,
            });
        }
        paid += amount;

        settlement.transfers.push(TransferBalance {
            amount,
            currency,
            recipient: task.sender,
        });
        settlement.analysis.insert(
            task.task_id,
            format!(
                "Task {} got CoW matched. Receiving {} tokens for {} tokens, which is {} tokens more than the AMM's output",
                task.task_id,
                format_units(amount),
                format_units(input),
                format_units(amount - quoted_output)
            ),
        );
    }

    if paid > declared_output {
        return Err(SettlementError::Overdrawn {
            currency,
            paid,
            declared: declared_output,
        });
    }
    Ok(())
}

fn quoted(task: &Task) -> Result<(U256, U256), SettlementError> {
    task.quoted_amounts()
        .ok_or(SettlementError::MissingQuote {
            task_id: task.task_id,
        })
}

/// Render a base-unit amount as a decimal with 18 fractional digits
pub fn format_units(amount: U256) -> String {
    FixedDecimal::from_raw(u256_to_bigint(amount)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, I256};
    use cow_operator_matching_engine::{
        evaluate_partition_at_price, sqrt_price_x96_from_price, MatchingEngine,
    };
    use cow_operator_types::{bigint_to_u256, PoolKey, RawTask, TaskId};

    const ONE: u128 = 1_000_000_000_000_000_000;

    fn dec(s: &str) -> FixedDecimal {
        s.parse().unwrap()
    }

    fn units(s: &str) -> U256 {
        bigint_to_u256(dec(s).raw()).unwrap()
    }

    fn token0() -> Address {
        Address::repeat_byte(0x01)
    }

    fn token1() -> Address {
        Address::repeat_byte(0x02)
    }

    fn make_task(
        task_id: TaskId,
        zero_for_one: bool,
        amount: &str,
        limit_price: &str,
        quoted_output: &str,
    ) -> Task {
        let magnitude = units(amount);
        let mut task = Task::from_raw(
            RawTask {
                task_id,
                zero_for_one,
                amount_specified: -I256::from_raw(magnitude),
                sqrt_price_limit_x96: sqrt_price_x96_from_price(&dec(limit_price)).unwrap(),
                sender: Address::repeat_byte(0xa0 + task_id as u8),
                pool_id: B256::repeat_byte(0x11),
                task_created_block: 1,
            },
            PoolKey {
                currency0: token0(),
                currency1: token1(),
                fee: 3000,
                tick_spacing: 60,
                hooks: Address::ZERO,
            },
        );
        task.pool_input_amount = Some(magnitude);
        task.pool_output_amount = Some(units(quoted_output));
        task
    }

    fn spot_3000_pair() -> (Task, Task) {
        (
            make_task(1, true, "1", "2995", "2997"),
            make_task(2, false, "3000", "3005", "0.9985"),
        )
    }

    #[test]
    fn test_ideal_pair_pays_both_sides() {
        let (a, b) = spot_3000_pair();
        let result = MatchingEngine::new()
            .solve_at_price(&[a.clone(), b.clone()], &dec("3000"))
            .unwrap()
            .best
            .unwrap();

        let settlement = compute_settlement(&result).unwrap();

        assert!(settlement.swaps.is_empty());
        assert_eq!(
            settlement.transfers,
            vec![
                TransferBalance {
                    amount: U256::from(3000 * ONE),
                    currency: token1(),
                    recipient: a.sender,
                },
                TransferBalance {
                    amount: U256::from(ONE),
                    currency: token0(),
                    recipient: b.sender,
                },
            ]
        );
        assert_eq!(
            settlement.analysis[&1],
            "Task 1 got CoW matched. Receiving 3000 tokens for 1 tokens, which is 3 tokens more than the AMM's output"
        );
        assert_eq!(
            settlement.analysis[&2],
            "Task 2 got CoW matched. Receiving 1 tokens for 3000 tokens, which is 0.0015 tokens more than the AMM's output"
        );
    }

    #[test]
    fn test_single_task_becomes_swap() {
        let task = make_task(7, true, "1", "2900", "2997");
        let result = evaluate_partition_at_price(&[vec![&task]], &dec("3000")).unwrap();

        let settlement = compute_settlement(&result).unwrap();

        assert!(settlement.transfers.is_empty());
        assert_eq!(
            settlement.swaps,
            vec![SwapBalance {
                amount_specified: task.amount_specified,
                zero_for_one: true,
                sqrt_price_limit_x96: task.sqrt_price_limit_x96,
            }]
        );
        assert_eq!(
            settlement.analysis[&7],
            "Task 7 got swapped through AMM. Receiving 2997 tokens for 1 tokens"
        );
    }

    #[test]
    fn test_pro_rata_shares_conserve_value() {
        let a = make_task(1, true, "1", "2400", "2490");
        let b = make_task(2, true, "2", "2400", "4980");
        let c = make_task(3, false, "7500", "2600", "2.99");
        let result = evaluate_partition_at_price(&[vec![&a, &b, &c]], &dec("2500")).unwrap();
        assert_eq!(result.matchings[0].feasibility, Feasibility::Ideal);

        let settlement = compute_settlement(&result).unwrap();

        let paid_token1 = settlement.transferred(token1());
        let declared_token1 = result.matchings[0].totals.token1_output;
        assert!(paid_token1 <= declared_token1);
        // Flooring each third loses at most a few base units of dust
        assert!(declared_token1 - paid_token1 < U256::from(1_000_000u64));

        assert_eq!(settlement.transferred(token0()), U256::from(3 * ONE));
        assert_eq!(settlement.transfers.len(), 3);
    }

    #[test]
    fn test_settlement_is_idempotent() {
        let (a, b) = spot_3000_pair();
        let result = evaluate_partition_at_price(&[vec![&a, &b]], &dec("3000")).unwrap();

        let first = compute_settlement(&result).unwrap();
        let second = compute_settlement(&result).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_negative_surplus_is_fatal() {
        let a = make_task(1, true, "1", "2995", "3001");
        let (_, b) = spot_3000_pair();
        let result = evaluate_partition_at_price(&[vec![&a, &b]], &dec("3000")).unwrap();

        assert!(matches!(
            compute_settlement(&result),
            Err(SettlementError::NegativeSurplus { task_id: 1, .. })
        ));
    }

    #[test]
    fn test_input_mismatch_is_fatal() {
        let (a, b) = spot_3000_pair();
        let mut result = evaluate_partition_at_price(&[vec![&a, &b]], &dec("3000")).unwrap();
        result.matchings[0].tasks[1].pool_input_amount = Some(units("2999"));

        assert!(matches!(
            compute_settlement(&result),
            Err(SettlementError::InputMismatch { .. })
        ));
    }

    #[test]
    fn test_infeasible_matching_rejected() {
        let a = make_task(1, true, "1", "2490", "2497");
        let b = make_task(2, false, "2000", "2510", "0.79");
        let result = evaluate_partition_at_price(&[vec![&a, &b]], &dec("2500")).unwrap();

        assert!(matches!(
            compute_settlement(&result),
            Err(SettlementError::InfeasibleMatching)
        ));
    }

    #[test]
    fn test_missing_quote_rejected() {
        let (a, b) = spot_3000_pair();
        let mut result = evaluate_partition_at_price(&[vec![&a], vec![&b]], &dec("3000")).unwrap();
        result.matchings[1].tasks[0].pool_output_amount = None;

        assert!(matches!(
            compute_settlement(&result),
            Err(SettlementError::MissingQuote { task_id: 2 })
        ));
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::from(ONE)), "1");
        assert_eq!(format_units(U256::from(1_500_000_000_000_000u64)), "0.0015");
        assert_eq!(format_units(U256::ZERO), "0");
    }
}
