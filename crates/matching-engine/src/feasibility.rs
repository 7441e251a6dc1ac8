use alloy_primitives::U256;
use cow_operator_types::{Feasibility, FixedDecimal, Matching, PossibleResult, Task, TokenTotals};

use crate::{ideal_output, price_from_sqrt_x96, MatchingError};

/// Cheap check run before full evaluation: every group of two or more tasks
/// must contain both directions, since a group cannot net against itself.
pub fn is_structurally_possible(partition: &[Vec<&Task>]) -> bool {
    partition.iter().all(|group| group.len() == 1 || has_both_directions(group))
}

fn has_both_directions(group: &[&Task]) -> bool {
    group.iter().any(|t| t.zero_for_one) && group.iter().any(|t| !t.zero_for_one)
}

/// Evaluate one partition at the pool's current `sqrtPriceX96`
pub fn evaluate_partition(
    partition: &[Vec<&Task>],
    sqrt_price_x96: U256,
) -> Result<PossibleResult, MatchingError> {
    let spot = price_from_sqrt_x96(sqrt_price_x96);
    evaluate_partition_at_price(partition, &spot)
}

/// Evaluate one partition at a linear spot price (token1 per token0)
pub fn evaluate_partition_at_price(
    partition: &[Vec<&Task>],
    spot: &FixedDecimal,
) -> Result<PossibleResult, MatchingError> {
    let mut pool_totals = TokenTotals::default();
    for task in partition.iter().flatten() {
        pool_totals.accumulate(&quoted_totals(task)?);
    }

    let mut matchings = Vec::with_capacity(partition.len());
    let mut totals = TokenTotals::default();
    for group in partition {
        let matching = evaluate_group(group, spot)?;
        totals.accumulate(&matching.totals);
        matchings.push(matching);
    }

    let feasible = matchings
        .iter()
        .all(|m| m.feasibility != Feasibility::None);

    let matching_average_price = if feasible {
        average_swap_price(&totals)
    } else {
        FixedDecimal::zero()
    };

    Ok(PossibleResult {
        matchings,
        pool_spot_price: spot.clone(),
        pool_average_price: average_swap_price(&pool_totals),
        pool_totals,
        totals,
        matching_average_price,
        feasible,
    })
}

/// What the pool alone would do with a single task
fn quoted_totals(task: &Task) -> Result<TokenTotals, MatchingError> {
    let (input, output) = task
        .quoted_amounts()
        .ok_or(MatchingError::MissingQuote { task_id: task.task_id })?;

    let mut totals = TokenTotals::default();
    if task.zero_for_one {
        totals.token0_input = input;
        totals.token1_output = output;
    } else {
        totals.token1_input = input;
        totals.token0_output = output;
    }
    Ok(totals)
}

fn evaluate_group(group: &[&Task], spot: &FixedDecimal) -> Result<Matching, MatchingError> {
    let tasks: Vec<Task> = group.iter().map(|t| (*t).clone()).collect();

    if let [task] = group {
        return Ok(Matching {
            tasks,
            feasibility: Feasibility::SwapEachTask,
            totals: quoted_totals(task)?,
        });
    }

    let (zero_for_one, one_for_zero): (Vec<&Task>, Vec<&Task>) =
        group.iter().copied().partition(|t| t.zero_for_one);

    let available_token0 = sum_specified(&zero_for_one);
    let available_token1 = sum_specified(&one_for_zero);
    let mut totals = TokenTotals {
        token0_input: available_token0,
        token1_input: available_token1,
        ..TokenTotals::default()
    };

    let (Some(min_limit), Some(max_limit)) = (
        zero_for_one.iter().map(|t| t.sqrt_price_limit_x96).min(),
        one_for_zero.iter().map(|t| t.sqrt_price_limit_x96).max(),
    ) else {
        return Ok(Matching {
            tasks,
            feasibility: Feasibility::None,
            totals,
        });
    };

    let minimum_price = price_from_sqrt_x96(min_limit);
    let maximum_price = price_from_sqrt_x96(max_limit);

    let ideal_token1_for_token0 = ideal_output(available_token0, spot, true)?;
    let ideal_token0_for_token1 = ideal_output(available_token1, spot, false)?;
    let minimum_token1_for_token0 = ideal_output(available_token0, &minimum_price, true)?;
    // A zero bound price puts no floor under the one-for-zero side
    let minimum_token0_for_token1 = match ideal_output(available_token1, &maximum_price, false) {
        Ok(amount) => amount,
        Err(MatchingError::ZeroPrice) => U256::ZERO,
        Err(e) => return Err(e),
    };

    let token1_fits = ideal_token1_for_token0 <= available_token1;
    let token0_fits = ideal_token0_for_token1 <= available_token0;

    let feasibility = if token1_fits && token0_fits {
        totals.token0_output = ideal_token0_for_token1;
        totals.token1_output = ideal_token1_for_token0;
        Feasibility::Ideal
    } else if token1_fits && minimum_token0_for_token1 <= available_token0 {
        totals.token0_output = available_token0;
        totals.token1_output = ideal_token1_for_token0;
        Feasibility::IdealZeroForOne
    } else if token0_fits && minimum_token1_for_token0 <= available_token1 {
        totals.token0_output = ideal_token0_for_token1;
        totals.token1_output = available_token1;
        Feasibility::IdealOneForZero
    } else {
        Feasibility::None
    };

    Ok(Matching {
        tasks,
        feasibility,
        totals,
    })
}

fn sum_specified(tasks: &[&Task]) -> U256 {
    tasks
        .iter()
        .fold(U256::ZERO, |acc, t| acc + t.specified_magnitude())
}

/// Mean of the two effective prices `out1 / in0` and `in1 / out0`, or zero
/// when either side of the trade is empty
pub fn average_swap_price(totals: &TokenTotals) -> FixedDecimal {
    if totals.token0_input.is_zero()
        || totals.token1_input.is_zero()
        || totals.token0_output.is_zero()
        || totals.token1_output.is_zero()
    {
        return FixedDecimal::zero();
    }

    let token0_input = FixedDecimal::from_u256(totals.token0_input);
    let token1_input = FixedDecimal::from_u256(totals.token1_input);
    let token0_output = FixedDecimal::from_u256(totals.token0_output);
    let token1_output = FixedDecimal::from_u256(totals.token1_output);

    let first_half = token1_output.div_floor(&token0_input).unwrap_or_default();
    let second_half = token1_input.div_floor(&token0_output).unwrap_or_default();
    (first_half + second_half)
        .div_floor(&FixedDecimal::from_integer(2))
        .unwrap_or_default()
}
