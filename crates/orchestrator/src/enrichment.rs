use cow_operator_types::Task;
use futures::future::try_join_all;
use tracing::debug;

use crate::manager::OrchestratorError;
use crate::venue::{SwapQuote, SwapQuoter};

/// Quote every task against its pool, concurrently.
///
/// All or nothing: the first failure fails the whole set and no task is
/// returned.
pub async fn enrich_quotes(
    quoter: &dyn SwapQuoter,
    tasks: Vec<Task>,
) -> Result<Vec<Task>, OrchestratorError> {
    let quotes = try_join_all(tasks.iter().map(|task| quote_task(quoter, task))).await?;

    Ok(tasks
        .into_iter()
        .zip(quotes)
        .map(|(mut task, quote)| {
            task.apply_quote(quote.amount0, quote.amount1);
            task
        })
        .collect())
}

async fn quote_task(quoter: &dyn SwapQuoter, task: &Task) -> Result<SwapQuote, OrchestratorError> {
    if !task.is_exact_input() {
        return Err(OrchestratorError::NotExactInput {
            task_id: task.task_id,
        });
    }

    let quote = quoter
        .quote_exact_input(&task.pool_key, task.zero_for_one, task.specified_magnitude())
        .await
        .map_err(|e| OrchestratorError::QuoteFailed {
            task_id: task.task_id,
            reason: e.to_string(),
        })?;

    debug!(
        task_id = task.task_id,
        amount0 = %quote.amount0,
        amount1 = %quote.amount1,
        "Quoted task"
    );
    Ok(quote)
}
