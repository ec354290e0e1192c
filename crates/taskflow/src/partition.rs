//! Filter and reject inputs with an asynchronous predicate

use crate::error::RunResult;
use crate::parallel;
use crate::state::RunContext;
use crate::task::Task;
use crate::types::RunKind;

/// Inputs split by a predicate, each side in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition<I> {
    pub kept: Vec<I>,
    pub rejected: Vec<I>,
}

impl<I> Partition<I> {
    pub(crate) fn split(inputs: Vec<I>, verdicts: Vec<bool>) -> Self {
        debug_assert_eq!(inputs.len(), verdicts.len());
        let mut kept = Vec::new();
        let mut rejected = Vec::new();
        for (input, keep) in inputs.into_iter().zip(verdicts) {
            if keep {
                kept.push(input);
            } else {
                rejected.push(input);
            }
        }
        Self { kept, rejected }
    }
}

/// Run `predicate` for every input in parallel and split the inputs by its
/// verdict.
///
/// A failing predicate fails the whole operation; no partial partition is
/// returned. Must be called from within a tokio runtime.
pub async fn partition<I, P>(inputs: Vec<I>, predicate: P) -> RunResult<Partition<I>, P::Error>
where
    I: Clone + Send + 'static,
    P: Task<I, Output = bool>,
{
    partition_with(RunContext::detached(RunKind::Partition), inputs, predicate).await
}

/// Keep the inputs the predicate accepts
pub async fn filter<I, P>(inputs: Vec<I>, predicate: P) -> RunResult<Vec<I>, P::Error>
where
    I: Clone + Send + 'static,
    P: Task<I, Output = bool>,
{
    Ok(partition(inputs, predicate).await?.kept)
}

/// Keep the inputs the predicate refuses
pub async fn reject<I, P>(inputs: Vec<I>, predicate: P) -> RunResult<Vec<I>, P::Error>
where
    I: Clone + Send + 'static,
    P: Task<I, Output = bool>,
{
    Ok(partition(inputs, predicate).await?.rejected)
}

pub(crate) async fn partition_with<I, P>(
    ctx: RunContext,
    inputs: Vec<I>,
    predicate: P,
) -> RunResult<Partition<I>, P::Error>
where
    I: Clone + Send + 'static,
    P: Task<I, Output = bool>,
{
    let verdicts = parallel::drive(ctx, inputs.clone(), predicate)
        .await
        .into_result()?;
    Ok(Partition::split(inputs, verdicts))
}
