//! Bounded fan-out over independent model calls.
//!
//! Tasks run concurrently and finish in whatever order the model server
//! answers them. Results are re-sorted by submission index before they are
//! handed back, so anything folded over them downstream (the graph merge in
//! particular) sees the same order on every run. A task that fails or panics
//! is recorded as a [`TaskFailure`] and the rest of the batch carries on.

use anyhow::{anyhow, Result};
use futures::{stream, FutureExt, StreamExt};
use serde::Serialize;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize)]
pub struct TaskFailure {
    /// Submission position of the input that failed
    pub index: usize,
    /// Length in bytes of the failed input, for diagnosis
    pub input_len: usize,
    pub error: String,
}

#[derive(Debug)]
pub struct BatchOutcome<R> {
    /// Successful results as (submission index, value), ascending by index
    pub successes: Vec<(usize, R)>,
    /// Failures, ascending by index
    pub failures: Vec<TaskFailure>,
}

impl<R> BatchOutcome<R> {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Successful values in submission order.
    pub fn into_values(self) -> Vec<R> {
        self.successes.into_iter().map(|(_, value)| value).collect()
    }
}

/// Run `task` over every input with at most `max_concurrency` calls in
/// flight and return the results in submission order.
pub async fn dispatch_ordered<T, R, F, Fut>(
    inputs: Vec<T>,
    max_concurrency: usize,
    task: F,
) -> BatchOutcome<R>
where
    T: AsRef<str>,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let limit = max_concurrency.max(1);
    let total = inputs.len();

    let mut completed: Vec<(usize, usize, Result<R>)> = stream::iter(inputs.into_iter().enumerate())
        .map(|(index, input)| {
            let input_len = input.as_ref().len();
            let call = task(input);
            async move {
                let result = match AssertUnwindSafe(call).catch_unwind().await {
                    Ok(result) => result,
                    Err(panic) => Err(anyhow!("task panicked: {}", panic_message(panic.as_ref()))),
                };
                debug!(index, ok = result.is_ok(), "Task finished");
                (index, input_len, result)
            }
        })
        .buffer_unordered(limit)
        .collect()
        .await;

    completed.sort_by_key(|(index, _, _)| *index);

    let mut successes = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (index, input_len, result) in completed {
        match result {
            Ok(value) => successes.push((index, value)),
            Err(e) => {
                warn!(
                    chunk_index = index,
                    chunk_len = input_len,
                    error = %format!("{:#}", e),
                    "Task failed, excluding it from the batch"
                );
                failures.push(TaskFailure {
                    index,
                    input_len,
                    error: format!("{:#}", e),
                });
            }
        }
    }

    BatchOutcome {
        successes,
        failures,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
