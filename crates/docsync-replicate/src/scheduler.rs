//! Bounded-concurrency runner for replication work items.

use std::future::Future;

use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::error::{ReplicateError, Result};

/// Runs futures with at most `limit` in flight.
///
/// Items start in submission order and a freed slot is refilled at once.
/// A failing item never cancels its running siblings.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    limit: usize,
}

impl Scheduler {
    /// Create a scheduler. A limit of zero is treated as one.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run every item and return the outputs in submission order.
    ///
    /// With `stop_on_error`, no item is started after the first failure.
    /// Either way the earliest submitted failure is returned once the
    /// in-flight items have settled.
    pub async fn run<T, F>(&self, items: Vec<F>, stop_on_error: bool) -> Result<Vec<T>>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let total = items.len();
        let mut outputs: Vec<Option<T>> = (0..total).map(|_| None).collect();
        let mut first_error: Option<(usize, ReplicateError)> = None;
        let mut pending = items.into_iter().enumerate();
        let mut tasks = JoinSet::new();
        let mut stopped = false;

        loop {
            while !stopped && tasks.len() < self.limit {
                match pending.next() {
                    Some((index, item)) => {
                        tasks.spawn(async move { (index, item.await) });
                    }
                    None => break,
                }
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };

            let (index, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    error!("work item failed: {}", e);
                    (total, Err(ReplicateError::TaskFailed(e.to_string())))
                }
            };

            match result {
                Ok(value) => outputs[index] = Some(value),
                Err(e) => {
                    debug!(index, "work item returned an error");
                    if first_error.as_ref().map_or(true, |(first, _)| index < *first) {
                        first_error = Some((index, e));
                    }
                    stopped |= stop_on_error;
                }
            }
        }

        if let Some((_, e)) = first_error {
            return Err(e);
        }
        Ok(outputs.into_iter().flatten().collect())
    }
}
