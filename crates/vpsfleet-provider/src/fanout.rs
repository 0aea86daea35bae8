//! Keyed fan-out / fan-in for independent vendor calls
//!
//! Every workflow phase issues its calls concurrently and needs the complete
//! set of outcomes before deciding anything — a single failed disk creation
//! in a five-server batch must not abandon tracking of the other four,
//! because rollback needs them all. Outcomes are keyed (slot number or
//! server id), never matched back by position.

use crate::error::{Error, Phase, Result};
use futures::future::join_all;
use std::fmt::Display;
use std::future::Future;

/// Outcome of running a group of keyed tasks to completion.
///
/// Every submitted task settles exactly once: its key lands in `values` on
/// success or in `errors` on failure, so
/// `values.len() + errors.len() == tasks.len()` always holds.
#[derive(Debug)]
pub struct Settled<K, T> {
    pub values: Vec<(K, T)>,
    pub errors: Vec<(K, anyhow::Error)>,
}

impl<K: Display, T> Settled<K, T> {
    /// Escalate any recorded failure into a fatal batch error for `phase`.
    pub fn into_result(self, phase: Phase) -> Result<Vec<(K, T)>> {
        if self.errors.is_empty() {
            Ok(self.values)
        } else {
            Err(Error::batch(
                phase,
                self.errors
                    .into_iter()
                    .map(|(k, e)| (k.to_string(), e))
                    .collect(),
            ))
        }
    }
}

/// Run every keyed task concurrently and wait for all of them to finish.
///
/// Failures never cancel siblings; the group resolves only once each task
/// has settled. Wall-clock cost is the slowest task, not the sum.
pub async fn join_settled<K, T, Fut>(tasks: Vec<(K, Fut)>) -> Settled<K, T>
where
    Fut: Future<Output = anyhow::Result<T>>,
{
    let (keys, futures): (Vec<K>, Vec<Fut>) = tasks.into_iter().unzip();
    let outcomes = join_all(futures).await;

    let mut values = Vec::new();
    let mut errors = Vec::new();
    for (key, outcome) in keys.into_iter().zip(outcomes) {
        match outcome {
            Ok(value) => values.push((key, value)),
            Err(error) => errors.push((key, error)),
        }
    }
    Settled { values, errors }
}
