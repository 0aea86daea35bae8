//! Error taxonomy
//!
//! Four families, handled differently by callers: validation errors are
//! never retried; transport errors are repeated only by poll loops; partial
//! fan-out failures escalate during acquisition but aggregate into reports
//! during release; timeouts carry enough detail to diagnose without
//! re-running the operation.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Fan-out phases that can surface a batch error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Create,
    Tag,
    AwaitJobs,
    Addresses,
    Disks,
    Configs,
    Boot,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Create => "create",
            Phase::Tag => "tag",
            Phase::AwaitJobs => "await-jobs",
            Phase::Addresses => "addresses",
            Phase::Disks => "disks",
            Phase::Configs => "configs",
            Phase::Boot => "boot",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single failed task within a fan-out phase, keyed by the slot or server
/// it belonged to.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub key: String,
    pub error: String,
}

fn summarize(failures: &[TaskFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("[{}] {}", f.key, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed identifier, unsupported option value or endpoint spec.
    #[error("validation error: {0}")]
    Validation(String),

    /// A single vendor call failed.
    #[error("vendor call '{op}' failed: {message}")]
    Transport { op: &'static str, message: String },

    /// One or more fan-out tasks failed while others succeeded.
    #[error("batch {phase} errors ({}): {}", .failures.len(), summarize(.failures))]
    Batch {
        phase: Phase,
        failures: Vec<TaskFailure>,
    },

    /// A poll loop exhausted its deadline with work still pending.
    #[error("timed out after {waited:?} waiting for {what} ({detail})")]
    Timeout {
        what: String,
        waited: Duration,
        detail: String,
    },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Wrap a failed vendor call, keeping the full cause chain in the
    /// message.
    pub fn transport(op: &'static str, source: anyhow::Error) -> Self {
        Error::Transport {
            op,
            message: format!("{source:#}"),
        }
    }

    /// Escalate fan-out failures into a fatal batch error.
    pub fn batch(phase: Phase, errors: Vec<(String, anyhow::Error)>) -> Self {
        Error::Batch {
            phase,
            failures: errors
                .into_iter()
                .map(|(key, error)| TaskFailure {
                    key,
                    error: format!("{error:#}"),
                })
                .collect(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_error_lists_every_failure() {
        let err = Error::batch(
            Phase::Configs,
            vec![
                ("10001".to_string(), anyhow::anyhow!("rejected")),
                ("10003".to_string(), anyhow::anyhow!("rejected")),
            ],
        );
        let text = err.to_string();
        assert!(text.contains("configs"));
        assert!(text.contains("(2)"));
        assert!(text.contains("[10001]"));
        assert!(text.contains("[10003]"));
    }

    #[test]
    fn transport_error_keeps_cause_chain() {
        let source = anyhow::anyhow!("connection reset").context("listing servers");
        let err = Error::transport("list_servers", source);
        let text = err.to_string();
        assert!(text.contains("list_servers"));
        assert!(text.contains("listing servers"));
        assert!(text.contains("connection reset"));
    }
}
