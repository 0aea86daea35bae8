//! Scripted port probes for readiness tests

use async_trait::async_trait;
use std::time::{Duration, Instant};
use vpsfleet_provider::probe::{PortProbe, ProbeOutcome};

/// Probe that always reports the port closed.
pub struct AlwaysClosed;

#[async_trait]
impl PortProbe for AlwaysClosed {
    async fn check(&self, _host: &str, _port: u16) -> ProbeOutcome {
        ProbeOutcome::closed()
    }
}

/// Probe that reports closed until a deadline, then open.
pub struct OpensAfter {
    opens_at: Instant,
}

impl OpensAfter {
    pub fn new(delay: Duration) -> Self {
        Self {
            opens_at: Instant::now() + delay,
        }
    }
}

#[async_trait]
impl PortProbe for OpensAfter {
    async fn check(&self, _host: &str, _port: u16) -> ProbeOutcome {
        if Instant::now() >= self.opens_at {
            ProbeOutcome::open()
        } else {
            ProbeOutcome::closed()
        }
    }
}

/// Probe driven by a plain function, for one-off scripts.
pub struct FnProbe<F>(pub F);

#[async_trait]
impl<F> PortProbe for FnProbe<F>
where
    F: Fn(&str, u16) -> ProbeOutcome + Send + Sync,
{
    async fn check(&self, host: &str, port: u16) -> ProbeOutcome {
        (self.0)(host, port)
    }
}
