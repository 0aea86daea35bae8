//! Port readiness waiting
//!
//! Applies the bounded poller's loop contract to a set of independent
//! endpoints: each iteration probes everything still pending, endpoints
//! leave the pending set on their first terminal outcome, and the wait
//! succeeds only once nothing is pending. Reusable against any reachable
//! endpoint, not just provisioned servers.

use crate::error::{Error, Result};
use crate::probe::{PortProbe, ProbeStatus};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// A network endpoint awaiting its first terminal probe outcome.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse a `host:port` spec.
    pub fn parse(spec: &str) -> Result<Self> {
        let (host, port) = spec
            .rsplit_once(':')
            .ok_or_else(|| Error::validation(format!("invalid endpoint '{spec}', expected host:port")))?;
        if host.is_empty() {
            return Err(Error::validation(format!(
                "invalid endpoint '{spec}', empty host"
            )));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| Error::validation(format!("invalid port in endpoint '{spec}'")))?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Terminal outcome for one endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CheckedEndpoint {
    pub host: String,
    pub port: u16,
    /// Probe rounds completed when the endpoint resolved.
    pub tries: u32,
    pub open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a completed readiness wait.
#[derive(Debug, Serialize)]
pub struct ReadinessReport {
    /// Endpoints that resolved with a terminal probe error.
    pub errors: usize,
    pub endpoints: Vec<CheckedEndpoint>,
}

/// Wait until every endpoint either accepts connections or fails terminally.
///
/// Shares the bounded poller's loop rules, including the skipped first sleep
/// while less than half an interval has elapsed. `closed` keeps an endpoint
/// pending; `open` and `error` both resolve it, with `error` counting toward
/// the report's error tally. On timeout, the error enumerates what resolved
/// (with outcome and try count) and what never did.
pub async fn wait_for_port(
    endpoints: Vec<Endpoint>,
    timeout: Duration,
    interval: Duration,
    probe: &dyn PortProbe,
) -> Result<ReadinessReport> {
    info!(count = endpoints.len(), ?timeout, "Waiting for ports");
    let start = Instant::now();
    let mut pending = endpoints;
    let mut checked: Vec<CheckedEndpoint> = Vec::new();
    let mut errors = 0usize;
    let mut tries = 0u32;

    while start.elapsed() <= timeout {
        if start.elapsed() > interval / 2 {
            tokio::time::sleep(interval).await;
        }
        tries += 1;

        let mut still_pending = Vec::with_capacity(pending.len());
        for endpoint in pending {
            let outcome = probe.check(&endpoint.host, endpoint.port).await;
            match outcome.status {
                ProbeStatus::Open => {
                    debug!(endpoint = %endpoint, tries, "Port open");
                    checked.push(CheckedEndpoint {
                        host: endpoint.host,
                        port: endpoint.port,
                        tries,
                        open: true,
                        error: None,
                    });
                }
                ProbeStatus::Error => {
                    debug!(endpoint = %endpoint, tries, error = ?outcome.error, "Probe failed terminally");
                    errors += 1;
                    checked.push(CheckedEndpoint {
                        host: endpoint.host,
                        port: endpoint.port,
                        tries,
                        open: false,
                        error: outcome.error.or_else(|| Some("probe error".to_string())),
                    });
                }
                ProbeStatus::Closed => still_pending.push(endpoint),
            }
        }
        pending = still_pending;

        if pending.is_empty() {
            info!(errors, tries, "All endpoints resolved");
            return Ok(ReadinessReport {
                errors,
                endpoints: checked,
            });
        }
    }

    let resolved: Vec<String> = checked
        .iter()
        .map(|e| {
            format!(
                "{}:{} {} after {} tries",
                e.host,
                e.port,
                if e.open { "open" } else { "error" },
                e.tries
            )
        })
        .collect();
    let unresolved: Vec<String> = pending.iter().map(Endpoint::to_string).collect();
    Err(Error::Timeout {
        what: "ports to become reachable".to_string(),
        waited: timeout,
        detail: format!(
            "resolved: [{}]; unresolved: [{}]",
            resolved.join(", "),
            unresolved.join(", ")
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_port() {
        let endpoint = Endpoint::parse("example.com:80").unwrap();
        assert_eq!(endpoint.host, "example.com");
        assert_eq!(endpoint.port, 80);
    }

    #[test]
    fn rejects_malformed_specs() {
        for spec in ["example.com", ":80", "host:", "host:notaport", "host:99999"] {
            assert!(
                matches!(Endpoint::parse(spec), Err(Error::Validation(_))),
                "expected validation error for '{spec}'"
            );
        }
    }

    #[test]
    fn last_colon_wins_for_weird_hosts() {
        let endpoint = Endpoint::parse("some-host.internal:8080").unwrap();
        assert_eq!(endpoint.port, 8080);
    }
}
