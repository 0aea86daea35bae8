//! Pluggable endpoint probes

use async_trait::async_trait;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::net::TcpStream;

/// What a single probe attempt observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    /// The endpoint accepted a connection.
    Open,
    /// Not accepting yet; worth retrying.
    Closed,
    /// Terminal failure (resolution, routing); retrying is pointless.
    Error,
}

#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub status: ProbeStatus,
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn open() -> Self {
        Self {
            status: ProbeStatus::Open,
            error: None,
        }
    }

    pub fn closed() -> Self {
        Self {
            status: ProbeStatus::Closed,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Error,
            error: Some(message.into()),
        }
    }
}

/// A reachability check for one endpoint.
///
/// Probes report, they never fail: an unreachable host is an outcome, not an
/// error. One attempt must settle promptly — the readiness loop bounds the
/// overall wait, not the individual probe.
#[async_trait]
pub trait PortProbe: Send + Sync {
    async fn check(&self, host: &str, port: u16) -> ProbeOutcome;
}

/// Direct TCP connect probe with a bounded attempt time.
pub struct TcpProbe {
    pub connect_timeout: Duration,
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl PortProbe for TcpProbe {
    async fn check(&self, host: &str, port: u16) -> ProbeOutcome {
        let addr = format!("{host}:{port}");
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_stream)) => ProbeOutcome::open(),
            Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => ProbeOutcome::closed(),
            Ok(Err(e)) => ProbeOutcome::error(e.to_string()),
            // A silently dropped SYN looks like a port that is not open yet
            Err(_) => ProbeOutcome::closed(),
        }
    }
}
