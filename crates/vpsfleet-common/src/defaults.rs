//! Default timeouts and poll cadences shared across the workspace

use std::time::Duration;

/// Total budget for one acquisition, shared by both job-wait phases.
pub const DEFAULT_PROVISION_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Cadence of job-completion polling during acquisition.
pub const DEFAULT_PROVISION_INTERVAL: Duration = Duration::from_secs(5);

/// Total budget for port-readiness waiting.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(120);

/// Cadence of port probing.
pub const DEFAULT_READINESS_INTERVAL: Duration = Duration::from_secs(10);

/// Port probed when waiting on a batch by id.
pub const DEFAULT_SSH_PORT: u16 = 22;
