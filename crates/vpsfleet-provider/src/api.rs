//! Vendor compute API boundary
//!
//! The orchestrator drives one pluggable backend through [`VendorApi`]: a
//! closed set of typed operations rather than string-dispatched command
//! names. Backends return `anyhow::Result` at this boundary; the workflow
//! classifies failures into the crate's error taxonomy.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// State of an asynchronous vendor job.
///
/// A job the vendor has not yet reported on is `Pending` and counts as
/// unfinished for job-completion waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Success,
    Failure,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

/// One server as reported by the vendor's listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerRecord {
    pub id: String,
    pub label: String,
    /// Free-text group tag; carries the full batch tag for managed servers.
    pub group: String,
    /// Total disk capacity in MiB available to this server's plan.
    pub total_disk_mb: u64,
    /// Full vendor attribute snapshot.
    pub raw: serde_json::Value,
}

/// One network address assigned to a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressRecord {
    pub address: String,
    pub public: bool,
}

/// One asynchronous vendor job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub label: String,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskRecord {
    pub id: String,
    pub server_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootConfigRecord {
    pub id: String,
    pub server_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRecord {
    pub id: String,
    pub label: String,
    pub disk_mb: u64,
    pub ram_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionRecord {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    pub label: String,
}

/// Parameters for [`VendorApi::create_server`].
#[derive(Debug, Clone)]
pub struct CreateServer {
    pub plan_id: String,
    pub region_id: String,
}

/// Parameters for [`VendorApi::update_server`].
#[derive(Debug, Clone)]
pub struct UpdateServer {
    pub server_id: String,
    pub label: String,
    pub group: String,
}

/// Parameters for [`VendorApi::delete_server`].
///
/// `skip_checks` bypasses vendor-side safety checks (attached disks and the
/// like); set when membership was already validated on our side.
#[derive(Debug, Clone)]
pub struct DeleteServer {
    pub server_id: String,
    pub skip_checks: bool,
}

/// Parameters for [`VendorApi::create_disk`].
#[derive(Debug, Clone)]
pub struct CreateDisk {
    pub server_id: String,
    pub image_id: String,
    pub size_mb: u64,
    pub label: String,
    pub root_password: String,
    pub root_ssh_key: Option<String>,
}

/// Parameters for [`VendorApi::create_boot_config`].
#[derive(Debug, Clone)]
pub struct CreateBootConfig {
    pub server_id: String,
    pub disk_id: String,
    pub label: String,
    /// Vendor default when unset.
    pub kernel_id: Option<String>,
}

/// Parameters for [`VendorApi::boot_server`].
#[derive(Debug, Clone)]
pub struct BootServer {
    pub server_id: String,
    pub config_id: String,
}

/// The closed set of vendor operations the orchestrator relies on.
///
/// Implemented once per backend. Every call is independent; concurrency is
/// the caller's concern.
#[async_trait]
pub trait VendorApi: Send + Sync {
    async fn create_server(&self, req: CreateServer) -> Result<ServerRecord>;
    async fn update_server(&self, req: UpdateServer) -> Result<()>;
    async fn delete_server(&self, req: DeleteServer) -> Result<()>;
    async fn list_servers(&self) -> Result<Vec<ServerRecord>>;
    async fn list_addresses(&self, server_id: &str) -> Result<Vec<AddressRecord>>;
    async fn list_jobs(&self, server_id: &str) -> Result<Vec<JobRecord>>;
    async fn create_disk(&self, req: CreateDisk) -> Result<DiskRecord>;
    async fn create_boot_config(&self, req: CreateBootConfig) -> Result<BootConfigRecord>;
    async fn boot_server(&self, req: BootServer) -> Result<JobRecord>;

    // Read-only catalogs
    async fn plans(&self) -> Result<Vec<PlanRecord>>;
    async fn regions(&self) -> Result<Vec<RegionRecord>>;
    async fn images(&self) -> Result<Vec<ImageRecord>>;
}

/// Select the address exposed to callers: the first one flagged public.
pub fn first_public_address(addresses: &[AddressRecord]) -> Option<String> {
    addresses
        .iter()
        .find(|a| a.public)
        .map(|a| a.address.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_public_skips_private_addresses() {
        let addresses = vec![
            AddressRecord {
                address: "10.0.0.5".into(),
                public: false,
            },
            AddressRecord {
                address: "198.51.100.7".into(),
                public: true,
            },
            AddressRecord {
                address: "198.51.100.8".into(),
                public: true,
            },
        ];
        assert_eq!(
            first_public_address(&addresses).as_deref(),
            Some("198.51.100.7")
        );
        assert_eq!(first_public_address(&addresses[..1]), None);
        assert_eq!(first_public_address(&[]), None);
    }
}
