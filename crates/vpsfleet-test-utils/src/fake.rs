//! In-memory vendor backend
//!
//! Mirrors the behavior the orchestrator depends on: servers with mutable
//! label/group fields, disks bounded by plan capacity, boot configurations
//! validated against attached disks, and asynchronous jobs that stay pending
//! for a short real-time latency before reporting a terminal status.
//!
//! Failure injection hooks cover the paths integration tests need: boot
//! configuration rejection past a store-size threshold, vetoed deletions,
//! and boot jobs that finish as failures.

use crate::fixtures;
use crate::generators::{AddressSource, CounterIds, IdSource, PrivateRangeAddresses};
use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use vpsfleet_common::BatchId;
use vpsfleet_provider::api::{
    AddressRecord, BootConfigRecord, BootServer, CreateBootConfig, CreateDisk, CreateServer,
    DeleteServer, DiskRecord, ImageRecord, JobRecord, JobStatus, PlanRecord, RegionRecord,
    ServerRecord, UpdateServer, VendorApi,
};

#[derive(Debug, Clone)]
struct FakeDisk {
    id: String,
    size_mb: u64,
}

#[derive(Debug, Clone)]
struct FakeConfig {
    id: String,
    disk_id: String,
}

#[derive(Debug, Clone)]
struct FakeJob {
    id: String,
    label: String,
    succeeds: bool,
    finishes_at: Instant,
}

impl FakeJob {
    fn status(&self) -> JobStatus {
        if Instant::now() < self.finishes_at {
            JobStatus::Pending
        } else if self.succeeds {
            JobStatus::Success
        } else {
            JobStatus::Failure
        }
    }
}

#[derive(Debug, Clone)]
struct FakeServer {
    id: String,
    label: String,
    group: String,
    plan_id: String,
    region_id: String,
    total_disk_mb: u64,
    addresses: Vec<String>,
    disks: Vec<FakeDisk>,
    configs: Vec<FakeConfig>,
    jobs: Vec<FakeJob>,
    reject_boot_config: bool,
}

impl FakeServer {
    fn used_disk_mb(&self) -> u64 {
        self.disks.iter().map(|d| d.size_mb).sum()
    }

    fn record(&self) -> ServerRecord {
        ServerRecord {
            id: self.id.clone(),
            label: self.label.clone(),
            group: self.group.clone(),
            total_disk_mb: self.total_disk_mb,
            raw: json!({
                "id": self.id,
                "label": self.label,
                "group": self.group,
                "plan_id": self.plan_id,
                "region_id": self.region_id,
                "total_disk_mb": self.total_disk_mb,
                "disks": self.disks.len(),
                "configs": self.configs.len(),
            }),
        }
    }
}

#[derive(Default)]
struct Store {
    servers: BTreeMap<String, FakeServer>,
    /// New servers reject boot configs once the store reaches this size.
    config_reject_threshold: Option<usize>,
    /// Servers whose deletion fails.
    vetoed_deletes: HashSet<String>,
    /// The next boot job created finishes as a failure.
    fail_next_boot_job: bool,
}

/// In-memory [`VendorApi`] implementation.
pub struct FakeVendor {
    store: Mutex<Store>,
    ids: Box<dyn IdSource>,
    addresses: Box<dyn AddressSource>,
    op_latency: Duration,
    job_latency: Duration,
}

impl Default for FakeVendor {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeVendor {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store::default()),
            ids: Box::new(CounterIds::default()),
            addresses: Box::new(PrivateRangeAddresses::default()),
            op_latency: Duration::from_millis(2),
            job_latency: Duration::from_millis(30),
        }
    }

    /// Substitute the id/address generation strategies.
    pub fn with_sources(
        ids: Box<dyn IdSource>,
        addresses: Box<dyn AddressSource>,
    ) -> Self {
        Self {
            ids,
            addresses,
            ..Self::new()
        }
    }

    /// How long each asynchronous job stays pending.
    pub fn with_job_latency(mut self, latency: Duration) -> Self {
        self.job_latency = latency;
        self
    }

    /// Number of servers currently in the store.
    pub fn server_count(&self) -> usize {
        self.lock().servers.len()
    }

    /// Servers whose creation brings the store to `threshold` or more
    /// reject boot configuration creation.
    pub fn reject_boot_configs_when_store_reaches(&self, threshold: usize) {
        self.lock().config_reject_threshold = Some(threshold);
    }

    /// Make deletion of one server fail.
    pub fn veto_delete(&self, server_id: &str) {
        self.lock().vetoed_deletes.insert(server_id.to_string());
    }

    /// Make the next boot job finish as a failure.
    pub fn fail_next_boot_job(&self) {
        self.lock().fail_next_boot_job = true;
    }

    /// Rewrite the timestamp embedded in a batch's group tags, returning the
    /// rewritten id. Simulates batch age for sweep tests.
    pub fn rewrite_batch_timestamp(&self, batch_id: &str, timestamp_ms: i64) -> Option<String> {
        let old = BatchId::parse(batch_id)?;
        let new = old.with_timestamp(timestamp_ms);
        let mut store = self.lock();
        for server in store.servers.values_mut() {
            if BatchId::parse_full_tag(&server.group).as_ref() == Some(&old) {
                server.group = new.full_tag();
            }
        }
        Some(new.as_str().to_string())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn latency(&self) {
        tokio::time::sleep(self.op_latency).await;
    }
}

#[async_trait]
impl VendorApi for FakeVendor {
    async fn create_server(&self, req: CreateServer) -> Result<ServerRecord> {
        self.latency().await;
        let plan = fixtures::plans()
            .into_iter()
            .find(|p| p.id == req.plan_id);
        let Some(plan) = plan else {
            bail!("invalid plan '{}'", req.plan_id);
        };
        if !fixtures::regions().iter().any(|r| r.id == req.region_id) {
            bail!("invalid region '{}'", req.region_id);
        }

        let mut store = self.lock();
        let id = self.ids.next_id();
        let reject_boot_config = store
            .config_reject_threshold
            .is_some_and(|threshold| store.servers.len() + 1 >= threshold);
        let server = FakeServer {
            id: id.clone(),
            label: format!("server{id}"),
            group: String::new(),
            plan_id: req.plan_id,
            region_id: req.region_id,
            total_disk_mb: plan.disk_mb,
            addresses: vec![self.addresses.next_address()],
            disks: Vec::new(),
            configs: Vec::new(),
            jobs: vec![FakeJob {
                id: self.ids.next_id(),
                label: "Initial Configuration".to_string(),
                succeeds: true,
                finishes_at: Instant::now() + self.job_latency,
            }],
            reject_boot_config,
        };
        let record = server.record();
        store.servers.insert(id, server);
        Ok(record)
    }

    async fn update_server(&self, req: UpdateServer) -> Result<()> {
        self.latency().await;
        let mut store = self.lock();
        let Some(server) = store.servers.get_mut(&req.server_id) else {
            bail!("unknown server '{}'", req.server_id);
        };
        server.label = req.label;
        server.group = req.group;
        Ok(())
    }

    async fn delete_server(&self, req: DeleteServer) -> Result<()> {
        self.latency().await;
        let mut store = self.lock();
        if store.vetoed_deletes.contains(&req.server_id) {
            bail!("deletion vetoed for server '{}'", req.server_id);
        }
        let Some(server) = store.servers.get(&req.server_id) else {
            bail!("unknown server '{}'", req.server_id);
        };
        if !req.skip_checks && !server.disks.is_empty() {
            bail!("cannot delete server '{}' with attached disks", req.server_id);
        }
        store.servers.remove(&req.server_id);
        Ok(())
    }

    async fn list_servers(&self) -> Result<Vec<ServerRecord>> {
        self.latency().await;
        Ok(self.lock().servers.values().map(FakeServer::record).collect())
    }

    async fn list_addresses(&self, server_id: &str) -> Result<Vec<AddressRecord>> {
        self.latency().await;
        let store = self.lock();
        let Some(server) = store.servers.get(server_id) else {
            bail!("unknown server '{server_id}'");
        };
        Ok(server
            .addresses
            .iter()
            .map(|address| AddressRecord {
                address: address.clone(),
                public: true,
            })
            .collect())
    }

    async fn list_jobs(&self, server_id: &str) -> Result<Vec<JobRecord>> {
        self.latency().await;
        let store = self.lock();
        let Some(server) = store.servers.get(server_id) else {
            bail!("unknown server '{server_id}'");
        };
        Ok(server
            .jobs
            .iter()
            .map(|job| JobRecord {
                id: job.id.clone(),
                label: job.label.clone(),
                status: job.status(),
            })
            .collect())
    }

    async fn create_disk(&self, req: CreateDisk) -> Result<DiskRecord> {
        self.latency().await;
        if !fixtures::images().iter().any(|i| i.id == req.image_id) {
            bail!("invalid image '{}'", req.image_id);
        }
        if req.root_password.is_empty() {
            bail!("missing root password");
        }
        let mut store = self.lock();
        let Some(server) = store.servers.get_mut(&req.server_id) else {
            bail!("unknown server '{}'", req.server_id);
        };
        if server.used_disk_mb() + req.size_mb > server.total_disk_mb {
            bail!(
                "disk too large for server '{}': {} + {} > {}",
                req.server_id,
                server.used_disk_mb(),
                req.size_mb,
                server.total_disk_mb
            );
        }
        let disk_id = self.ids.next_id();
        server.disks.push(FakeDisk {
            id: disk_id.clone(),
            size_mb: req.size_mb,
        });
        server.jobs.push(FakeJob {
            id: self.ids.next_id(),
            label: "Disk Create From Image".to_string(),
            succeeds: true,
            finishes_at: Instant::now() + self.job_latency,
        });
        Ok(DiskRecord {
            id: disk_id,
            server_id: req.server_id,
        })
    }

    async fn create_boot_config(&self, req: CreateBootConfig) -> Result<BootConfigRecord> {
        self.latency().await;
        let mut store = self.lock();
        let Some(server) = store.servers.get_mut(&req.server_id) else {
            bail!("unknown server '{}'", req.server_id);
        };
        if server.reject_boot_config {
            bail!(
                "boot configuration creation rejected for server '{}'",
                req.server_id
            );
        }
        if !server.disks.iter().any(|d| d.id == req.disk_id) {
            bail!(
                "disk '{}' does not belong to server '{}'",
                req.disk_id,
                req.server_id
            );
        }
        if req.label.is_empty() {
            bail!("missing boot config label");
        }
        let config_id = self.ids.next_id();
        server.configs.push(FakeConfig {
            id: config_id.clone(),
            disk_id: req.disk_id,
        });
        Ok(BootConfigRecord {
            id: config_id,
            server_id: req.server_id,
        })
    }

    async fn boot_server(&self, req: BootServer) -> Result<JobRecord> {
        self.latency().await;
        let mut store = self.lock();
        let succeeds = !std::mem::take(&mut store.fail_next_boot_job);
        let Some(server) = store.servers.get_mut(&req.server_id) else {
            bail!("unknown server '{}'", req.server_id);
        };
        if !server.configs.iter().any(|c| c.id == req.config_id) {
            bail!(
                "config '{}' does not belong to server '{}'",
                req.config_id,
                req.server_id
            );
        }
        let job = FakeJob {
            id: self.ids.next_id(),
            label: "System Boot".to_string(),
            succeeds,
            finishes_at: Instant::now() + self.job_latency,
        };
        let record = JobRecord {
            id: job.id.clone(),
            label: job.label.clone(),
            status: JobStatus::Pending,
        };
        server.jobs.push(job);
        Ok(record)
    }

    async fn plans(&self) -> Result<Vec<PlanRecord>> {
        self.latency().await;
        Ok(fixtures::plans())
    }

    async fn regions(&self) -> Result<Vec<RegionRecord>> {
        self.latency().await;
        Ok(fixtures::regions())
    }

    async fn images(&self) -> Result<Vec<ImageRecord>> {
        self.latency().await;
        Ok(fixtures::images())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::PrivateRangeAddresses;

    #[tokio::test]
    async fn injected_sources_drive_ids_and_addresses() {
        let vendor = FakeVendor::with_sources(
            Box::new(CounterIds::starting_at(500)),
            Box::new(PrivateRangeAddresses::default()),
        );
        let record = vendor
            .create_server(CreateServer {
                plan_id: "plan-1".to_string(),
                region_id: "region-4".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(record.id, "500");

        let addresses = vendor.list_addresses("500").await.unwrap();
        assert_eq!(addresses[0].address, "192.168.0.1");
        assert!(addresses[0].public);
    }

    #[tokio::test]
    async fn jobs_stay_pending_until_their_latency_passes() {
        let vendor = FakeVendor::new().with_job_latency(Duration::from_millis(40));
        let record = vendor
            .create_server(CreateServer {
                plan_id: "plan-1".to_string(),
                region_id: "region-4".to_string(),
            })
            .await
            .unwrap();

        let jobs = vendor.list_jobs(&record.id).await.unwrap();
        assert_eq!(jobs[0].status, JobStatus::Pending);

        tokio::time::sleep(Duration::from_millis(60)).await;
        let jobs = vendor.list_jobs(&record.id).await.unwrap();
        assert_eq!(jobs[0].status, JobStatus::Success);
    }

    #[tokio::test]
    async fn unchecked_delete_is_blocked_by_attached_disks() {
        let vendor = FakeVendor::new();
        let record = vendor
            .create_server(CreateServer {
                plan_id: "plan-1".to_string(),
                region_id: "region-4".to_string(),
            })
            .await
            .unwrap();
        vendor
            .create_disk(CreateDisk {
                server_id: record.id.clone(),
                image_id: "image-146".to_string(),
                size_mb: 1024,
                label: "main".to_string(),
                root_password: "hunter2hunter2".to_string(),
                root_ssh_key: None,
            })
            .await
            .unwrap();

        let checked = vendor
            .delete_server(DeleteServer {
                server_id: record.id.clone(),
                skip_checks: false,
            })
            .await;
        assert!(checked.is_err());

        vendor
            .delete_server(DeleteServer {
                server_id: record.id.clone(),
                skip_checks: true,
            })
            .await
            .unwrap();
        assert_eq!(vendor.server_count(), 0);
    }
}
