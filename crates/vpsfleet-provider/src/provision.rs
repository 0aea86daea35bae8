//! Batch acquisition workflow
//!
//! Creates `count` servers as one logical batch: create, tag, wait for the
//! vendor's asynchronous jobs, attach metadata and addresses, then
//! disk/config/boot with a second job wait at the end. Any failure tears
//! down every server created in the first step, best-effort, and the
//! original error is what the caller sees.
//!
//! Per-server state flows through maps keyed by server id; nothing is ever
//! paired back together by array position.

use crate::api::{
    BootServer, CreateBootConfig, CreateDisk, CreateServer, DeleteServer, JobStatus, ServerRecord,
    UpdateServer, VendorApi, first_public_address,
};
use crate::error::{Error, Phase, Result, TaskFailure};
use crate::fanout::join_settled;
use crate::wait::poll_until;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use vpsfleet_common::{BatchId, age, credentials, name};

/// Per-acquisition parameters, already translated to vendor identifiers.
#[derive(Debug, Clone)]
pub struct ProvisionSpec {
    pub name: String,
    pub plan_id: String,
    pub region_id: String,
    pub image_id: String,
    pub kernel_id: Option<String>,
    pub ssh_public_key: Option<String>,
    /// Shared budget for both job-wait phases.
    pub timeout: Duration,
    /// Job polling cadence.
    pub interval: Duration,
}

/// One provisioned server as exposed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct Server {
    pub id: String,
    pub batch_id: String,
    /// Creation time decoded from the batch id.
    pub created_at: DateTime<Utc>,
    /// Human-readable age, computed fresh at projection time.
    pub age: String,
    /// Public address, when the vendor assigned one.
    pub ip: Option<String>,
    /// Full vendor attribute snapshot.
    pub raw_info: serde_json::Value,
}

/// A freshly acquired batch.
#[derive(Debug, Clone, Serialize)]
pub struct Batch {
    pub batch_id: String,
    pub servers: Vec<Server>,
}

/// Project a vendor record into the caller-facing server shape.
pub(crate) fn project_server(
    record: &ServerRecord,
    batch_id: &BatchId,
    ip: Option<String>,
) -> Server {
    let created_at = batch_id.created_at();
    Server {
        id: record.id.clone(),
        batch_id: batch_id.as_str().to_string(),
        created_at,
        age: age::format_age(Utc::now() - created_at),
        ip,
        raw_info: record.raw.clone(),
    }
}

/// The ordered acquisition state machine.
pub struct ProvisioningWorkflow<'a> {
    api: &'a dyn VendorApi,
    spec: ProvisionSpec,
}

impl<'a> ProvisioningWorkflow<'a> {
    pub fn new(api: &'a dyn VendorApi, spec: ProvisionSpec) -> Self {
        Self { api, spec }
    }

    /// Acquire `count` servers as one batch.
    ///
    /// Every server that reached creation is deleted again if any later step
    /// fails; rollback never masks the original error.
    pub async fn run(&self, count: usize) -> Result<Batch> {
        info!(count, name = %self.spec.name, "Acquiring server batch");

        let settled = join_settled(
            (0..count)
                .map(|slot| {
                    (
                        slot.to_string(),
                        self.api.create_server(CreateServer {
                            plan_id: self.spec.plan_id.clone(),
                            region_id: self.spec.region_id.clone(),
                        }),
                    )
                })
                .collect(),
        )
        .await;

        let created: Vec<ServerRecord> = settled.values.into_iter().map(|(_, r)| r).collect();
        let created_ids: Vec<String> = created.iter().map(|r| r.id.clone()).collect();

        if !settled.errors.is_empty() {
            let error = Error::batch(Phase::Create, settled.errors);
            warn!(%error, "Batch creation failed, rolling back");
            self.rollback(&created_ids).await;
            return Err(error);
        }

        match self.provision(created).await {
            Ok(batch) => Ok(batch),
            Err(error) => {
                warn!(%error, "Provisioning failed, rolling back created servers");
                self.rollback(&created_ids).await;
                Err(error)
            }
        }
    }

    /// Steps after creation: tag through boot, bracketed by two job waits
    /// against one shared deadline.
    async fn provision(&self, created: Vec<ServerRecord>) -> Result<Batch> {
        let batch_id = BatchId::generate();
        let deadline = Instant::now() + self.spec.timeout;
        let ids: Vec<String> = created.iter().map(|r| r.id.clone()).collect();

        info!(batch_id = %batch_id, count = ids.len(), "Tagging batch");
        let group = batch_id.full_tag();
        join_settled(
            ids.iter()
                .map(|id| {
                    (
                        id.clone(),
                        self.api.update_server(UpdateServer {
                            server_id: id.clone(),
                            label: name::unique_name(&self.spec.name, id),
                            group: group.clone(),
                        }),
                    )
                })
                .collect(),
        )
        .await
        .into_result(Phase::Tag)?;

        self.await_jobs(&ids, deadline).await?;

        // Re-list and attach each server's full attribute snapshot. A
        // created server missing from the listing is a vendor-side
        // inconsistency, not a transient condition.
        let listing = self
            .api
            .list_servers()
            .await
            .map_err(|e| Error::transport("list_servers", e))?;
        let mut by_id: HashMap<String, ServerRecord> =
            listing.into_iter().map(|r| (r.id.clone(), r)).collect();
        let mut servers: HashMap<String, ServerRecord> = HashMap::new();
        for id in &ids {
            let record = by_id.remove(id).ok_or_else(|| {
                Error::transport(
                    "list_servers",
                    anyhow::anyhow!("created server {id} missing from vendor listing"),
                )
            })?;
            servers.insert(id.clone(), record);
        }

        let addresses = join_settled(
            ids.iter()
                .map(|id| (id.clone(), self.api.list_addresses(id)))
                .collect(),
        )
        .await
        .into_result(Phase::Addresses)?;
        let public_ips: HashMap<String, Option<String>> = addresses
            .into_iter()
            .map(|(id, addrs)| (id, first_public_address(&addrs)))
            .collect();

        info!(batch_id = %batch_id, "Creating disks");
        let disks = join_settled(
            ids.iter()
                .map(|id| {
                    (
                        id.clone(),
                        self.api.create_disk(CreateDisk {
                            server_id: id.clone(),
                            image_id: self.spec.image_id.clone(),
                            size_mb: servers[id].total_disk_mb,
                            label: "main".to_string(),
                            root_password: credentials::generate_root_password(),
                            root_ssh_key: self.spec.ssh_public_key.clone(),
                        }),
                    )
                })
                .collect(),
        )
        .await
        .into_result(Phase::Disks)?;
        let disk_by_server: HashMap<String, _> = disks.into_iter().collect();

        info!(batch_id = %batch_id, "Creating boot configurations");
        let configs = join_settled(
            ids.iter()
                .map(|id| {
                    (
                        id.clone(),
                        self.api.create_boot_config(CreateBootConfig {
                            server_id: id.clone(),
                            disk_id: disk_by_server[id].id.clone(),
                            label: group.clone(),
                            kernel_id: self.spec.kernel_id.clone(),
                        }),
                    )
                })
                .collect(),
        )
        .await
        .into_result(Phase::Configs)?;
        let config_by_server: HashMap<String, _> = configs.into_iter().collect();

        info!(batch_id = %batch_id, "Booting batch");
        join_settled(
            ids.iter()
                .map(|id| {
                    (
                        id.clone(),
                        self.api.boot_server(BootServer {
                            server_id: id.clone(),
                            config_id: config_by_server[id].id.clone(),
                        }),
                    )
                })
                .collect(),
        )
        .await
        .into_result(Phase::Boot)?;

        self.await_jobs(&ids, deadline).await?;

        info!(batch_id = %batch_id, "Batch ready");
        let servers = ids
            .iter()
            .map(|id| {
                project_server(
                    &servers[id],
                    &batch_id,
                    public_ips.get(id).cloned().flatten(),
                )
            })
            .collect();
        Ok(Batch {
            batch_id: batch_id.as_str().to_string(),
            servers,
        })
    }

    /// Poll every server's job queue until no job is pending, then surface
    /// any job that reported failure as a fatal batch error.
    ///
    /// A round that fails to list jobs resolves nothing and is retried on
    /// the next tick; only the shared deadline bounds it.
    async fn await_jobs(&self, ids: &[String], deadline: Instant) -> Result<()> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let api = self.api;
        let failures = poll_until(
            "vendor jobs to finish",
            remaining,
            self.spec.interval,
            || async move {
                let settled = join_settled(
                    ids.iter()
                        .map(|id| (id.clone(), api.list_jobs(id)))
                        .collect(),
                )
                .await;
                if !settled.errors.is_empty() {
                    for (id, error) in &settled.errors {
                        debug!(server_id = %id, error = ?error, "Job listing failed, will retry");
                    }
                    return None;
                }

                let mut pending = 0usize;
                let mut failed: Vec<TaskFailure> = Vec::new();
                for (id, jobs) in &settled.values {
                    for job in jobs {
                        match job.status {
                            JobStatus::Pending => pending += 1,
                            JobStatus::Failure => failed.push(TaskFailure {
                                key: id.clone(),
                                error: format!("job '{}' ({}) failed", job.label, job.id),
                            }),
                            JobStatus::Success => {}
                        }
                    }
                }
                if pending > 0 {
                    debug!(pending, "Jobs still running");
                    return None;
                }
                Some(failed)
            },
        )
        .await?;

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Batch {
                phase: Phase::AwaitJobs,
                failures,
            })
        }
    }

    /// Best-effort teardown of created servers. Deletion failures are logged
    /// and swallowed: there is no further recovery action, and the original
    /// workflow error is the one the caller needs.
    async fn rollback(&self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }
        info!(count = ids.len(), "Rolling back created servers");
        let settled = join_settled(
            ids.iter()
                .map(|id| {
                    (
                        id.clone(),
                        self.api.delete_server(DeleteServer {
                            server_id: id.clone(),
                            skip_checks: true,
                        }),
                    )
                })
                .collect(),
        )
        .await;
        for (id, error) in settled.errors {
            warn!(server_id = %id, error = ?error, "Rollback deletion failed");
        }
    }
}
