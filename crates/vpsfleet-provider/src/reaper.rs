//! Batch release and age-based sweeps
//!
//! Deletion is inherently non-reversible, so both entry points are
//! best-effort sweeps: every member is deleted independently and the report
//! aggregates per-server outcomes instead of escalating partial failures.

use crate::api::{DeleteServer, VendorApi};
use crate::error::{Error, Result};
use crate::fanout::join_settled;
use crate::inventory::Inventory;
use crate::provision::Server;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};
use vpsfleet_common::BatchId;

/// Outcome of one server deletion.
#[derive(Debug, Clone, Serialize)]
pub struct ReleasedServer {
    pub id: String,
    pub batch_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate report of a release sweep.
#[derive(Debug, Serialize)]
pub struct ReleaseReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    pub errors: usize,
    pub servers: Vec<ReleasedServer>,
}

/// Deletes batches, by id or by age.
pub struct Reaper<'a> {
    api: &'a dyn VendorApi,
}

impl<'a> Reaper<'a> {
    pub fn new(api: &'a dyn VendorApi) -> Self {
        Self { api }
    }

    /// Release every member of the named batch.
    ///
    /// The id must be well-formed; membership is then pre-validated by the
    /// inventory, so deletions bypass vendor-side safety checks.
    pub async fn release(&self, batch_id: &str) -> Result<ReleaseReport> {
        let batch_id = BatchId::parse(batch_id)
            .ok_or_else(|| Error::validation(format!("invalid batch id '{batch_id}'")))?;
        info!(batch_id = %batch_id, "Releasing batch");

        let listing = Inventory::new(self.api).list(Some(&batch_id)).await?;
        let mut report = self.delete_all(listing.servers).await;
        report.batch_id = Some(batch_id.as_str().to_string());
        Ok(report)
    }

    /// Release every managed server older than `minutes`.
    pub async fn release_older_than(&self, minutes: i64) -> Result<ReleaseReport> {
        let listing = Inventory::new(self.api).list(None).await?;
        let cutoff = Utc::now() - Duration::minutes(minutes);
        let expired: Vec<Server> = listing
            .servers
            .into_iter()
            .filter(|server| server.created_at < cutoff)
            .collect();
        info!(minutes, count = expired.len(), "Releasing expired servers");
        Ok(self.delete_all(expired).await)
    }

    async fn delete_all(&self, servers: Vec<Server>) -> ReleaseReport {
        let batch_by_id: HashMap<String, String> = servers
            .iter()
            .map(|s| (s.id.clone(), s.batch_id.clone()))
            .collect();

        let settled = join_settled(
            servers
                .iter()
                .map(|server| {
                    (
                        server.id.clone(),
                        self.api.delete_server(DeleteServer {
                            server_id: server.id.clone(),
                            skip_checks: true,
                        }),
                    )
                })
                .collect(),
        )
        .await;

        let mut out = Vec::with_capacity(batch_by_id.len());
        for (id, ()) in settled.values {
            out.push(ReleasedServer {
                batch_id: batch_by_id[&id].clone(),
                id,
                success: true,
                error: None,
            });
        }
        let errors = settled.errors.len();
        for (id, error) in settled.errors {
            warn!(server_id = %id, error = ?error, "Failed to delete server");
            out.push(ReleasedServer {
                batch_id: batch_by_id[&id].clone(),
                id,
                success: false,
                error: Some(format!("{error:#}")),
            });
        }

        ReleaseReport {
            batch_id: None,
            errors,
            servers: out,
        }
    }
}
