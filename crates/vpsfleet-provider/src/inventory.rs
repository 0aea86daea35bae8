//! Tag-based batch inventory
//!
//! Batch membership is never stored locally: every listing re-reads the
//! vendor's server list and reconstructs batches from group tags, so the
//! view self-heals across process restarts. Servers whose tag does not
//! parse as a batch tag are not ours and are skipped, silently.

use crate::api::{ServerRecord, VendorApi, first_public_address};
use crate::error::{Error, Phase, Result};
use crate::fanout::join_settled;
use crate::provision::{Server, project_server};
use std::collections::HashMap;
use tracing::debug;
use vpsfleet_common::BatchId;

/// Point-in-time view of managed servers.
#[derive(Debug)]
pub struct Listing {
    pub servers: Vec<Server>,
}

/// Recomputes batch membership from live vendor state.
pub struct Inventory<'a> {
    api: &'a dyn VendorApi,
}

impl<'a> Inventory<'a> {
    pub fn new(api: &'a dyn VendorApi) -> Self {
        Self { api }
    }

    /// List managed servers, optionally restricted to one batch.
    pub async fn list(&self, filter: Option<&BatchId>) -> Result<Listing> {
        let records = self
            .api
            .list_servers()
            .await
            .map_err(|e| Error::transport("list_servers", e))?;

        let mut members: Vec<(ServerRecord, BatchId)> = Vec::new();
        for record in records {
            let Some(batch_id) = BatchId::parse_full_tag(&record.group) else {
                continue;
            };
            if let Some(filter) = filter {
                if filter != &batch_id {
                    continue;
                }
            }
            members.push((record, batch_id));
        }
        debug!(count = members.len(), filter = ?filter.map(BatchId::as_str), "Listed managed servers");

        let addresses = join_settled(
            members
                .iter()
                .map(|(record, _)| (record.id.clone(), self.api.list_addresses(&record.id)))
                .collect(),
        )
        .await
        .into_result(Phase::Addresses)?;
        let ip_by_server: HashMap<String, Option<String>> = addresses
            .into_iter()
            .map(|(id, addrs)| (id, first_public_address(&addrs)))
            .collect();

        let servers = members
            .iter()
            .map(|(record, batch_id)| {
                project_server(
                    record,
                    batch_id,
                    ip_by_server.get(&record.id).cloned().flatten(),
                )
            })
            .collect();
        Ok(Listing { servers })
    }
}
