//! Public entry point
//!
//! Ties the provisioning workflow, inventory, reaper and readiness waiter to
//! one vendor backend, translating human-readable size/region/image names
//! through the vendor's read-only catalogs (fetched once, then cached).

use crate::api::{PlanRecord, VendorApi};
use crate::error::{Error, Result};
use crate::inventory::{Inventory, Listing};
use crate::probe::{PortProbe, TcpProbe};
use crate::provision::{Batch, ProvisionSpec, ProvisioningWorkflow};
use crate::readiness::{Endpoint, ReadinessReport, wait_for_port};
use crate::reaper::{Reaper, ReleaseReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::warn;
use vpsfleet_common::{BatchId, defaults};

/// Human-readable size names accepted by `acquire`, resolved against plan
/// catalog labels.
const SIZE_ALIASES: &[(&str, &str)] = &[
    ("1gb", "Standard 1024"),
    ("2gb", "Standard 2048"),
    ("4gb", "Standard 4096"),
    ("8gb", "Standard 8192"),
];

/// Shorthand image names, resolved against image catalog labels. Unknown
/// names are treated as literal catalog labels.
const IMAGE_ALIASES: &[(&str, &str)] = &[
    ("@ubuntu", "Ubuntu 16.04 LTS"),
    ("@ubuntu16", "Ubuntu 16.04 LTS"),
    ("@ubuntu14", "Ubuntu 14.04 LTS"),
    ("@debian", "Debian 8"),
    ("@debian8", "Debian 8"),
    ("@debian7", "Debian 7"),
    ("@centos", "CentOS 7"),
    ("@centos7", "CentOS 7"),
    ("@centos6", "CentOS 6.8"),
    ("@fedora", "Fedora 25"),
    ("@fedora25", "Fedora 25"),
    ("@fedora24", "Fedora 24"),
];

/// Default instance options applied when an acquisition leaves them unset.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub size: String,
    pub region: String,
    pub image: String,
    pub ssh_public_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "vps".to_string(),
            size: "1gb".to_string(),
            region: "atlanta".to_string(),
            image: "@ubuntu16".to_string(),
            ssh_public_key: None,
        }
    }
}

/// Per-acquisition overrides; unset fields fall back to [`ProviderConfig`].
#[derive(Debug, Clone, Default)]
pub struct AcquireOptions {
    pub name: Option<String>,
    pub size: Option<String>,
    pub region: Option<String>,
    pub image: Option<String>,
    pub kernel: Option<String>,
    pub ssh_public_key: Option<String>,
    pub timeout: Option<Duration>,
    pub interval: Option<Duration>,
}

/// Options for readiness waiting.
#[derive(Clone, Default)]
pub struct ReadinessOptions {
    pub timeout: Option<Duration>,
    pub interval: Option<Duration>,
    /// Port probed when waiting on a batch by id.
    pub port: Option<u16>,
    /// Probe override; direct TCP connect when unset.
    pub probe: Option<Arc<dyn PortProbe>>,
}

#[derive(Default)]
struct Catalogs {
    plans: OnceCell<Vec<PlanRecord>>,
    regions: OnceCell<Vec<crate::api::RegionRecord>>,
    images: OnceCell<Vec<crate::api::ImageRecord>>,
}

/// Provisions and decommissions server batches against one vendor backend.
pub struct ServerProvider {
    api: Arc<dyn VendorApi>,
    config: ProviderConfig,
    catalogs: Catalogs,
}

impl ServerProvider {
    pub fn new(api: Arc<dyn VendorApi>, config: ProviderConfig) -> Self {
        Self {
            api,
            config,
            catalogs: Catalogs::default(),
        }
    }

    /// Acquire `count` servers as one new batch.
    pub async fn acquire(&self, count: usize, options: AcquireOptions) -> Result<Batch> {
        let spec = self.resolve_spec(&options).await?;
        ProvisioningWorkflow::new(self.api.as_ref(), spec)
            .run(count)
            .await
    }

    /// List managed servers, optionally restricted to one batch.
    pub async fn list(&self, batch_id: Option<&str>) -> Result<Listing> {
        let filter = match batch_id {
            Some(raw) => Some(
                BatchId::parse(raw)
                    .ok_or_else(|| Error::validation(format!("invalid batch id '{raw}'")))?,
            ),
            None => None,
        };
        Inventory::new(self.api.as_ref()).list(filter.as_ref()).await
    }

    /// Release every member of the named batch.
    pub async fn release(&self, batch_id: &str) -> Result<ReleaseReport> {
        Reaper::new(self.api.as_ref()).release(batch_id).await
    }

    /// Release every managed server older than `minutes`.
    pub async fn release_older_than(&self, minutes: i64) -> Result<ReleaseReport> {
        Reaper::new(self.api.as_ref())
            .release_older_than(minutes)
            .await
    }

    /// Wait for explicit `host:port` endpoint specs to become reachable.
    pub async fn wait_for_endpoints(
        &self,
        specs: &[String],
        options: ReadinessOptions,
    ) -> Result<ReadinessReport> {
        let endpoints = specs
            .iter()
            .map(|spec| Endpoint::parse(spec))
            .collect::<Result<Vec<_>>>()?;
        self.wait(endpoints, options).await
    }

    /// Wait for every server of a batch to accept connections on one port
    /// (SSH by default).
    ///
    /// Servers the vendor never gave a public address are skipped with a
    /// warning; there is nothing to probe for them.
    pub async fn wait_for_reachable(
        &self,
        batch_id: &str,
        options: ReadinessOptions,
    ) -> Result<ReadinessReport> {
        if BatchId::parse(batch_id).is_none() {
            return Err(Error::validation(format!("invalid batch id '{batch_id}'")));
        }
        let port = options.port.unwrap_or(defaults::DEFAULT_SSH_PORT);
        let listing = self.list(Some(batch_id)).await?;

        let mut endpoints = Vec::new();
        for server in &listing.servers {
            match &server.ip {
                Some(ip) => endpoints.push(Endpoint::new(ip.clone(), port)),
                None => warn!(server_id = %server.id, "Server has no public address, skipping"),
            }
        }
        endpoints.sort_unstable_by(|a, b| (&a.host, a.port).cmp(&(&b.host, b.port)));
        endpoints.dedup();
        self.wait(endpoints, options).await
    }

    async fn wait(
        &self,
        endpoints: Vec<Endpoint>,
        options: ReadinessOptions,
    ) -> Result<ReadinessReport> {
        let timeout = options.timeout.unwrap_or(defaults::DEFAULT_READINESS_TIMEOUT);
        let interval = options
            .interval
            .unwrap_or(defaults::DEFAULT_READINESS_INTERVAL);
        let default_probe;
        let probe: &dyn PortProbe = match &options.probe {
            Some(probe) => probe.as_ref(),
            None => {
                default_probe = TcpProbe::default();
                &default_probe
            }
        };
        wait_for_port(endpoints, timeout, interval, probe).await
    }

    /// Translate human-readable options into vendor identifiers.
    async fn resolve_spec(&self, options: &AcquireOptions) -> Result<ProvisionSpec> {
        let size = options
            .size
            .as_deref()
            .unwrap_or(&self.config.size)
            .to_lowercase();
        let size_label = SIZE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == size)
            .map(|(_, label)| *label)
            .ok_or_else(|| Error::validation(format!("unsupported size '{size}'")))?;
        let plans = self
            .catalogs
            .plans
            .get_or_try_init(|| async { self.api.plans().await })
            .await
            .map_err(|e| Error::transport("plans", e))?;
        let plan_id = plans
            .iter()
            .find(|plan| plan.label == size_label)
            .map(|plan| plan.id.clone())
            .ok_or_else(|| Error::validation(format!("size '{size}' not offered by vendor")))?;

        let region = options
            .region
            .as_deref()
            .unwrap_or(&self.config.region)
            .to_lowercase();
        let regions = self
            .catalogs
            .regions
            .get_or_try_init(|| async { self.api.regions().await })
            .await
            .map_err(|e| Error::transport("regions", e))?;
        let region_id = regions
            .iter()
            .find(|r| r.label == region)
            .map(|r| r.id.clone())
            .ok_or_else(|| Error::validation(format!("unsupported region '{region}'")))?;

        let image = options.image.as_deref().unwrap_or(&self.config.image);
        let image_label = IMAGE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == image.to_lowercase())
            .map_or(image, |(_, label)| *label);
        let images = self
            .catalogs
            .images
            .get_or_try_init(|| async { self.api.images().await })
            .await
            .map_err(|e| Error::transport("images", e))?;
        let image_id = images
            .iter()
            .find(|i| i.label == image_label)
            .map(|i| i.id.clone())
            .ok_or_else(|| Error::validation(format!("unsupported image '{image}'")))?;

        Ok(ProvisionSpec {
            name: options
                .name
                .clone()
                .unwrap_or_else(|| self.config.name.clone()),
            plan_id,
            region_id,
            image_id,
            kernel_id: options.kernel.clone(),
            ssh_public_key: options
                .ssh_public_key
                .clone()
                .or_else(|| self.config.ssh_public_key.clone()),
            timeout: options
                .timeout
                .unwrap_or(defaults::DEFAULT_PROVISION_TIMEOUT),
            interval: options
                .interval
                .unwrap_or(defaults::DEFAULT_PROVISION_INTERVAL),
        })
    }
}
