//! Batch orchestration of per-tenant exports.
//!
//! A batch consults the [`ChangeGate`], lists tenants, loads the shared
//! reference data once and then runs one export per tenant through a bounded
//! worker pool. Each tenant's stages run strictly in order:
//!
//! 1. load tenant-scoped reference data;
//! 2. fetch the tenant's features from the graph;
//! 3. normalize and build the snapshot file (blocking pool);
//! 4. compress, upload and clean up.
//!
//! A failing or panicking tenant only fails its own outcome.

use std::sync::Arc;

use camino::Utf8PathBuf;
use log::{info, warn};
use thiserror::Error;
use tokio::sync::{AcquireError, Semaphore};
use tokio::task::JoinError;
use trailhead_core::{ReferenceData, TenantDataset};

use crate::change_gate::ChangeGate;
use crate::graph::{FeatureGraph, GraphError};
use crate::publish::{ArtifactStore, PublishError, Publisher, snapshot_file_name};
use crate::reference::{ReferenceError, ReferenceSource};
use crate::snapshot::{SnapshotError, SnapshotSummary, build_snapshot};

/// Default directory for transient snapshot files.
pub const DEFAULT_WORK_DIR: &str = "/tmp/exports/sqlite";

/// Default number of tenants exported at once.
pub const DEFAULT_MAX_CONCURRENT_TENANTS: usize = 4;

/// Tuning for [`ExportPipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Directory holding snapshot files until they are published.
    pub work_dir: Utf8PathBuf,
    /// Upper bound on tenants processed concurrently.
    pub max_concurrent_tenants: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: Utf8PathBuf::from(DEFAULT_WORK_DIR),
            max_concurrent_tenants: DEFAULT_MAX_CONCURRENT_TENANTS,
        }
    }
}

impl PipelineConfig {
    /// Set the work directory.
    #[must_use]
    pub fn with_work_dir(mut self, work_dir: impl Into<Utf8PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    /// Set the worker pool size. Zero is treated as one.
    #[must_use]
    pub fn with_max_concurrent_tenants(mut self, max: usize) -> Self {
        self.max_concurrent_tenants = max.max(1);
        self
    }

    /// Local snapshot path for `tenant_id`.
    #[must_use]
    pub fn snapshot_path(&self, tenant_id: i64) -> Utf8PathBuf {
        self.work_dir.join(snapshot_file_name(tenant_id))
    }
}

/// Errors that fail one tenant's export.
#[derive(Debug, Error)]
pub enum TenantError {
    /// Shared or tenant-scoped lookups could not be read.
    #[error("failed to load reference data")]
    Reference(#[from] ReferenceError),
    /// The feature graph rejected or failed the tenant query.
    #[error("failed to fetch features")]
    Graph(#[from] GraphError),
    /// Writing the SQLite file failed; nothing was published.
    #[error("failed to build snapshot")]
    Snapshot(#[from] SnapshotError),
    /// Compression or upload failed; local files are kept.
    #[error("failed to publish snapshot")]
    Publish(#[from] PublishError),
    /// The spawned export or blocking build panicked or was cancelled.
    #[error("export task aborted")]
    Task(#[from] JoinError),
    /// The worker semaphore closed before a permit was granted.
    #[error("worker pool closed")]
    PoolClosed(#[from] AcquireError),
}

/// Errors that fail a whole batch.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The graph could not enumerate tenants.
    #[error("failed to list tenants")]
    ListTenants(#[source] GraphError),
    /// Lookups shared by every tenant could not be read.
    #[error("failed to load shared reference data")]
    Reference(#[source] ReferenceError),
}

/// A tenant snapshot that reached durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantArtifact {
    /// Tenant the snapshot belongs to.
    pub tenant_id: i64,
    /// Storage key of the compressed snapshot.
    pub key: String,
    /// Row counts written to the snapshot.
    pub summary: SnapshotSummary,
    /// Size of the uploaded gzip body.
    pub compressed_bytes: usize,
}

/// Outcome of one tenant within a batch.
#[derive(Debug)]
pub struct TenantOutcome {
    /// Tenant this outcome reports on.
    pub tenant_id: i64,
    /// Published artefact, or the error that stopped the export.
    pub result: Result<TenantArtifact, TenantError>,
}

/// Result of [`ExportPipeline::build_all`].
#[derive(Debug)]
pub enum BatchOutcome {
    /// The change gate found nothing to rebuild.
    Skipped,
    /// One outcome per tenant, in tenant-list order.
    Built(Vec<TenantOutcome>),
}

impl BatchOutcome {
    /// Number of failed tenants; zero when skipped.
    #[must_use]
    pub fn failures(&self) -> usize {
        match self {
            Self::Skipped => 0,
            Self::Built(outcomes) => outcomes
                .iter()
                .filter(|outcome| outcome.result.is_err())
                .count(),
        }
    }
}

/// Wires the gate, sources, graph and store into the export flow.
#[derive(Clone)]
pub struct ExportPipeline {
    gate: ChangeGate,
    references: Arc<dyn ReferenceSource>,
    graph: Arc<dyn FeatureGraph>,
    publisher: Publisher,
    config: PipelineConfig,
}

impl std::fmt::Debug for ExportPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportPipeline")
            .field("gate", &self.gate)
            .field("references", &"<dyn ReferenceSource>")
            .field("graph", &"<dyn FeatureGraph>")
            .field("publisher", &self.publisher)
            .field("config", &self.config)
            .finish()
    }
}

impl ExportPipeline {
    /// Assemble a pipeline publishing through `store`.
    #[must_use]
    pub fn new(
        gate: ChangeGate,
        references: Arc<dyn ReferenceSource>,
        graph: Arc<dyn FeatureGraph>,
        store: Arc<dyn ArtifactStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            gate,
            references,
            graph,
            publisher: Publisher::new(store),
            config,
        }
    }

    /// Ask the change gate whether a rebuild is due.
    pub async fn check(&self, force: bool) -> bool {
        self.gate.should_rebuild(force).await
    }

    /// Export one tenant end to end.
    ///
    /// `shared` is loaded on demand when the caller has not already done so.
    ///
    /// # Errors
    ///
    /// Returns the first [`TenantError`] raised by any stage. A snapshot
    /// that failed to build is never published.
    pub async fn build_tenant(
        &self,
        tenant_id: i64,
        shared: Option<Arc<ReferenceData>>,
    ) -> Result<TenantArtifact, TenantError> {
        let shared = match shared {
            Some(shared) => shared,
            None => Arc::new(self.references.load_shared().await?),
        };

        info!("{tenant_id}: loading tenant reference data");
        let tenant = self.references.load_tenant(tenant_id).await?;

        info!("{tenant_id}: fetching features");
        let features = self.graph.fetch_features(tenant_id).await?;

        let path = self.config.snapshot_path(tenant_id);
        info!("{tenant_id}: building snapshot at {path}");
        let summary = {
            let path = path.clone();
            tokio::task::spawn_blocking(move || {
                let dataset = TenantDataset::from(features);
                build_snapshot(&path, &shared, &tenant, &dataset)
            })
            .await??
        };
        info!(
            "{tenant_id}: snapshot holds {} features and {} associations",
            summary.features, summary.associations
        );

        let published = self.publisher.publish(tenant_id, &path).await?;
        Ok(TenantArtifact {
            tenant_id,
            key: published.key,
            summary,
            compressed_bytes: published.compressed_bytes,
        })
    }

    /// Run a full batch.
    ///
    /// Returns [`BatchOutcome::Skipped`] without contacting the graph when
    /// the gate declines. Otherwise every listed tenant gets an outcome.
    ///
    /// # Errors
    ///
    /// Fails only when the tenant list or the shared reference data cannot
    /// be loaded.
    pub async fn build_all(&self, force: bool) -> Result<BatchOutcome, PipelineError> {
        if !self.gate.should_rebuild(force).await {
            return Ok(BatchOutcome::Skipped);
        }

        let tenants = self
            .graph
            .list_tenants()
            .await
            .map_err(PipelineError::ListTenants)?;
        let shared = Arc::new(
            self.references
                .load_shared()
                .await
                .map_err(PipelineError::Reference)?,
        );
        info!(
            "exporting {} tenants, {} at a time",
            tenants.len(),
            self.config.max_concurrent_tenants
        );

        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_tenants.max(1)));
        let handles: Vec<_> = tenants
            .iter()
            .map(|&tenant_id| {
                let pipeline = self.clone();
                let shared = Arc::clone(&shared);
                let permits = Arc::clone(&permits);
                tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await?;
                    pipeline.build_tenant(tenant_id, Some(shared)).await
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (tenant_id, handle) in tenants.into_iter().zip(handles) {
            let result = handle.await.unwrap_or_else(|err| Err(TenantError::Task(err)));
            match &result {
                Ok(artifact) => info!("{tenant_id}: published {}", artifact.key),
                Err(err) => warn!("{tenant_id}: export failed: {}", error_chain(err)),
            }
            outcomes.push(TenantOutcome { tenant_id, result });
        }
        Ok(BatchOutcome::Built(outcomes))
    }

    /// Local snapshot path the pipeline uses for `tenant_id`.
    #[must_use]
    pub fn snapshot_path(&self, tenant_id: i64) -> Utf8PathBuf {
        self.config.snapshot_path(tenant_id)
    }
}

/// Render an error with its source chain on one line.
#[must_use]
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
