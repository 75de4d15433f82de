//! In-memory doubles for the pipeline's seams.
//!
//! Each stub records how often it was called so tests can assert on which
//! stages ran.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use trailhead_core::{ReferenceData, TenantFeatures, TenantReferenceData};

use crate::change_gate::{EventLog, EventLogError};
use crate::graph::{FeatureGraph, GraphError};
use crate::publish::{Artifact, ArtifactStore, StoreError};
use crate::reference::{ReferenceError, ReferenceSource};

/// [`EventLog`] returning a fixed count or always failing.
#[derive(Debug, Default)]
pub struct StubEventLog {
    count: Option<i64>,
    calls: AtomicUsize,
    last: Mutex<Option<(Vec<String>, Duration)>>,
}

impl StubEventLog {
    #[must_use]
    pub fn with_count(count: i64) -> Self {
        Self {
            count: Some(count),
            ..Self::default()
        }
    }

    /// A log whose every query fails.
    #[must_use]
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Tables and window of the most recent query.
    pub fn last_request(&self) -> Option<(Vec<String>, Duration)> {
        self.last.lock().ok().and_then(|last| last.clone())
    }
}

#[async_trait]
impl EventLog for StubEventLog {
    async fn count_changes(
        &self,
        tables: &[&str],
        window: Duration,
    ) -> Result<i64, EventLogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last.lock() {
            *last = Some((tables.iter().map(|table| (*table).to_owned()).collect(), window));
        }
        self.count.ok_or(EventLogError::Query {
            source: sqlx::Error::PoolClosed,
        })
    }
}

/// [`ReferenceSource`] serving fixed data.
#[derive(Debug, Default)]
pub struct StubReferenceSource {
    shared: ReferenceData,
    tenant: TenantReferenceData,
    failing: bool,
    shared_loads: AtomicUsize,
    tenant_loads: AtomicUsize,
}

impl StubReferenceSource {
    #[must_use]
    pub fn new(shared: ReferenceData, tenant: TenantReferenceData) -> Self {
        Self {
            shared,
            tenant,
            ..Self::default()
        }
    }

    /// A source whose every load fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn shared_loads(&self) -> usize {
        self.shared_loads.load(Ordering::SeqCst)
    }

    pub fn tenant_loads(&self) -> usize {
        self.tenant_loads.load(Ordering::SeqCst)
    }

    fn check(&self, operation: &'static str) -> Result<(), ReferenceError> {
        if self.failing {
            return Err(ReferenceError::Query {
                operation,
                source: sqlx::Error::PoolClosed,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ReferenceSource for StubReferenceSource {
    async fn load_shared(&self) -> Result<ReferenceData, ReferenceError> {
        self.shared_loads.fetch_add(1, Ordering::SeqCst);
        self.check("shared reference data")?;
        Ok(self.shared.clone())
    }

    async fn load_tenant(&self, _tenant_id: i64) -> Result<TenantReferenceData, ReferenceError> {
        self.tenant_loads.fetch_add(1, Ordering::SeqCst);
        self.check("tenant reference data")?;
        Ok(self.tenant.clone())
    }
}

/// [`FeatureGraph`] serving per-tenant features from memory.
#[derive(Debug, Default)]
pub struct StubFeatureGraph {
    tenants: BTreeMap<i64, TenantFeatures>,
    failing_tenants: BTreeSet<i64>,
    failing_listing: bool,
    calls: AtomicUsize,
}

impl StubFeatureGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tenant_id` with `features`.
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: i64, features: TenantFeatures) -> Self {
        self.tenants.insert(tenant_id, features);
        self
    }

    /// Register `tenant_id` as listed but failing to fetch.
    #[must_use]
    pub fn with_failing_tenant(mut self, tenant_id: i64) -> Self {
        self.tenants.insert(tenant_id, TenantFeatures::default());
        self.failing_tenants.insert(tenant_id);
        self
    }

    /// Make tenant listing fail.
    #[must_use]
    pub fn with_failing_listing(mut self) -> Self {
        self.failing_listing = true;
        self
    }

    /// Total calls across both operations.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeatureGraph for StubFeatureGraph {
    async fn list_tenants(&self) -> Result<Vec<i64>, GraphError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_listing {
            return Err(GraphError::MissingData { query: "tenants" });
        }
        Ok(self.tenants.keys().copied().collect())
    }

    async fn fetch_features(&self, tenant_id: i64) -> Result<TenantFeatures, GraphError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_tenants.contains(&tenant_id) {
            return Err(GraphError::GraphQl {
                messages: format!("tenant {tenant_id} unavailable"),
            });
        }
        self.tenants
            .get(&tenant_id)
            .cloned()
            .ok_or(GraphError::MissingData {
                query: "tenant features",
            })
    }
}

/// [`ArtifactStore`] keeping uploads in memory.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    uploads: Mutex<Vec<Artifact>>,
    failing: bool,
}

impl MemoryArtifactStore {
    /// A store rejecting every upload.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Artefacts stored so far, in upload order.
    pub fn uploads(&self) -> Vec<Artifact> {
        self.uploads
            .lock()
            .map(|uploads| uploads.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, artifact: Artifact) -> Result<(), StoreError> {
        if self.failing {
            return Err(StoreError::Backend {
                operation: "memory put",
                message: format!("rejected {}", artifact.key),
            });
        }
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push(artifact);
        }
        Ok(())
    }
}
