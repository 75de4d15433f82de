//! Data access, snapshot building and publishing for Trailhead.
//!
//! Responsibilities:
//! - gate scheduled rebuilds on recent changes in the event log;
//! - load reference lookups from Postgres and features from the graph API;
//! - write per-tenant SQLite snapshots and publish them compressed;
//! - orchestrate batches with a bounded worker pool.
//!
//! Boundaries:
//! - domain rules and normalization live in `trailhead-core`;
//! - SQLite and file I/O run on the blocking pool, never on async workers.
//!
//! Invariants:
//! - a snapshot is only published once it was fully written and closed;
//! - local files are removed only after a successful upload;
//! - one tenant's failure never aborts another tenant's export.

#![forbid(unsafe_code)]

pub mod change_gate;
pub mod graph;
pub mod pipeline;
pub mod postgres;
pub mod publish;
pub mod reference;
pub mod snapshot;

/// In-memory doubles for tests.
#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod test_support;

pub use change_gate::{CHANGE_WINDOW, ChangeGate, EventLog, EventLogError, PgEventLog, WATCHED_TABLES};
pub use graph::{FeatureGraph, GraphError, HttpFeatureGraph, HttpFeatureGraphConfig};
pub use pipeline::{
    BatchOutcome, ExportPipeline, PipelineConfig, PipelineError, TenantArtifact, TenantError,
    TenantOutcome,
};
pub use postgres::PostgresConfig;
pub use publish::{
    Artifact, ArtifactStore, PublishError, Publisher, S3ArtifactStore, S3StoreConfig, StoreError,
};
pub use reference::{PgReferenceSource, ReferenceError, ReferenceSource};
pub use snapshot::{SnapshotError, SnapshotSummary, build_snapshot};
