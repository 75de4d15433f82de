//! Facade crate for the Trailhead snapshot exporter.
//!
//! This crate re-exports the core domain types and, behind the `pipeline`
//! feature, the adapters and orchestrator that build and publish per-tenant
//! snapshots.

#![forbid(unsafe_code)]

pub use trailhead_core::{
    BoundingBox, ColumnValue, FeatureKind, FeatureNode, FeatureRow, NamedEntity, Organization,
    ReferenceData, SCHEMA_VERSION, TagDescriptor, TenantDataset, TenantFeatures,
    TenantReferenceData, Visibility,
};

#[cfg(feature = "pipeline")]
pub use trailhead_data::{
    ArtifactStore, BatchOutcome, ChangeGate, EventLog, ExportPipeline, FeatureGraph,
    PipelineConfig, PipelineError, ReferenceSource, TenantArtifact, TenantError, TenantOutcome,
    build_snapshot,
};
