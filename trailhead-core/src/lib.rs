//! Core domain types for the Trailhead snapshot exporter.
//!
//! Responsibilities:
//! - model the four feature kinds and their publication state;
//! - decode feature nodes as delivered by the tenant feature graph;
//! - normalize nodes into fixed-order snapshot rows and association groups;
//! - assemble a deduplicated, self-consistent [`TenantDataset`].
//!
//! Boundaries:
//! - no I/O happens here; fetching, persistence and publishing live in
//!   `trailhead-data`.
//!
//! Invariants:
//! - coordinates are rounded to six decimal places;
//! - absent or degenerate extents produce a zero bounding box;
//! - visibility always resolves to a known code.

#![forbid(unsafe_code)]

pub mod dataset;
pub mod geometry;
pub mod kind;
pub mod normalize;
pub mod reference;
pub mod source;
#[cfg(feature = "store-sqlite")]
mod sql;
pub mod visibility;

#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod test_support;

pub use dataset::TenantDataset;
pub use geometry::{BoundingBox, Coordinates, Geometry};
pub use kind::{FeatureKind, UnknownFeatureKind};
pub use normalize::{
    Associations, ColumnValue, FeatureRow, NormalizedFeature, OutingAreaLink, StewardshipLink,
    SuperCategoryLink, TagLink,
};
pub use reference::{NamedEntity, Organization, ReferenceData, TagDescriptor, TenantReferenceData};
pub use source::{
    AreaSize, AreaSource, ClosedStatus, FeatureNode, GeometryField, ImageAttachment, ImageRef,
    OrganizationNode, OutingAreaRef, OutingRoute, OutingSource, PointOfInterestSource,
    StewardshipRef, SuperCategoryRef, TagRef, TenantFeatures, TrailSource,
};
pub use visibility::Visibility;

/// Version of the snapshot schema.
///
/// Recorded in each snapshot's `metadata` table and in the storage key of
/// the published artefact. Any change to table or column layout bumps it.
pub const SCHEMA_VERSION: &str = "1.0.3";
