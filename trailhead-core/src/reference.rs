//! Lookup data copied into every snapshot.
//!
//! [`ReferenceData`] is tenant independent and loaded once per batch;
//! [`TenantReferenceData`] is scoped to the organizations belonging to one
//! tenant.

use serde::{Deserialize, Serialize};

/// An `(id, name)` pair. Used for POI types, super-categories, articles,
/// challenges and events.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NamedEntity {
    /// Row identifier.
    pub id: i64,
    /// Display name, if set.
    pub name: Option<String>,
}

impl NamedEntity {
    /// Build a named entry.
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
        }
    }
}

/// Describes how a tag key is presented for one feature type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TagDescriptor {
    /// Descriptor identifier.
    pub id: i64,
    /// Upstream feature type label, stored verbatim.
    pub feature_type: Option<String>,
    /// Tag key the descriptor presents.
    pub key: Option<String>,
    /// Human-readable label.
    pub name: Option<String>,
    /// Name of the tag category the descriptor belongs to.
    pub category: Option<String>,
    /// Super-category the descriptor is limited to, if any.
    pub super_category_id: Option<i64>,
}

/// An organization that is a member of the tenant, with its optional logo.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Organization {
    /// Organization identifier.
    pub id: i64,
    /// Display name.
    pub name: Option<String>,
    /// Logo image row, if a logo is set.
    pub logo_image_id: Option<i64>,
    /// Stored file name of the logo.
    pub logo_file: Option<String>,
}

/// Tenant-independent lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReferenceData {
    /// Point-of-interest types.
    pub poi_types: Vec<NamedEntity>,
    /// Super-categories features can belong to.
    pub super_categories: Vec<NamedEntity>,
    /// Presentation of tag keys per feature type.
    pub tag_descriptors: Vec<TagDescriptor>,
}

/// Lookups scoped to one tenant's member organizations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TenantReferenceData {
    /// Member organizations of the tenant.
    pub organizations: Vec<Organization>,
    /// Published content bundles.
    pub articles: Vec<NamedEntity>,
    /// Challenges run by member organizations.
    pub challenges: Vec<NamedEntity>,
    /// Events that have not yet taken place.
    pub events: Vec<NamedEntity>,
}
