//! Feature nodes as returned by the tenant feature graph.
//!
//! Each node pairs the owning organization with the nested feature record.
//! Collections default to empty so an omitted list and an empty list decode
//! the same way.

use serde::{Deserialize, Serialize};

use crate::geometry::Geometry;

/// A feature reached through one of the tenant's organizations.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrganizationNode<T> {
    /// Organization through which the tenant owns the feature.
    #[serde(default)]
    pub organization_id: Option<i64>,
    /// The nested feature record.
    pub feature: T,
}

/// Image reference carried by an attachment or a featured image.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImageRef {
    /// Image identifier.
    pub id: i64,
    /// Stored file name.
    #[serde(default)]
    pub uploaded_file: Option<String>,
}

/// First-by-position image attachment of a feature.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImageAttachment {
    /// Attached image, absent if the image row was removed.
    #[serde(default)]
    pub image: Option<ImageRef>,
}

/// Closure notice attached to a feature.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClosedStatus {
    /// Free-text closure status.
    #[serde(default)]
    pub status: Option<String>,
}

/// Wrapper around a geometry column exposed as an object relationship.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeometryField {
    /// The geometry itself.
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

/// Reference to a super-category by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SuperCategoryRef {
    /// Super-category identifier.
    pub id: i64,
}

/// Stewardship of a feature by an organization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StewardshipRef {
    /// Role the organization plays.
    #[serde(default)]
    pub role: Option<String>,
    /// Stewarding organization.
    pub organization_id: i64,
}

/// A tag applied to a feature.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TagRef {
    /// Tag key.
    pub key: String,
}

/// Area size.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct AreaSize {
    /// Size in square metres.
    #[serde(default)]
    pub meters: Option<f64>,
}

/// Route attached to an outing.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct OutingRoute {
    /// Route length in metres.
    #[serde(default)]
    pub length_meters: Option<f64>,
}

/// Link between an outing and an area it visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutingAreaRef {
    /// Linked outing.
    pub outing_id: i64,
    /// Linked area.
    pub area_id: i64,
}

/// Area record.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AreaSource {
    /// Feature identifier, unique within its kind.
    pub id: i64,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Closure notice, if the feature is closed.
    #[serde(default)]
    pub closed: Option<ClosedStatus>,
    /// Image attachments; only the first is exported.
    #[serde(default)]
    pub image_attachments: Vec<ImageAttachment>,
    /// Representative point of the area.
    #[serde(default)]
    pub centroid: Option<GeometryField>,
    /// Boundary used for the bounding box.
    #[serde(default)]
    pub extent: Option<GeometryField>,
    /// Super-categories the feature belongs to.
    #[serde(default)]
    pub super_categories: Vec<SuperCategoryRef>,
    /// Visibility label; unknown labels export as draft.
    #[serde(default)]
    pub visibility: Option<String>,
    /// Organizations stewarding the feature.
    #[serde(default)]
    pub stewardships: Vec<StewardshipRef>,
    /// Area size.
    #[serde(default)]
    pub size: Option<AreaSize>,
    /// Tags applied to the feature.
    #[serde(default)]
    pub tags: Vec<TagRef>,
}

/// Trail record. The extent is a bare geometry column.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TrailSource {
    /// Feature identifier, unique within its kind.
    pub id: i64,
    /// Parent area, if any.
    #[serde(default)]
    pub area_id: Option<i64>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Closure notice, if the feature is closed.
    #[serde(default)]
    pub closed: Option<ClosedStatus>,
    /// Image attachments; only the first is exported.
    #[serde(default)]
    pub image_attachments: Vec<ImageAttachment>,
    /// Trailhead location.
    #[serde(default)]
    pub start: Option<GeometryField>,
    /// Trail line used for the bounding box.
    #[serde(default)]
    pub extent: Option<Geometry>,
    /// Super-categories the feature belongs to.
    #[serde(default)]
    pub super_categories: Vec<SuperCategoryRef>,
    /// Visibility label; unknown labels export as draft.
    #[serde(default)]
    pub visibility: Option<String>,
    /// Organizations stewarding the feature.
    #[serde(default)]
    pub stewardships: Vec<StewardshipRef>,
    /// Stored trail length in metres.
    #[serde(default)]
    pub cached_length: Option<f64>,
    /// Tags applied to the feature.
    #[serde(default)]
    pub tags: Vec<TagRef>,
}

/// Point-of-interest record.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PointOfInterestSource {
    /// Feature identifier, unique within its kind.
    pub id: i64,
    /// Parent area, if any.
    #[serde(default)]
    pub area_id: Option<i64>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Closure notice, if the feature is closed.
    #[serde(default)]
    pub closed: Option<ClosedStatus>,
    /// Image attachments; only the first is exported.
    #[serde(default)]
    pub image_attachments: Vec<ImageAttachment>,
    /// Point location.
    #[serde(default)]
    pub location: Option<GeometryField>,
    /// Point-of-interest type.
    #[serde(default)]
    pub point_of_interest_type_id: Option<i64>,
    /// Super-categories the feature belongs to.
    #[serde(default)]
    pub super_categories: Vec<SuperCategoryRef>,
    /// Visibility label; unknown labels export as draft.
    #[serde(default)]
    pub visibility: Option<String>,
    /// Organizations stewarding the feature.
    #[serde(default)]
    pub stewardships: Vec<StewardshipRef>,
    /// Tags applied to the feature.
    #[serde(default)]
    pub tags: Vec<TagRef>,
}

/// Outing record. Outings carry a featured image instead of attachments.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutingSource {
    /// Feature identifier, unique within its kind.
    pub id: i64,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Cover image.
    #[serde(default)]
    pub featured_image: Option<ImageRef>,
    /// Starting location.
    #[serde(default)]
    pub start: Option<GeometryField>,
    /// Outing footprint used for the bounding box.
    #[serde(default)]
    pub extent: Option<GeometryField>,
    /// Super-categories the feature belongs to.
    #[serde(default)]
    pub super_categories: Vec<SuperCategoryRef>,
    /// Visibility label; unknown labels export as draft.
    #[serde(default)]
    pub visibility: Option<String>,
    /// Organizations stewarding the feature.
    #[serde(default)]
    pub stewardships: Vec<StewardshipRef>,
    /// Closure notice, if the feature is closed.
    #[serde(default)]
    pub closed: Option<ClosedStatus>,
    /// Difficulty label.
    #[serde(default)]
    pub difficulty: Option<String>,
    /// Route shape label, such as loop or out-and-back.
    #[serde(default)]
    pub route_type: Option<String>,
    /// Length as shown to users.
    #[serde(default)]
    pub display_length: Option<String>,
    /// Route geometry summary.
    #[serde(default)]
    pub route: Option<OutingRoute>,
    /// Areas the outing visits.
    #[serde(default)]
    pub outing_areas: Vec<OutingAreaRef>,
    /// Tags applied to the feature.
    #[serde(default)]
    pub tags: Vec<TagRef>,
}

/// A feature node of any kind.
///
/// Normalization dispatches once on this enum; see
/// [`FeatureNode::normalize`](crate::FeatureNode::normalize).
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureNode {
    /// An area node.
    Area(OrganizationNode<AreaSource>),
    /// A trail node.
    Trail(OrganizationNode<TrailSource>),
    /// A point-of-interest node.
    PointOfInterest(OrganizationNode<PointOfInterestSource>),
    /// An outing node.
    Outing(OrganizationNode<OutingSource>),
}

/// The four feature collections fetched for one tenant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TenantFeatures {
    /// Areas owned by the tenant.
    pub areas: Vec<OrganizationNode<AreaSource>>,
    /// Trails owned by the tenant.
    pub trails: Vec<OrganizationNode<TrailSource>>,
    /// Points of interest owned by the tenant.
    pub points_of_interest: Vec<OrganizationNode<PointOfInterestSource>>,
    /// Outings owned by the tenant.
    pub outings: Vec<OrganizationNode<OutingSource>>,
}

impl TenantFeatures {
    /// Total number of nodes across all kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.areas.len() + self.trails.len() + self.points_of_interest.len() + self.outings.len()
    }

    /// Whether every collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the collections as a single stream of nodes in kind order.
    pub fn into_nodes(self) -> impl Iterator<Item = FeatureNode> {
        self.areas
            .into_iter()
            .map(FeatureNode::Area)
            .chain(self.trails.into_iter().map(FeatureNode::Trail))
            .chain(
                self.points_of_interest
                    .into_iter()
                    .map(FeatureNode::PointOfInterest),
            )
            .chain(self.outings.into_iter().map(FeatureNode::Outing))
    }
}
