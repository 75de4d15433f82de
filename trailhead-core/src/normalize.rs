//! Row normalization: one feature node in, one fixed-order attribute tuple
//! plus its association groups out.
//!
//! Column order per kind is a snapshot contract and must match the column
//! lists exposed by [`FeatureKind::columns`]. Association groups are `None`
//! when the node has no entries in that category and otherwise hold
//! first-occurrence-ordered, duplicate-free tuples.

use std::collections::HashSet;
use std::hash::Hash;

use crate::geometry::{BoundingBox, LENGTH_PLACES, representative_point, round_to};
use crate::kind::FeatureKind;
use crate::source::{
    AreaSource, ClosedStatus, FeatureNode, ImageAttachment, ImageRef, OrganizationNode,
    OutingSource, PointOfInterestSource, StewardshipRef, SuperCategoryRef, TagRef, TrailSource,
};
use crate::visibility::Visibility;

const AREA_COLUMNS: [&str; 15] = [
    "feature_id",
    "name",
    "owner_id",
    "image_file",
    "image_id",
    "feature_type",
    "closed",
    "bounds_max_lat",
    "bounds_max_lon",
    "bounds_min_lat",
    "bounds_min_lon",
    "lat",
    "lon",
    "visibility",
    "area_meters",
];

const TRAIL_COLUMNS: [&str; 16] = [
    "feature_id",
    "name",
    "owner_id",
    "image_file",
    "image_id",
    "feature_type",
    "area_id",
    "closed",
    "bounds_max_lat",
    "bounds_max_lon",
    "bounds_min_lat",
    "bounds_min_lon",
    "lat",
    "lon",
    "visibility",
    "length_meters",
];

const POINT_OF_INTEREST_COLUMNS: [&str; 12] = [
    "feature_id",
    "name",
    "owner_id",
    "image_file",
    "image_id",
    "feature_type",
    "closed",
    "area_id",
    "lat",
    "lon",
    "poi_type",
    "visibility",
];

const OUTING_COLUMNS: [&str; 18] = [
    "feature_id",
    "name",
    "owner_id",
    "image_file",
    "image_id",
    "feature_type",
    "visibility",
    "bounds_max_lat",
    "bounds_max_lon",
    "bounds_min_lat",
    "bounds_min_lon",
    "lat",
    "lon",
    "closed",
    "difficulty",
    "route_type",
    "display_length",
    "length_meters",
];

impl FeatureKind {
    /// `features` columns populated for this kind, in tuple order.
    #[must_use]
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Area => &AREA_COLUMNS,
            Self::Trail => &TRAIL_COLUMNS,
            Self::PointOfInterest => &POINT_OF_INTEREST_COLUMNS,
            Self::Outing => &OUTING_COLUMNS,
        }
    }
}

/// A single value bound into a snapshot statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    /// SQL `NULL`.
    Null,
    /// An integer column value.
    Integer(i64),
    /// A floating point column value.
    Real(f64),
    /// A text column value, stored verbatim.
    Text(String),
}

impl ColumnValue {
    fn text(value: Option<&str>) -> Self {
        value.map_or(Self::Null, |text| Self::Text(text.to_owned()))
    }

    fn integer(value: Option<i64>) -> Self {
        value.map_or(Self::Null, Self::Integer)
    }

    fn real(value: Option<f64>) -> Self {
        value.map_or(Self::Null, Self::Real)
    }
}

/// Attribute tuple for one feature, ordered per [`FeatureKind::columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    /// Kind the row belongs to.
    pub kind: FeatureKind,
    /// Kind-scoped feature identifier.
    pub feature_id: i64,
    /// Column values in `FeatureKind::columns` order.
    pub values: Vec<ColumnValue>,
}

/// Membership of a feature in a super-category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SuperCategoryLink {
    /// Kind of the linked feature.
    pub kind: FeatureKind,
    /// Linked feature.
    pub feature_id: i64,
    /// Linked super-category.
    pub super_category_id: i64,
}

/// Stewardship of a feature by an organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StewardshipLink {
    /// Kind of the linked feature.
    pub kind: FeatureKind,
    /// Linked feature.
    pub feature_id: i64,
    /// Stewarding organization.
    pub organization_id: i64,
    /// Role the organization plays, if recorded.
    pub role: Option<String>,
}

/// A `yes`-valued tag applied to a feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagLink {
    /// Kind of the tagged feature.
    pub kind: FeatureKind,
    /// Tagged feature.
    pub feature_id: i64,
    /// Tag key.
    pub key: String,
}

/// Link between an area and an outing visiting it.
///
/// Stored against the area: `feature_type` is always the area code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutingAreaLink {
    /// Visited area.
    pub area_id: i64,
    /// Visiting outing.
    pub outing_id: i64,
}

/// Association groups emitted for one feature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Associations {
    /// Super-category links; `None` when the node lists none.
    pub super_categories: Option<Vec<SuperCategoryLink>>,
    /// Stewardship links; `None` when the node lists none.
    pub stewardships: Option<Vec<StewardshipLink>>,
    /// Tag links; `None` when the node lists none.
    pub tags: Option<Vec<TagLink>>,
    /// Outing-to-area links; `None` unless an outing lists areas.
    pub outing_areas: Option<Vec<OutingAreaLink>>,
}

/// Output of [`FeatureNode::normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFeature {
    /// Attribute tuple for the `features` table.
    pub row: FeatureRow,
    /// Deduplicated association groups.
    pub associations: Associations,
}

impl FeatureNode {
    /// Kind of the wrapped feature.
    #[must_use]
    pub const fn kind(&self) -> FeatureKind {
        match self {
            Self::Area(_) => FeatureKind::Area,
            Self::Trail(_) => FeatureKind::Trail,
            Self::PointOfInterest(_) => FeatureKind::PointOfInterest,
            Self::Outing(_) => FeatureKind::Outing,
        }
    }

    /// Kind-scoped identifier of the wrapped feature.
    #[must_use]
    pub const fn feature_id(&self) -> i64 {
        match self {
            Self::Area(node) => node.feature.id,
            Self::Trail(node) => node.feature.id,
            Self::PointOfInterest(node) => node.feature.id,
            Self::Outing(node) => node.feature.id,
        }
    }

    /// Map the node to its attribute tuple and association groups.
    ///
    /// # Examples
    ///
    /// ```
    /// use trailhead_core::{
    ///     ColumnValue, FeatureKind, FeatureNode, OrganizationNode, PointOfInterestSource,
    /// };
    ///
    /// let node = FeatureNode::PointOfInterest(OrganizationNode {
    ///     organization_id: Some(9),
    ///     feature: PointOfInterestSource {
    ///         id: 42,
    ///         area_id: None,
    ///         name: Some("Viewpoint".to_owned()),
    ///         closed: None,
    ///         image_attachments: Vec::new(),
    ///         location: None,
    ///         point_of_interest_type_id: Some(3),
    ///         super_categories: Vec::new(),
    ///         visibility: Some("Published".to_owned()),
    ///         stewardships: Vec::new(),
    ///         tags: Vec::new(),
    ///     },
    /// });
    /// let normalized = node.normalize();
    /// assert_eq!(normalized.row.kind, FeatureKind::PointOfInterest);
    /// assert_eq!(normalized.row.values.len(), FeatureKind::PointOfInterest.columns().len());
    /// assert_eq!(normalized.row.values[11], ColumnValue::Integer(2));
    /// assert!(normalized.associations.tags.is_none());
    /// ```
    #[must_use]
    pub fn normalize(&self) -> NormalizedFeature {
        match self {
            Self::Area(node) => normalize_area(node),
            Self::Trail(node) => normalize_trail(node),
            Self::PointOfInterest(node) => normalize_point_of_interest(node),
            Self::Outing(node) => normalize_outing(node),
        }
    }
}

/// Attributes every kind shares, resolved once per node.
struct Common<'a> {
    kind: FeatureKind,
    feature_id: i64,
    name: Option<&'a str>,
    owner_id: Option<i64>,
    image: Option<&'a ImageRef>,
    closed: Option<&'a str>,
    visibility: Visibility,
}

impl Common<'_> {
    /// The six leading columns shared by all kinds.
    fn leading(&self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::Integer(self.feature_id),
            ColumnValue::text(self.name),
            ColumnValue::integer(self.owner_id),
            ColumnValue::text(self.image.and_then(|image| image.uploaded_file.as_deref())),
            ColumnValue::integer(self.image.map(|image| image.id)),
            ColumnValue::Integer(self.kind.code()),
        ]
    }

    fn row(&self, values: Vec<ColumnValue>) -> FeatureRow {
        FeatureRow {
            kind: self.kind,
            feature_id: self.feature_id,
            values,
        }
    }

    fn associations(
        &self,
        super_categories: &[SuperCategoryRef],
        stewardships: &[StewardshipRef],
        tags: &[TagRef],
    ) -> Associations {
        let (kind, feature_id) = (self.kind, self.feature_id);
        Associations {
            super_categories: unique(super_categories.iter().map(|category| {
                SuperCategoryLink {
                    kind,
                    feature_id,
                    super_category_id: category.id,
                }
            })),
            stewardships: unique(stewardships.iter().map(|stewardship| StewardshipLink {
                kind,
                feature_id,
                organization_id: stewardship.organization_id,
                role: stewardship.role.clone(),
            })),
            tags: unique(tags.iter().map(|tag| TagLink {
                kind,
                feature_id,
                key: tag.key.clone(),
            })),
            outing_areas: None,
        }
    }
}

fn first_image(attachments: &[ImageAttachment]) -> Option<&ImageRef> {
    attachments
        .first()
        .and_then(|attachment| attachment.image.as_ref())
}

fn closed_status(closed: Option<&ClosedStatus>) -> Option<&str> {
    closed.and_then(|status| status.status.as_deref())
}

fn bounds_columns(bbox: BoundingBox) -> [ColumnValue; 4] {
    [
        ColumnValue::Real(bbox.max_lat),
        ColumnValue::Real(bbox.max_lon),
        ColumnValue::Real(bbox.min_lat),
        ColumnValue::Real(bbox.min_lon),
    ]
}

fn point_columns(point: Option<geo::Coord<f64>>) -> [ColumnValue; 2] {
    [
        ColumnValue::real(point.map(|coord| coord.y)),
        ColumnValue::real(point.map(|coord| coord.x)),
    ]
}

fn normalize_area(node: &OrganizationNode<AreaSource>) -> NormalizedFeature {
    let area = &node.feature;
    let common = Common {
        kind: FeatureKind::Area,
        feature_id: area.id,
        name: area.name.as_deref(),
        owner_id: node.organization_id,
        image: first_image(&area.image_attachments),
        closed: closed_status(area.closed.as_ref()),
        visibility: Visibility::from_label(area.visibility.as_deref()),
    };
    let extent = area.extent.as_ref().and_then(|field| field.geometry.as_ref());
    let centroid = area
        .centroid
        .as_ref()
        .and_then(|field| field.geometry.as_ref());

    let mut values = common.leading();
    values.push(ColumnValue::text(common.closed));
    values.extend(bounds_columns(BoundingBox::from_extent(extent)));
    values.extend(point_columns(representative_point(centroid)));
    values.push(ColumnValue::Integer(common.visibility.code()));
    values.push(ColumnValue::Real(
        area.size.and_then(|size| size.meters).unwrap_or(0.0),
    ));

    NormalizedFeature {
        row: common.row(values),
        associations: common.associations(
            &area.super_categories,
            &area.stewardships,
            &area.tags,
        ),
    }
}

fn normalize_trail(node: &OrganizationNode<TrailSource>) -> NormalizedFeature {
    let trail = &node.feature;
    let common = Common {
        kind: FeatureKind::Trail,
        feature_id: trail.id,
        name: trail.name.as_deref(),
        owner_id: node.organization_id,
        image: first_image(&trail.image_attachments),
        closed: closed_status(trail.closed.as_ref()),
        visibility: Visibility::from_label(trail.visibility.as_deref()),
    };
    let start = trail.start.as_ref().and_then(|field| field.geometry.as_ref());

    let mut values = common.leading();
    values.push(ColumnValue::integer(trail.area_id));
    values.push(ColumnValue::text(common.closed));
    values.extend(bounds_columns(BoundingBox::from_extent(
        trail.extent.as_ref(),
    )));
    values.extend(point_columns(representative_point(start)));
    values.push(ColumnValue::Integer(common.visibility.code()));
    values.push(ColumnValue::Real(trail.cached_length.unwrap_or(0.0)));

    NormalizedFeature {
        row: common.row(values),
        associations: common.associations(
            &trail.super_categories,
            &trail.stewardships,
            &trail.tags,
        ),
    }
}

fn normalize_point_of_interest(
    node: &OrganizationNode<PointOfInterestSource>,
) -> NormalizedFeature {
    let poi = &node.feature;
    let common = Common {
        kind: FeatureKind::PointOfInterest,
        feature_id: poi.id,
        name: poi.name.as_deref(),
        owner_id: node.organization_id,
        image: first_image(&poi.image_attachments),
        closed: closed_status(poi.closed.as_ref()),
        visibility: Visibility::from_label(poi.visibility.as_deref()),
    };
    let location = poi
        .location
        .as_ref()
        .and_then(|field| field.geometry.as_ref());

    let mut values = common.leading();
    values.push(ColumnValue::text(common.closed));
    values.push(ColumnValue::integer(poi.area_id));
    values.extend(point_columns(representative_point(location)));
    values.push(ColumnValue::integer(poi.point_of_interest_type_id));
    values.push(ColumnValue::Integer(common.visibility.code()));

    NormalizedFeature {
        row: common.row(values),
        associations: common.associations(&poi.super_categories, &poi.stewardships, &poi.tags),
    }
}

fn normalize_outing(node: &OrganizationNode<OutingSource>) -> NormalizedFeature {
    let outing = &node.feature;
    let common = Common {
        kind: FeatureKind::Outing,
        feature_id: outing.id,
        name: outing.name.as_deref(),
        owner_id: node.organization_id,
        image: outing.featured_image.as_ref(),
        closed: closed_status(outing.closed.as_ref()),
        visibility: Visibility::from_label(outing.visibility.as_deref()),
    };
    let extent = outing
        .extent
        .as_ref()
        .and_then(|field| field.geometry.as_ref());
    let start = outing
        .start
        .as_ref()
        .and_then(|field| field.geometry.as_ref());
    let length = outing
        .route
        .and_then(|route| route.length_meters)
        .map_or(0.0, |meters| round_to(meters, LENGTH_PLACES));

    let mut values = common.leading();
    values.push(ColumnValue::Integer(common.visibility.code()));
    values.extend(bounds_columns(BoundingBox::from_extent(extent)));
    values.extend(point_columns(representative_point(start)));
    values.push(ColumnValue::text(common.closed));
    values.push(ColumnValue::text(outing.difficulty.as_deref()));
    values.push(ColumnValue::text(outing.route_type.as_deref()));
    values.push(ColumnValue::text(outing.display_length.as_deref()));
    values.push(ColumnValue::Real(length));

    let mut associations = common.associations(
        &outing.super_categories,
        &outing.stewardships,
        &outing.tags,
    );
    associations.outing_areas = unique(outing.outing_areas.iter().map(|link| OutingAreaLink {
        area_id: link.area_id,
        outing_id: link.outing_id,
    }));

    NormalizedFeature {
        row: common.row(values),
        associations,
    }
}

/// Drop repeated items, keeping first occurrences in order. Empty input
/// yields `None`.
pub(crate) fn unique<T>(items: impl IntoIterator<Item = T>) -> Option<Vec<T>>
where
    T: Eq + Hash + Clone,
{
    let mut seen = HashSet::new();
    let kept: Vec<T> = items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect();
    (!kept.is_empty()).then_some(kept)
}
