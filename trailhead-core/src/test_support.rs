//! Minimal feature nodes for unit and behaviour tests.
//!
//! Every builder returns a node with the given id, no geometry, no
//! associations and no visibility label. Tests adjust the fields they care
//! about.

use crate::source::{
    AreaSource, OrganizationNode, OutingSource, PointOfInterestSource, TrailSource,
};

/// Organization id used by every builder.
pub const OWNER_ID: i64 = 100;

/// Area node with only an id and name.
#[must_use]
pub fn area_node(id: i64) -> OrganizationNode<AreaSource> {
    OrganizationNode {
        organization_id: Some(OWNER_ID),
        feature: AreaSource {
            id,
            name: Some(format!("Area {id}")),
            closed: None,
            image_attachments: Vec::new(),
            centroid: None,
            extent: None,
            super_categories: Vec::new(),
            visibility: None,
            stewardships: Vec::new(),
            size: None,
            tags: Vec::new(),
        },
    }
}

/// Trail node with only an id and name.
#[must_use]
pub fn trail_node(id: i64) -> OrganizationNode<TrailSource> {
    OrganizationNode {
        organization_id: Some(OWNER_ID),
        feature: TrailSource {
            id,
            area_id: None,
            name: Some(format!("Trail {id}")),
            closed: None,
            image_attachments: Vec::new(),
            start: None,
            extent: None,
            super_categories: Vec::new(),
            visibility: None,
            stewardships: Vec::new(),
            cached_length: None,
            tags: Vec::new(),
        },
    }
}

/// Point-of-interest node with only an id and name.
#[must_use]
pub fn point_of_interest_node(id: i64) -> OrganizationNode<PointOfInterestSource> {
    OrganizationNode {
        organization_id: Some(OWNER_ID),
        feature: PointOfInterestSource {
            id,
            area_id: None,
            name: Some(format!("Point {id}")),
            closed: None,
            image_attachments: Vec::new(),
            location: None,
            point_of_interest_type_id: None,
            super_categories: Vec::new(),
            visibility: None,
            stewardships: Vec::new(),
            tags: Vec::new(),
        },
    }
}

/// Outing node with only an id and name.
#[must_use]
pub fn outing_node(id: i64) -> OrganizationNode<OutingSource> {
    OrganizationNode {
        organization_id: Some(OWNER_ID),
        feature: OutingSource {
            id,
            name: Some(format!("Outing {id}")),
            featured_image: None,
            start: None,
            extent: None,
            super_categories: Vec::new(),
            visibility: None,
            stewardships: Vec::new(),
            closed: None,
            difficulty: None,
            route_type: None,
            display_length: None,
            route: None,
            outing_areas: Vec::new(),
            tags: Vec::new(),
        },
    }
}
