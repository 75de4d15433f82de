//! GeoJSON geometry as delivered by the feature graph, plus the derived
//! values a snapshot stores: rounded representative points and bounding
//! boxes.

use geo::Coord;
use serde::{Deserialize, Serialize};

/// Decimal places kept for coordinates and bounding boxes.
pub const COORDINATE_PLACES: i32 = 6;

/// Decimal places kept for route lengths.
pub const LENGTH_PLACES: i32 = 1;

/// Coordinate payload of a GeoJSON geometry.
///
/// Variants are distinguished by nesting depth, so a `Point`, a
/// `MultiPoint`, a `Polygon` and a `MultiPolygon` all deserialize without
/// consulting the `type` member. Positions are `[lon, lat]`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Coordinates {
    /// A single position.
    Position(Vec<f64>),
    /// A list of positions (`MultiPoint`, `LineString`).
    Positions(Vec<Vec<f64>>),
    /// A list of rings (`Polygon`, `MultiLineString`).
    Rings(Vec<Vec<Vec<f64>>>),
    /// A list of polygons (`MultiPolygon`).
    Polygons(Vec<Vec<Vec<Vec<f64>>>>),
}

/// A GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Geometry {
    /// GeoJSON `type` member, kept for diagnostics only.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Raw coordinate payload.
    pub coordinates: Coordinates,
}

impl Geometry {
    /// Build a `Point` geometry.
    #[must_use]
    pub fn point(lon: f64, lat: f64) -> Self {
        Self {
            kind: Some("Point".to_owned()),
            coordinates: Coordinates::Position(vec![lon, lat]),
        }
    }

    /// Build a `MultiPoint` geometry from `[lon, lat]` pairs.
    #[must_use]
    pub fn multi_point(points: &[[f64; 2]]) -> Self {
        Self {
            kind: Some("MultiPoint".to_owned()),
            coordinates: Coordinates::Positions(points.iter().map(|p| p.to_vec()).collect()),
        }
    }

    /// Build a single-ring `Polygon` geometry from `[lon, lat]` pairs.
    #[must_use]
    pub fn polygon(ring: &[[f64; 2]]) -> Self {
        Self {
            kind: Some("Polygon".to_owned()),
            coordinates: Coordinates::Rings(vec![ring.iter().map(|p| p.to_vec()).collect()]),
        }
    }

    /// First position of the geometry, whatever its nesting.
    ///
    /// Multi-point geometries resolve to their first point. Returns `None`
    /// when the payload is empty or the first position lacks a latitude.
    #[must_use]
    pub fn first_position(&self) -> Option<Coord<f64>> {
        let first = match &self.coordinates {
            Coordinates::Position(position) => Some(position.as_slice()),
            Coordinates::Positions(positions) => positions.first().map(Vec::as_slice),
            Coordinates::Rings(rings) => rings
                .first()
                .and_then(|ring| ring.first())
                .map(Vec::as_slice),
            Coordinates::Polygons(polygons) => polygons
                .first()
                .and_then(|rings| rings.first())
                .and_then(|ring| ring.first())
                .map(Vec::as_slice),
        }?;
        match first {
            [lon, lat, ..] => Some(Coord { x: *lon, y: *lat }),
            _ => None,
        }
    }

    /// Outer ring of a polygonal geometry.
    ///
    /// Point and line payloads have no ring. Positions missing a component
    /// carry `NaN` in its place so the bounding box logic can zero the axis.
    #[must_use]
    pub fn outer_ring(&self) -> Option<Vec<Coord<f64>>> {
        let ring = match &self.coordinates {
            Coordinates::Rings(rings) => rings.first(),
            Coordinates::Polygons(polygons) => polygons.first().and_then(|rings| rings.first()),
            Coordinates::Position(_) | Coordinates::Positions(_) => None,
        }?;
        if ring.is_empty() {
            return None;
        }
        Some(
            ring.iter()
                .map(|position| Coord {
                    x: position.first().copied().unwrap_or(f64::NAN),
                    y: position.get(1).copied().unwrap_or(f64::NAN),
                })
                .collect(),
        )
    }
}

/// Axis-aligned extent of a feature in snapshot column order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    /// Northern edge.
    pub max_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Western edge.
    pub min_lon: f64,
}

impl BoundingBox {
    /// Box used when a feature has no usable extent.
    pub const ZERO: Self = Self {
        max_lat: 0.0,
        max_lon: 0.0,
        min_lat: 0.0,
        min_lon: 0.0,
    };

    /// Compute the box spanned by a ring of `[lon, lat]` vertices.
    ///
    /// Each axis is computed independently; an axis containing a non-finite
    /// value collapses to `0.0` on both edges.
    ///
    /// # Examples
    ///
    /// ```
    /// use geo::Coord;
    /// use trailhead_core::BoundingBox;
    ///
    /// let ring = [
    ///     Coord { x: -1.5, y: 50.25 },
    ///     Coord { x: -1.0, y: 50.75 },
    ///     Coord { x: -1.25, y: 50.5 },
    /// ];
    /// let bbox = BoundingBox::from_ring(&ring);
    /// assert_eq!(bbox.max_lat, 50.75);
    /// assert_eq!(bbox.min_lon, -1.5);
    /// ```
    #[must_use]
    pub fn from_ring(ring: &[Coord<f64>]) -> Self {
        let (max_lat, min_lat) = axis_extent(ring.iter().map(|coord| coord.y));
        let (max_lon, min_lon) = axis_extent(ring.iter().map(|coord| coord.x));
        Self {
            max_lat,
            max_lon,
            min_lat,
            min_lon,
        }
    }

    /// Compute the box for an optional extent geometry.
    #[must_use]
    pub fn from_extent(extent: Option<&Geometry>) -> Self {
        extent
            .and_then(Geometry::outer_ring)
            .map_or(Self::ZERO, |ring| Self::from_ring(&ring))
    }
}

fn axis_extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut bounds: Option<(f64, f64)> = None;
    for value in values {
        if !value.is_finite() {
            return (0.0, 0.0);
        }
        bounds = Some(match bounds {
            Some((max, min)) => (max.max(value), min.min(value)),
            None => (value, value),
        });
    }
    bounds.map_or((0.0, 0.0), |(max, min)| {
        (round_coordinate(max), round_coordinate(min))
    })
}

/// Round `value` to `places` decimal places.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

/// Round a coordinate to [`COORDINATE_PLACES`].
#[must_use]
pub fn round_coordinate(value: f64) -> f64 {
    round_to(value, COORDINATE_PLACES)
}

/// Representative point of a geometry: its first position, rounded.
///
/// Absent geometry, or a first position with a non-finite component, yields
/// `None` so callers can store a null rather than a fabricated origin.
#[must_use]
pub fn representative_point(geometry: Option<&Geometry>) -> Option<Coord<f64>> {
    let position = geometry?.first_position()?;
    if !(position.x.is_finite() && position.y.is_finite()) {
        return None;
    }
    Some(Coord {
        x: round_coordinate(position.x),
        y: round_coordinate(position.y),
    })
}
