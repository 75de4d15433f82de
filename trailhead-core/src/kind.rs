//! Feature kinds and the numeric codes that discriminate them in a snapshot.

use std::fmt;

use thiserror::Error;

/// The four feature kinds carried by a tenant snapshot.
///
/// The numeric code is part of the snapshot contract: it populates the
/// `feature_type` column of `features` and every association table, and the
/// seeded `feature_types` lookup.
///
/// # Examples
///
/// ```
/// use trailhead_core::FeatureKind;
///
/// assert_eq!(FeatureKind::Outing.code(), 4);
/// assert_eq!(FeatureKind::try_from(3), Ok(FeatureKind::PointOfInterest));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKind {
    /// A bounded region that can contain trails and points of interest.
    Area,
    /// A linear route, optionally inside an area.
    Trail,
    /// A single located feature, optionally inside an area.
    PointOfInterest,
    /// A curated route linking one or more areas.
    Outing,
}

/// Error returned when a numeric code names no feature kind.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("unknown feature kind code {code}")]
pub struct UnknownFeatureKind {
    /// The rejected code.
    pub code: i64,
}

impl FeatureKind {
    /// Every kind, in snapshot insertion order.
    pub const ALL: [Self; 4] = [Self::Area, Self::Trail, Self::PointOfInterest, Self::Outing];

    /// Numeric code stored in `feature_type` columns.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Area => 1,
            Self::Trail => 2,
            Self::PointOfInterest => 3,
            Self::Outing => 4,
        }
    }

    /// Name seeded into the `feature_types` lookup table.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Area => "Area",
            Self::Trail => "Trail",
            Self::PointOfInterest => "PointOfInterest",
            Self::Outing => "Outing",
        }
    }
}

impl TryFrom<i64> for FeatureKind {
    type Error = UnknownFeatureKind;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code() == code)
            .ok_or(UnknownFeatureKind { code })
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(FeatureKind::Area, 1, "Area")]
    #[case(FeatureKind::Trail, 2, "Trail")]
    #[case(FeatureKind::PointOfInterest, 3, "PointOfInterest")]
    #[case(FeatureKind::Outing, 4, "Outing")]
    fn codes_and_names_are_stable(
        #[case] kind: FeatureKind,
        #[case] code: i64,
        #[case] name: &str,
    ) {
        assert_eq!(kind.code(), code);
        assert_eq!(kind.name(), name);
        assert_eq!(FeatureKind::try_from(code), Ok(kind));
    }

    #[rstest]
    #[case(0)]
    #[case(5)]
    #[case(-1)]
    fn rejects_unknown_codes(#[case] code: i64) {
        assert_eq!(
            FeatureKind::try_from(code),
            Err(UnknownFeatureKind { code })
        );
    }
}
