//! Publication state of a feature.

/// Visibility of a feature as recorded in a snapshot.
///
/// Labels arrive as free text from the upstream graph. Anything that is not
/// one of the three known labels resolves to [`Visibility::Draft`], so a
/// feature row always carries a known code.
///
/// # Examples
///
/// ```
/// use trailhead_core::Visibility;
///
/// assert_eq!(Visibility::from_label(Some("Published")), Visibility::Published);
/// assert_eq!(Visibility::from_label(Some("Hidden")), Visibility::Draft);
/// assert_eq!(Visibility::from_label(None).code(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// Not yet published.
    #[default]
    Draft,
    /// Visible to everyone.
    Published,
    /// Retired from public view.
    Archived,
}

impl Visibility {
    /// Every visibility, in code order.
    pub const ALL: [Self; 3] = [Self::Draft, Self::Published, Self::Archived];

    /// Resolve an upstream label, falling back to [`Visibility::Draft`].
    #[must_use]
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("Published") => Self::Published,
            Some("Archived") => Self::Archived,
            _ => Self::Draft,
        }
    }

    /// Numeric code stored in the `visibility` column.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Draft => 1,
            Self::Published => 2,
            Self::Archived => 3,
        }
    }

    /// Name seeded into the `visibilities` lookup table.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Published => "Published",
            Self::Archived => "Archived",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("Draft"), 1)]
    #[case(Some("Published"), 2)]
    #[case(Some("Archived"), 3)]
    #[case(Some("published"), 1)]
    #[case(Some(""), 1)]
    #[case(None, 1)]
    fn resolves_labels(#[case] label: Option<&str>, #[case] code: i64) {
        assert_eq!(Visibility::from_label(label).code(), code);
    }

    proptest! {
        #[test]
        fn unknown_labels_resolve_to_draft(label in "\\PC*") {
            prop_assume!(!["Draft", "Published", "Archived"].contains(&label.as_str()));
            prop_assert_eq!(
                Visibility::from_label(Some(&label)).code(),
                Visibility::Draft.code()
            );
        }
    }
}
