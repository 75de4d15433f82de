//! Per-tenant collection of normalized rows ready for a snapshot.

use std::collections::HashSet;

use log::debug;

use crate::kind::FeatureKind;
use crate::normalize::{
    FeatureRow, OutingAreaLink, StewardshipLink, SuperCategoryLink, TagLink, unique,
};
use crate::source::{FeatureNode, TenantFeatures};

/// Normalized rows for one tenant.
///
/// Invariants upheld by [`TenantDataset::from_nodes`]:
///
/// - at most one row per `(kind, feature_id)`; the first node wins;
/// - association rows are unique across the whole tenant;
/// - every association row references a feature row in the dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TenantDataset {
    features: Vec<FeatureRow>,
    super_categories: Vec<SuperCategoryLink>,
    stewardships: Vec<StewardshipLink>,
    tags: Vec<TagLink>,
    outing_areas: Vec<OutingAreaLink>,
}

impl TenantDataset {
    /// Normalize a stream of nodes into a dataset.
    #[must_use]
    pub fn from_nodes<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = FeatureNode>,
    {
        let mut present = HashSet::new();
        let mut features = Vec::new();
        let mut super_categories = Vec::new();
        let mut stewardships = Vec::new();
        let mut tags = Vec::new();
        let mut outing_areas = Vec::new();

        for node in nodes {
            let key = (node.kind(), node.feature_id());
            if !present.insert(key) {
                debug!("skipping repeated {} {}", key.0, key.1);
                continue;
            }
            let normalized = node.normalize();
            features.push(normalized.row);
            let links = normalized.associations;
            super_categories.extend(links.super_categories.into_iter().flatten());
            stewardships.extend(links.stewardships.into_iter().flatten());
            tags.extend(links.tags.into_iter().flatten());
            outing_areas.extend(links.outing_areas.into_iter().flatten());
        }

        let has = |kind: FeatureKind, id: i64| present.contains(&(kind, id));
        let dataset = Self {
            features,
            super_categories: retain_linked(super_categories, |link| {
                has(link.kind, link.feature_id)
            }),
            stewardships: retain_linked(stewardships, |link| has(link.kind, link.feature_id)),
            tags: retain_linked(tags, |link| has(link.kind, link.feature_id)),
            outing_areas: retain_linked(outing_areas, |link| {
                has(FeatureKind::Area, link.area_id) && has(FeatureKind::Outing, link.outing_id)
            }),
        };
        debug!(
            "normalized {} features with {} super-category, {} stewardship, {} tag and {} outing links",
            dataset.features.len(),
            dataset.super_categories.len(),
            dataset.stewardships.len(),
            dataset.tags.len(),
            dataset.outing_areas.len()
        );
        dataset
    }

    /// Feature rows of one kind, in source order.
    pub fn rows(&self, kind: FeatureKind) -> impl Iterator<Item = &FeatureRow> {
        self.features.iter().filter(move |row| row.kind == kind)
    }

    /// All feature rows.
    #[must_use]
    pub fn features(&self) -> &[FeatureRow] {
        &self.features
    }

    /// Super-category links, deduplicated.
    #[must_use]
    pub fn super_categories(&self) -> &[SuperCategoryLink] {
        &self.super_categories
    }

    /// Stewardship links, deduplicated.
    #[must_use]
    pub fn stewardships(&self) -> &[StewardshipLink] {
        &self.stewardships
    }

    /// Tag links, deduplicated.
    #[must_use]
    pub fn tags(&self) -> &[TagLink] {
        &self.tags
    }

    /// Outing-to-area links whose area and outing are both present.
    #[must_use]
    pub fn outing_areas(&self) -> &[OutingAreaLink] {
        &self.outing_areas
    }
}

impl From<TenantFeatures> for TenantDataset {
    fn from(features: TenantFeatures) -> Self {
        Self::from_nodes(features.into_nodes())
    }
}

fn retain_linked<T, F>(links: Vec<T>, keep: F) -> Vec<T>
where
    T: Eq + std::hash::Hash + Clone,
    F: Fn(&T) -> bool,
{
    let before = links.len();
    let kept: Vec<T> = unique(links.into_iter().filter(|link| keep(link))).unwrap_or_default();
    if kept.len() < before {
        debug!("dropped {} repeated or dangling links", before - kept.len());
    }
    kept
}
