//! Behavioural tests for [`TenantDataset`] assembly.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use trailhead_core::test_support::{area_node, outing_node};
use trailhead_core::{
    ColumnValue, FeatureKind, FeatureRow, Geometry, GeometryField, OutingAreaRef,
    StewardshipRef, SuperCategoryRef, TagRef, TenantDataset, TenantFeatures,
};

type FeaturesCell = RefCell<TenantFeatures>;
type DatasetCell = RefCell<Option<TenantDataset>>;

#[fixture]
fn features() -> FeaturesCell {
    RefCell::new(TenantFeatures::default())
}

#[fixture]
fn dataset() -> DatasetCell {
    RefCell::new(None)
}

fn value<'a>(row: &'a FeatureRow, column: &str) -> &'a ColumnValue {
    let index = row
        .kind
        .columns()
        .iter()
        .position(|name| *name == column)
        .expect("known column");
    &row.values[index]
}

fn with_dataset(dataset: &DatasetCell, check: impl FnOnce(&TenantDataset)) {
    let borrowed = dataset.borrow();
    check(borrowed.as_ref().expect("dataset must be built"));
}

// --- Given steps ---

#[given("a published area with an extent, a super-category, a stewardship and a tag")]
fn published_area(#[from(features)] features: &FeaturesCell) {
    let mut node = area_node(1);
    node.feature.visibility = Some("Published".to_owned());
    node.feature.extent = Some(GeometryField {
        geometry: Some(Geometry::polygon(&[
            [-1.5, 50.25],
            [-1.0, 50.25],
            [-1.0, 50.75],
            [-1.5, 50.75],
            [-1.5, 50.25],
        ])),
    });
    node.feature.super_categories = vec![SuperCategoryRef { id: 4 }];
    node.feature.stewardships = vec![StewardshipRef {
        role: Some("owner".to_owned()),
        organization_id: 100,
    }];
    node.feature.tags = vec![TagRef {
        key: "dogs_allowed".to_owned(),
    }];
    features.borrow_mut().areas.push(node);
}

#[given("a published area whose tag and super-category are listed twice")]
fn repeated_associations(#[from(features)] features: &FeaturesCell) {
    let mut node = area_node(2);
    node.feature.visibility = Some("Published".to_owned());
    node.feature.super_categories = vec![SuperCategoryRef { id: 4 }, SuperCategoryRef { id: 4 }];
    node.feature.stewardships = vec![StewardshipRef {
        role: None,
        organization_id: 100,
    }];
    node.feature.tags = vec![
        TagRef {
            key: "dogs_allowed".to_owned(),
        },
        TagRef {
            key: "dogs_allowed".to_owned(),
        },
    ];
    features.borrow_mut().areas.push(node);
}

#[given("an area labelled \"Hidden\"")]
fn hidden_area(#[from(features)] features: &FeaturesCell) {
    let mut node = area_node(3);
    node.feature.visibility = Some("Hidden".to_owned());
    features.borrow_mut().areas.push(node);
}

#[given("an outing visiting area 5 and area 6 where only area 5 exists")]
fn outing_with_missing_area(#[from(features)] features: &FeaturesCell) {
    let mut outing = outing_node(9);
    outing.feature.outing_areas = vec![
        OutingAreaRef {
            outing_id: 9,
            area_id: 5,
        },
        OutingAreaRef {
            outing_id: 9,
            area_id: 6,
        },
    ];
    let mut borrowed = features.borrow_mut();
    borrowed.areas.push(area_node(5));
    borrowed.outings.push(outing);
}

// --- When steps ---

#[when("the tenant dataset is built")]
fn build_dataset(
    #[from(features)] features: &FeaturesCell,
    #[from(dataset)] dataset: &DatasetCell,
) {
    let source = features.borrow().clone();
    *dataset.borrow_mut() = Some(TenantDataset::from(source));
}

// --- Then steps ---

#[then("the dataset holds one area row with visibility code {code}")]
fn then_area_visibility(#[from(dataset)] dataset: &DatasetCell, code: i64) {
    with_dataset(dataset, |built| {
        let rows: Vec<&FeatureRow> = built.rows(FeatureKind::Area).collect();
        assert_eq!(rows.len(), 1, "expected one area row");
        assert_eq!(value(rows[0], "visibility"), &ColumnValue::Integer(code));
        assert_eq!(value(rows[0], "feature_type"), &ColumnValue::Integer(1));
    });
}

#[then("the area row carries a non-zero bounding box")]
fn then_bounding_box(#[from(dataset)] dataset: &DatasetCell) {
    with_dataset(dataset, |built| {
        let row = built.rows(FeatureKind::Area).next().expect("area row");
        assert_eq!(value(row, "bounds_max_lat"), &ColumnValue::Real(50.75));
        assert_eq!(value(row, "bounds_max_lon"), &ColumnValue::Real(-1.0));
        assert_eq!(value(row, "bounds_min_lat"), &ColumnValue::Real(50.25));
        assert_eq!(value(row, "bounds_min_lon"), &ColumnValue::Real(-1.5));
    });
}

#[then("the dataset holds one super-category, one stewardship and one tag link")]
fn then_one_of_each(#[from(dataset)] dataset: &DatasetCell) {
    with_dataset(dataset, |built| {
        assert_eq!(built.super_categories().len(), 1);
        assert_eq!(built.stewardships().len(), 1);
        assert_eq!(built.tags().len(), 1);
        assert!(built.outing_areas().is_empty());
    });
}

#[then("the dataset holds exactly one outing link, from area 5")]
fn then_pruned_outing_links(#[from(dataset)] dataset: &DatasetCell) {
    with_dataset(dataset, |built| {
        let links = built.outing_areas();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].area_id, 5);
        assert_eq!(links[0].outing_id, 9);
    });
}

// --- Scenario registrations ---

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/tenant_dataset.feature", name = $title)]
        fn $fn_name(features: FeaturesCell, dataset: DatasetCell) {
            let _ = (features, dataset);
        }
    };
}

register_scenario!(
    published_area_with_associations,
    "a published area with one of each association"
);
register_scenario!(
    repeated_associations_collapse,
    "repeated associations collapse to one row"
);
register_scenario!(unknown_visibility_is_draft, "an unknown visibility label becomes draft");
register_scenario!(outing_links_are_pruned, "outing links to missing areas are pruned");
