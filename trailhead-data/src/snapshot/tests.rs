//! Unit tests for snapshot construction.

use super::*;
use camino::Utf8PathBuf;
use proptest::prelude::*;
use rstest::{fixture, rstest};
use rusqlite::Connection;
use tempfile::TempDir;
use trailhead_core::test_support::{area_node, outing_node, trail_node};
use trailhead_core::{
    FeatureNode, Geometry, GeometryField, NamedEntity, Organization, OutingAreaRef,
    StewardshipRef, SuperCategoryRef, TagDescriptor, TagRef, TenantFeatures,
};

#[fixture]
fn temp_dir() -> TempDir {
    TempDir::new().expect("create temp dir")
}

fn snapshot_path(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().join("tenant_1_features.db")).expect("utf-8 path")
}

fn reference() -> ReferenceData {
    ReferenceData {
        poi_types: vec![NamedEntity::new(1, "Viewpoint")],
        super_categories: vec![NamedEntity::new(10, "Water")],
        tag_descriptors: vec![TagDescriptor {
            id: 3,
            feature_type: Some("Area".to_owned()),
            key: Some("swimming".to_owned()),
            name: Some("Swimming".to_owned()),
            category: Some("Activities".to_owned()),
            super_category_id: Some(10),
        }],
    }
}

fn tenant() -> TenantReferenceData {
    TenantReferenceData {
        organizations: vec![Organization {
            id: 100,
            name: Some("Friends of the Fells".to_owned()),
            logo_image_id: Some(8),
            logo_file: Some("logo.png".to_owned()),
        }],
        articles: vec![NamedEntity::new(1, "Trail etiquette")],
        challenges: vec![NamedEntity::new(2, "Summit ten peaks")],
        events: vec![NamedEntity::new(3, "Spring clean-up")],
    }
}

fn published_area() -> FeatureNode {
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
    node.feature.super_categories = vec![SuperCategoryRef { id: 10 }];
    node.feature.stewardships = vec![StewardshipRef {
        role: Some("owner".to_owned()),
        organization_id: 100,
    }];
    node.feature.tags = vec![TagRef {
        key: "swimming".to_owned(),
    }];
    FeatureNode::Area(node)
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })
    .expect("count rows")
}

fn build(path: &Utf8Path, dataset: &TenantDataset) -> SnapshotSummary {
    build_snapshot(path, &reference(), &tenant(), dataset).expect("build snapshot")
}

#[rstest]
fn single_published_area(temp_dir: TempDir) {
    let path = snapshot_path(&temp_dir);
    let dataset = TenantDataset::from_nodes([published_area()]);

    let summary = build(&path, &dataset);

    assert_eq!(summary.features, 1);
    assert_eq!(summary.associations, 3);
    let conn = Connection::open(path.as_std_path()).expect("open snapshot");
    assert_eq!(count(&conn, "features"), 1);
    assert_eq!(count(&conn, "feature_super_categories"), 1);
    assert_eq!(count(&conn, "feature_stewardships"), 1);
    assert_eq!(count(&conn, "feature_tags"), 1);
    assert_eq!(count(&conn, "feature_outings"), 0);

    let row: (i64, i64, f64, f64, f64, f64) = conn
        .query_row(
            "SELECT feature_type, visibility, bounds_max_lat, bounds_max_lon, \
                    bounds_min_lat, bounds_min_lon FROM features",
            [],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )
        .expect("read feature");
    assert_eq!(row, (1, 2, 50.75, -1.0, 50.25, -1.5));
}

#[rstest]
fn empty_tenant_still_gets_reference_tables(temp_dir: TempDir) {
    let path = snapshot_path(&temp_dir);

    let summary = build(&path, &TenantDataset::default());

    assert_eq!(summary.features, 0);
    assert_eq!(summary.associations, 0);
    let conn = Connection::open(path.as_std_path()).expect("open snapshot");
    for table in [
        "features",
        "feature_super_categories",
        "feature_stewardships",
        "feature_tags",
        "feature_outings",
    ] {
        assert_eq!(count(&conn, table), 0, "{table} should be empty");
    }
    for table in [
        "poi_types",
        "super_categories",
        "tag_descriptors",
        "organizations",
        "articles",
        "challenges",
        "events",
    ] {
        assert_eq!(count(&conn, table), 1, "{table} should be populated");
    }
    assert_eq!(count(&conn, "feature_types"), 4);
    assert_eq!(count(&conn, "visibilities"), 3);
}

#[rstest]
fn metadata_records_version_and_timestamp(temp_dir: TempDir) {
    let path = snapshot_path(&temp_dir);
    build(&path, &TenantDataset::default());

    let conn = Connection::open(path.as_std_path()).expect("open snapshot");
    let version: String = conn
        .query_row(
            "SELECT value FROM metadata WHERE name = 'version'",
            [],
            |row| row.get(0),
        )
        .expect("read version");
    let created_at: String = conn
        .query_row(
            "SELECT value FROM metadata WHERE name = 'created_at'",
            [],
            |row| row.get(0),
        )
        .expect("read timestamp");

    assert_eq!(version, trailhead_core::SCHEMA_VERSION);
    assert_eq!(created_at.len(), "2024-01-01T00:00:00.000Z".len());
    assert!(created_at.ends_with('Z'));
}

#[rstest]
fn organization_logo_is_stored(temp_dir: TempDir) {
    let path = snapshot_path(&temp_dir);
    build(&path, &TenantDataset::default());

    let conn = Connection::open(path.as_std_path()).expect("open snapshot");
    let row: (i64, String, i64, String) = conn
        .query_row(
            "SELECT id, image_file, image_id, name FROM organizations",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .expect("read organization");

    assert_eq!(
        row,
        (
            100,
            "logo.png".to_owned(),
            8,
            "Friends of the Fells".to_owned()
        )
    );
}

#[rstest]
fn outing_links_are_keyed_by_area(temp_dir: TempDir) {
    let path = snapshot_path(&temp_dir);
    let mut outing = outing_node(9);
    outing.feature.outing_areas = vec![OutingAreaRef {
        outing_id: 9,
        area_id: 1,
    }];
    let dataset = TenantDataset::from(TenantFeatures {
        areas: vec![area_node(1)],
        outings: vec![outing],
        ..TenantFeatures::default()
    });

    build(&path, &dataset);

    let conn = Connection::open(path.as_std_path()).expect("open snapshot");
    let link: (i64, i64, i64) = conn
        .query_row(
            "SELECT feature_type, feature_id, outing_id FROM feature_outings",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .expect("read link");
    assert_eq!(link, (1, 1, 9));
}

#[rstest]
fn large_batches_are_split_below_the_parameter_ceiling(temp_dir: TempDir) {
    let path = snapshot_path(&temp_dir);
    let mut area = area_node(1);
    area.feature.tags = (0..400)
        .map(|index| TagRef {
            key: format!("tag-{index}"),
        })
        .collect();
    let dataset = TenantDataset::from(TenantFeatures {
        areas: vec![area],
        trails: (1..=100).map(trail_node).collect(),
        ..TenantFeatures::default()
    });

    let summary = build(&path, &dataset);

    assert_eq!(summary.features, 101);
    let conn = Connection::open(path.as_std_path()).expect("open snapshot");
    assert_eq!(count(&conn, "features"), 101);
    assert_eq!(count(&conn, "feature_tags"), 400);
}

#[rstest]
fn existing_snapshot_is_replaced(temp_dir: TempDir) {
    let path = snapshot_path(&temp_dir);
    build(&path, &TenantDataset::from_nodes([published_area()]));

    build(&path, &TenantDataset::default());

    let conn = Connection::open(path.as_std_path()).expect("open snapshot");
    assert_eq!(count(&conn, "features"), 0);
    assert_eq!(count(&conn, "metadata"), 2);
}

#[rstest]
fn failed_build_removes_partial_file(temp_dir: TempDir) {
    let path = snapshot_path(&temp_dir);
    let mut reference = reference();
    reference.poi_types.push(NamedEntity::new(1, "Duplicate"));

    let err = build_snapshot(&path, &reference, &tenant(), &TenantDataset::default())
        .expect_err("duplicate primary key");

    assert!(matches!(
        err,
        SnapshotError::Insert {
            table: "poi_types",
            ..
        }
    ));
    assert!(!path.exists());
}

#[rstest]
fn creates_missing_work_dir(temp_dir: TempDir) {
    let path = Utf8PathBuf::from_path_buf(temp_dir.path().join("exports/sqlite/tenant_1.db"))
        .expect("utf-8 path");

    build(&path, &TenantDataset::default());

    assert!(path.exists());
}

type Rows = Vec<Vec<rusqlite::types::Value>>;

fn dump(path: &Utf8Path, sql: &str) -> Rows {
    let conn = Connection::open(path.as_std_path()).expect("open snapshot");
    let mut statement = conn.prepare(sql).expect("prepare dump");
    let width = statement.column_count();
    statement
        .query_map([], |row| {
            (0..width)
                .map(|index| row.get::<_, rusqlite::types::Value>(index))
                .collect::<Result<Vec<_>, _>>()
        })
        .expect("query rows")
        .collect::<Result<Vec<_>, _>>()
        .expect("read rows")
}

#[rstest]
fn rebuilding_from_identical_input_is_idempotent(temp_dir: TempDir) {
    let first = Utf8PathBuf::from_path_buf(temp_dir.path().join("first.db")).expect("utf-8 path");
    let second =
        Utf8PathBuf::from_path_buf(temp_dir.path().join("second.db")).expect("utf-8 path");
    let mut outing = outing_node(9);
    outing.feature.outing_areas = vec![OutingAreaRef {
        outing_id: 9,
        area_id: 1,
    }];
    let nodes = || {
        TenantFeatures {
            trails: vec![trail_node(4)],
            outings: vec![outing.clone()],
            ..TenantFeatures::default()
        }
        .into_nodes()
        .chain([published_area()])
    };

    build(&first, &TenantDataset::from_nodes(nodes()));
    build(&second, &TenantDataset::from_nodes(nodes()));

    for sql in [
        "SELECT * FROM features ORDER BY id",
        "SELECT * FROM feature_super_categories ORDER BY id",
        "SELECT * FROM feature_stewardships ORDER BY id",
        "SELECT * FROM feature_tags ORDER BY id",
        "SELECT * FROM feature_outings ORDER BY id",
        "SELECT * FROM metadata WHERE name <> 'created_at'",
    ] {
        assert_eq!(dump(&first, sql), dump(&second, sql), "{sql}");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn quoted_strings_round_trip(
        name in "[a-z'\"\\\\ ]{0,24}",
        key in "[a-z'\"\\\\;]{1,12}",
    ) {
        let dir = TempDir::new().expect("create temp dir");
        let path = snapshot_path(&dir);
        let mut area = area_node(1);
        area.feature.name = Some(name.clone());
        area.feature.tags = vec![TagRef { key: key.clone() }];
        let mut reference = reference();
        reference.poi_types = vec![NamedEntity::new(1, name.clone())];

        build_snapshot(
            &path,
            &reference,
            &tenant(),
            &TenantDataset::from(TenantFeatures {
                areas: vec![area],
                ..TenantFeatures::default()
            }),
        )
        .expect("build snapshot");

        let conn = Connection::open(path.as_std_path()).expect("open snapshot");
        let stored_name: String = conn
            .query_row("SELECT name FROM features", [], |row| row.get(0))
            .expect("read name");
        let stored_key: String = conn
            .query_row("SELECT key FROM feature_tags", [], |row| row.get(0))
            .expect("read key");
        let stored_type: String = conn
            .query_row("SELECT name FROM poi_types", [], |row| row.get(0))
            .expect("read poi type");
        prop_assert_eq!(stored_name, name.clone());
        prop_assert_eq!(stored_key, key);
        prop_assert_eq!(stored_type, name);
    }
}
