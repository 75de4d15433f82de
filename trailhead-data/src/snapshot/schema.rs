//! Snapshot DDL, secondary indexes and fixed lookup rows.
//!
//! Table and column names are a contract with offline readers. Changing them
//! requires bumping [`trailhead_core::SCHEMA_VERSION`].

use rusqlite::Transaction;
use trailhead_core::{ColumnValue, FeatureKind, SCHEMA_VERSION, Visibility};

use super::SnapshotError;
use super::insert::insert_rows;

const TABLES: [(&str, &str); 15] = [
    (
        "create articles",
        "CREATE TABLE articles (
            id INTEGER PRIMARY KEY,
            name VARCHAR
        )",
    ),
    (
        "create challenges",
        "CREATE TABLE challenges (
            id INTEGER PRIMARY KEY,
            name VARCHAR
        )",
    ),
    (
        "create events",
        "CREATE TABLE events (
            id INTEGER PRIMARY KEY,
            name VARCHAR
        )",
    ),
    (
        "create feature_stewardships",
        "CREATE TABLE feature_stewardships (
            id INTEGER PRIMARY KEY,
            feature_type INTEGER,
            feature_id INTEGER,
            organization_id INTEGER,
            role VARCHAR
        )",
    ),
    (
        "create feature_outings",
        "CREATE TABLE feature_outings (
            id INTEGER PRIMARY KEY,
            feature_type INTEGER,
            feature_id INTEGER,
            outing_id INTEGER
        )",
    ),
    (
        "create feature_super_categories",
        "CREATE TABLE feature_super_categories (
            id INTEGER PRIMARY KEY,
            feature_type INTEGER,
            feature_id INTEGER,
            super_category_id INTEGER
        )",
    ),
    (
        "create feature_types",
        "CREATE TABLE feature_types (
            id INTEGER PRIMARY KEY,
            name VARCHAR
        )",
    ),
    (
        "create feature_tags",
        "CREATE TABLE feature_tags (
            id INTEGER PRIMARY KEY,
            feature_type INTEGER,
            feature_id INTEGER,
            key VARCHAR
        )",
    ),
    (
        "create tag_descriptors",
        "CREATE TABLE tag_descriptors (
            id INTEGER PRIMARY KEY,
            feature_type INTEGER,
            key VARCHAR,
            name VARCHAR,
            category VARCHAR,
            super_category_id INTEGER
        )",
    ),
    (
        "create features",
        "CREATE TABLE features (
            id INTEGER PRIMARY KEY,
            area_id INTEGER,
            closed INTEGER,
            feature_id INTEGER,
            owner_id INTEGER,
            bounds_max_lat FLOAT,
            bounds_max_lon FLOAT,
            bounds_min_lat FLOAT,
            bounds_min_lon FLOAT,
            lat FLOAT,
            lon FLOAT,
            image_file VARCHAR,
            image_id INTEGER,
            name VARCHAR,
            poi_type INTEGER,
            feature_type INTEGER,
            visibility INTEGER,
            area_meters FLOAT,
            difficulty VARCHAR,
            route_type VARCHAR,
            display_length VARCHAR,
            length_meters FLOAT
        )",
    ),
    (
        "create metadata",
        "CREATE TABLE metadata (
            id INTEGER PRIMARY KEY,
            name VARCHAR,
            value VARCHAR
        )",
    ),
    (
        "create organizations",
        "CREATE TABLE organizations (
            id INTEGER PRIMARY KEY,
            image_file VARCHAR,
            image_id INTEGER,
            name VARCHAR
        )",
    ),
    (
        "create poi_types",
        "CREATE TABLE poi_types (
            id INTEGER PRIMARY KEY,
            name VARCHAR
        )",
    ),
    (
        "create super_categories",
        "CREATE TABLE super_categories (
            id INTEGER PRIMARY KEY,
            name VARCHAR
        )",
    ),
    (
        "create visibilities",
        "CREATE TABLE visibilities (
            id INTEGER PRIMARY KEY,
            name VARCHAR
        )",
    ),
];

const INDEXES: [(&str, &str); 7] = [
    (
        "index features by area",
        "CREATE INDEX idx_area_id ON features (area_id)",
    ),
    (
        "index features by type",
        "CREATE INDEX idx_feature_type ON features (feature_type)",
    ),
    (
        "index features by visibility",
        "CREATE INDEX idx_visibility ON features (visibility)",
    ),
    (
        "index feature_outings",
        "CREATE INDEX idx_feature_outings ON feature_outings (feature_type, feature_id)",
    ),
    (
        "index feature_super_categories",
        "CREATE INDEX idx_feature_super_categories \
         ON feature_super_categories (feature_type, feature_id)",
    ),
    (
        "index feature_stewardships",
        "CREATE INDEX idx_feature_stewardships ON feature_stewardships (feature_type, feature_id)",
    ),
    (
        "index feature_tags",
        "CREATE INDEX idx_feature_tags ON feature_tags (feature_type, feature_id)",
    ),
];

pub(super) fn create_tables(transaction: &Transaction<'_>) -> Result<(), SnapshotError> {
    TABLES
        .iter()
        .try_for_each(|&(step, sql)| run_migration_step(transaction, step, sql))
}

pub(super) fn create_indexes(transaction: &Transaction<'_>) -> Result<(), SnapshotError> {
    INDEXES
        .iter()
        .try_for_each(|&(step, sql)| run_migration_step(transaction, step, sql))
}

/// Seed kind names, visibility names and the version/timestamp metadata.
pub(super) fn seed_lookups(transaction: &Transaction<'_>) -> Result<(), SnapshotError> {
    let kinds: Vec<[ColumnValue; 2]> = FeatureKind::ALL
        .iter()
        .map(|kind| {
            [
                ColumnValue::Integer(kind.code()),
                ColumnValue::Text(kind.name().to_owned()),
            ]
        })
        .collect();
    insert_rows(transaction, "feature_types", &["id", "name"], &kinds)?;

    let visibilities: Vec<[ColumnValue; 2]> = Visibility::ALL
        .iter()
        .map(|visibility| {
            [
                ColumnValue::Integer(visibility.code()),
                ColumnValue::Text(visibility.name().to_owned()),
            ]
        })
        .collect();
    insert_rows(transaction, "visibilities", &["id", "name"], &visibilities)?;

    transaction
        .execute(
            "INSERT INTO metadata (name, value) VALUES \
             ('version', ?1), \
             ('created_at', strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
            [SCHEMA_VERSION],
        )
        .map(|_| ())
        .map_err(|source| SnapshotError::Insert {
            table: "metadata",
            source,
        })
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SnapshotError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SnapshotError::Migration { step, source })
}
