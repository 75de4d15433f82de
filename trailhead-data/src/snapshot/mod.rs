//! Per-tenant SQLite snapshot construction.
//!
//! [`build_snapshot`] creates a fresh database file, lays down the fixed
//! schema and indexes, seeds the lookup tables and bulk-inserts the tenant's
//! reference and feature rows inside a single transaction. The connection is
//! always closed before an error propagates, and a failed build removes its
//! partial file so nothing incomplete can be published.
//!
//! # Examples
//!
//! ```
//! use camino::Utf8PathBuf;
//! use tempfile::TempDir;
//! use trailhead_core::{ReferenceData, TenantDataset, TenantReferenceData};
//! use trailhead_data::snapshot::build_snapshot;
//!
//! let dir = TempDir::new().expect("create temp dir");
//! let path = Utf8PathBuf::from_path_buf(dir.path().join("tenant_1_features.db"))
//!     .expect("utf-8 path");
//!
//! let summary = build_snapshot(
//!     &path,
//!     &ReferenceData::default(),
//!     &TenantReferenceData::default(),
//!     &TenantDataset::default(),
//! )
//! .expect("build snapshot");
//! assert_eq!(summary.features, 0);
//! assert!(path.exists());
//! ```

mod insert;
mod schema;

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use rusqlite::{Connection, Error as SqliteError, Transaction};
use thiserror::Error;
use trailhead_core::{
    FeatureKind, NamedEntity, ReferenceData, TenantDataset, TenantReferenceData,
};

use insert::{
    ORGANIZATION_COLUMNS, OUTING_LINK_COLUMNS, STEWARDSHIP_LINK_COLUMNS,
    SUPER_CATEGORY_LINK_COLUMNS, TAG_DESCRIPTOR_COLUMNS, TAG_LINK_COLUMNS, insert_rows,
    named_row, organization_row, outing_link_row, stewardship_link_row, super_category_link_row,
    tag_descriptor_row, tag_link_row,
};

/// Errors raised while building a snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The directory holding the snapshot could not be created.
    #[error("failed to prepare snapshot directory for {path}")]
    WorkDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A snapshot left over from an earlier run could not be removed.
    #[error("failed to remove existing snapshot {path}")]
    RemoveExisting {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}")]
    Open {
        path: Utf8PathBuf,
        #[source]
        source: SqliteError,
    },
    /// A DDL statement failed.
    #[error("failed to execute migration step '{step}'")]
    Migration {
        step: &'static str,
        #[source]
        source: SqliteError,
    },
    /// Writing rows to a table failed.
    #[error("failed to insert rows into {table}")]
    Insert {
        table: &'static str,
        #[source]
        source: SqliteError,
    },
    /// Committing the build transaction failed.
    #[error("failed to commit snapshot transaction")]
    Commit {
        #[source]
        source: SqliteError,
    },
    /// Closing the database failed.
    #[error("failed to close SQLite database")]
    Close {
        #[source]
        source: SqliteError,
    },
}

/// Row counts written to a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotSummary {
    /// Rows in `features`.
    pub features: usize,
    /// Rows across the four association tables.
    pub associations: usize,
    /// Rows across the reference tables, excluding fixed lookups.
    pub references: usize,
}

/// Build the snapshot for one tenant at `path`.
///
/// Any file already at `path` is replaced. Parent directories are created as
/// needed.
///
/// # Errors
///
/// Returns a [`SnapshotError`] naming the failed step. The partial file is
/// removed before the error is returned.
pub fn build_snapshot(
    path: &Utf8Path,
    reference: &ReferenceData,
    tenant: &TenantReferenceData,
    dataset: &TenantDataset,
) -> Result<SnapshotSummary, SnapshotError> {
    trailhead_fs::ensure_parent_dir(path).map_err(|source| SnapshotError::WorkDir {
        path: path.to_path_buf(),
        source,
    })?;
    trailhead_fs::remove_file_if_exists(path).map_err(|source| {
        SnapshotError::RemoveExisting {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let mut connection =
        Connection::open(path.as_std_path()).map_err(|source| SnapshotError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let populated = populate(&mut connection, reference, tenant, dataset);
    let closed = connection
        .close()
        .map_err(|(_, source)| SnapshotError::Close { source });

    match (populated, closed) {
        (Ok(summary), Ok(())) => Ok(summary),
        (Err(err), _) | (Ok(_), Err(err)) => {
            discard_partial(path);
            Err(err)
        }
    }
}

fn discard_partial(path: &Utf8Path) {
    if let Err(err) = trailhead_fs::remove_file_if_exists(path) {
        warn!("failed to remove partial snapshot {path}: {err}");
    }
}

fn populate(
    connection: &mut Connection,
    reference: &ReferenceData,
    tenant: &TenantReferenceData,
    dataset: &TenantDataset,
) -> Result<SnapshotSummary, SnapshotError> {
    let transaction = connection
        .transaction()
        .map_err(|source| SnapshotError::Migration {
            step: "begin snapshot transaction",
            source,
        })?;

    schema::create_tables(&transaction)?;
    schema::create_indexes(&transaction)?;
    schema::seed_lookups(&transaction)?;

    let references = insert_references(&transaction, reference, tenant)?;
    let features = insert_features(&transaction, dataset)?;
    let associations = insert_associations(&transaction, dataset)?;

    transaction
        .commit()
        .map_err(|source| SnapshotError::Commit { source })?;

    Ok(SnapshotSummary {
        features,
        associations,
        references,
    })
}

fn insert_references(
    transaction: &Transaction<'_>,
    reference: &ReferenceData,
    tenant: &TenantReferenceData,
) -> Result<usize, SnapshotError> {
    let named = |table: &'static str, entities: &[NamedEntity]| {
        let rows: Vec<_> = entities.iter().map(named_row).collect();
        insert_rows(transaction, table, &["id", "name"], &rows)
    };

    let organizations: Vec<_> = tenant.organizations.iter().map(organization_row).collect();
    let descriptors: Vec<_> = reference
        .tag_descriptors
        .iter()
        .map(tag_descriptor_row)
        .collect();

    let mut written = insert_rows(
        transaction,
        "organizations",
        &ORGANIZATION_COLUMNS,
        &organizations,
    )?;
    written += named("poi_types", &reference.poi_types)?;
    written += named("super_categories", &reference.super_categories)?;
    written += insert_rows(
        transaction,
        "tag_descriptors",
        &TAG_DESCRIPTOR_COLUMNS,
        &descriptors,
    )?;
    written += named("articles", &tenant.articles)?;
    written += named("challenges", &tenant.challenges)?;
    written += named("events", &tenant.events)?;
    debug!("inserted {written} reference rows");
    Ok(written)
}

fn insert_features(
    transaction: &Transaction<'_>,
    dataset: &TenantDataset,
) -> Result<usize, SnapshotError> {
    let mut written = 0;
    for kind in FeatureKind::ALL {
        let rows: Vec<&[_]> = dataset
            .rows(kind)
            .map(|row| row.values.as_slice())
            .collect();
        if rows.is_empty() {
            continue;
        }
        let inserted = insert_rows(transaction, "features", kind.columns(), &rows)?;
        debug!("inserted {inserted} {kind} rows");
        written += inserted;
    }
    Ok(written)
}

fn insert_associations(
    transaction: &Transaction<'_>,
    dataset: &TenantDataset,
) -> Result<usize, SnapshotError> {
    let mut written = 0;
    for kind in FeatureKind::ALL {
        let super_categories: Vec<_> = dataset
            .super_categories()
            .iter()
            .filter(|link| link.kind == kind)
            .map(super_category_link_row)
            .collect();
        let stewardships: Vec<_> = dataset
            .stewardships()
            .iter()
            .filter(|link| link.kind == kind)
            .map(stewardship_link_row)
            .collect();
        let tags: Vec<_> = dataset
            .tags()
            .iter()
            .filter(|link| link.kind == kind)
            .map(tag_link_row)
            .collect();

        written += insert_rows(
            transaction,
            "feature_super_categories",
            &SUPER_CATEGORY_LINK_COLUMNS,
            &super_categories,
        )?;
        written += insert_rows(
            transaction,
            "feature_stewardships",
            &STEWARDSHIP_LINK_COLUMNS,
            &stewardships,
        )?;
        if kind == FeatureKind::Outing {
            let outings: Vec<_> = dataset.outing_areas().iter().map(outing_link_row).collect();
            written += insert_rows(
                transaction,
                "feature_outings",
                &OUTING_LINK_COLUMNS,
                &outings,
            )?;
        }
        written += insert_rows(transaction, "feature_tags", &TAG_LINK_COLUMNS, &tags)?;
    }
    debug!("inserted {written} association rows");
    Ok(written)
}

#[cfg(test)]
mod tests;
