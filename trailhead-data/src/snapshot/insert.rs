//! Batched multi-row inserts.
//!
//! Rows are grouped into `INSERT ... VALUES (..), (..)` statements whose
//! bound parameter count stays within SQLite's per-statement limit. Values
//! are always bound, never spliced into the statement text.

use rusqlite::{Transaction, params_from_iter};
use trailhead_core::{
    ColumnValue, FeatureKind, NamedEntity, Organization, OutingAreaLink, StewardshipLink,
    SuperCategoryLink, TagDescriptor, TagLink,
};

use super::SnapshotError;

/// Default `SQLITE_MAX_VARIABLE_NUMBER` for SQLite builds before 3.32.
pub(crate) const SQLITE_MAX_VARIABLE_NUMBER: usize = 999;

/// Rows that fit in one statement for a table of `width` columns.
pub(crate) fn rows_per_statement(width: usize) -> usize {
    (SQLITE_MAX_VARIABLE_NUMBER / width.max(1)).max(1)
}

fn statement(table: &str, columns: &[&str], rows: usize) -> String {
    let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
    format!(
        "INSERT INTO {table} ({}) VALUES {}",
        columns.join(", "),
        vec![placeholders.as_str(); rows].join(", ")
    )
}

/// Insert `rows` into `table`, returning the number of rows written.
///
/// Every row must hold exactly one value per entry in `columns`.
pub(crate) fn insert_rows<R>(
    transaction: &Transaction<'_>,
    table: &'static str,
    columns: &[&str],
    rows: &[R],
) -> Result<usize, SnapshotError>
where
    R: AsRef<[ColumnValue]>,
{
    let mut written = 0;
    for chunk in rows.chunks(rows_per_statement(columns.len())) {
        let sql = statement(table, columns, chunk.len());
        let mut insert = transaction
            .prepare_cached(&sql)
            .map_err(|source| SnapshotError::Insert { table, source })?;
        written += insert
            .execute(params_from_iter(
                chunk.iter().flat_map(|row| row.as_ref().iter()),
            ))
            .map_err(|source| SnapshotError::Insert { table, source })?;
    }
    Ok(written)
}

fn text(value: Option<&str>) -> ColumnValue {
    value.map_or(ColumnValue::Null, |text| ColumnValue::Text(text.to_owned()))
}

fn integer(value: Option<i64>) -> ColumnValue {
    value.map_or(ColumnValue::Null, ColumnValue::Integer)
}

pub(super) fn named_row(entity: &NamedEntity) -> [ColumnValue; 2] {
    [
        ColumnValue::Integer(entity.id),
        text(entity.name.as_deref()),
    ]
}

pub(super) const ORGANIZATION_COLUMNS: [&str; 4] = ["id", "image_file", "image_id", "name"];

pub(super) fn organization_row(organization: &Organization) -> [ColumnValue; 4] {
    [
        ColumnValue::Integer(organization.id),
        text(organization.logo_file.as_deref()),
        integer(organization.logo_image_id),
        text(organization.name.as_deref()),
    ]
}

pub(super) const TAG_DESCRIPTOR_COLUMNS: [&str; 6] = [
    "id",
    "feature_type",
    "key",
    "name",
    "category",
    "super_category_id",
];

pub(super) fn tag_descriptor_row(descriptor: &TagDescriptor) -> [ColumnValue; 6] {
    [
        ColumnValue::Integer(descriptor.id),
        text(descriptor.feature_type.as_deref()),
        text(descriptor.key.as_deref()),
        text(descriptor.name.as_deref()),
        text(descriptor.category.as_deref()),
        integer(descriptor.super_category_id),
    ]
}

pub(super) const SUPER_CATEGORY_LINK_COLUMNS: [&str; 3] =
    ["feature_type", "feature_id", "super_category_id"];

pub(super) fn super_category_link_row(link: &SuperCategoryLink) -> [ColumnValue; 3] {
    [
        ColumnValue::Integer(link.kind.code()),
        ColumnValue::Integer(link.feature_id),
        ColumnValue::Integer(link.super_category_id),
    ]
}

pub(super) const STEWARDSHIP_LINK_COLUMNS: [&str; 4] =
    ["feature_type", "feature_id", "organization_id", "role"];

pub(super) fn stewardship_link_row(link: &StewardshipLink) -> [ColumnValue; 4] {
    [
        ColumnValue::Integer(link.kind.code()),
        ColumnValue::Integer(link.feature_id),
        ColumnValue::Integer(link.organization_id),
        text(link.role.as_deref()),
    ]
}

pub(super) const TAG_LINK_COLUMNS: [&str; 3] = ["feature_type", "feature_id", "key"];

pub(super) fn tag_link_row(link: &TagLink) -> [ColumnValue; 3] {
    [
        ColumnValue::Integer(link.kind.code()),
        ColumnValue::Integer(link.feature_id),
        ColumnValue::Text(link.key.clone()),
    ]
}

pub(super) const OUTING_LINK_COLUMNS: [&str; 3] = ["feature_type", "feature_id", "outing_id"];

/// Outing links are stored against the area they reach.
pub(super) fn outing_link_row(link: &OutingAreaLink) -> [ColumnValue; 3] {
    [
        ColumnValue::Integer(FeatureKind::Area.code()),
        ColumnValue::Integer(link.area_id),
        ColumnValue::Integer(link.outing_id),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 999)]
    #[case(3, 333)]
    #[case(16, 62)]
    #[case(18, 55)]
    #[case(1000, 1)]
    fn chunks_respect_the_parameter_ceiling(#[case] width: usize, #[case] expected: usize) {
        let rows = rows_per_statement(width);

        assert_eq!(rows, expected);
        assert!(rows == 1 || rows * width <= SQLITE_MAX_VARIABLE_NUMBER);
    }

    #[rstest]
    fn statement_lists_one_group_per_row() {
        let sql = statement("poi_types", &["id", "name"], 2);

        assert_eq!(
            sql,
            "INSERT INTO poi_types (id, name) VALUES (?, ?), (?, ?)"
        );
    }

    #[rstest]
    fn outing_links_point_at_areas() {
        let row = outing_link_row(&OutingAreaLink {
            area_id: 5,
            outing_id: 9,
        });

        assert_eq!(
            row,
            [
                ColumnValue::Integer(1),
                ColumnValue::Integer(5),
                ColumnValue::Integer(9)
            ]
        );
    }
}
