//! Reference-data loading from the relational source.
//!
//! Tenant-independent lookups are loaded once per batch and shared; lookups
//! scoped to a tenant are filtered through the tenant's organization
//! memberships.

use async_trait::async_trait;
use log::debug;
use sqlx::{PgPool, Postgres};
use thiserror::Error;
use trailhead_core::{NamedEntity, Organization, ReferenceData, TagDescriptor, TenantReferenceData};

/// Organizations belonging to tenant `$1`.
const MEMBER_ORGANIZATIONS: &str = "SELECT member_id FROM community_memberships \
     WHERE community_id = $1 AND member_type = 'Organization'";

/// Errors raised while loading reference data.
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// A lookup query failed.
    #[error("failed to load {operation}")]
    Query {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

/// Source of reference lookups.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    /// Load the tenant-independent lookups.
    async fn load_shared(&self) -> Result<ReferenceData, ReferenceError>;

    /// Load lookups scoped to `tenant_id`.
    async fn load_tenant(&self, tenant_id: i64) -> Result<TenantReferenceData, ReferenceError>;
}

#[derive(Debug, sqlx::FromRow)]
struct NamedRow {
    id: i64,
    name: Option<String>,
}

impl From<NamedRow> for NamedEntity {
    fn from(row: NamedRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TagDescriptorRow {
    id: i64,
    feature_type: Option<String>,
    key: Option<String>,
    name: Option<String>,
    category: Option<String>,
    super_category_id: Option<i64>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrganizationRow {
    id: i64,
    name: Option<String>,
    logo_image_id: Option<i64>,
    uploaded_file: Option<String>,
}

/// [`ReferenceSource`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgReferenceSource {
    pool: PgPool,
}

impl PgReferenceSource {
    /// Read reference tables through `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn named(
        &self,
        operation: &'static str,
        sql: &str,
        tenant_id: Option<i64>,
    ) -> Result<Vec<NamedEntity>, ReferenceError> {
        let query = sqlx::query_as::<Postgres, NamedRow>(sql);
        let query = match tenant_id {
            Some(id) => query.bind(id),
            None => query,
        };
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|source| ReferenceError::Query { operation, source })?;
        debug!("loaded {} {operation}", rows.len());
        Ok(rows.into_iter().map(NamedEntity::from).collect())
    }

    async fn tag_descriptors(&self) -> Result<Vec<TagDescriptor>, ReferenceError> {
        let rows = sqlx::query_as::<Postgres, TagDescriptorRow>(
            "SELECT td.id::int8 AS id, td.feature_type::text AS feature_type, td.key, td.name, \
                    td.super_category_id::int8 AS super_category_id, tc.name AS category \
             FROM tag_descriptors td \
             JOIN tag_categories tc ON td.tag_category_id = tc.id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|source| ReferenceError::Query {
            operation: "tag descriptors",
            source,
        })?;
        debug!("loaded {} tag descriptors", rows.len());
        Ok(rows
            .into_iter()
            .map(|row| TagDescriptor {
                id: row.id,
                feature_type: row.feature_type,
                key: row.key,
                name: row.name,
                category: row.category,
                super_category_id: row.super_category_id,
            })
            .collect())
    }

    async fn organizations(&self, tenant_id: i64) -> Result<Vec<Organization>, ReferenceError> {
        let sql = format!(
            "SELECT o.id::int8 AS id, o.name, o.logo_image_id::int8 AS logo_image_id, \
                    i.uploaded_file \
             FROM organizations o \
             LEFT JOIN images i ON o.logo_image_id = i.id \
             WHERE o.id IN ({MEMBER_ORGANIZATIONS})"
        );
        let rows = sqlx::query_as::<Postgres, OrganizationRow>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| ReferenceError::Query {
                operation: "organizations",
                source,
            })?;
        Ok(rows
            .into_iter()
            .map(|row| Organization {
                id: row.id,
                name: row.name,
                logo_image_id: row.logo_image_id,
                logo_file: row.uploaded_file,
            })
            .collect())
    }
}

#[async_trait]
impl ReferenceSource for PgReferenceSource {
    async fn load_shared(&self) -> Result<ReferenceData, ReferenceError> {
        let poi_types = self
            .named(
                "point of interest types",
                "SELECT id::int8 AS id, name FROM point_of_interest_types",
                None,
            )
            .await?;
        let super_categories = self
            .named(
                "super categories",
                "SELECT id::int8 AS id, name FROM tag_categories WHERE group_id IS NOT NULL",
                None,
            )
            .await?;
        let tag_descriptors = self.tag_descriptors().await?;
        Ok(ReferenceData {
            poi_types,
            super_categories,
            tag_descriptors,
        })
    }

    async fn load_tenant(&self, tenant_id: i64) -> Result<TenantReferenceData, ReferenceError> {
        let articles = self
            .named(
                "articles",
                &format!(
                    "SELECT id::int8 AS id, name FROM content_bundles \
                     WHERE visibility = 'Published' AND feature_id IN ({MEMBER_ORGANIZATIONS})"
                ),
                Some(tenant_id),
            )
            .await?;
        let challenges = self
            .named(
                "challenges",
                &format!(
                    "SELECT id::int8 AS id, name FROM challenges \
                     WHERE organization_id IN ({MEMBER_ORGANIZATIONS})"
                ),
                Some(tenant_id),
            )
            .await?;
        let events = self
            .named(
                "events",
                &format!(
                    "SELECT id::int8 AS id, name FROM future_events \
                     WHERE id IN (SELECT id FROM events WHERE organization_id IN ({MEMBER_ORGANIZATIONS}))"
                ),
                Some(tenant_id),
            )
            .await?;
        let organizations = self.organizations(tenant_id).await?;
        debug!(
            "tenant {tenant_id}: {} organizations, {} articles, {} challenges, {} events",
            organizations.len(),
            articles.len(),
            challenges.len(),
            events.len()
        );
        Ok(TenantReferenceData {
            organizations,
            articles,
            challenges,
            events,
        })
    }
}
