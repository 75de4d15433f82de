//! Error types emitted by the Trailhead CLI.

use std::sync::Arc;

use thiserror::Error;
use trailhead_data::{GraphError, PipelineError, TenantError};

/// Errors emitted by the Trailhead CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// Two mutually exclusive modes were requested.
    #[error("--{first} cannot be combined with --{second}")]
    ConflictingModes {
        first: &'static str,
        second: &'static str,
    },
    /// A Postgres connection string could not be used.
    #[error("invalid connection string for {field}: {source}")]
    ConnectDatabase {
        field: &'static str,
        #[source]
        source: sqlx::Error,
    },
    /// The graph client could not be constructed.
    #[error("failed to build graph client: {0}")]
    BuildGraphClient(#[source] GraphError),
    /// The batch could not start.
    #[error("batch export failed: {0}")]
    Batch(#[source] PipelineError),
    /// A single-tenant export failed.
    #[error("export of tenant {tenant_id} failed: {source}")]
    Tenant {
        tenant_id: i64,
        #[source]
        source: Box<TenantError>,
    },
}
