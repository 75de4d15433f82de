//! Export command implementation for the Trailhead CLI.

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use trailhead_data::pipeline::{DEFAULT_MAX_CONCURRENT_TENANTS, DEFAULT_WORK_DIR};
use trailhead_data::publish::DEFAULT_REGION;
use trailhead_data::{
    BatchOutcome, ChangeGate, ExportPipeline, HttpFeatureGraph, HttpFeatureGraphConfig,
    PgEventLog, PgReferenceSource, PipelineConfig, PostgresConfig, S3ArtifactStore,
    S3StoreConfig,
};

use crate::CliError;

pub(crate) const ARG_DATABASE_URL: &str = "database-url";
pub(crate) const ARG_EVENTS_DATABASE_URL: &str = "events-database-url";
pub(crate) const ARG_GRAPHQL_URL: &str = "graphql-url";
pub(crate) const ARG_GRAPHQL_ADMIN_SECRET: &str = "graphql-admin-secret";
pub(crate) const ARG_BUCKET: &str = "bucket";
pub(crate) const ARG_TENANT: &str = "tenant";
pub(crate) const ARG_CHECK_ONLY: &str = "check-only";
pub(crate) const ENV_DATABASE_URL: &str = "TRAILHEAD_CMDS_EXPORT_DATABASE_URL";
pub(crate) const ENV_EVENTS_DATABASE_URL: &str = "TRAILHEAD_CMDS_EXPORT_EVENTS_DATABASE_URL";
pub(crate) const ENV_GRAPHQL_URL: &str = "TRAILHEAD_CMDS_EXPORT_GRAPHQL_URL";
pub(crate) const ENV_GRAPHQL_ADMIN_SECRET: &str = "TRAILHEAD_CMDS_EXPORT_GRAPHQL_ADMIN_SECRET";
pub(crate) const ENV_BUCKET: &str = "TRAILHEAD_CMDS_EXPORT_BUCKET";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// CLI arguments for the `export` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Build per-tenant SQLite snapshots from the feature graph and \
                 reference database, then publish them compressed to object \
                 storage. Scheduled runs only rebuild when the event log \
                 records recent changes; --force bypasses that check.",
    about = "Export tenant snapshots"
)]
#[ortho_config(prefix = "TRAILHEAD")]
pub(crate) struct ExportArgs {
    /// Connection string for the reference database.
    #[arg(long = ARG_DATABASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) database_url: Option<String>,
    /// Connection string for the database holding the event log.
    #[arg(long = ARG_EVENTS_DATABASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) events_database_url: Option<String>,
    /// GraphQL endpoint of the feature graph.
    #[arg(long = ARG_GRAPHQL_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) graphql_url: Option<String>,
    /// Admin secret sent to the feature graph.
    #[arg(long = ARG_GRAPHQL_ADMIN_SECRET, value_name = "secret")]
    #[serde(default)]
    pub(crate) graphql_admin_secret: Option<String>,
    /// Destination bucket for published snapshots.
    #[arg(long = ARG_BUCKET, value_name = "name")]
    #[serde(default)]
    pub(crate) bucket: Option<String>,
    /// Bucket region (defaults to us-east-1).
    #[arg(long, value_name = "region")]
    #[serde(default)]
    pub(crate) region: Option<String>,
    /// Directory for transient snapshot files.
    #[arg(long, value_name = "dir")]
    #[serde(default)]
    pub(crate) work_dir: Option<Utf8PathBuf>,
    /// Number of tenants exported at once.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) max_concurrent_tenants: Option<usize>,
    /// Connect and read timeout for network clients, in seconds.
    #[arg(long, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// Rebuild even when no changes were recorded.
    #[arg(long)]
    #[serde(default)]
    pub(crate) force: bool,
    /// Export only this tenant, skipping the change check.
    #[arg(long = ARG_TENANT, value_name = "id")]
    #[serde(default)]
    pub(crate) tenant: Option<i64>,
    /// Report whether a rebuild is due without building anything.
    #[arg(long = ARG_CHECK_ONLY)]
    #[serde(default)]
    pub(crate) check_only: bool,
}

impl ExportArgs {
    pub(crate) fn into_config(self) -> Result<ExportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ExportConfig::try_from(merged)
    }
}

/// What an export invocation should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExportMode {
    /// Run the batch, honouring the change gate unless forced.
    Batch { force: bool },
    /// Export one tenant unconditionally.
    Tenant(i64),
    /// Consult the change gate only.
    Check { force: bool },
}

/// Resolved `export` command configuration.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct ExportConfig {
    pub(crate) database_url: String,
    pub(crate) events_database_url: String,
    pub(crate) graphql_url: String,
    pub(crate) graphql_admin_secret: String,
    pub(crate) bucket: String,
    pub(crate) region: String,
    pub(crate) work_dir: Utf8PathBuf,
    pub(crate) max_concurrent_tenants: usize,
    pub(crate) timeout: Duration,
    pub(crate) mode: ExportMode,
}

impl std::fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportConfig")
            .field("database_url", &"<redacted>")
            .field("events_database_url", &"<redacted>")
            .field("graphql_url", &self.graphql_url)
            .field("graphql_admin_secret", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("work_dir", &self.work_dir)
            .field("max_concurrent_tenants", &self.max_concurrent_tenants)
            .field("timeout", &self.timeout)
            .field("mode", &self.mode)
            .finish()
    }
}

impl TryFrom<ExportArgs> for ExportConfig {
    type Error = CliError;

    fn try_from(args: ExportArgs) -> Result<Self, Self::Error> {
        let mode = match (args.tenant, args.check_only) {
            (Some(_), true) => {
                return Err(CliError::ConflictingModes {
                    first: ARG_TENANT,
                    second: ARG_CHECK_ONLY,
                });
            }
            (Some(tenant_id), false) => ExportMode::Tenant(tenant_id),
            (None, true) => ExportMode::Check { force: args.force },
            (None, false) => ExportMode::Batch { force: args.force },
        };
        let database_url = args.database_url.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE_URL,
            env: ENV_DATABASE_URL,
        })?;
        let events_database_url = args.events_database_url.ok_or(CliError::MissingArgument {
            field: ARG_EVENTS_DATABASE_URL,
            env: ENV_EVENTS_DATABASE_URL,
        })?;
        let graphql_url = args.graphql_url.ok_or(CliError::MissingArgument {
            field: ARG_GRAPHQL_URL,
            env: ENV_GRAPHQL_URL,
        })?;
        let graphql_admin_secret = args.graphql_admin_secret.ok_or(CliError::MissingArgument {
            field: ARG_GRAPHQL_ADMIN_SECRET,
            env: ENV_GRAPHQL_ADMIN_SECRET,
        })?;
        let bucket = args.bucket.ok_or(CliError::MissingArgument {
            field: ARG_BUCKET,
            env: ENV_BUCKET,
        })?;

        Ok(Self {
            database_url,
            events_database_url,
            graphql_url,
            graphql_admin_secret,
            bucket,
            region: args.region.unwrap_or_else(|| DEFAULT_REGION.to_owned()),
            work_dir: args
                .work_dir
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_WORK_DIR)),
            max_concurrent_tenants: args
                .max_concurrent_tenants
                .unwrap_or(DEFAULT_MAX_CONCURRENT_TENANTS)
                .max(1),
            timeout: Duration::from_secs(args.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            mode,
        })
    }
}

/// Summary of a finished export invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportReport {
    /// The change gate declined the batch.
    Skipped,
    /// Gate-only check result.
    Checked { rebuild: bool },
    /// A batch ran to completion.
    Batch { published: usize, failed: usize },
    /// A single tenant was published under `key`.
    Tenant { key: String },
}

impl ExportReport {
    /// Number of tenants whose export failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        match self {
            Self::Batch { failed, .. } => *failed,
            Self::Skipped | Self::Checked { .. } | Self::Tenant { .. } => 0,
        }
    }
}

pub(crate) async fn run_export(args: ExportArgs) -> Result<ExportReport, CliError> {
    let config = args.into_config()?;
    info!("resolved export configuration: {config:?}");
    let pipeline = connect(&config).await?;
    execute(&pipeline, config.mode).await
}

/// Construct the production pipeline for `config`.
async fn connect(config: &ExportConfig) -> Result<ExportPipeline, CliError> {
    let references = PostgresConfig::new(config.database_url.as_str())
        .connect_lazy()
        .map_err(|source| CliError::ConnectDatabase {
            field: ARG_DATABASE_URL,
            source,
        })?;
    let events = PostgresConfig::new(config.events_database_url.as_str())
        .connect_lazy()
        .map_err(|source| CliError::ConnectDatabase {
            field: ARG_EVENTS_DATABASE_URL,
            source,
        })?;
    let graph = HttpFeatureGraph::new(
        HttpFeatureGraphConfig::new(
            config.graphql_url.as_str(),
            config.graphql_admin_secret.as_str(),
        )
        .with_timeout(config.timeout),
    )
    .map_err(CliError::BuildGraphClient)?;
    let store = S3ArtifactStore::new(
        &S3StoreConfig::new(config.bucket.as_str())
            .with_region(config.region.as_str())
            .with_timeout(config.timeout),
    )
    .await;

    Ok(ExportPipeline::new(
        ChangeGate::new(Arc::new(PgEventLog::new(events))),
        Arc::new(PgReferenceSource::new(references)),
        Arc::new(graph),
        Arc::new(store),
        PipelineConfig::default()
            .with_work_dir(config.work_dir.clone())
            .with_max_concurrent_tenants(config.max_concurrent_tenants),
    ))
}

/// Run `mode` against an already constructed pipeline.
pub(crate) async fn execute(
    pipeline: &ExportPipeline,
    mode: ExportMode,
) -> Result<ExportReport, CliError> {
    match mode {
        ExportMode::Check { force } => Ok(ExportReport::Checked {
            rebuild: pipeline.check(force).await,
        }),
        ExportMode::Tenant(tenant_id) => pipeline
            .build_tenant(tenant_id, None)
            .await
            .map(|artifact| ExportReport::Tenant { key: artifact.key })
            .map_err(|source| CliError::Tenant {
                tenant_id,
                source: Box::new(source),
            }),
        ExportMode::Batch { force } => {
            let outcome = pipeline.build_all(force).await.map_err(CliError::Batch)?;
            let failed = outcome.failures();
            Ok(match outcome {
                BatchOutcome::Skipped => ExportReport::Skipped,
                BatchOutcome::Built(outcomes) => ExportReport::Batch {
                    published: outcomes.len().saturating_sub(failed),
                    failed,
                },
            })
        }
    }
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ExportConfig, CliError> {
    let merged = ExportArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ExportConfig::try_from(merged)
}
