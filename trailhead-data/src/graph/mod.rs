//! Access to the feature graph API.
//!
//! The graph API exposes tenants and their features as a GraphQL endpoint.
//! [`FeatureGraph`] is the seam the export pipeline fetches through;
//! [`HttpFeatureGraph`] implements it over HTTP with an admin secret.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use trailhead_data::graph::{FeatureGraph, HttpFeatureGraph, HttpFeatureGraphConfig};
//!
//! # async fn run() -> Result<(), trailhead_data::graph::GraphError> {
//! let config = HttpFeatureGraphConfig::new("https://graph.example.com/v1/graphql", "secret")
//!     .with_timeout(Duration::from_secs(60));
//! let graph = HttpFeatureGraph::new(config)?;
//!
//! for tenant_id in graph.list_tenants().await? {
//!     let features = graph.fetch_features(tenant_id).await?;
//!     println!("tenant {tenant_id}: {} features", features.len());
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod query;

use async_trait::async_trait;
use thiserror::Error;
use trailhead_core::TenantFeatures;

pub use client::{
    ADMIN_SECRET_HEADER, CLIENT_NAME_HEADER, DEFAULT_CLIENT_NAME, DEFAULT_USER_AGENT,
    HttpFeatureGraph, HttpFeatureGraphConfig,
};

/// Errors raised while talking to the feature graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The configured endpoint is not an absolute URL.
    #[error("invalid graph endpoint {endpoint:?}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    BuildClient(#[source] reqwest::Error),
    /// The request never produced a response.
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The request exceeded its deadline.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },
    /// The endpoint answered with a non-success status.
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    /// The response body was not the expected JSON shape.
    #[error("failed to decode graph response")]
    Decode {
        #[source]
        source: simd_json::Error,
    },
    /// The endpoint reported GraphQL errors.
    #[error("graph query failed: {messages}")]
    GraphQl { messages: String },
    /// The response carried neither data nor errors.
    #[error("graph response for {query} has no data")]
    MissingData { query: &'static str },
}

/// Read access to tenants and their features.
#[async_trait]
pub trait FeatureGraph: Send + Sync {
    /// List the ids of every tenant.
    async fn list_tenants(&self) -> Result<Vec<i64>, GraphError>;

    /// Fetch all features belonging to `tenant_id`.
    ///
    /// Collections absent from the response are treated as empty.
    async fn fetch_features(&self, tenant_id: i64) -> Result<TenantFeatures, GraphError>;
}
