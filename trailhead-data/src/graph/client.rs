//! HTTP implementation of [`FeatureGraph`].

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use trailhead_core::TenantFeatures;
use url::Url;

use super::query::{
    FULL_REFETCH_SINCE, GraphRequest, GraphResponse, TENANT_FEATURES_QUERY, TENANTS_QUERY,
    TenantFeaturesData, TenantVariables, TenantsData,
};
use super::{FeatureGraph, GraphError};

/// Default user agent for graph requests.
pub const DEFAULT_USER_AGENT: &str = "trailhead-export/0.1";

/// Header carrying the admin secret.
pub const ADMIN_SECRET_HEADER: &str = "x-hasura-admin-secret";

/// Header naming the calling client.
pub const CLIENT_NAME_HEADER: &str = "x-hasura-client-name";

/// Default value of [`CLIENT_NAME_HEADER`].
pub const DEFAULT_CLIENT_NAME: &str = "trailhead-export";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Configuration for [`HttpFeatureGraph`].
#[derive(Clone)]
pub struct HttpFeatureGraphConfig {
    /// GraphQL endpoint URL.
    pub endpoint: String,
    /// Secret sent in [`ADMIN_SECRET_HEADER`].
    pub admin_secret: String,
    /// Connect and request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Value of [`CLIENT_NAME_HEADER`].
    pub client_name: String,
    /// Idle keep-alive connections retained per host.
    pub pool_max_idle_per_host: usize,
}

impl std::fmt::Debug for HttpFeatureGraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFeatureGraphConfig")
            .field("endpoint", &self.endpoint)
            .field("admin_secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("client_name", &self.client_name)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .finish()
    }
}

impl HttpFeatureGraphConfig {
    /// Create a configuration for `endpoint` authenticated with `admin_secret`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, admin_secret: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            admin_secret: admin_secret.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            client_name: DEFAULT_CLIENT_NAME.to_owned(),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the client name sent with every request.
    #[must_use]
    pub fn with_client_name(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }

    /// Set the number of idle connections kept per host.
    #[must_use]
    pub fn with_pool_max_idle_per_host(mut self, max_idle: usize) -> Self {
        self.pool_max_idle_per_host = max_idle;
        self
    }
}

/// GraphQL-over-HTTP feature graph.
///
/// Holds one pooled [`Client`]; clones share the pool.
#[derive(Debug, Clone)]
pub struct HttpFeatureGraph {
    client: Client,
    endpoint: Url,
    config: HttpFeatureGraphConfig,
}

impl HttpFeatureGraph {
    /// Build a graph client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidEndpoint`] when the endpoint is not an
    /// absolute URL, or [`GraphError::BuildClient`] when the HTTP client
    /// fails to build.
    pub fn new(config: HttpFeatureGraphConfig) -> Result<Self, GraphError> {
        let endpoint =
            Url::parse(&config.endpoint).map_err(|source| GraphError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                source,
            })?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(GraphError::BuildClient)?;
        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    async fn post<V, T>(
        &self,
        label: &'static str,
        query: &'static str,
        variables: V,
    ) -> Result<T, GraphError>
    where
        V: Serialize + Send + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(ADMIN_SECRET_HEADER, &self.config.admin_secret)
            .header(CLIENT_NAME_HEADER, &self.config.client_name)
            .json(&GraphRequest { query, variables })
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(err))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(err))?;
        let body = response
            .bytes()
            .await
            .map_err(|err| self.convert_reqwest_error(err))?;
        debug!("graph response: {} bytes", body.len());
        decode(body.to_vec(), label)
    }

    fn convert_reqwest_error(&self, error: reqwest::Error) -> GraphError {
        let url = self.endpoint.to_string();
        if error.is_timeout() {
            return GraphError::Timeout {
                url,
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return GraphError::Status {
                url,
                status: status.as_u16(),
            };
        }
        GraphError::Transport { url, source: error }
    }
}

/// Decode a GraphQL envelope, surfacing reported errors before data.
fn decode<T: DeserializeOwned>(mut body: Vec<u8>, label: &'static str) -> Result<T, GraphError> {
    let response: GraphResponse<T> =
        simd_json::serde::from_slice(&mut body).map_err(|source| GraphError::Decode { source })?;
    if !response.errors.is_empty() {
        let messages = response
            .errors
            .into_iter()
            .map(|error| error.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(GraphError::GraphQl { messages });
    }
    response.data.ok_or(GraphError::MissingData { query: label })
}

#[async_trait]
impl FeatureGraph for HttpFeatureGraph {
    async fn list_tenants(&self) -> Result<Vec<i64>, GraphError> {
        let data: TenantsData = self
            .post("tenants", TENANTS_QUERY, serde_json::Map::new())
            .await?;
        let tenants = data.communities.ok_or(GraphError::MissingData {
            query: "tenants",
        })?;
        Ok(tenants.into_iter().map(|tenant| tenant.id).collect())
    }

    async fn fetch_features(&self, tenant_id: i64) -> Result<TenantFeatures, GraphError> {
        let data: TenantFeaturesData = self
            .post(
                "tenant features",
                TENANT_FEATURES_QUERY,
                TenantVariables {
                    tenant_id,
                    since: FULL_REFETCH_SINCE,
                },
            )
            .await?;
        let features = TenantFeatures::from(data);
        debug!("tenant {tenant_id}: fetched {} features", features.len());
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn config_defaults() {
        let config = HttpFeatureGraphConfig::new("http://graph.local/v1/graphql", "s3cret");

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.client_name, "trailhead-export");
        assert_eq!(config.pool_max_idle_per_host, 10);
    }

    #[rstest]
    fn debug_output_redacts_secret() {
        let config = HttpFeatureGraphConfig::new("http://graph.local/v1/graphql", "s3cret");

        let rendered = format!("{config:?}");

        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("graph.local"));
    }

    #[rstest]
    fn client_builds_from_config() {
        let config = HttpFeatureGraphConfig::new("http://graph.local/v1/graphql", "s3cret")
            .with_timeout(Duration::from_secs(5))
            .with_pool_max_idle_per_host(2);

        assert!(HttpFeatureGraph::new(config).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("graph.local/v1/graphql")]
    fn relative_endpoints_are_rejected(#[case] endpoint: &str) {
        let err = HttpFeatureGraph::new(HttpFeatureGraphConfig::new(endpoint, "s3cret"))
            .expect_err("endpoint must be absolute");

        assert!(matches!(err, GraphError::InvalidEndpoint { .. }));
    }

    #[rstest]
    fn decode_prefers_reported_errors() {
        let body = br#"{"data":null,"errors":[{"message":"a"},{"message":"b"}]}"#.to_vec();

        let err = decode::<TenantsData>(body, "tenants").expect_err("errors reported");

        match err {
            GraphError::GraphQl { messages } => assert_eq!(messages, "a; b"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[rstest]
    fn decode_requires_data() {
        let body = br#"{"data":null}"#.to_vec();

        let err = decode::<TenantsData>(body, "tenants").expect_err("no data");

        assert!(matches!(err, GraphError::MissingData { query: "tenants" }));
    }

    #[rstest]
    fn decode_rejects_malformed_json() {
        let body = b"<html>bad gateway</html>".to_vec();

        let err = decode::<TenantsData>(body, "tenants").expect_err("not json");

        assert!(matches!(err, GraphError::Decode { .. }));
    }

    #[rstest]
    fn decode_reads_tenant_ids() {
        let body = br#"{"data":{"communities":[{"id":1},{"id":2}]}}"#.to_vec();

        let data = decode::<TenantsData>(body, "tenants").expect("decoded");

        let ids: Vec<i64> = data
            .communities
            .expect("communities")
            .into_iter()
            .map(|row| row.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
