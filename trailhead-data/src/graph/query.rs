//! GraphQL documents and response envelopes for the feature graph.

use serde::{Deserialize, Serialize};
use trailhead_core::{
    AreaSource, OrganizationNode, OutingSource, PointOfInterestSource, TenantFeatures,
    TrailSource,
};

/// Lower bound for the `updated_at` filter. Every cycle refetches in full.
pub const FULL_REFETCH_SINCE: &str = "2000-01-01";

/// Lists every tenant id.
pub const TENANTS_QUERY: &str = "query Tenants { communities { id } }";

/// Composite per-tenant feature query. Aliases match the field names of the
/// source node types; every feature is wrapped as `{ organization_id, feature }`.
pub const TENANT_FEATURES_QUERY: &str = r#"
query TenantFeatures($tenantId: Int!, $since: timestamp!) {
  areas: community_organization_areas_aggregate(
    where: { community_id: { _eq: $tenantId }, area: { updated_at: { _gt: $since } } }
  ) {
    nodes {
      organization_id
      feature: area {
        id
        name
        closed { status }
        image_attachments(order_by: { position: asc }, limit: 1, where: { position: { _is_null: false } }) {
          image { id uploaded_file }
        }
        centroid { geometry }
        extent { geometry }
        super_categories { id }
        visibility
        stewardships { role organization_id }
        size { meters }
        tags(where: { value: { _eq: "yes" } }) { key }
      }
    }
  }
  trails: community_organization_trails_aggregate(
    where: { community_id: { _eq: $tenantId }, trail: { updated_at: { _gt: $since } } }
  ) {
    nodes {
      organization_id
      feature: trail {
        id
        area_id
        name
        closed { status }
        image_attachments(order_by: { position: asc }, limit: 1, where: { position: { _is_null: false } }) {
          image { id uploaded_file }
        }
        start { geometry }
        extent
        super_categories { id }
        visibility
        stewardships { role organization_id }
        cached_length
        tags(where: { value: { _eq: "yes" } }) { key }
      }
    }
  }
  points_of_interest: community_organization_points_of_interest_aggregate(
    where: { community_id: { _eq: $tenantId }, point_of_interest: { updated_at: { _gt: $since } } }
  ) {
    nodes {
      organization_id
      feature: point_of_interest {
        id
        area_id
        name
        closed { status }
        image_attachments(order_by: { position: asc }, limit: 1, where: { position: { _is_null: false } }) {
          image { id uploaded_file }
        }
        location { geometry }
        point_of_interest_type_id
        super_categories { id }
        visibility
        stewardships { role organization_id }
        tags(where: { value: { _eq: "yes" } }) { key }
      }
    }
  }
  outings: community_organization_outings_aggregate(
    where: {
      community_id: { _eq: $tenantId }
      outing: {
        updated_at: { _gt: $since }
        extent: { geometry: { _is_null: false } }
        route: { geometry: { _is_null: false } }
      }
    }
  ) {
    nodes {
      organization_id
      feature: outing {
        id
        name
        featured_image { id uploaded_file }
        start { geometry }
        extent { geometry }
        super_categories { id }
        visibility
        stewardships { role organization_id }
        closed { status }
        difficulty
        route_type
        display_length
        route { length_meters }
        outing_areas { outing_id: attached_id area_id: feature_id }
        tags(where: { value: { _eq: "yes" } }) { key }
      }
    }
  }
}
"#;

/// POST body of a GraphQL request.
#[derive(Debug, Serialize)]
pub struct GraphRequest<'a, V> {
    pub query: &'a str,
    pub variables: V,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantVariables<'a> {
    pub tenant_id: i64,
    pub since: &'a str,
}

/// Response envelope; `errors` wins over `data` when both are present.
#[derive(Debug, Deserialize)]
pub struct GraphResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphErrorMessage>,
}

#[derive(Debug, Deserialize)]
pub struct GraphErrorMessage {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TenantsData {
    pub communities: Option<Vec<TenantRow>>,
}

#[derive(Debug, Deserialize)]
pub struct TenantRow {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct Aggregate<T> {
    pub nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct TenantFeaturesData {
    pub areas: Option<Aggregate<OrganizationNode<AreaSource>>>,
    pub trails: Option<Aggregate<OrganizationNode<TrailSource>>>,
    pub points_of_interest: Option<Aggregate<OrganizationNode<PointOfInterestSource>>>,
    pub outings: Option<Aggregate<OrganizationNode<OutingSource>>>,
}

fn nodes<T>(aggregate: Option<Aggregate<T>>) -> Vec<T> {
    aggregate.map_or_else(Vec::new, |aggregate| aggregate.nodes)
}

impl From<TenantFeaturesData> for TenantFeatures {
    fn from(data: TenantFeaturesData) -> Self {
        Self {
            areas: nodes(data.areas),
            trails: nodes(data.trails),
            points_of_interest: nodes(data.points_of_interest),
            outings: nodes(data.outings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn null_and_missing_collections_become_empty() {
        let mut body = br#"{"data":{"areas":null,"trails":{"nodes":[]}}}"#.to_vec();
        let response: GraphResponse<TenantFeaturesData> =
            simd_json::serde::from_slice(&mut body).expect("decode");

        let features = TenantFeatures::from(response.data.expect("data"));

        assert!(features.is_empty());
        assert!(response.errors.is_empty());
    }

    #[rstest]
    fn decodes_error_messages() {
        let mut body =
            br#"{"data":null,"errors":[{"message":"field not found","extensions":{}}]}"#.to_vec();
        let response: GraphResponse<TenantsData> =
            simd_json::serde::from_slice(&mut body).expect("decode");

        assert!(response.data.is_none());
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, "field not found");
    }

    #[rstest]
    fn variables_use_graphql_names() {
        let request = GraphRequest {
            query: TENANT_FEATURES_QUERY,
            variables: TenantVariables {
                tenant_id: 7,
                since: FULL_REFETCH_SINCE,
            },
        };
        let json = serde_json::to_value(&request).expect("encode");

        assert_eq!(json["variables"]["tenantId"], 7);
        assert_eq!(json["variables"]["since"], "2000-01-01");
    }
}
