//! # API Resources
//!
//! An API definition comes in one of two shapes:
//!
//! - **Classic**: a flat record with identity fields at the top level
//! - **OAS**: an OpenAPI document whose gateway metadata sits in the
//!   `x-api-gateway` vendor extension
//!
//! [`ApiResource`] is the sum of both. Its accessors are the only place that
//! looks at the shape; everything else goes through [`SyncResource`] and the
//! API-specific accessors below.
//!
//! Classic APIs encode category membership as `#category` tokens appended to
//! the name (`orders#billing#public`). OAS APIs carry an explicit category
//! list and honour name tokens as well.

use super::identity::{self, KeyStrategy, TargetProfile};
use super::{non_empty, ResourceKind, SyncResource};
use crate::constants::CATEGORY_MARKER;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// API definition in the flat classic schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassicApi {
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub internal_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub org_id: String,
    #[serde(default)]
    pub route_path: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Every other field of the definition, carried through untouched
    #[serde(flatten)]
    pub definition: Map<String, Value>,
}

/// Identity block of the gateway extension
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionInfo {
    #[serde(default, rename = "id")]
    pub external_id: String,
    #[serde(default)]
    pub internal_id: String,
    #[serde(default)]
    pub org_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Version the definition is published under, empty when unversioned
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version_name: String,
}

/// Routing block of the gateway extension
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionServer {
    #[serde(default)]
    pub route_path: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strip_route_path: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Upstream block of the gateway extension
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionUpstream {
    #[serde(default)]
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExtensionUpstream {
    pub fn is_empty(&self) -> bool {
        self.url.is_empty() && self.extra.is_empty()
    }
}

/// The `x-api-gateway` vendor extension
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayExtension {
    #[serde(default)]
    pub info: ExtensionInfo,
    #[serde(default)]
    pub server: ExtensionServer,
    #[serde(default, skip_serializing_if = "ExtensionUpstream::is_empty")]
    pub upstream: ExtensionUpstream,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// OpenAPI document carrying gateway metadata in its vendor extension
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OasApi {
    #[serde(rename = "x-api-gateway")]
    pub extension: GatewayExtension,
    /// The rest of the OpenAPI document (`openapi`, `info`, `paths`, ...)
    #[serde(flatten)]
    pub document: Map<String, Value>,
}

impl OasApi {
    fn title(&self) -> &str {
        self.document
            .get("info")
            .and_then(|info| info.get("title"))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

/// One API definition in either shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiResource {
    Oas(OasApi),
    Classic(ClassicApi),
}

impl From<ClassicApi> for ApiResource {
    fn from(api: ClassicApi) -> Self {
        ApiResource::Classic(api)
    }
}

impl From<OasApi> for ApiResource {
    fn from(api: OasApi) -> Self {
        ApiResource::Oas(api)
    }
}

impl ApiResource {
    /// Parse a document known to be in the classic schema
    pub fn classic_from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value::<ClassicApi>(value).map(ApiResource::Classic)
    }

    /// Parse a document known to be an OpenAPI document with the gateway extension
    pub fn oas_from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value::<OasApi>(value).map(ApiResource::Oas)
    }

    pub fn is_oas(&self) -> bool {
        matches!(self, ApiResource::Oas(_))
    }

    pub fn as_oas_mut(&mut self) -> Option<&mut OasApi> {
        match self {
            ApiResource::Oas(api) => Some(api),
            ApiResource::Classic(_) => None,
        }
    }

    /// Policy IDs bound to OpenID Connect client IDs, in declaration order
    ///
    /// Read from `openid_options.providers[].client_ids`, a map of client ID
    /// to policy ID.
    pub fn oidc_policy_ids(&self) -> Vec<String> {
        let options = match self {
            ApiResource::Classic(api) => api.definition.get("openid_options"),
            ApiResource::Oas(api) => api.extension.extra.get("openid_options"),
        };
        let providers = options
            .and_then(|o| o.get("providers"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut ids: Vec<String> = Vec::new();
        for provider in providers {
            let Some(client_ids) = provider.get("client_ids").and_then(Value::as_object) else {
                continue;
            };
            for policy_id in client_ids.values().filter_map(Value::as_str) {
                if !policy_id.is_empty() && !ids.iter().any(|id| id == policy_id) {
                    ids.push(policy_id.to_string());
                }
            }
        }
        ids
    }

    pub fn route_path(&self) -> &str {
        match self {
            ApiResource::Classic(api) => &api.route_path,
            ApiResource::Oas(api) => &api.extension.server.route_path,
        }
    }

    pub fn domain(&self) -> &str {
        match self {
            ApiResource::Classic(api) => &api.domain,
            ApiResource::Oas(api) => &api.extension.server.domain,
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            ApiResource::Classic(api) => &api.slug,
            ApiResource::Oas(api) => &api.extension.info.slug,
        }
    }

    /// Categories this API belongs to, in declaration order without duplicates
    pub fn categories(&self) -> Vec<String> {
        let mut categories = name_categories(self.display_name());
        if let ApiResource::Oas(api) = self {
            for category in &api.extension.info.categories {
                let category = category.trim().trim_start_matches(CATEGORY_MARKER);
                if !category.is_empty() && !categories.iter().any(|c| c == category) {
                    categories.push(category.to_string());
                }
            }
        }
        categories
    }

    pub fn has_category(&self, category: &str) -> bool {
        let wanted = category.trim().trim_start_matches(CATEGORY_MARKER);
        self.categories().iter().any(|c| c == wanted)
    }
}

/// `#token` suffixes of a name: `"orders#billing#eu"` yields `["billing", "eu"]`
pub fn name_categories(name: &str) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for token in name.split(CATEGORY_MARKER).skip(1) {
        let token = token.trim();
        if !token.is_empty() && !categories.iter().any(|c| c == token) {
            categories.push(token.to_string());
        }
    }
    categories
}

impl SyncResource for ApiResource {
    const KIND: ResourceKind = ResourceKind::Api;

    fn external_id(&self) -> &str {
        match self {
            ApiResource::Classic(api) => &api.external_id,
            ApiResource::Oas(api) => &api.extension.info.external_id,
        }
    }

    fn set_external_id(&mut self, id: &str) {
        match self {
            ApiResource::Classic(api) => api.external_id = id.to_string(),
            ApiResource::Oas(api) => api.extension.info.external_id = id.to_string(),
        }
    }

    fn internal_id(&self) -> &str {
        match self {
            ApiResource::Classic(api) => &api.internal_id,
            ApiResource::Oas(api) => &api.extension.info.internal_id,
        }
    }

    fn set_internal_id(&mut self, id: &str) {
        match self {
            ApiResource::Classic(api) => api.internal_id = id.to_string(),
            ApiResource::Oas(api) => api.extension.info.internal_id = id.to_string(),
        }
    }

    fn org_id(&self) -> &str {
        match self {
            ApiResource::Classic(api) => &api.org_id,
            ApiResource::Oas(api) => &api.extension.info.org_id,
        }
    }

    fn set_org_id(&mut self, org_id: &str) {
        match self {
            ApiResource::Classic(api) => api.org_id = org_id.to_string(),
            ApiResource::Oas(api) => api.extension.info.org_id = org_id.to_string(),
        }
    }

    fn display_name(&self) -> &str {
        match self {
            ApiResource::Classic(api) => api.name.as_str(),
            ApiResource::Oas(api) if !api.extension.info.name.is_empty() => {
                api.extension.info.name.as_str()
            }
            ApiResource::Oas(api) => api.title(),
        }
    }

    fn tags(&self) -> &[String] {
        match self {
            ApiResource::Classic(api) => &api.tags,
            ApiResource::Oas(api) => &api.extension.info.tags,
        }
    }

    fn identity_key(&self, strategy: KeyStrategy) -> Option<String> {
        match strategy {
            KeyStrategy::ExternalId => non_empty(self.external_id()),
            KeyStrategy::InternalId => non_empty(self.internal_id()),
            KeyStrategy::Slug => non_empty(self.slug()),
            KeyStrategy::RouteDomain => {
                let route = self.route_path();
                (!route.is_empty()).then(|| format!("{route}-{}", self.domain()))
            }
        }
    }

    fn key_strategies(profile: TargetProfile) -> &'static [KeyStrategy] {
        match profile {
            TargetProfile::Standard => identity::API_STRATEGIES,
            TargetProfile::Cloud => identity::CLOUD_API_STRATEGIES,
        }
    }

    fn all_key_strategies() -> &'static [KeyStrategy] {
        identity::API_STRATEGIES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classic(external_id: &str) -> ApiResource {
        ApiResource::Classic(ClassicApi {
            external_id: external_id.to_string(),
            name: "orders".to_string(),
            ..Default::default()
        })
    }

    fn oas(external_id: &str) -> ApiResource {
        let mut api = OasApi::default();
        api.extension.info.external_id = external_id.to_string();
        ApiResource::Oas(api)
    }

    mod accessor_tests {
        use super::*;

        #[test]
        fn test_external_id_is_shape_independent() {
            assert_eq!(classic("A").external_id(), "A");
            assert_eq!(oas("A").external_id(), "A");
        }

        #[test]
        fn test_set_org_id_round_trips_for_both_shapes() {
            for mut api in [classic("A"), oas("A")] {
                api.set_org_id("X");
                assert_eq!(api.org_id(), "X");
            }
        }

        #[test]
        fn test_set_ids_land_inside_extension() {
            let mut api = oas("");
            api.set_external_id("ext");
            api.set_internal_id("int");
            let ApiResource::Oas(inner) = &api else {
                panic!("shape changed");
            };
            assert_eq!(inner.extension.info.external_id, "ext");
            assert_eq!(inner.extension.info.internal_id, "int");
        }

        #[test]
        fn test_oas_display_name_falls_back_to_title() {
            let api = ApiResource::oas_from_value(json!({
                "openapi": "3.0.3",
                "info": {"title": "Petstore", "version": "1"},
                "x-api-gateway": {"info": {"id": "pets"}}
            }))
            .unwrap();
            assert_eq!(api.display_name(), "Petstore");
        }
    }

    mod identity_key_tests {
        use super::*;

        #[test]
        fn test_route_domain_requires_route_path() {
            let mut api = ClassicApi {
                domain: "example.com".to_string(),
                ..Default::default()
            };
            assert_eq!(
                ApiResource::Classic(api.clone()).identity_key(KeyStrategy::RouteDomain),
                None
            );
            api.route_path = "/orders/".to_string();
            assert_eq!(
                ApiResource::Classic(api).identity_key(KeyStrategy::RouteDomain),
                Some("/orders/-example.com".to_string())
            );
        }

        #[test]
        fn test_route_domain_with_empty_domain() {
            let api = ApiResource::Classic(ClassicApi {
                route_path: "/orders/".to_string(),
                ..Default::default()
            });
            assert_eq!(
                api.identity_key(KeyStrategy::RouteDomain),
                Some("/orders/-".to_string())
            );
        }

        #[test]
        fn test_cloud_profile_collapses_to_slug() {
            assert_eq!(
                ApiResource::key_strategies(TargetProfile::Cloud),
                &[KeyStrategy::Slug]
            );
            assert_eq!(ApiResource::all_key_strategies().len(), 4);
        }
    }

    mod category_tests {
        use super::*;

        #[test]
        fn test_name_categories() {
            assert_eq!(name_categories("orders#billing#eu"), vec!["billing", "eu"]);
            assert!(name_categories("orders").is_empty());
            assert_eq!(name_categories("orders#billing#billing"), vec!["billing"]);
        }

        #[test]
        fn test_category_match_is_exact_token() {
            let api = ApiResource::Classic(ClassicApi {
                name: "orders#billing".to_string(),
                ..Default::default()
            });
            assert!(api.has_category("billing"));
            assert!(api.has_category("#billing"));
            assert!(!api.has_category("bill"));
        }

        #[test]
        fn test_oas_categories_merge_extension_and_name() {
            let mut inner = OasApi::default();
            inner.extension.info.name = "pets#public".to_string();
            inner.extension.info.categories = vec!["internal".to_string(), "public".to_string()];
            let api = ApiResource::Oas(inner);
            assert_eq!(api.categories(), vec!["public", "internal"]);
        }
    }

    mod serde_tests {
        use super::*;

        #[test]
        fn test_untagged_picks_shape_from_extension() {
            let oas: ApiResource = serde_json::from_value(json!({
                "openapi": "3.0.3",
                "x-api-gateway": {"info": {"id": "a1"}, "server": {"route_path": "/a/"}}
            }))
            .unwrap();
            assert!(oas.is_oas());
            assert_eq!(oas.route_path(), "/a/");

            let classic: ApiResource = serde_json::from_value(json!({
                "external_id": "a1",
                "proxy": {"target_url": "http://upstream"}
            }))
            .unwrap();
            assert!(!classic.is_oas());
            let ApiResource::Classic(inner) = classic else {
                panic!("expected classic");
            };
            assert!(inner.definition.contains_key("proxy"));
        }

        #[test]
        fn test_oas_round_trip_keeps_extension_and_document() {
            let mut inner = OasApi::default();
            inner.extension.info.external_id = "a1".to_string();
            inner
                .document
                .insert("paths".to_string(), json!({"/pets": {}}));

            let value = serde_json::to_value(ApiResource::Oas(inner)).unwrap();
            assert_eq!(value["x-api-gateway"]["info"]["id"], "a1");
            assert!(value["paths"].get("/pets").is_some());
            assert!(value["x-api-gateway"].get("upstream").is_none());
            assert!(value["x-api-gateway"]["server"].get("strip_route_path").is_none());
        }

        #[test]
        fn test_upstream_keeps_unknown_fields() {
            let api = ApiResource::oas_from_value(json!({
                "x-api-gateway": {"upstream": {"url": "http://pets", "rateLimit": {"per": 1}}}
            }))
            .unwrap();
            let ApiResource::Oas(inner) = &api else {
                panic!("expected oas");
            };
            assert_eq!(inner.extension.upstream.url, "http://pets");
            let value = serde_json::to_value(&api).unwrap();
            assert_eq!(value["x-api-gateway"]["upstream"]["rateLimit"]["per"], 1);
        }
    }

    mod oidc_tests {
        use super::*;

        #[test]
        fn test_oidc_policy_ids_from_classic_definition() {
            let api = ApiResource::classic_from_value(json!({
                "external_id": "a1",
                "openid_options": {"providers": [
                    {"issuer": "https://idp", "client_ids": {"web": "p1", "cli": "p2"}},
                    {"issuer": "https://other", "client_ids": {"web": "p1"}}
                ]}
            }))
            .unwrap();
            let mut ids = api.oidc_policy_ids();
            ids.sort();
            assert_eq!(ids, vec!["p1", "p2"]);
        }

        #[test]
        fn test_no_openid_options_means_no_references() {
            assert!(classic("a1").oidc_policy_ids().is_empty());
            assert!(oas("a1").oidc_policy_ids().is_empty());
        }
    }
}
