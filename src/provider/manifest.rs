//! # Manifest
//!
//! The index file a source carries at its root: which files hold APIs,
//! policies and assets, and how API documents are shaped.
//!
//! ```json
//! {
//!   "type": "oas",
//!   "apis": [
//!     { "file": "apis/orders.json", "external_id": "orders" },
//!     { "file": "apis/pets.json", "oas": { "override_listen_path": "/v2/pets/" } }
//!   ],
//!   "policies": [{ "file": "policies/gold.json" }],
//!   "assets": [{ "file": "assets/welcome.json" }]
//! }
//! ```

use crate::error::{SyncError, SyncResult};
use crate::resource::{ApiResource, PolicyResource, SyncResource};
use serde::{Deserialize, Serialize};

/// Shape of the API documents a manifest points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    /// Flat classic definitions
    #[default]
    #[serde(alias = "apidef")]
    Classic,
    /// OpenAPI documents with the gateway extension
    Oas,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiFileRef {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    /// Shape of this file when it differs from the manifest's `type`
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ManifestKind>,
    #[serde(default, skip_serializing_if = "OasOverrides::is_empty")]
    pub oas: OasOverrides,
}

/// Per-file settings layered over an OAS document's gateway extension
///
/// Ignored for classic files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OasOverrides {
    /// Replaces `upstream.url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_target: Option<String>,
    /// Replaces `server.route_path`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_listen_path: Option<String>,
    /// Sets `server.strip_route_path`; `false` leaves the document's value
    #[serde(default, skip_serializing_if = "is_false")]
    pub strip_listen_path: bool,
    /// Sets `info.version_name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
}

impl OasOverrides {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ApiFileRef {
    /// Shape to parse this file as
    pub fn kind_or(&self, manifest_kind: ManifestKind) -> ManifestKind {
        self.kind.unwrap_or(manifest_kind)
    }

    /// Apply the OAS overrides this entry declares; classic APIs are untouched
    pub fn apply_oas_overrides(&self, api: &mut ApiResource) {
        let Some(oas) = api.as_oas_mut() else {
            return;
        };
        if let Some(target) = non_blank(self.oas.override_target.as_deref()) {
            oas.extension.upstream.url = target.to_string();
        }
        if let Some(path) = non_blank(self.oas.override_listen_path.as_deref()) {
            oas.extension.server.route_path = path.to_string();
        }
        if self.oas.strip_listen_path {
            oas.extension.server.strip_route_path = true;
        }
        if let Some(version) = non_blank(self.oas.version_name.as_deref()) {
            oas.extension.info.version_name = version.to_string();
        }
    }

    /// Apply the identifier overrides this entry declares
    pub fn apply_overrides(&self, api: &mut ApiResource) {
        if let Some(id) = non_blank(self.external_id.as_deref()) {
            api.set_external_id(id);
        }
        if let Some(id) = non_blank(self.internal_id.as_deref()) {
            api.set_internal_id(id);
        }
        if let Some(org) = non_blank(self.org_id.as_deref()) {
            api.set_org_id(org);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyFileRef {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl PolicyFileRef {
    pub fn apply_overrides(&self, policy: &mut PolicyResource) {
        if let Some(id) = non_blank(self.external_id.as_deref()) {
            policy.set_external_id(id);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetFileRef {
    pub file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "type")]
    pub kind: ManifestKind,
    #[serde(default)]
    pub apis: Vec<ApiFileRef>,
    #[serde(default)]
    pub policies: Vec<PolicyFileRef>,
    #[serde(default)]
    pub assets: Vec<AssetFileRef>,
}

impl Manifest {
    /// Reject entries that reference no file
    pub fn validate(&self) -> SyncResult<()> {
        let files = self
            .apis
            .iter()
            .map(|r| ("api", r.file.as_str()))
            .chain(self.policies.iter().map(|r| ("policy", r.file.as_str())))
            .chain(self.assets.iter().map(|r| ("asset", r.file.as_str())));

        for (position, (kind, file)) in files.enumerate() {
            if file.trim().is_empty() {
                return Err(SyncError::integrity(format!(
                    "{kind} entry #{position} has an empty file reference"
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.apis.is_empty() && self.policies.is_empty() && self.assets.is_empty()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ClassicApi;

    #[test]
    fn test_manifest_parses_with_defaults() {
        let manifest: Manifest = serde_json::from_str(
            r#"{"apis": [{"file": "a.json", "external_id": "a1"}], "policies": [{"file": "p.json"}]}"#,
        )
        .unwrap();
        assert_eq!(manifest.kind, ManifestKind::Classic);
        assert_eq!(manifest.apis[0].external_id.as_deref(), Some("a1"));
        assert!(manifest.assets.is_empty());
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_legacy_apidef_type_is_classic() {
        let manifest: Manifest = serde_json::from_str(r#"{"type": "apidef"}"#).unwrap();
        assert_eq!(manifest.kind, ManifestKind::Classic);
        let manifest: Manifest = serde_json::from_str(r#"{"type": "oas"}"#).unwrap();
        assert_eq!(manifest.kind, ManifestKind::Oas);
    }

    #[test]
    fn test_empty_file_reference_fails_validation() {
        let manifest = Manifest {
            policies: vec![PolicyFileRef::default()],
            ..Default::default()
        };
        assert!(matches!(
            manifest.validate(),
            Err(SyncError::ManifestIntegrity { .. })
        ));
    }

    #[test]
    fn test_overrides_skip_blank_values() {
        let entry = ApiFileRef {
            file: "a.json".to_string(),
            external_id: Some("pinned".to_string()),
            internal_id: Some(" ".to_string()),
            org_id: Some("org1".to_string()),
            ..Default::default()
        };
        let mut api = ApiResource::Classic(ClassicApi {
            external_id: "from-file".to_string(),
            internal_id: "db1".to_string(),
            ..Default::default()
        });
        entry.apply_overrides(&mut api);
        assert_eq!(api.external_id(), "pinned");
        assert_eq!(api.internal_id(), "db1");
        assert_eq!(api.org_id(), "org1");
    }

    #[test]
    fn test_entry_type_overrides_manifest_type() {
        let manifest: Manifest = serde_json::from_str(
            r#"{"type": "apidef", "apis": [{"file": "a.json"}, {"file": "b.json", "type": "oas"}]}"#,
        )
        .unwrap();
        assert_eq!(manifest.apis[0].kind_or(manifest.kind), ManifestKind::Classic);
        assert_eq!(manifest.apis[1].kind_or(manifest.kind), ManifestKind::Oas);
    }

    #[test]
    fn test_oas_overrides_rewrite_extension() {
        let entry: ApiFileRef = serde_json::from_str(
            r#"{"file": "pets.json", "oas": {"override_target": "http://pets:8080",
                "override_listen_path": "/v2/pets/", "strip_listen_path": true,
                "version_name": "v2"}}"#,
        )
        .unwrap();
        let mut api = ApiResource::oas_from_value(serde_json::json!({
            "x-api-gateway": {"info": {"id": "pets"}, "server": {"route_path": "/pets/"}}
        }))
        .unwrap();
        entry.apply_oas_overrides(&mut api);

        assert_eq!(api.route_path(), "/v2/pets/");
        let value = serde_json::to_value(&api).unwrap();
        assert_eq!(value["x-api-gateway"]["upstream"]["url"], "http://pets:8080");
        assert_eq!(value["x-api-gateway"]["server"]["strip_route_path"], true);
        assert_eq!(value["x-api-gateway"]["info"]["version_name"], "v2");
    }

    #[test]
    fn test_oas_overrides_leave_classic_untouched() {
        let entry = ApiFileRef {
            file: "a.json".to_string(),
            oas: OasOverrides {
                override_listen_path: Some("/moved/".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut api = ApiResource::Classic(ClassicApi {
            route_path: "/orders/".to_string(),
            ..Default::default()
        });
        entry.apply_oas_overrides(&mut api);
        assert_eq!(api.route_path(), "/orders/");
        assert!(OasOverrides::default().is_empty());
    }
}
