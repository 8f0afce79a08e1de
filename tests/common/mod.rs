//! Shared fixtures for the integration tests
//!
//! Builders for resources and a helper that wires a [`SyncOrchestrator`]
//! to in-memory collaborators while keeping handles for assertions.

#![allow(dead_code, reason = "Each test binary uses a different subset")]

use gateway_sync::prelude::*;
use gateway_sync::resource::{AccessDefinition, ClassicApi, OasApi};
use std::sync::Arc;

pub fn classic_api(external_id: &str, name: &str) -> ApiResource {
    ApiResource::Classic(ClassicApi {
        external_id: external_id.to_string(),
        name: name.to_string(),
        ..Default::default()
    })
}

pub fn tagged_api(external_id: &str, tags: &[&str]) -> ApiResource {
    ApiResource::Classic(ClassicApi {
        external_id: external_id.to_string(),
        name: external_id.to_string(),
        tags: tags.iter().map(ToString::to_string).collect(),
        ..Default::default()
    })
}

pub fn oas_api(external_id: &str, name: &str) -> ApiResource {
    let mut api = OasApi::default();
    api.extension.info.external_id = external_id.to_string();
    api.extension.info.name = name.to_string();
    ApiResource::Oas(api)
}

pub fn policy(external_id: &str, api_ids: &[&str]) -> PolicyResource {
    let mut policy = PolicyResource {
        external_id: external_id.to_string(),
        name: external_id.to_string(),
        ..Default::default()
    };
    for api_id in api_ids {
        policy.access_rights.insert(
            (*api_id).to_string(),
            AccessDefinition {
                api_id: (*api_id).to_string(),
                ..Default::default()
            },
        );
    }
    policy
}

pub fn asset(external_id: &str) -> TemplateAsset {
    TemplateAsset {
        external_id: external_id.to_string(),
        name: external_id.to_string(),
        ..Default::default()
    }
}

/// Orchestrator plus the collaborators it talks to
pub struct Harness {
    pub getter: Arc<StaticGetter>,
    pub publisher: Arc<InMemoryPublisher>,
    pub orchestrator: SyncOrchestrator,
}

pub fn harness(getter: StaticGetter, publisher: InMemoryPublisher, options: SyncOptions) -> Harness {
    let getter = Arc::new(getter);
    let publisher = Arc::new(publisher);
    let orchestrator = SyncOrchestrator::new(
        Arc::clone(&getter) as Arc<dyn Getter>,
        Arc::clone(&publisher) as Arc<dyn Publisher>,
        options,
    );
    Harness {
        getter,
        publisher,
        orchestrator,
    }
}

/// Options with an org override, so runs never need the target's default org
pub fn options(mode: SyncMode) -> SyncOptions {
    SyncOptions::new(mode).with_org_id("org1")
}

/// Write calls as `"create api [a1]"` strings, in call order
pub fn mutations(publisher: &InMemoryPublisher) -> Vec<String> {
    publisher
        .mutations()
        .iter()
        .map(ToString::to_string)
        .collect()
}
