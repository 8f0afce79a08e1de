//! # Directory Source Tests
//!
//! Full runs that read desired state from files on disk.

mod common;

use common::*;
use gateway_sync::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write(root: &Path, file: &str, content: &str) {
    let path = root.join(file);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn oas_repository() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        ".gateway-sync.json",
        r#"{
            "type": "oas",
            "apis": [
                { "file": "apis/orders.json", "external_id": "orders" },
                { "file": "apis/users.yaml" }
            ],
            "policies": [{ "file": "policies/gold.yaml" }]
        }"#,
    );
    write(
        dir.path(),
        "apis/orders.json",
        r#"{
            "openapi": "3.0.3",
            "info": { "title": "Orders", "version": "1.0.0" },
            "paths": {},
            "x-api-gateway": {
                "info": { "name": "Orders #payments", "tags": ["edge"] },
                "server": { "route_path": "/orders/" }
            }
        }"#,
    );
    write(
        dir.path(),
        "apis/users.yaml",
        "openapi: 3.0.3\n\
         info:\n  title: Users\n  version: 1.0.0\n\
         paths: {}\n\
         x-api-gateway:\n  info:\n    id: users\n    name: Users\n",
    );
    write(
        dir.path(),
        "policies/gold.yaml",
        "external_id: gold\n\
         name: Gold\n\
         access_rights:\n  orders:\n    api_id: orders\n    versions: [Default]\n",
    );
    dir
}

#[tokio::test]
async fn test_publish_from_directory() {
    let dir = oas_repository();
    let publisher = Arc::new(InMemoryPublisher::control_plane());
    let orchestrator = SyncOrchestrator::new(
        Arc::new(DirectoryGetter::new(dir.path())),
        Arc::clone(&publisher) as Arc<dyn Publisher>,
        options(SyncMode::Publish),
    );

    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.apis.created, 2);
    assert_eq!(report.policies.created, 1);
    assert_eq!(
        mutations(&publisher),
        vec!["create api [orders,users]", "create policy [gold]"]
    );

    let apis = publisher.apis();
    assert!(apis.iter().all(ApiResource::is_oas));
    assert!(apis.iter().all(|api| api.org_id() == "org1"));
    assert_eq!(apis[0].route_path(), "/orders/");
}

#[tokio::test]
async fn test_category_run_from_directory() {
    let dir = oas_repository();
    let publisher = Arc::new(InMemoryPublisher::control_plane());
    let orchestrator = SyncOrchestrator::new(
        Arc::new(DirectoryGetter::new(dir.path())),
        Arc::clone(&publisher) as Arc<dyn Publisher>,
        options(SyncMode::Sync)
            .with_criteria(SelectionCriteria::default().with_categories(["#payments"])),
    );

    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.apis.created, 1);
    assert_eq!(mutations(&publisher), vec!["create api [orders]"]);
}

#[tokio::test]
async fn test_missing_file_fails_before_any_write() {
    let dir = oas_repository();
    std::fs::remove_file(dir.path().join("apis/users.yaml")).unwrap();
    let publisher = Arc::new(InMemoryPublisher::control_plane());
    let orchestrator = SyncOrchestrator::new(
        Arc::new(DirectoryGetter::new(dir.path())),
        Arc::clone(&publisher) as Arc<dyn Publisher>,
        options(SyncMode::Sync),
    );

    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(
        err.root_cause(),
        SyncError::ManifestIntegrity { .. }
    ));
    assert!(publisher.calls().is_empty());
}

#[tokio::test]
async fn test_oas_overrides_reach_the_target() {
    let dir = oas_repository();
    write(
        dir.path(),
        ".gateway-sync.json",
        r#"{
            "type": "oas",
            "apis": [
                { "file": "apis/orders.json", "external_id": "orders",
                  "oas": { "override_listen_path": "/v2/orders/", "version_name": "v2" } }
            ]
        }"#,
    );
    let publisher = Arc::new(InMemoryPublisher::control_plane());
    let orchestrator = SyncOrchestrator::new(
        Arc::new(DirectoryGetter::new(dir.path())),
        Arc::clone(&publisher) as Arc<dyn Publisher>,
        options(SyncMode::Publish),
    );

    orchestrator.run().await.unwrap();

    let stored = publisher.apis();
    assert_eq!(stored[0].route_path(), "/v2/orders/");
    let value = serde_json::to_value(&stored[0]).unwrap();
    assert_eq!(value["x-api-gateway"]["info"]["version_name"], "v2");
}

#[tokio::test]
async fn test_dump_then_sync_into_fresh_target() {
    let source = InMemoryPublisher::control_plane()
        .with_apis(vec![classic_api("a1", "orders"), oas_api("pets", "Pets")])
            .with_policies(vec![policy("p1", &["a1", "pets"])])
        .with_assets(vec![asset("welcome")]);
    let dir = TempDir::new().unwrap();

    let dump = DirectoryDumper::new(dir.path())
        .dump(&source, &SelectionCriteria::default())
        .await
        .unwrap();
    assert!(dump.dangling.is_empty());

    let target = Arc::new(InMemoryPublisher::control_plane());
    let orchestrator = SyncOrchestrator::new(
        Arc::new(DirectoryGetter::new(dir.path())),
        Arc::clone(&target) as Arc<dyn Publisher>,
        options(SyncMode::Sync),
    );
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.apis.created, 2);
    assert_eq!(report.policies.created, 1);
    assert_eq!(report.assets.created, 1);
    let ids: Vec<String> = target.apis().iter().map(|a| a.external_id().to_string()).collect();
    assert_eq!(ids, vec!["a1", "pets"]);
    assert!(target.apis()[1].is_oas());
    assert!(target.policies()[0].references_api("pets"));
}
