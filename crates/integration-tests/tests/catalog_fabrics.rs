//! Fabric CRUD through the catalog client against a live server.
//!
//! Run with: cargo test -p cushion-integration-tests

#![allow(clippy::unwrap_used)]

use cushion_core::{DEFAULT_COLOR, FabricFilter, FabricPatch, NewFabric};
use cushion_integration_tests::TestServer;
use cushion_storefront::{ApiError, Resource, ResourceState, RetryPolicy};
use rust_decimal::Decimal;

fn fabric(id: &str, name: &str, category: &str, order: i32) -> NewFabric {
    NewFabric {
        order: Some(order),
        ..NewFabric::new(id, name, category)
    }
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let server = TestServer::spawn().await;
    let http = reqwest::Client::new();

    for path in ["/health", "/api/health", "/health/ready"] {
        let resp = http
            .get(format!("http://{}{path}", server.addr))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(resp.status(), 200, "GET {path}");
    }
}

// ============================================================================
// CRUD
// ============================================================================

#[tokio::test]
async fn test_fabric_crud_round_trip() {
    let server = TestServer::spawn().await;
    let client = server.client();

    let created = client
        .create_fabric(&NewFabric {
            price_per_meter: Some(Decimal::new(4250, 2)),
            ..fabric("linen-sand", "Linen Sand", "indoor", 1)
        })
        .await
        .expect("create failed");
    assert_eq!(created.id.as_str(), "linen-sand");
    assert_eq!(created.color, DEFAULT_COLOR);
    assert_eq!(created.price_per_meter, Decimal::new(4250, 2));
    assert!(created.active);

    let fetched = client.fabric("linen-sand").await.expect("get failed");
    assert_eq!(fetched, created);

    let updated = client
        .update_fabric(
            "linen-sand",
            &FabricPatch {
                name: Some("Linen Dune".to_string()),
                ..FabricPatch::default()
            },
        )
        .await
        .expect("update failed");
    assert_eq!(updated.name, "Linen Dune");
    assert_eq!(updated.created_at, created.created_at);

    client.delete_fabric("linen-sand").await.expect("delete failed");

    let err = client.fabric("linen-sand").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "Fabric not found");
}

#[tokio::test]
async fn test_duplicate_create_is_conflict() {
    let server = TestServer::spawn().await;
    let client = server.client();

    client
        .create_fabric(&fabric("velvet", "Velvet", "premium", 1))
        .await
        .expect("create failed");
    let err = client
        .create_fabric(&fabric("velvet", "Velvet Again", "premium", 2))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 409, .. }));
    assert_eq!(err.to_string(), "Fabric with this ID already exists");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_list_filters_and_catalog_order() {
    let server = TestServer::spawn().await;
    let client = server.client();

    client.create_fabric(&fabric("b", "Bravo", "outdoor", 2)).await.unwrap();
    client.create_fabric(&fabric("a", "alpha", "outdoor", 2)).await.unwrap();
    client.create_fabric(&fabric("c", "Charlie", "indoor", 1)).await.unwrap();
    client
        .create_fabric(&NewFabric {
            active: Some(false),
            ..fabric("d", "Delta", "outdoor", 0)
        })
        .await
        .unwrap();

    let all = client.fabrics(&FabricFilter::default()).await.unwrap();
    let ids: Vec<&str> = all.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, ["d", "c", "a", "b"]);

    let active_outdoor = client
        .fabrics(&FabricFilter {
            category: Some("outdoor".to_string()),
            active: Some(true),
        })
        .await
        .unwrap();
    let ids: Vec<&str> = active_outdoor.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);

    let categories = client.categories().await.unwrap();
    let summary: Vec<(&str, usize, &str)> = categories
        .iter()
        .map(|c| (c.name.as_str(), c.count, c.display_name.as_str()))
        .collect();
    assert_eq!(summary, [("indoor", 1, "Indoor"), ("outdoor", 2, "Outdoor")]);
}

// ============================================================================
// Cache coherence
// ============================================================================

#[tokio::test]
async fn test_writes_invalidate_the_writers_cache() {
    let server = TestServer::spawn().await;
    let writer = server.client();
    let bystander = server.client();

    writer.create_fabric(&fabric("a", "Alpha", "indoor", 1)).await.unwrap();

    assert_eq!(writer.fabrics(&FabricFilter::default()).await.unwrap().len(), 1);
    assert_eq!(bystander.fabrics(&FabricFilter::default()).await.unwrap().len(), 1);

    writer.create_fabric(&fabric("b", "Bravo", "indoor", 2)).await.unwrap();

    // The writer's list entries were invalidated; the bystander still serves
    // its cached list until it expires or is cleared.
    assert_eq!(writer.fabrics(&FabricFilter::default()).await.unwrap().len(), 2);
    assert_eq!(bystander.fabrics(&FabricFilter::default()).await.unwrap().len(), 1);

    bystander.clear_cache().await;
    assert_eq!(bystander.fabrics(&FabricFilter::default()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_update_invalidates_single_fabric_entry() {
    let server = TestServer::spawn().await;
    let client = server.client();

    client.create_fabric(&fabric("a", "Alpha", "indoor", 1)).await.unwrap();
    assert_eq!(client.fabric("a").await.unwrap().name, "Alpha");

    client
        .update_fabric(
            "a",
            &FabricPatch {
                name: Some("Aleph".to_string()),
                ..FabricPatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(client.fabric("a").await.unwrap().name, "Aleph");
}

// ============================================================================
// Resources
// ============================================================================

#[tokio::test]
async fn test_resources_load_from_server() {
    let server = TestServer::spawn().await;
    let client = server.client();
    client.create_fabric(&fabric("a", "Alpha", "sunproof", 1)).await.unwrap();

    let mut fabrics = Resource::fabrics(client.clone(), FabricFilter::active_only());
    assert!(fabrics.state().is_loading());
    let loaded = fabrics.load().await.data().map(Vec::len);
    assert_eq!(loaded, Some(1));

    let mut categories = Resource::categories(client);
    let state = categories.load().await;
    assert_eq!(state.data().and_then(|c| c.first()).map(|c| c.count), Some(1));
}

#[tokio::test]
async fn test_resource_for_unused_category_is_empty() {
    let server = TestServer::spawn().await;
    let client = server.client();

    let mut empty = Resource::fabrics(
        client,
        FabricFilter {
            category: Some("nothing-here".to_string()),
            active: None,
        },
    )
    .with_retry(RetryPolicy::none());
    assert_eq!(empty.load().await, &ResourceState::Ready(Vec::new()));
}
