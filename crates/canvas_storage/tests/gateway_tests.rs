//! GatewayContentStore against a mock pinning service

use std::sync::Arc;

use canvas_core::{Canvas, Position};
use canvas_storage::{
    ContentId, ContentStore, GatewayContentStore, InMemoryProjectRegistry, ProjectService,
    SaveRequest, StorageError,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn network_tests_disabled() -> bool {
    std::env::var_os("CODEX_SANDBOX_NETWORK_DISABLED").is_some()
}

fn store_for(server: &MockServer) -> GatewayContentStore {
    GatewayContentStore::new(
        format!("{}/api/v0/add", server.uri()),
        format!("{}/ipfs", server.uri()),
    )
}

#[tokio::test]
async fn test_upload_returns_hash_from_add_response() {
    if network_tests_disabled() {
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v0/add"))
        .and(header("authorization", "Bearer lh-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Name": "graph.json",
            "Hash": "bafkreigh2akiscaildcqabsyg3dfr6chu3fgpregiymsck7e7aqa4s52zy",
            "Size": "42"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server).with_api_key("lh-key");
    let cid = store.put("graph.json", b"{}".to_vec()).await.unwrap();

    assert_eq!(
        cid.as_str(),
        "bafkreigh2akiscaildcqabsyg3dfr6chu3fgpregiymsck7e7aqa4s52zy"
    );
}

#[tokio::test]
async fn test_upload_failure_surfaces_status_and_body() {
    if network_tests_disabled() {
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v0/add"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let result = store_for(&server).put("graph.json", b"{}".to_vec()).await;

    match result {
        Err(StorageError::Upload { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("expected upload error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_get_reads_through_gateway() {
    if network_tests_disabled() {
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ipfs/QmPresent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"ok\":true}"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ipfs/QmMissing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ipfs/QmBroken"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let bytes = store.get(&ContentId::from("QmPresent")).await.unwrap();
    assert_eq!(bytes, b"{\"ok\":true}".to_vec());

    let missing = store.get(&ContentId::from("QmMissing")).await;
    assert!(matches!(missing, Err(StorageError::ContentNotFound(_))));

    let broken = store.get(&ContentId::from("QmBroken")).await;
    assert!(matches!(broken, Err(StorageError::Gateway { status: 502, .. })));
}

#[tokio::test]
async fn test_failed_metadata_upload_registers_nothing() {
    if network_tests_disabled() {
        return;
    }
    let server = MockServer::start().await;

    // First upload (the graph) succeeds, the metadata upload fails.
    let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = calls.clone();
    Mock::given(method("POST"))
        .and(path("/api/v0/add"))
        .respond_with(move |_req: &wiremock::Request| {
            if counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "Name": "Biology.json",
                    "Hash": "QmGraph",
                    "Size": "120"
                }))
            } else {
                ResponseTemplate::new(503).set_body_string("unavailable")
            }
        })
        .mount(&server)
        .await;

    let registry = Arc::new(InMemoryProjectRegistry::new());
    let service = ProjectService::new(Arc::new(store_for(&server)), registry.clone());
    let mut canvas = Canvas::default();
    canvas.create_root(Position::default()).unwrap();

    let result = service
        .save(
            &canvas,
            SaveRequest {
                name: "Biology".to_string(),
                description: None,
                owner: Some("0xabc".to_string()),
            },
        )
        .await;

    assert!(matches!(result, Err(StorageError::Upload { status: 503, .. })));
    assert!(service.list("0xabc").await.unwrap().is_empty());
    assert_eq!(canvas.store().len(), 1);
}
