//! Stream manager flows against a mocked transcoding daemon.

use serde_json::json;
use std::sync::Arc;
use streambridge::manager::{StreamError, StreamManager};
use streambridge::registry::SessionRegistry;
use streambridge::transcoder::TranscoderClient;
use streambridge::MagnetError;

const HASH: &str = "aabbccddeeff00112233445566778899aabbccdd";
const MAGNET: &str = "magnet:?xt=urn:btih:AABBCCDDEEFF00112233445566778899AABBCCDD&dn=Test";
const BASE: &str = "http://127.0.0.1:3001";

fn create_body() -> String {
    json!({
        "infoHash": HASH,
        "files": [
            { "name": "movie.mkv", "length": 4_000_000_000u64 },
            { "name": "sample.mkv", "length": 1000 },
        ]
    })
    .to_string()
}

async fn mock_create(server: &mut mockito::ServerGuard, hash: &str) -> mockito::Mock {
    server
        .mock("POST", format!("/{}/create", hash).as_str())
        .with_status(200)
        .with_body(create_body())
        .create_async()
        .await
}

fn manager(server: &mockito::ServerGuard) -> (Arc<SessionRegistry>, StreamManager) {
    let registry = Arc::new(SessionRegistry::new());
    let transcoder = Arc::new(TranscoderClient::new(server.url()));
    let manager = StreamManager::new(registry.clone(), transcoder);
    (registry, manager)
}

#[tokio::test]
async fn start_stream_normalizes_hash_and_builds_stream_url() {
    let mut server = mockito::Server::new_async().await;
    mock_create(&mut server, HASH).await;
    let (registry, manager) = manager(&server);

    let session = manager
        .start_stream("u1", MAGNET, Some("Test".to_string()), BASE)
        .await
        .unwrap();

    assert_eq!(session.info_hash, HASH);
    assert_eq!(session.file_index, 0);
    assert!(session.needs_transcoding);
    assert_eq!(session.stream_url, format!("{}/stream/{}", BASE, HASH));
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn invalid_magnet_registers_nothing() {
    let server = mockito::Server::new_async().await;
    let (registry, manager) = manager(&server);

    let err = manager
        .start_stream("u1", "not-a-magnet", None, BASE)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StreamError::Magnet(MagnetError::InvalidMagnetFormat)
    ));
    assert!(registry.is_empty().await);

    let err = manager
        .start_stream("u1", "magnet:?dn=NoHash", None, BASE)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StreamError::Magnet(MagnetError::InfoHashMissing)
    ));
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn second_stream_purges_the_first_with_one_removal_call() {
    let mut server = mockito::Server::new_async().await;
    let other_hash = "1122334455667788990011223344556677889900";
    let other_magnet = format!("magnet:?xt=urn:btih:{}", other_hash);

    mock_create(&mut server, HASH).await;
    mock_create(&mut server, other_hash).await;
    let remove_first = server
        .mock("GET", format!("/{}/remove", HASH).as_str())
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let (registry, manager) = manager(&server);
    manager.start_stream("u1", MAGNET, None, BASE).await.unwrap();
    manager
        .start_stream("u1", &other_magnet, None, BASE)
        .await
        .unwrap();

    remove_first.assert_async().await;
    assert_eq!(registry.len().await, 1);
    assert_eq!(registry.get("u1").await.unwrap().info_hash, other_hash);
}

#[tokio::test]
async fn replacement_survives_failing_remote_teardown() {
    let mut server = mockito::Server::new_async().await;
    let other_hash = "1122334455667788990011223344556677889900";
    let other_magnet = format!("magnet:?xt=urn:btih:{}", other_hash);

    mock_create(&mut server, HASH).await;
    mock_create(&mut server, other_hash).await;
    server
        .mock("GET", format!("/{}/remove", HASH).as_str())
        .with_status(500)
        .create_async()
        .await;

    let (registry, manager) = manager(&server);
    manager.start_stream("u1", MAGNET, None, BASE).await.unwrap();
    manager
        .start_stream("u1", &other_magnet, None, BASE)
        .await
        .unwrap();

    assert_eq!(registry.get("u1").await.unwrap().info_hash, other_hash);
}

#[tokio::test]
async fn metadata_before_any_progress_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    mock_create(&mut server, HASH).await;
    server
        .mock("GET", format!("/{}/stats.json", HASH).as_str())
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("GET", format!("/{}/0/stats.json", HASH).as_str())
        .with_status(404)
        .create_async()
        .await;

    let (_registry, manager) = manager(&server);
    manager.start_stream("u1", MAGNET, None, BASE).await.unwrap();

    let metadata = manager.metadata("u1", HASH).await.unwrap();
    assert_eq!(metadata.status, "not_found");
    assert!(!metadata.file_ready);
    assert!(!metadata.transcoding);
}

#[tokio::test]
async fn metadata_reports_ready_past_threshold() {
    let mut server = mockito::Server::new_async().await;
    mock_create(&mut server, HASH).await;
    server
        .mock("GET", format!("/{}/stats.json", HASH).as_str())
        .with_status(200)
        .with_body(json!({ "progress": 7.3, "peers": 8 }).to_string())
        .create_async()
        .await;

    let (_registry, manager) = manager(&server);
    manager.start_stream("u1", MAGNET, None, BASE).await.unwrap();

    let metadata = manager.metadata("u1", HASH).await.unwrap();
    assert!(metadata.file_ready);
    assert_eq!(metadata.status, "ready");
    assert_eq!(metadata.transcoding_progress, "7.3%");
    assert!(metadata.transcoding);
    assert_eq!(metadata.stremio_stats.unwrap()["peers"], 8);
}

#[tokio::test]
async fn stop_stream_round_trip_yields_not_found() {
    let mut server = mockito::Server::new_async().await;
    mock_create(&mut server, HASH).await;
    let remove = server
        .mock("GET", format!("/{}/remove", HASH).as_str())
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let (registry, manager) = manager(&server);
    manager.start_stream("u1", MAGNET, None, BASE).await.unwrap();

    assert!(manager.stop_stream("u1", HASH).await);
    remove.assert_async().await;
    assert!(registry.is_empty().await);

    let metadata = manager.metadata("u1", HASH).await.unwrap();
    assert_eq!(metadata.status, "not_found");
}

#[tokio::test]
async fn metadata_for_another_users_session_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    mock_create(&mut server, HASH).await;

    let (_registry, manager) = manager(&server);
    manager.start_stream("u1", MAGNET, None, BASE).await.unwrap();

    let metadata = manager.metadata("u2", HASH).await.unwrap();
    assert_eq!(metadata.status, "not_found");
}

#[tokio::test]
async fn activity_pings_touch_only_matching_sessions() {
    let mut server = mockito::Server::new_async().await;
    mock_create(&mut server, HASH).await;

    let (registry, manager) = manager(&server);
    manager.start_stream("u1", MAGNET, None, BASE).await.unwrap();

    assert!(manager.record_activity("u1", HASH, true).await);
    assert!(registry.get("u1").await.unwrap().playing);
    assert!(!manager.record_activity("u1", "f".repeat(40).as_str(), true).await);
}
