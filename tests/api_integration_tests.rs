//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycles against a store backed by the
//! loopback channel and in-memory persistence.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use thicket_store::{
    api::create_router, models::PublicationRecord, persist::MemoryKv, remote::LocalChannel,
    AppState, Config, Store,
};
use tower::ServiceExt;

// == Helper Functions ==

async fn create_test_app(channel: Arc<LocalChannel>) -> Router {
    let config = Config {
        eager_warmup: false,
        ..Config::default()
    };
    let store = Store::open(channel, Arc::new(MemoryKv::new()), config)
        .await
        .unwrap();
    create_router(AppState::new(store))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn request(method: &str, uri: &str, body: Option<&str>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn record(id: &str, src: &str) -> PublicationRecord {
    PublicationRecord {
        id: id.to_string(),
        src: Some(src.to_string()),
        hash: None,
        caption: None,
        nickname: None,
        path: None,
        created_at: None,
    }
}

// == User Endpoint Tests ==

#[tokio::test]
async fn test_user_defaults_to_guest() {
    let app = create_test_app(Arc::new(LocalChannel::new())).await;

    let response = app.oneshot(request("GET", "/user", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert!(json["nickname"].as_str().unwrap().starts_with("Guest"));
}

#[tokio::test]
async fn test_user_put_merges() {
    let app = create_test_app(Arc::new(LocalChannel::new())).await;

    let response = app
        .clone()
        .oneshot(request("PUT", "/user", Some(r#"{"nickname":"Ann"}"#)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request("PUT", "/user", Some(r#"{"onboarded":true}"#)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(request("GET", "/user", None)).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["nickname"], "Ann");
    assert_eq!(json["onboarded"], true);
}

#[tokio::test]
async fn test_user_put_rejects_blank_nickname() {
    let app = create_test_app(Arc::new(LocalChannel::new())).await;

    let response = app
        .oneshot(request("PUT", "/user", Some(r#"{"nickname":"   "}"#)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

// == Community Endpoint Tests ==

#[tokio::test]
async fn test_join_list_and_leave() {
    let app = create_test_app(Arc::new(LocalChannel::new())).await;

    for id in ["c1", "c2"] {
        let response = app
            .clone()
            .oneshot(request("PUT", &format!("/communities/{}", id), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(request("GET", "/communities", None))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["communities"], serde_json::json!(["c2", "c1"]));

    let response = app
        .clone()
        .oneshot(request("DELETE", "/communities/c1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["communities"], serde_json::json!(["c2"]));

    let response = app.oneshot(request("GET", "/health", None)).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["communities"], 1);
}

#[tokio::test]
async fn test_community_size_tracks_publications() {
    let channel = Arc::new(LocalChannel::new());
    channel
        .seed_publications("c1", vec![record("1", "aa"), record("2", "bbbb")])
        .await;
    let app = create_test_app(channel).await;

    app.clone()
        .oneshot(request("PUT", "/communities/c1", None))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(request("GET", "/communities/c1/publications", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(request("GET", "/communities/c1", None))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["size"], 6);
    assert_eq!(json["joined"], true);

    let response = app
        .clone()
        .oneshot(request("DELETE", "/communities/c1/publications/1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(request("GET", "/communities/c1", None))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["size"], 4);
}

#[tokio::test]
async fn test_post_publication() {
    let app = create_test_app(Arc::new(LocalChannel::new())).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/communities/c1/publications",
            Some(r#"{"src":"data:abc","caption":"hi"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_to_json(response.into_body()).await;
    let id = json["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(request(
            "GET",
            &format!("/communities/c1/publications/{}", id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["caption"], "hi");
}

#[tokio::test]
async fn test_post_publication_requires_content() {
    let app = create_test_app(Arc::new(LocalChannel::new())).await;

    let response = app
        .oneshot(request(
            "POST",
            "/communities/c1/publications",
            Some(r#"{"caption":"empty"}"#),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_peers_include_local_user() {
    let channel = Arc::new(LocalChannel::new());
    channel
        .set_online_peers("c1", vec!["Bob".to_string()])
        .await;
    let app = create_test_app(channel).await;

    app.clone()
        .oneshot(request("PUT", "/user", Some(r#"{"nickname":"Ann"}"#)))
        .await
        .unwrap();
    let response = app
        .oneshot(request("GET", "/communities/c1/peers", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json, serde_json::json!(["Ann", "Bob"]));
}

#[tokio::test]
async fn test_blacklist_leaves_communities() {
    let app = create_test_app(Arc::new(LocalChannel::new())).await;
    for id in ["good", "bad"] {
        app.clone()
            .oneshot(request("PUT", &format!("/communities/{}", id), None))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(request(
            "POST",
            "/user/blacklist",
            Some(r#"{"communities":["bad"]}"#),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["communities"], serde_json::json!(["good"]));
}

#[tokio::test]
async fn test_remote_unavailable_maps_to_503() {
    let channel = Arc::new(LocalChannel::new());
    let app = create_test_app(channel.clone()).await;
    channel.set_available(false);

    let response = app
        .oneshot(request("GET", "/communities/c1/publications", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
