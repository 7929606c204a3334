//! API Routes
//!
//! Configures the Axum router with all store endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    blacklist_handler, delete_publication_handler, get_community_handler,
    get_publication_handler, get_user_handler, health_handler, join_community_handler,
    leave_community_handler, list_communities_handler, list_publications_handler,
    onboarding_handler, peers_handler, post_publication_handler, put_community_handler,
    put_publication_handler, put_user_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin, the UI is served from another local origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/onboarding", get(onboarding_handler))
        .route("/user", get(get_user_handler).put(put_user_handler))
        .route("/user/blacklist", post(blacklist_handler))
        .route("/communities", get(list_communities_handler))
        .route(
            "/communities/:id",
            put(join_community_handler)
                .get(get_community_handler)
                .patch(put_community_handler)
                .delete(leave_community_handler),
        )
        .route("/communities/:id/peers", get(peers_handler))
        .route(
            "/communities/:id/publications",
            get(list_publications_handler).post(post_publication_handler),
        )
        .route(
            "/communities/:id/publications/:publication_id",
            get(get_publication_handler)
                .put(put_publication_handler)
                .delete(delete_publication_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::Config;
    use crate::persist::MemoryKv;
    use crate::remote::LocalChannel;
    use crate::store::Store;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    async fn create_test_app() -> Router {
        let config = Config {
            eager_warmup: false,
            ..Config::default()
        };
        let store = Store::open(
            Arc::new(LocalChannel::new()),
            Arc::new(MemoryKv::new()),
            config,
        )
        .await
        .unwrap();
        create_router(AppState::new(store))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_user_endpoint() {
        let app = create_test_app().await;

        let response = app
            .oneshot(Request::builder().uri("/user").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_onboarding_endpoint() {
        let app = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/onboarding")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_join_endpoint() {
        let app = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/communities/c1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_publication_not_found() {
        let app = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/communities/c1/publications/nonexistent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
