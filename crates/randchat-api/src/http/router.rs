//! Axum router configuration with middleware.
//!
//! All API routes are under `/api/v1/`; `/health` sits at the root.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/stats", get(handlers::stats::get_stats))
        .route("/users/{id}", get(handlers::user::get_user))
        .route("/ws", get(handlers::ws::ws_handler));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use randchat_types::user::UserId;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn test_state() -> (AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let state = AppState::init_at(dir.path()).await.unwrap();
        (state, dir)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _dir) = test_state().await;
        let (status, body) = get_json(build_router(state), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_stats_counts_users() {
        let (state, _dir) = test_state().await;
        state
            .lifecycle()
            .directory()
            .get_or_create(UserId(31416))
            .await
            .unwrap();

        let (status, body) = get_json(build_router(state), "/api/v1/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["users"]["total"], 1);
        assert_eq!(body["data"]["talks"], 0);
        assert_eq!(body["data"]["cached_users"], 1);
        assert_eq!(body["data"]["connections"], 0);
    }

    #[tokio::test]
    async fn test_get_user() {
        let (state, _dir) = test_state().await;
        state
            .lifecycle()
            .directory()
            .get_or_create(UserId(27))
            .await
            .unwrap();

        let (status, body) = get_json(build_router(state), "/api/v1/users/27").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], 27);
    }

    #[tokio::test]
    async fn test_get_user_errors() {
        let (state, _dir) = test_state().await;
        let router = build_router(state);

        let (status, body) = get_json(router.clone(), "/api/v1/users/404").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["data"].is_null());

        let (status, _) = get_json(router, "/api/v1/users/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
