//! HTTP Surface
//!
//! Maps the cache-aside operations and the batched write path onto URLs.
//! Keys travel in the path for reads and deletes and in the JSON body for
//! writes.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    batch_set_handler, delete_handler, get_handler, health_handler, set_handler, stats_handler,
    AppState,
};

/// Builds the service router over a shared cache and batch executor.
///
/// | Method | Path          | Operation                                        |
/// |--------|---------------|--------------------------------------------------|
/// | PUT    | `/set`        | cache-aside `set`; a `null` value removes the key |
/// | GET    | `/get/:key`   | cache-aside `get`; 404 on a miss                 |
/// | DELETE | `/del/:key`   | explicit delete                                  |
/// | POST   | `/batch/set`  | many `set`s, bounded by the executor's limit     |
/// | GET    | `/stats`      | hit/miss/compute/write/delete counters           |
/// | GET    | `/health`     | liveness plus the active backend kind            |
///
/// Every response passes through the request trace layer; CORS is open.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/batch/set", post(batch_set_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(open_cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn open_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryBackend;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        response::Response,
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        create_router(AppState::with_backend(Arc::new(MemoryBackend::new())))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<&'static str>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json)),
            None => builder.body(Body::empty()),
        };
        app.clone().oneshot(request.unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_every_route_is_mounted() {
        let app = create_test_app();

        let cases = [
            (Method::GET, "/health", None, StatusCode::OK),
            (Method::GET, "/stats", None, StatusCode::OK),
            (Method::PUT, "/set", Some(r#"{"key":"k","value":"v"}"#), StatusCode::OK),
            (Method::GET, "/get/k", None, StatusCode::OK),
            (Method::DELETE, "/del/k", None, StatusCode::OK),
            (
                Method::POST,
                "/batch/set",
                Some(r#"{"entries":[{"key":"a","value":1}]}"#),
                StatusCode::OK,
            ),
        ];

        for (method, uri, body, expected) in cases {
            let response = send(&app, method.clone(), uri, body).await;
            assert_eq!(response.status(), expected, "{} {}", method, uri);
        }
    }

    #[tokio::test]
    async fn test_get_after_delete_is_not_found() {
        let app = create_test_app();

        send(&app, Method::PUT, "/set", Some(r#"{"key":"gone","value":1}"#)).await;
        send(&app, Method::DELETE, "/del/gone", None).await;

        let response = send(&app, Method::GET, "/get/gone", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wrong_method_rejected() {
        let app = create_test_app();

        let response = send(&app, Method::GET, "/batch/set", None).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_cors_preflight_allowed() {
        let app = create_test_app();

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/set")
            .header("origin", "http://localhost:8080")
            .header("access-control-request-method", "PUT")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
    }
}
