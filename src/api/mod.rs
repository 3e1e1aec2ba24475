//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Resource endpoints are mounted under `/api/v1`; `/health` sits at the
//! root.

pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());
    with_docs(router)
}

#[cfg(feature = "swagger-ui")]
fn with_docs(router: Router<AppState>) -> Router<AppState> {
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    router.merge(
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
    )
}

#[cfg(not(feature = "swagger-ui"))]
fn with_docs(router: Router<AppState>) -> Router<AppState> {
    router
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use utoipa::OpenApi;

    use super::*;
    use crate::config::PaymentLinks;
    use crate::source::{MemorySource, TransferFeed, TransferSource};

    fn app() -> Router {
        let source: Arc<dyn TransferSource> = Arc::new(MemorySource::new());
        build_router().with_state(AppState {
            feed: TransferFeed::new(8),
            source,
            payment_links: Arc::new(PaymentLinks::default()),
            manual_check_limit: 5,
        })
    }

    async fn call(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = tokio_test::assert_ok!(app().oneshot(request).await);
        let status = response.status();
        let bytes = tokio_test::assert_ok!(to_bytes(response.into_body(), usize::MAX).await);
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        let Ok(request) = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
        else {
            panic!("request did not build");
        };
        request
    }

    #[test]
    fn document_lists_every_route() {
        let doc = openapi::ApiDoc::openapi();
        for path in [
            "/health",
            "/api/v1/payments/request",
            "/api/v1/transfers/manual-check",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[tokio::test]
    async fn health_is_mounted_at_root() {
        let Ok(request) = Request::get("/health").body(Body::empty()) else {
            panic!("request did not build");
        };
        let (status, body) = call(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn payment_request_with_custom_data() {
        let (status, body) = call(post_json(
            "/api/v1/payments/request",
            serde_json::json!({ "amount": 3, "app_id": "raffle", "custom_data": "ticket-7" }),
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "raffle:ticket-7");
        assert_eq!(body["value"], "3000000000000000000");
    }

    #[tokio::test]
    async fn malformed_recipient_is_rejected() {
        let (status, body) = call(post_json(
            "/api/v1/payments/request",
            serde_json::json!({ "amount": 1, "app_id": "raffle", "recipient": "0x1234" }),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], 1004);
    }

    #[tokio::test]
    async fn manual_check_on_empty_store() {
        let Ok(request) = Request::post("/api/v1/transfers/manual-check").body(Body::empty())
        else {
            panic!("request did not build");
        };
        let (status, body) = call(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
    }
}
