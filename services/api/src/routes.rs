use crate::infra::AppState;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use candidate_flagging::candidates::{candidate_router, FlaggingService, SnapshotSink};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

pub(crate) fn with_candidate_routes<S>(service: Arc<FlaggingService<S>>) -> axum::Router
where
    S: SnapshotSink,
{
    candidate_router(service)
        .route("/", axum::routing::get(banner))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

/// CORS policy for the reviewer front end.
pub(crate) fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%origin, %err, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

pub(crate) async fn banner() -> &'static str {
    "Flagging System API is running..."
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::open_service;
    use axum::body::Body;
    use axum::http::Request;
    use candidate_flagging::candidates::StoreOptions;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn read_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    fn options() -> StoreOptions {
        StoreOptions {
            flush_interval: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn banner_route_is_served_next_to_candidate_routes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = open_service(&dir.path().join("candidates.json"), options()).await;
        let router = with_candidate_routes(service.clone());

        let response = router
            .oneshot(Request::get("/").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);

        service.shutdown().await.expect("store shuts down");
    }

    #[tokio::test]
    async fn evaluate_route_persists_to_the_data_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data_file = dir.path().join("candidates.json");
        let service = open_service(&data_file, options()).await;
        let router = with_candidate_routes(service.clone());

        let submission = json!({
            "firstName": "Amara",
            "lastName": "Okafor",
            "email": "amara.okafor@example.org",
            "dateOfBirth": "1988-03-14",
            "legalStatus": "Other",
            "writtenTDM": "Failed",
            "practiceHours": 500,
            "rotationsCompleted": 3,
            "hasImpairmentToPractice": true
        });
        let response = router
            .oneshot(
                Request::post("/api/candidates/evaluate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(submission.to_string()))
                    .expect("request"),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json(response).await;
        assert_eq!(payload["data"]["isEligible"], false);

        service.shutdown().await.expect("store shuts down");
        let persisted: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(&data_file).expect("data file written"),
        )
        .expect("data file is json");
        assert_eq!(persisted.as_array().map(Vec::len), Some(1));
        assert_eq!(persisted[0]["id"], payload["data"]["candidateId"]);
    }

    #[tokio::test]
    async fn cors_preflight_allows_configured_origin() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = open_service(&dir.path().join("candidates.json"), options()).await;
        let router = with_candidate_routes(service.clone())
            .layer(cors_layer(&["http://localhost:4200".to_string()]));

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/candidates")
                    .header(header::ORIGIN, "http://localhost:4200")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route executes");

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some("http://localhost:4200")
        );

        service.shutdown().await.expect("store shuts down");
    }
}
