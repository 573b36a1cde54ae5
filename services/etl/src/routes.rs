use crate::infra::AppState;
use axum::body::Bytes;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use scorecard::error::AppError;
use scorecard::source::SourceTables;
use scorecard::{transform, WarehouseBundle};
use serde_json::json;
use tracing::info;

pub(crate) fn router() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/transform", post(transform_endpoint))
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

/// Transforms a posted source snapshot and returns every output table.
pub(crate) async fn transform_endpoint(body: Bytes) -> Result<Json<WarehouseBundle>, AppError> {
    let tables: SourceTables = serde_json::from_slice(&body)?;
    info!(rows = tables.total_records(), "transform requested");
    let bundle = transform(&tables)?;
    Ok(Json(bundle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(ready: bool) -> Router {
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        router().layer(Extension(state))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn post_snapshot(payload: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/transform")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request builds")
    }

    #[tokio::test]
    async fn transform_endpoint_returns_the_bundle() {
        let body = Bytes::from(
            json!({
                "proveedores": [{ "Row ID": "P1", "nombre_proveedor": "Acme", "id_tipo_proveedor": "T1" }],
                "roles": [{ "Row ID": "R1", "nombre_rol": "Residente" }]
            })
            .to_string(),
        );

        let Json(bundle) = transform_endpoint(body).await.expect("transform succeeds");

        assert_eq!(bundle.dim_provider.len(), 1);
        assert_eq!(bundle.dim_role[0].name, "Residente");
        assert!(bundle.fact_score.is_empty());
    }

    #[tokio::test]
    async fn missing_mandatory_table_is_a_bad_request() {
        let response = app(true)
            .oneshot(post_snapshot(json!({ "proveedores": [] })))
            .await
            .expect("request handled");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"]
            .as_str()
            .is_some_and(|message| message.contains("roles")));
    }

    #[tokio::test]
    async fn malformed_snapshot_is_a_bad_request() {
        let response = app(true)
            .oneshot(post_snapshot(json!(["not", "a", "snapshot"])))
            .await
            .expect("request handled");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_and_readiness_report_status() {
        let health = app(false)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("request handled");
        assert_eq!(health.status(), StatusCode::OK);

        let ready = app(false)
            .oneshot(
                Request::builder()
                    .uri("/ready")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("request handled");
        assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(ready).await["status"], "initializing");
    }
}
