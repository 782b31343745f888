//! # Control Plane
//!
//! The key registry routes plus the pipeline's own:
//!
//! | Method | Path | Behaviour |
//! |--------|------|-----------|
//! | PUT | `/api/batches/{count}` | Publish a request for `count` records; 202 |
//! | POST | `/api/records` | Ingest unclaimed records; 201 with their ids |
//! | GET | `/metrics` | Prometheus text exposition |

use crate::container::PipelineContainer;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use shared_types::RecordId;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub const BATCHES_PATH: &str = "/api/batches/:count";
pub const RECORDS_PATH: &str = "/api/records";
pub const METRICS_PATH: &str = "/metrics";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchesRequested {
    pub requested_count: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestRequest {
    pub payloads: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestResponse {
    pub record_ids: Vec<RecordId>,
}

/// Build the full control-plane router over a container.
pub fn control_plane(container: Arc<PipelineContainer>) -> Router {
    let pipeline = Router::new()
        .route(BATCHES_PATH, put(request_batches))
        .route(RECORDS_PATH, post(ingest_records))
        .with_state(container.clone());

    rs_03_key_registry::router(container.registry.clone())
        .merge(pipeline)
        .route(METRICS_PATH, get(metrics))
}

/// Serve `router` until `cancel` fires, then drain open connections.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Control plane listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}

async fn request_batches(
    State(container): State<Arc<PipelineContainer>>,
    Path(count): Path<i64>,
) -> Response {
    match container.request_batches(count).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(BatchesRequested {
                requested_count: count,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(count, error = %e, "Failed to publish batch request");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

async fn ingest_records(
    State(container): State<Arc<PipelineContainer>>,
    Json(request): Json<IngestRequest>,
) -> Response {
    match container.ingest(request.payloads).await {
        Ok(record_ids) => (StatusCode::CREATED, Json(IngestResponse { record_ids })).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to ingest records");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

async fn metrics() -> Response {
    match signing_telemetry::gather() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, signing_telemetry::content_type())],
            text,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::RuntimeConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use rs_01_record_store::RecordStore;
    use shared_bus::PipelineQueue;
    use shared_types::{BatchRequest, WirePayload};
    use tower::ServiceExt;

    fn container() -> Arc<PipelineContainer> {
        Arc::new(PipelineContainer::new(RuntimeConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn test_put_batches_publishes_request() {
        let container = container();
        let mut consumer = container
            .bus
            .consume(PipelineQueue::BatchRequests.queue_name())
            .unwrap();

        let response = control_plane(container.clone())
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/batches/5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let delivery = consumer.try_recv().unwrap().unwrap();
        assert_eq!(BatchRequest::decode(&delivery.body).unwrap(), BatchRequest::new(5));
    }

    #[tokio::test]
    async fn test_post_records_ingests() {
        let container = container();

        let response = control_plane(container.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(RECORDS_PATH)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"payloads":["a","b"]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let ingested: IngestResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(ingested.record_ids.len(), 2);
        assert_eq!(container.records.unclaimed_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let response = control_plane(container())
            .oneshot(Request::builder().uri(METRICS_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("sg_signer_batches_signed_total"));
    }

    #[tokio::test]
    async fn test_registry_routes_are_mounted() {
        let container = container();
        container.seed_keys().await.unwrap();

        let response = control_plane(container)
            .oneshot(
                Request::builder()
                    .uri("/api/keys/next-available")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
