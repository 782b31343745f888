//! # HTTP Control Plane
//!
//! | Method | Path | Behaviour |
//! |--------|------|-----------|
//! | GET | `/api/keys/next-available` | Lease a key: 200 with the entry, 404 if none free |
//! | PUT | `/api/keys?id=&inUse=[&leasedAt=]` | Release or re-mark a key; `leasedAt` scopes a release to one lease |
//! | POST | `/api/keys?count=` | Replace the registry with `count` new keys |
//! | DELETE | `/api/keys` | Delete every key |
//! | GET | `/api/keys` | Key statuses without material |

use crate::domain::errors::KeyRegistryError;
use crate::ports::inbound::KeyRegistryApi;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use shared_types::{KeyIdentity, Timestamp};
use std::sync::Arc;
use tracing::error;

/// Path of the lease endpoint, relative to the registry base URL.
pub const NEXT_AVAILABLE_PATH: &str = "/api/keys/next-available";

/// Path of the key collection, relative to the registry base URL.
pub const KEYS_PATH: &str = "/api/keys";

#[derive(Debug, Deserialize)]
pub struct SetInUseQuery {
    pub id: String,
    #[serde(rename = "inUse")]
    pub in_use: bool,
    /// Lease stamp of the releasing holder. Without it a release is
    /// unconditional.
    #[serde(rename = "leasedAt", default)]
    pub leased_at: Option<Timestamp>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateResponse {
    pub generated: usize,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurgeResponse {
    pub deleted: usize,
}

/// Build the control-plane router around a registry.
pub fn router<A>(registry: Arc<A>) -> Router
where
    A: KeyRegistryApi + 'static,
{
    Router::new()
        .route(NEXT_AVAILABLE_PATH, get(next_available::<A>))
        .route(
            KEYS_PATH,
            get(list_keys::<A>)
                .put(set_in_use::<A>)
                .post(generate_keys::<A>)
                .delete(purge_keys::<A>),
        )
        .with_state(registry)
}

async fn next_available<A: KeyRegistryApi>(State(registry): State<Arc<A>>) -> Response {
    match registry.lease_next().await {
        Ok(Some(entry)) => Json(entry).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "no key available").into_response(),
        Err(e) => e.into_response(),
    }
}

async fn set_in_use<A: KeyRegistryApi>(
    State(registry): State<Arc<A>>,
    Query(query): Query<SetInUseQuery>,
) -> Response {
    let identity = KeyIdentity::new(query.id);
    let result = match (query.in_use, query.leased_at) {
        (true, _) => registry.set_in_use(&identity, true).await,
        (false, Some(leased_at)) => registry.release_lease(&identity, leased_at).await,
        (false, None) => registry.release(&identity).await,
    };
    match result {
        Ok(status) => Json(status).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn generate_keys<A: KeyRegistryApi>(
    State(registry): State<Arc<A>>,
    Query(query): Query<GenerateQuery>,
) -> Response {
    match registry.generate_keys(query.count).await {
        Ok(keys) => Json(GenerateResponse {
            generated: keys.len(),
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn purge_keys<A: KeyRegistryApi>(State(registry): State<Arc<A>>) -> Response {
    match registry.purge_all().await {
        Ok(deleted) => Json(PurgeResponse { deleted }).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn list_keys<A: KeyRegistryApi>(State(registry): State<Arc<A>>) -> Response {
    match registry.list_keys().await {
        Ok(keys) => Json(keys).into_response(),
        Err(e) => e.into_response(),
    }
}

impl IntoResponse for KeyRegistryError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidCount(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => {
                error!(error = %self, "Key store failure");
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        (status, self.to_string()).into_response()
    }
}
