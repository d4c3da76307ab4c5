//! HTTP surface and configuration for the VLE sync service.

mod config;

pub use config::ServiceConfig;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use vlesync_sync::{BasicCredentials, Reconciler};
use vlesync_types::SyncSnapshot;

/// Realm advertised in Basic-auth challenges.
pub const AUTH_REALM: &str = "vlesync";

/// Shared state for the HTTP API.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
    /// Credentials callers must present. `None` rejects every request.
    pub credentials: Option<BasicCredentials>,
}

/// JSON body returned for every handled error.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorBody {
    #[serde(rename = "errorMessage")]
    pub error_message: String,
}

/// Errors surfaced by the HTTP API.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                [(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Basic realm=\"vlesync\""),
                )],
                Json(ErrorBody {
                    error_message: "Unauthorized".to_string(),
                }),
            )
                .into_response(),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error_message: message,
                }),
            )
                .into_response(),
        }
    }
}

async fn basic_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match (presented, state.credentials.as_ref()) {
        (Some(header), Some(expected)) if expected.matches_header(header) => {
            Ok(next.run(request).await)
        }
        _ => Err(ApiError::Unauthorized),
    }
}

async fn snapshot_handler(State(state): State<AppState>) -> Result<Json<SyncSnapshot>, ApiError> {
    let reconciler = Arc::clone(&state.reconciler);
    let snapshot = tokio::task::spawn_blocking(move || reconciler.snapshot())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| {
            warn!(error = %e, "Reconciliation snapshot failed");
            ApiError::Internal(e.to_string())
        })?;
    Ok(Json(snapshot))
}

/// Build the HTTP API router serving the reconciliation snapshot.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(snapshot_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), basic_auth))
        .with_state(state)
}
