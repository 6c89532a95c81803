//! HTTP control API over the engine

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::engine::Engine;
use crate::inventory::Order;
use crate::state::StatusSnapshot;
use crate::SniperError;

#[derive(Debug, Serialize)]
struct MessageBody {
    message: String,
}

impl MessageBody {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Maps engine errors onto HTTP status codes
#[derive(Debug)]
pub struct ApiError(SniperError);

impl From<SniperError> for ApiError {
    fn from(err: SniperError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            SniperError::InvalidConfig(_) | SniperError::NotAvailable => StatusCode::BAD_REQUEST,
            SniperError::AlreadyRunning | SniperError::PurchaseAlreadyInProgress => {
                StatusCode::CONFLICT
            }
            SniperError::Purchase(_)
            | SniperError::Http(_)
            | SniperError::Provider { .. }
            | SniperError::Timeout(_) => StatusCode::BAD_GATEWAY,
            SniperError::Io(_) | SniperError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("Request failed with {}: {}", status, self.0);
        } else {
            tracing::debug!("Request rejected with {}: {}", status, self.0);
        }
        (status, MessageBody::new(self.0.to_string())).into_response()
    }
}

/// Build the control API router
pub fn build_router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/api/ovh/start-monitoring", post(start_handler))
        .route("/api/ovh/stop-monitoring", post(stop_handler))
        .route("/api/ovh/status", get(status_handler))
        .route("/api/ovh/purchase", post(purchase_handler))
        .route("/health", get(health_handler))
        .with_state(engine)
}

async fn start_handler(
    State(engine): State<Arc<Engine>>,
    payload: Result<Json<crate::config::MonitoringConfig>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(config) =
        payload.map_err(|rejection| SniperError::InvalidConfig(rejection.body_text()))?;
    engine.start(config).await?;
    Ok(MessageBody::new("Monitoring started"))
}

async fn stop_handler(State(engine): State<Arc<Engine>>) -> impl IntoResponse {
    engine.stop().await;
    MessageBody::new("Monitoring stopped")
}

async fn status_handler(State(engine): State<Arc<Engine>>) -> Json<StatusSnapshot> {
    Json(engine.status().await)
}

async fn purchase_handler(State(engine): State<Arc<Engine>>) -> Result<Json<Order>, ApiError> {
    Ok(Json(engine.purchase().await?))
}

async fn health_handler() -> &'static str {
    "OK"
}
