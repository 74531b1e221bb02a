//! Request handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use pf_core::api::{
    most_recent_first, CancelResponse, ErrorResponse, HealthResponse, StatusReport,
    SubmitResponse,
};
use pf_core::{InstallJob, InstallationId};

use crate::state::ProvisionerState;

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn parse_id(raw: &str) -> Result<InstallationId, Response> {
    raw.parse()
        .map_err(|_| error(StatusCode::BAD_REQUEST, format!("invalid installation id: {}", raw)))
}

pub(super) async fn health(State(state): State<Arc<ProvisionerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_installations: state.active_installations(),
    })
}

pub(super) async fn submit(
    State(state): State<Arc<ProvisionerState>>,
    Json(job): Json<InstallJob>,
) -> Response {
    if let Err(message) = job.panel.validate() {
        return error(StatusCode::UNPROCESSABLE_ENTITY, message);
    }

    match state.submit(job).await {
        Ok(id) => (StatusCode::ACCEPTED, Json(SubmitResponse { id })).into_response(),
        Err(e) => {
            tracing::warn!("Failed to record installation: {}", e);
            error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub(super) async fn status(
    State(state): State<Arc<ProvisionerState>>,
    Path(raw): Path<String>,
) -> Response {
    let id = match parse_id(&raw) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let store = state.store();
    let Some(installation) = store.get(id).await else {
        return error(StatusCode::NOT_FOUND, format!("installation {} not found", id));
    };
    let logs = most_recent_first(store.logs(id).await, state.config.status_log_limit);

    Json(StatusReport { installation, logs }).into_response()
}

pub(super) async fn cancel(
    State(state): State<Arc<ProvisionerState>>,
    Path(raw): Path<String>,
) -> Response {
    let id = match parse_id(&raw) {
        Ok(id) => id,
        Err(response) => return response,
    };

    if state.store().get(id).await.is_none() {
        return error(StatusCode::NOT_FOUND, format!("installation {} not found", id));
    }
    Json(CancelResponse {
        cancelled: state.cancel(id),
    })
    .into_response()
}
