//! REST API surface for mirrormgrd.
//!
//! Axum router mapping the HTTP endpoints onto [`MirrorMgr`]:
//!
//! - `POST /v1/` — create a mirror
//! - `GET /v1/` — enabled mirrors, keyed by id
//! - `GET /v1/all` — all mirrors, keyed by id
//! - `PATCH /v1/{mirror_id}` — `{"enabled": bool}` and/or `{"name": str}`

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;

use crate::error::MirrorError;
use crate::mirror_mgr::MirrorMgr;
use crate::types::{CreateMirrorRequest, MirrorRecord, MirrorStatus, UpdateMirrorRequest};

/// JSON body returned for failed requests.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

fn status_for(err: &MirrorError) -> StatusCode {
    match err {
        MirrorError::Validation(_) | MirrorError::Unsupported(_) => StatusCode::BAD_REQUEST,
        MirrorError::NotFound { .. } => StatusCode::NOT_FOUND,
        MirrorError::Upstream { .. }
        | MirrorError::Gateway(_)
        | MirrorError::MalformedFlow(_) => StatusCode::BAD_GATEWAY,
        MirrorError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        MirrorError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for MirrorError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Body of a successful `POST /v1/`.
#[derive(Debug, Serialize)]
pub struct CreateMirrorResponse {
    pub mirror_id: String,
}

/// Body of a successful `PATCH /v1/{mirror_id}`.
#[derive(Debug, Serialize)]
pub struct UpdateMirrorResponse {
    pub mirror_id: String,
    pub status: MirrorStatus,
}

/// Builds the API router over a shared manager.
pub fn router(mgr: Arc<MirrorMgr>) -> Router {
    Router::new()
        .route("/v1/", post(create_mirror).get(list_enabled_mirrors))
        .route("/v1/all", get(list_all_mirrors))
        .route("/v1/{mirror_id}", patch(change_mirror))
        .with_state(mgr)
}

async fn create_mirror(
    State(mgr): State<Arc<MirrorMgr>>,
    Json(command): Json<CreateMirrorRequest>,
) -> Result<Json<CreateMirrorResponse>, MirrorError> {
    info!(name = %command.name, "create mirror request");
    let mirror_id = mgr.create_mirror(command).await?;
    Ok(Json(CreateMirrorResponse { mirror_id }))
}

async fn list_enabled_mirrors(
    State(mgr): State<Arc<MirrorMgr>>,
) -> Json<HashMap<String, MirrorRecord>> {
    Json(mgr.list_enabled())
}

async fn list_all_mirrors(
    State(mgr): State<Arc<MirrorMgr>>,
) -> Json<HashMap<String, MirrorRecord>> {
    Json(mgr.list_all())
}

async fn change_mirror(
    State(mgr): State<Arc<MirrorMgr>>,
    Path(mirror_id): Path<String>,
    Json(command): Json<UpdateMirrorRequest>,
) -> Result<Json<UpdateMirrorResponse>, MirrorError> {
    let mut status = match command.enabled {
        Some(enabled) => Some(mgr.toggle_status(&mirror_id, enabled).await?),
        None => None,
    };
    if let Some(name) = command.name {
        status = Some(mgr.rename(&mirror_id, name).await?);
    }

    match status {
        Some(status) => Ok(Json(UpdateMirrorResponse { mirror_id, status })),
        None => Err(MirrorError::validation(
            "request body must set 'enabled' or 'name'",
        )),
    }
}
