// src/handlers/audit.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::{error::AppError, identity::RequestIdentity},
    config::AppState,
    models::audit::ObjectType,
};

/// `GET /api/audit/{object_type}/{object_id}`, object type in snake_case.
pub async fn get_object_changes(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path((object_type, object_id)): Path<(ObjectType, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let changes = app_state
        .audit
        .get_object_changes(&identity, object_type, object_id)
        .await?;
    Ok((StatusCode::OK, Json(changes)))
}
