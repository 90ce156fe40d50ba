// src/handlers/rbac.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{common::error::AppError, common::identity::RequestIdentity, config::AppState};

// --- Roles & employees ---

pub async fn list_roles(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let roles = app_state.employees.list_roles().await?;
    Ok((StatusCode::OK, Json(roles)))
}

pub async fn list_employees(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
) -> Result<impl IntoResponse, AppError> {
    let employees = app_state.employees.list_employees(&identity).await?;
    Ok((StatusCode::OK, Json(employees)))
}

pub async fn get_employee(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let employee = app_state.employees.get_employee(&identity, user_id).await?;
    Ok((StatusCode::OK, Json(employee)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetRolePayload {
    #[validate(range(min = 1, max = 4, message = "roleId must be between 1 and 4"))]
    pub role_id: i32,
}

pub async fn set_employee_role(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SetRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let employee = app_state
        .employees
        .set_employee_role(&identity, user_id, payload.role_id)
        .await?;
    Ok((StatusCode::OK, Json(employee)))
}

pub async fn remove_employee(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.employees.remove_employee(&identity, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- API tokens ---

#[derive(Debug, Deserialize, Validate)]
pub struct CreateApiTokenPayload {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,
}

pub async fn create_api_token(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Json(payload): Json<CreateApiTokenPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let token = app_state.api_tokens.create_api_token(&identity, &payload.name).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

pub async fn list_api_tokens(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
) -> Result<impl IntoResponse, AppError> {
    let tokens = app_state.api_tokens.list_api_tokens(&identity).await?;
    Ok((StatusCode::OK, Json(tokens)))
}

pub async fn revoke_api_token(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(token_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let token = app_state.api_tokens.revoke_api_token(&identity, token_id).await?;
    Ok((StatusCode::OK, Json(token)))
}
