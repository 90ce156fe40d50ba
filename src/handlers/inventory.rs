// src/handlers/inventory.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, identity::RequestIdentity},
    config::AppState,
    models::inventory::{NewItem, NewItemInstance, NewItemVariant},
};

// --- Payloads ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVariantPayload {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,

    pub article: Option<String>,

    #[validate(range(min = 0, max = 9_999_999_999_999_i64, message = "ean13 must have at most 13 digits"))]
    pub ean13: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemPayload {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,

    pub description: Option<String>,

    #[validate(nested)]
    #[serde(default)]
    pub variants: Vec<CreateVariantPayload>,
}

impl From<CreateItemPayload> for NewItem {
    fn from(payload: CreateItemPayload) -> Self {
        NewItem {
            name: payload.name,
            description: payload.description,
            variants: payload
                .variants
                .into_iter()
                .map(|v| NewItemVariant {
                    name: v.name,
                    article: v.article,
                    ean13: v.ean13,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstancePayload {
    pub variant_id: Uuid,
    pub cell_id: Option<Uuid>,
}

// --- Items ---

pub async fn create_item(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Json(payload): Json<CreateItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let item = app_state.items.create_item(&identity, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn list_items(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
) -> Result<impl IntoResponse, AppError> {
    let items = app_state.items.list_items(&identity).await?;
    Ok((StatusCode::OK, Json(items)))
}

pub async fn get_item(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state.items.get_item(&identity, item_id).await?;
    Ok((StatusCode::OK, Json(item)))
}

// --- Instances ---

pub async fn create_item_instance(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<CreateInstancePayload>,
) -> Result<impl IntoResponse, AppError> {
    let input = NewItemInstance {
        item_id,
        variant_id: payload.variant_id,
        cell_id: payload.cell_id,
    };
    let instance = app_state.items.create_item_instance(&identity, input).await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

pub async fn list_item_instances(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let instances = app_state.items.list_item_instances(&identity, item_id).await?;
    Ok((StatusCode::OK, Json(instances)))
}

pub async fn get_item_instance(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(instance_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let instance = app_state.items.get_item_instance(&identity, instance_id).await?;
    Ok((StatusCode::OK, Json(instance)))
}

// --- Storage ---

pub async fn get_cell_path(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(cell_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let path = app_state.items.get_cell_path(&identity, cell_id).await?;
    Ok((StatusCode::OK, Json(path)))
}
