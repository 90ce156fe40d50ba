// src/handlers/tasks.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, identity::RequestIdentity},
    config::AppState,
    middleware::identity::BoardIdentity,
    models::task::{NewTask, NewTaskItem, TaskType},
};

// --- Payloads ---

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItemPayload {
    pub instance_id: Uuid,
    pub target_cell_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    pub unit_id: Uuid,

    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,

    pub description: Option<String>,

    #[serde(rename = "type")]
    pub task_type: TaskType,

    pub assigned_to_user_id: Option<Uuid>,

    #[validate(length(min = 1, message = "a task needs at least one item"))]
    pub items: Vec<TaskItemPayload>,
}

impl From<CreateTaskPayload> for NewTask {
    fn from(payload: CreateTaskPayload) -> Self {
        NewTask {
            unit_id: payload.unit_id,
            name: payload.name,
            description: payload.description,
            task_type: payload.task_type,
            assigned_to_user_id: payload.assigned_to_user_id,
            items: payload
                .items
                .into_iter()
                .map(|i| NewTaskItem {
                    instance_id: i.instance_id,
                    target_cell_id: i.target_cell_id,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPayload {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickPayload {
    pub instance_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnPayload {
    pub instance_id: Uuid,
    pub cell_id: Option<Uuid>,
}

// --- Handlers ---

pub async fn create_task(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Json(payload): Json<CreateTaskPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let task = app_state.tasks.create_task(&identity, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
) -> Result<impl IntoResponse, AppError> {
    let tasks = app_state.tasks.list_tasks(&identity).await?;
    Ok((StatusCode::OK, Json(tasks)))
}

pub async fn get_task(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let task = app_state.tasks.get_task(&identity, task_id).await?;
    Ok((StatusCode::OK, Json(task)))
}

pub async fn assign_task(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<AssignPayload>,
) -> Result<impl IntoResponse, AppError> {
    let task = app_state.tasks.assign_task(&identity, task_id, payload.user_id).await?;
    Ok((StatusCode::OK, Json(task)))
}

pub async fn pick_instance(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<PickPayload>,
) -> Result<impl IntoResponse, AppError> {
    let task = app_state
        .tasks
        .pick_instance_from_cell(&identity, task_id, payload.instance_id)
        .await?;
    Ok((StatusCode::OK, Json(task)))
}

pub async fn return_instance(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<ReturnPayload>,
) -> Result<impl IntoResponse, AppError> {
    let task = app_state
        .tasks
        .return_instance_to_cell(&identity, task_id, payload.instance_id, payload.cell_id)
        .await?;
    Ok((StatusCode::OK, Json(task)))
}

pub async fn complete_task(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let task = app_state.tasks.complete_task(&identity, task_id).await?;
    Ok((StatusCode::OK, Json(task)))
}

pub async fn cancel_task(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let task = app_state.tasks.cancel_task(&identity, task_id).await?;
    Ok((StatusCode::OK, Json(task)))
}

// TV board: authenticated by the board token header only.
pub async fn list_board_tasks(
    State(app_state): State<AppState>,
    BoardIdentity { identity, unit_id }: BoardIdentity,
) -> Result<impl IntoResponse, AppError> {
    let tasks = app_state.tasks.list_board_tasks(&identity, unit_id).await?;
    Ok((StatusCode::OK, Json(tasks)))
}
