// src/handlers/tv_boards.rs

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
    models::tv_board::NewTvBoard,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTvBoardPayload {
    pub unit_id: Uuid,

    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,
}

pub async fn create_tv_board(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Json(payload): Json<CreateTvBoardPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let input = NewTvBoard {
        unit_id: payload.unit_id,
        name: payload.name,
    };
    let board = app_state.tv_boards.create_tv_board(&identity, input).await?;
    Ok((StatusCode::CREATED, Json(board)))
}

pub async fn list_tv_boards(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
) -> Result<impl IntoResponse, AppError> {
    let boards = app_state.tv_boards.list_tv_boards(&identity).await?;
    Ok((StatusCode::OK, Json(boards)))
}

pub async fn get_tv_board(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(board_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let board = app_state.tv_boards.get_tv_board(&identity, board_id).await?;
    Ok((StatusCode::OK, Json(board)))
}

pub async fn delete_tv_board(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(board_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.tv_boards.delete_tv_board(&identity, board_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
