// src/db/tv_board_repo.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::postgres::PgTransaction;
use crate::models::tv_board::TvBoard;

const TV_BOARD_COLUMNS: &str = "id, org_id, unit_id, name, token, created_at";

#[async_trait]
pub trait TvBoardRepository {
    async fn insert_tv_board(&mut self, org_id: Uuid, unit_id: Uuid, name: &str, token: &str) -> Result<TvBoard, AppError>;

    async fn find_tv_board(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<TvBoard>, AppError>;

    async fn list_tv_boards(&mut self, org_id: Uuid) -> Result<Vec<TvBoard>, AppError>;

    /// Soft delete; the token stops resolving immediately.
    async fn delete_tv_board(&mut self, org_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    async fn find_tv_board_by_token(&mut self, token: &str) -> Result<Option<TvBoard>, AppError>;
}

#[async_trait]
impl TvBoardRepository for PgTransaction {
    async fn insert_tv_board(&mut self, org_id: Uuid, unit_id: Uuid, name: &str, token: &str) -> Result<TvBoard, AppError> {
        let sql = format!(
            r#"
            INSERT INTO tv_board (org_id, unit_id, name, token)
            VALUES ($1, $2, $3, $4)
            RETURNING {TV_BOARD_COLUMNS}
            "#
        );
        sqlx::query_as::<_, TvBoard>(&sql)
            .bind(org_id)
            .bind(unit_id)
            .bind(name)
            .bind(token)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| AppError::from_db(e, "tv board"))
    }

    async fn find_tv_board(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<TvBoard>, AppError> {
        let sql = format!(
            "SELECT {TV_BOARD_COLUMNS} FROM tv_board WHERE org_id = $1 AND id = $2 AND deleted_at IS NULL"
        );
        let board = sqlx::query_as::<_, TvBoard>(&sql)
            .bind(org_id)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(board)
    }

    async fn list_tv_boards(&mut self, org_id: Uuid) -> Result<Vec<TvBoard>, AppError> {
        let sql = format!(
            "SELECT {TV_BOARD_COLUMNS} FROM tv_board WHERE org_id = $1 AND deleted_at IS NULL ORDER BY created_at ASC"
        );
        let boards = sqlx::query_as::<_, TvBoard>(&sql)
            .bind(org_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(boards)
    }

    async fn delete_tv_board(&mut self, org_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE tv_board SET deleted_at = now() WHERE org_id = $1 AND id = $2 AND deleted_at IS NULL",
        )
        .bind(org_id)
        .bind(id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_tv_board_by_token(&mut self, token: &str) -> Result<Option<TvBoard>, AppError> {
        let sql = format!("SELECT {TV_BOARD_COLUMNS} FROM tv_board WHERE token = $1 AND deleted_at IS NULL");
        let board = sqlx::query_as::<_, TvBoard>(&sql)
            .bind(token)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(board)
    }
}
