// src/db/audit_repo.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::postgres::PgTransaction;
use crate::models::audit::{NewObjectChange, ObjectChange};

#[async_trait]
pub trait AuditRepository {
    async fn insert_object_change(&mut self, change: &NewObjectChange) -> Result<ObjectChange, AppError>;

    /// Newest first.
    async fn list_object_changes(
        &mut self,
        org_id: Uuid,
        target_object_type: i32,
        target_object_id: Uuid,
    ) -> Result<Vec<ObjectChange>, AppError>;
}

#[async_trait]
impl AuditRepository for PgTransaction {
    async fn insert_object_change(&mut self, change: &NewObjectChange) -> Result<ObjectChange, AppError> {
        let row = sqlx::query_as::<_, ObjectChange>(
            r#"
            INSERT INTO app_object_change (
                org_id, user_id, action, target_object_type, target_object_id,
                prechange_state, postchange_state
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, org_id, user_id, action, target_object_type, target_object_id,
                      prechange_state, postchange_state, time
            "#,
        )
        .bind(change.org_id)
        .bind(change.user_id)
        .bind(change.action)
        .bind(change.target_object_type.id())
        .bind(change.target_object_id)
        .bind(&change.prechange_state)
        .bind(&change.postchange_state)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn list_object_changes(
        &mut self,
        org_id: Uuid,
        target_object_type: i32,
        target_object_id: Uuid,
    ) -> Result<Vec<ObjectChange>, AppError> {
        let rows = sqlx::query_as::<_, ObjectChange>(
            r#"
            SELECT id, org_id, user_id, action, target_object_type, target_object_id,
                   prechange_state, postchange_state, time
            FROM app_object_change
            WHERE org_id = $1 AND target_object_type = $2 AND target_object_id = $3
            ORDER BY time DESC
            "#,
        )
        .bind(org_id)
        .bind(target_object_type)
        .bind(target_object_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }
}
