// src/db/task_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::postgres::PgTransaction;
use crate::models::task::{NewTask, Task, TaskItem, TaskItemStatus, TaskStatus};

const TASK_COLUMNS: &str = "id, org_id, unit_id, name, description, status, type, \
     assigned_to_user_id, created_at, assigned_at, completed_at";

const TASK_ITEM_COLUMNS: &str =
    "id, org_id, task_id, instance_id, source_cell_id, target_cell_id, status, position";

#[async_trait]
pub trait TaskRepository {
    async fn insert_task(&mut self, org_id: Uuid, task: &NewTask) -> Result<Task, AppError>;

    async fn insert_task_item(
        &mut self,
        org_id: Uuid,
        task_id: Uuid,
        instance_id: Uuid,
        source_cell_id: Option<Uuid>,
        target_cell_id: Option<Uuid>,
        position: i32,
    ) -> Result<TaskItem, AppError>;

    async fn find_task(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<Task>, AppError>;

    /// Row-locks the task until the transaction ends.
    async fn lock_task(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<Task>, AppError>;

    async fn list_tasks(&mut self, org_id: Uuid) -> Result<Vec<Task>, AppError>;

    async fn list_unit_tasks(&mut self, org_id: Uuid, unit_id: Uuid) -> Result<Vec<Task>, AppError>;

    /// Items in creation order.
    async fn list_task_items(&mut self, org_id: Uuid, task_id: Uuid) -> Result<Vec<TaskItem>, AppError>;

    /// Row-locks the task item referencing `instance_id` within `task_id`.
    async fn lock_task_item(&mut self, org_id: Uuid, task_id: Uuid, instance_id: Uuid) -> Result<Option<TaskItem>, AppError>;

    async fn update_task_item_status(&mut self, org_id: Uuid, id: Uuid, status: TaskItemStatus) -> Result<TaskItem, AppError>;

    async fn update_task_status(
        &mut self,
        org_id: Uuid,
        id: Uuid,
        status: TaskStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Task, AppError>;

    async fn update_task_assignee(&mut self, org_id: Uuid, id: Uuid, user_id: Option<Uuid>) -> Result<Task, AppError>;
}

#[async_trait]
impl TaskRepository for PgTransaction {
    async fn insert_task(&mut self, org_id: Uuid, task: &NewTask) -> Result<Task, AppError> {
        let sql = format!(
            r#"
            INSERT INTO task (org_id, unit_id, name, description, status, type, assigned_to_user_id, assigned_at)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6, CASE WHEN $6::uuid IS NULL THEN NULL ELSE now() END)
            RETURNING {TASK_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Task>(&sql)
            .bind(org_id)
            .bind(task.unit_id)
            .bind(&task.name)
            .bind(task.description.as_deref())
            .bind(task.task_type)
            .bind(task.assigned_to_user_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| AppError::from_db(e, "task"))
    }

    async fn insert_task_item(
        &mut self,
        org_id: Uuid,
        task_id: Uuid,
        instance_id: Uuid,
        source_cell_id: Option<Uuid>,
        target_cell_id: Option<Uuid>,
        position: i32,
    ) -> Result<TaskItem, AppError> {
        let sql = format!(
            r#"
            INSERT INTO task_item (org_id, task_id, instance_id, source_cell_id, target_cell_id, status, position)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6)
            RETURNING {TASK_ITEM_COLUMNS}
            "#
        );
        sqlx::query_as::<_, TaskItem>(&sql)
            .bind(org_id)
            .bind(task_id)
            .bind(instance_id)
            .bind(source_cell_id)
            .bind(target_cell_id)
            .bind(position)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| AppError::from_db(e, "task item"))
    }

    async fn find_task(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<Task>, AppError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM task WHERE org_id = $1 AND id = $2");
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(org_id)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(task)
    }

    async fn lock_task(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<Task>, AppError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM task WHERE org_id = $1 AND id = $2 FOR UPDATE");
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(org_id)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(task)
    }

    async fn list_tasks(&mut self, org_id: Uuid) -> Result<Vec<Task>, AppError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM task WHERE org_id = $1 ORDER BY created_at DESC");
        let tasks = sqlx::query_as::<_, Task>(&sql)
            .bind(org_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(tasks)
    }

    async fn list_unit_tasks(&mut self, org_id: Uuid, unit_id: Uuid) -> Result<Vec<Task>, AppError> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM task WHERE org_id = $1 AND unit_id = $2 ORDER BY created_at ASC"
        );
        let tasks = sqlx::query_as::<_, Task>(&sql)
            .bind(org_id)
            .bind(unit_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(tasks)
    }

    async fn list_task_items(&mut self, org_id: Uuid, task_id: Uuid) -> Result<Vec<TaskItem>, AppError> {
        let sql = format!(
            "SELECT {TASK_ITEM_COLUMNS} FROM task_item WHERE org_id = $1 AND task_id = $2 ORDER BY position ASC"
        );
        let items = sqlx::query_as::<_, TaskItem>(&sql)
            .bind(org_id)
            .bind(task_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(items)
    }

    async fn lock_task_item(&mut self, org_id: Uuid, task_id: Uuid, instance_id: Uuid) -> Result<Option<TaskItem>, AppError> {
        let sql = format!(
            r#"
            SELECT {TASK_ITEM_COLUMNS}
            FROM task_item
            WHERE org_id = $1 AND task_id = $2 AND instance_id = $3
            FOR UPDATE
            "#
        );
        let item = sqlx::query_as::<_, TaskItem>(&sql)
            .bind(org_id)
            .bind(task_id)
            .bind(instance_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(item)
    }

    async fn update_task_item_status(&mut self, org_id: Uuid, id: Uuid, status: TaskItemStatus) -> Result<TaskItem, AppError> {
        let sql = format!(
            "UPDATE task_item SET status = $3 WHERE org_id = $1 AND id = $2 RETURNING {TASK_ITEM_COLUMNS}"
        );
        sqlx::query_as::<_, TaskItem>(&sql)
            .bind(org_id)
            .bind(id)
            .bind(status)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| AppError::from_db(e, "task item"))
    }

    async fn update_task_status(
        &mut self,
        org_id: Uuid,
        id: Uuid,
        status: TaskStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Task, AppError> {
        let sql = format!(
            r#"
            UPDATE task
            SET status = $3, completed_at = COALESCE($4, completed_at)
            WHERE org_id = $1 AND id = $2
            RETURNING {TASK_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Task>(&sql)
            .bind(org_id)
            .bind(id)
            .bind(status)
            .bind(completed_at)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| AppError::from_db(e, "task"))
    }

    async fn update_task_assignee(&mut self, org_id: Uuid, id: Uuid, user_id: Option<Uuid>) -> Result<Task, AppError> {
        let sql = format!(
            r#"
            UPDATE task
            SET assigned_to_user_id = $3,
                assigned_at = CASE WHEN $3::uuid IS NULL THEN NULL ELSE now() END
            WHERE org_id = $1 AND id = $2
            RETURNING {TASK_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Task>(&sql)
            .bind(org_id)
            .bind(id)
            .bind(user_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| AppError::from_db(e, "task"))
    }
}
