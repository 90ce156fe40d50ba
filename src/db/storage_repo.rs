// src/db/storage_repo.rs
//
// Read side of the storage hierarchy. Creating and restructuring units,
// storage groups and cells lives outside this crate.

use async_trait::async_trait;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::postgres::PgTransaction;
use crate::models::storage::{Cell, CellsGroup, OrganizationUnit, StorageGroup};

#[async_trait]
pub trait StorageRepository {
    async fn find_unit(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<OrganizationUnit>, AppError>;

    async fn find_storage_group(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<StorageGroup>, AppError>;

    async fn find_cells_group(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<CellsGroup>, AppError>;

    async fn find_cell(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<Cell>, AppError>;
}

#[async_trait]
impl StorageRepository for PgTransaction {
    async fn find_unit(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<OrganizationUnit>, AppError> {
        let unit = sqlx::query_as::<_, OrganizationUnit>(
            r#"
            SELECT id, org_id, name, alias
            FROM org_unit
            WHERE org_id = $1 AND id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(org_id)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(unit)
    }

    async fn find_storage_group(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<StorageGroup>, AppError> {
        let group = sqlx::query_as::<_, StorageGroup>(
            r#"
            SELECT id, org_id, unit_id, parent_id, name, alias
            FROM storage_group
            WHERE org_id = $1 AND id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(org_id)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(group)
    }

    async fn find_cells_group(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<CellsGroup>, AppError> {
        let group = sqlx::query_as::<_, CellsGroup>(
            r#"
            SELECT id, org_id, unit_id, storage_group_id, name, alias
            FROM cells_group
            WHERE org_id = $1 AND id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(org_id)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(group)
    }

    async fn find_cell(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<Cell>, AppError> {
        let cell = sqlx::query_as::<_, Cell>(
            r#"
            SELECT id, org_id, cells_group_id, alias, "row", level, position
            FROM cell
            WHERE org_id = $1 AND id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(org_id)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(cell)
    }
}
