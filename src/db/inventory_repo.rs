// src/db/inventory_repo.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::postgres::PgTransaction;
use crate::models::inventory::{
    Item, ItemInstance, ItemInstanceStatus, ItemVariant, NewItemInstance, NewItemVariant,
};

const INSTANCE_COLUMNS: &str =
    "id, org_id, item_id, variant_id, cell_id, status, affected_by_task_id, created_at";

#[async_trait]
pub trait InventoryRepository {
    async fn insert_item(&mut self, org_id: Uuid, name: &str, description: Option<&str>) -> Result<Item, AppError>;

    async fn insert_item_variant(&mut self, org_id: Uuid, item_id: Uuid, variant: &NewItemVariant) -> Result<ItemVariant, AppError>;

    async fn find_item(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<Item>, AppError>;

    async fn list_items(&mut self, org_id: Uuid) -> Result<Vec<Item>, AppError>;

    async fn list_item_variants(&mut self, org_id: Uuid, item_id: Uuid) -> Result<Vec<ItemVariant>, AppError>;

    async fn find_item_variant(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<ItemVariant>, AppError>;

    async fn insert_item_instance(&mut self, org_id: Uuid, instance: &NewItemInstance) -> Result<ItemInstance, AppError>;

    async fn find_item_instance(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<ItemInstance>, AppError>;

    /// Same as `find_item_instance` but holds a row lock until the transaction ends.
    async fn lock_item_instance(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<ItemInstance>, AppError>;

    async fn list_item_instances(&mut self, org_id: Uuid, item_id: Uuid) -> Result<Vec<ItemInstance>, AppError>;

    async fn update_instance_cell(&mut self, org_id: Uuid, id: Uuid, cell_id: Option<Uuid>) -> Result<ItemInstance, AppError>;

    async fn update_instance_status(
        &mut self,
        org_id: Uuid,
        id: Uuid,
        status: ItemInstanceStatus,
        affected_by_task_id: Option<Uuid>,
    ) -> Result<ItemInstance, AppError>;
}

#[async_trait]
impl InventoryRepository for PgTransaction {
    async fn insert_item(&mut self, org_id: Uuid, name: &str, description: Option<&str>) -> Result<Item, AppError> {
        sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO item (org_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id, org_id, name, description, created_at
            "#,
        )
        .bind(org_id)
        .bind(name)
        .bind(description)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_db(e, "item"))
    }

    async fn insert_item_variant(&mut self, org_id: Uuid, item_id: Uuid, variant: &NewItemVariant) -> Result<ItemVariant, AppError> {
        sqlx::query_as::<_, ItemVariant>(
            r#"
            INSERT INTO item_variant (org_id, item_id, name, article, ean13)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, org_id, item_id, name, article, ean13, created_at
            "#,
        )
        .bind(org_id)
        .bind(item_id)
        .bind(&variant.name)
        .bind(variant.article.as_deref())
        .bind(variant.ean13)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_db(e, "item variant"))
    }

    async fn find_item(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<Item>, AppError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, org_id, name, description, created_at
            FROM item
            WHERE org_id = $1 AND id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(org_id)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(item)
    }

    async fn list_items(&mut self, org_id: Uuid) -> Result<Vec<Item>, AppError> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, org_id, name, description, created_at
            FROM item
            WHERE org_id = $1 AND deleted_at IS NULL
            ORDER BY name ASC
            "#,
        )
        .bind(org_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(items)
    }

    async fn list_item_variants(&mut self, org_id: Uuid, item_id: Uuid) -> Result<Vec<ItemVariant>, AppError> {
        let variants = sqlx::query_as::<_, ItemVariant>(
            r#"
            SELECT id, org_id, item_id, name, article, ean13, created_at
            FROM item_variant
            WHERE org_id = $1 AND item_id = $2 AND deleted_at IS NULL
            ORDER BY created_at ASC
            "#,
        )
        .bind(org_id)
        .bind(item_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(variants)
    }

    async fn find_item_variant(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<ItemVariant>, AppError> {
        let variant = sqlx::query_as::<_, ItemVariant>(
            r#"
            SELECT id, org_id, item_id, name, article, ean13, created_at
            FROM item_variant
            WHERE org_id = $1 AND id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(org_id)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(variant)
    }

    async fn insert_item_instance(&mut self, org_id: Uuid, instance: &NewItemInstance) -> Result<ItemInstance, AppError> {
        let sql = format!(
            r#"
            INSERT INTO item_instance (org_id, item_id, variant_id, cell_id, status)
            VALUES ($1, $2, $3, $4, 'available')
            RETURNING {INSTANCE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ItemInstance>(&sql)
            .bind(org_id)
            .bind(instance.item_id)
            .bind(instance.variant_id)
            .bind(instance.cell_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| AppError::from_db(e, "item instance"))
    }

    async fn find_item_instance(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<ItemInstance>, AppError> {
        let sql = format!("SELECT {INSTANCE_COLUMNS} FROM item_instance WHERE org_id = $1 AND id = $2");
        let instance = sqlx::query_as::<_, ItemInstance>(&sql)
            .bind(org_id)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(instance)
    }

    async fn lock_item_instance(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<ItemInstance>, AppError> {
        let sql = format!(
            "SELECT {INSTANCE_COLUMNS} FROM item_instance WHERE org_id = $1 AND id = $2 FOR UPDATE"
        );
        let instance = sqlx::query_as::<_, ItemInstance>(&sql)
            .bind(org_id)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(instance)
    }

    async fn list_item_instances(&mut self, org_id: Uuid, item_id: Uuid) -> Result<Vec<ItemInstance>, AppError> {
        let sql = format!(
            "SELECT {INSTANCE_COLUMNS} FROM item_instance WHERE org_id = $1 AND item_id = $2 ORDER BY created_at ASC"
        );
        let instances = sqlx::query_as::<_, ItemInstance>(&sql)
            .bind(org_id)
            .bind(item_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(instances)
    }

    async fn update_instance_cell(&mut self, org_id: Uuid, id: Uuid, cell_id: Option<Uuid>) -> Result<ItemInstance, AppError> {
        let sql = format!(
            "UPDATE item_instance SET cell_id = $3 WHERE org_id = $1 AND id = $2 RETURNING {INSTANCE_COLUMNS}"
        );
        sqlx::query_as::<_, ItemInstance>(&sql)
            .bind(org_id)
            .bind(id)
            .bind(cell_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| AppError::from_db(e, "item instance"))
    }

    async fn update_instance_status(
        &mut self,
        org_id: Uuid,
        id: Uuid,
        status: ItemInstanceStatus,
        affected_by_task_id: Option<Uuid>,
    ) -> Result<ItemInstance, AppError> {
        let sql = format!(
            r#"
            UPDATE item_instance
            SET status = $3, affected_by_task_id = $4
            WHERE org_id = $1 AND id = $2
            RETURNING {INSTANCE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ItemInstance>(&sql)
            .bind(org_id)
            .bind(id)
            .bind(status)
            .bind(affected_by_task_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| AppError::from_db(e, "item instance"))
    }
}
