// src/usecases/item.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{error::AppError, identity::RequestIdentity},
    db::Database,
    models::{
        inventory::{Item, ItemInstance, NewItem, NewItemInstance},
        rbac::AccessLevel,
        storage::CellPathSegment,
    },
    services::{
        auth::{AccessOptions, AuthService},
        inventory_service::InventoryService,
        storage_service::StorageService,
    },
};

#[derive(Clone)]
pub struct ItemUseCase {
    db: Arc<dyn Database>,
    auth: AuthService,
    inventory: InventoryService,
    storage: StorageService,
}

impl ItemUseCase {
    pub fn new(db: Arc<dyn Database>, auth: AuthService, inventory: InventoryService, storage: StorageService) -> Self {
        Self {
            db,
            auth,
            inventory,
            storage,
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn create_item(&self, identity: &RequestIdentity, input: NewItem) -> Result<Item, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Worker, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        let item = self.inventory.create_item(&mut *tx, grant.org_id, grant.user_id, &input).await?;

        tx.commit().await?;
        Ok(item)
    }

    pub async fn get_item(&self, identity: &RequestIdentity, item_id: Uuid) -> Result<Item, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Worker, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        self.inventory.get_item(&mut *tx, grant.org_id, item_id).await
    }

    pub async fn list_items(&self, identity: &RequestIdentity) -> Result<Vec<Item>, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Worker, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        self.inventory.list_items(&mut *tx, grant.org_id).await
    }

    #[tracing::instrument(skip_all, fields(item_id = %input.item_id))]
    pub async fn create_item_instance(&self, identity: &RequestIdentity, input: NewItemInstance) -> Result<ItemInstance, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Worker, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        let instance = self
            .inventory
            .create_item_instance(&mut *tx, grant.org_id, grant.user_id, &input)
            .await?;

        tx.commit().await?;
        Ok(instance)
    }

    pub async fn get_item_instance(&self, identity: &RequestIdentity, instance_id: Uuid) -> Result<ItemInstance, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Worker, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        self.inventory.get_item_instance(&mut *tx, grant.org_id, instance_id).await
    }

    pub async fn list_item_instances(&self, identity: &RequestIdentity, item_id: Uuid) -> Result<Vec<ItemInstance>, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Worker, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        self.inventory.list_item_instances(&mut *tx, grant.org_id, item_id).await
    }

    pub async fn get_cell_path(&self, identity: &RequestIdentity, cell_id: Uuid) -> Result<Vec<CellPathSegment>, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Worker, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        self.storage.get_cell_path(&mut *tx, grant.org_id, cell_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{inventory::ItemInstanceStatus, rbac::RoleName},
        services::{
            audit_service::AuditService, inventory_service::fixtures::seed_instance,
            storage_service::fixtures::seed_warehouse,
        },
        usecases::testing::{Harness, JWT_SECRET},
    };

    fn use_case(h: &Harness) -> ItemUseCase {
        let storage = StorageService::new();
        let inventory = InventoryService::new(AuditService::new(), storage.clone());
        ItemUseCase::new(h.database(), AuthService::new(JWT_SECRET.into()), inventory, storage)
    }

    fn drill() -> NewItem {
        NewItem {
            name: "Drill".into(),
            description: None,
            variants: vec![crate::models::inventory::NewItemVariant {
                name: "18V".into(),
                article: Some("DR-18".into()),
                ean13: None,
            }],
        }
    }

    #[tokio::test]
    async fn instance_is_created_available_and_audited() {
        let h = Harness::new();
        let org = h.org_id;
        let wh = h.db.with_state(|s| seed_warehouse(s, org, 1, 1)).await;
        let token = h.api_token("svc", false).await;
        let uc = use_case(&h);

        let item = uc.create_item(&token, drill()).await.unwrap();
        let instance = uc
            .create_item_instance(
                &token,
                NewItemInstance {
                    item_id: item.id,
                    variant_id: item.variants[0].id,
                    cell_id: Some(wh.cell_ids[0]),
                },
            )
            .await
            .unwrap();

        assert_eq!(instance.status, ItemInstanceStatus::Available);
        assert_eq!(instance.cell_id, Some(wh.cell_ids[0]));
        // item + variant + instance
        assert_eq!(h.audit_count().await, 3);
        let audited_user = h.db.with_state(|s| s.object_changes[2].user_id).await;
        assert_eq!(audited_user, None);
    }

    #[tokio::test]
    async fn entities_of_another_org_are_not_found() {
        let h = Harness::new();
        let foreign_org = Uuid::new_v4();
        let (foreign_instance, foreign_cell, foreign_item) = h
            .db
            .with_state(|s| {
                let wh = seed_warehouse(s, foreign_org, 2, 1);
                let instance = seed_instance(s, foreign_org, Some(wh.cell_ids[0]));
                (instance, wh.cell_ids[0], s.items[0].id)
            })
            .await;
        let owner = h.employee(RoleName::Owner).await;
        let uc = use_case(&h);

        assert!(matches!(uc.get_item_instance(&owner, foreign_instance).await, Err(AppError::NotFound(_))));
        assert!(matches!(uc.get_cell_path(&owner, foreign_cell).await, Err(AppError::NotFound(_))));
        assert!(matches!(uc.get_item(&owner, foreign_item).await, Err(AppError::NotFound(_))));
        assert!(matches!(uc.list_item_instances(&owner, foreign_item).await, Err(AppError::NotFound(_))));
        assert!(uc.list_items(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cell_path_through_the_use_case() {
        let h = Harness::new();
        let org = h.org_id;
        let wh = h.db.with_state(|s| seed_warehouse(s, org, 1, 1)).await;
        let manager = h.employee(RoleName::Manager).await;

        let path = use_case(&h).get_cell_path(&manager, wh.cell_ids[0]).await.unwrap();
        let ids: Vec<Uuid> = path.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![wh.unit_id, wh.storage_group_ids[0], wh.cells_group_id]);
    }

    #[tokio::test]
    async fn failed_audit_leaves_no_item_behind() {
        let h = Harness::new();
        let admin = h.employee(RoleName::Admin).await;
        h.db.with_state(|s| s.fail_audit_writes = true).await;

        let err = use_case(&h).create_item(&admin, drill()).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert!(h.db.with_state(|s| s.items.is_empty() && s.variants.is_empty()).await);
    }
}
