// src/services/inventory_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::Transaction,
    models::{
        audit::{ObjectChangeAction, ObjectType},
        inventory::{Item, ItemInstance, ItemInstanceStatus, NewItem, NewItemInstance},
    },
    services::{audit_service::AuditService, storage_service::StorageService},
};

pub const MAX_NAME_LEN: usize = 100;
const MAX_EAN13: i64 = 9_999_999_999_999;

/// Checks a display name: trimmed, non-empty, at most `MAX_NAME_LEN` chars.
pub fn validate_name(field: &str, value: &str) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(AppError::validation(format!("{field} is required")));
    }
    if len > MAX_NAME_LEN {
        return Err(AppError::validation(format!("{field} must be at most {MAX_NAME_LEN} characters")));
    }
    Ok(())
}

#[derive(Clone, Default)]
pub struct InventoryService {
    audit: AuditService,
    storage: StorageService,
}

impl InventoryService {
    pub fn new(audit: AuditService, storage: StorageService) -> Self {
        Self { audit, storage }
    }

    // --- Catalog ---

    #[tracing::instrument(skip(self, tx, input), fields(name = %input.name))]
    pub async fn create_item(
        &self,
        tx: &mut dyn Transaction,
        org_id: Uuid,
        user_id: Option<Uuid>,
        input: &NewItem,
    ) -> Result<Item, AppError> {
        // 1. Validation before touching the store
        validate_name("name", &input.name)?;
        for variant in &input.variants {
            validate_name("variant name", &variant.name)?;
            if let Some(ean) = variant.ean13 {
                if !(0..=MAX_EAN13).contains(&ean) {
                    return Err(AppError::validation("ean13 must have at most 13 digits"));
                }
            }
        }

        // 2. Item
        let mut item = tx
            .insert_item(org_id, input.name.trim(), input.description.as_deref())
            .await?;
        self.audit
            .record(tx, org_id, user_id, ObjectChangeAction::Create, ObjectType::Item, item.id, None, Some(&item))
            .await?;

        // 3. Variants, same transaction
        for new_variant in &input.variants {
            let variant = tx.insert_item_variant(org_id, item.id, new_variant).await?;
            self.audit
                .record(
                    tx,
                    org_id,
                    user_id,
                    ObjectChangeAction::Create,
                    ObjectType::ItemVariant,
                    variant.id,
                    None,
                    Some(&variant),
                )
                .await?;
            item.variants.push(variant);
        }

        tracing::info!(item_id = %item.id, variants = item.variants.len(), "item created");
        Ok(item)
    }

    pub async fn get_item(&self, tx: &mut dyn Transaction, org_id: Uuid, item_id: Uuid) -> Result<Item, AppError> {
        let mut item = tx
            .find_item(org_id, item_id)
            .await?
            .ok_or_else(|| AppError::not_found("item"))?;
        item.variants = tx.list_item_variants(org_id, item.id).await?;
        Ok(item)
    }

    pub async fn list_items(&self, tx: &mut dyn Transaction, org_id: Uuid) -> Result<Vec<Item>, AppError> {
        let mut items = tx.list_items(org_id).await?;
        for item in &mut items {
            item.variants = tx.list_item_variants(org_id, item.id).await?;
        }
        Ok(items)
    }

    // --- Instances ---

    #[tracing::instrument(skip(self, tx, input), fields(item_id = %input.item_id))]
    pub async fn create_item_instance(
        &self,
        tx: &mut dyn Transaction,
        org_id: Uuid,
        user_id: Option<Uuid>,
        input: &NewItemInstance,
    ) -> Result<ItemInstance, AppError> {
        // 1. Every reference must resolve inside the organization
        tx.find_item(org_id, input.item_id)
            .await?
            .ok_or_else(|| AppError::not_found("item"))?;
        let variant = tx
            .find_item_variant(org_id, input.variant_id)
            .await?
            .ok_or_else(|| AppError::not_found("item variant"))?;
        if variant.item_id != input.item_id {
            return Err(AppError::validation("variant does not belong to the item"));
        }
        if let Some(cell_id) = input.cell_id {
            self.storage.require_cell(tx, org_id, cell_id).await?;
        }

        // 2. Insert (status available) + audit
        let instance = tx.insert_item_instance(org_id, input).await?;
        self.audit
            .record(
                tx,
                org_id,
                user_id,
                ObjectChangeAction::Create,
                ObjectType::ItemInstance,
                instance.id,
                None,
                Some(&instance),
            )
            .await?;

        tracing::info!(instance_id = %instance.id, cell_id = ?instance.cell_id, "item instance created");
        Ok(instance)
    }

    pub async fn get_item_instance(&self, tx: &mut dyn Transaction, org_id: Uuid, instance_id: Uuid) -> Result<ItemInstance, AppError> {
        tx.find_item_instance(org_id, instance_id)
            .await?
            .ok_or_else(|| AppError::not_found("item instance"))
    }

    pub async fn list_item_instances(&self, tx: &mut dyn Transaction, org_id: Uuid, item_id: Uuid) -> Result<Vec<ItemInstance>, AppError> {
        tx.find_item(org_id, item_id)
            .await?
            .ok_or_else(|| AppError::not_found("item"))?;
        tx.list_item_instances(org_id, item_id).await
    }

    /// The only way an instance changes location. `None` leaves it unplaced.
    /// Writes exactly one audit record with the full before/after state.
    #[tracing::instrument(skip(self, tx))]
    pub async fn set_instance_cell(
        &self,
        tx: &mut dyn Transaction,
        org_id: Uuid,
        user_id: Option<Uuid>,
        instance_id: Uuid,
        cell_id: Option<Uuid>,
    ) -> Result<ItemInstance, AppError> {
        let before = tx
            .lock_item_instance(org_id, instance_id)
            .await?
            .ok_or_else(|| AppError::not_found("item instance"))?;

        if let Some(cell_id) = cell_id {
            self.storage.require_cell(tx, org_id, cell_id).await?;
        }

        let after = tx.update_instance_cell(org_id, instance_id, cell_id).await?;
        self.audit
            .record(
                tx,
                org_id,
                user_id,
                ObjectChangeAction::Update,
                ObjectType::ItemInstance,
                instance_id,
                Some(&before),
                Some(&after),
            )
            .await?;

        tracing::debug!(from = ?before.cell_id, to = ?after.cell_id, "instance relocated");
        Ok(after)
    }

    /// The only way an instance changes availability. `task_id` stamps the
    /// task holding the instance (`None` clears it). One audit record.
    #[tracing::instrument(skip(self, tx))]
    pub async fn set_item_instance_status(
        &self,
        tx: &mut dyn Transaction,
        org_id: Uuid,
        user_id: Option<Uuid>,
        instance_id: Uuid,
        status: ItemInstanceStatus,
        task_id: Option<Uuid>,
    ) -> Result<ItemInstance, AppError> {
        let before = tx
            .lock_item_instance(org_id, instance_id)
            .await?
            .ok_or_else(|| AppError::not_found("item instance"))?;

        let after = tx
            .update_instance_status(org_id, instance_id, status, task_id)
            .await?;
        self.audit
            .record(
                tx,
                org_id,
                user_id,
                ObjectChangeAction::Update,
                ObjectType::ItemInstance,
                instance_id,
                Some(&before),
                Some(&after),
            )
            .await?;

        tracing::debug!(from = ?before.status, to = ?after.status, "instance status changed");
        Ok(after)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;
    use uuid::Uuid;

    use crate::db::memory::MemoryState;
    use crate::models::inventory::{Item, ItemInstance, ItemInstanceStatus, ItemVariant};

    /// Seeds one item with one variant and an available instance at `cell_id`.
    /// Returns the instance id.
    pub fn seed_instance(state: &mut MemoryState, org_id: Uuid, cell_id: Option<Uuid>) -> Uuid {
        let item_id = Uuid::new_v4();
        let variant_id = Uuid::new_v4();
        let instance_id = Uuid::new_v4();
        let now = Utc::now();

        state.items.push(Item {
            id: item_id,
            org_id,
            name: "Pallet jack".into(),
            description: None,
            created_at: now,
            variants: Vec::new(),
        });
        state.variants.push(ItemVariant {
            id: variant_id,
            org_id,
            item_id,
            name: "Standard".into(),
            article: Some("PJ-1".into()),
            ean13: Some(4_006_381_333_931),
            created_at: now,
        });
        state.instances.push(ItemInstance {
            id: instance_id,
            org_id,
            item_id,
            variant_id,
            cell_id,
            status: ItemInstanceStatus::Available,
            affected_by_task_id: None,
            created_at: now,
        });
        instance_id
    }
}
