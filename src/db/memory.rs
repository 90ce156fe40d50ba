// src/db/memory.rs
//
// In-process implementation of the storage collaborator. A transaction holds
// the store lock for its whole lifetime and works on a copy of the state;
// `commit` swaps the copy in, dropping it discards every write.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::{
    AuditRepository, Database, InventoryRepository, RbacRepository, StorageRepository,
    TaskRepository, Transaction, TvBoardRepository,
};
use crate::models::{
    audit::{NewObjectChange, ObjectChange},
    inventory::{Item, ItemInstance, ItemInstanceStatus, ItemVariant, NewItemInstance, NewItemVariant},
    rbac::{ApiToken, Employee, Role},
    storage::{Cell, CellsGroup, OrganizationUnit, StorageGroup},
    task::{NewTask, Task, TaskItem, TaskItemStatus, TaskStatus},
    tv_board::TvBoard,
};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub roles: Vec<Role>,
    pub employees: Vec<Employee>,
    pub api_tokens: Vec<ApiToken>,
    pub units: Vec<OrganizationUnit>,
    pub storage_groups: Vec<StorageGroup>,
    pub cells_groups: Vec<CellsGroup>,
    pub cells: Vec<Cell>,
    pub items: Vec<Item>,
    pub variants: Vec<ItemVariant>,
    pub instances: Vec<ItemInstance>,
    pub tasks: Vec<Task>,
    pub task_items: Vec<TaskItem>,
    pub tv_boards: Vec<TvBoard>,
    pub object_changes: Vec<ObjectChange>,

    /// Makes every audit insert fail, to exercise rollback paths.
    pub fail_audit_writes: bool,
}

#[derive(Clone)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    /// Empty store with the reference roles seeded.
    pub fn new() -> Self {
        let state = MemoryState {
            roles: Role::seeded(),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Direct access to the committed state, for seeding and inspection.
    pub async fn with_state<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        let mut state = self.state.lock().await;
        f(&mut state)
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn begin(&self) -> Result<Box<dyn Transaction>, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

// --- RBAC ---

#[async_trait]
impl RbacRepository for MemoryTransaction {
    async fn list_roles(&mut self) -> Result<Vec<Role>, AppError> {
        Ok(self.working.roles.clone())
    }

    async fn find_employee(&mut self, org_id: Uuid, user_id: Uuid) -> Result<Option<Employee>, AppError> {
        Ok(self
            .working
            .employees
            .iter()
            .find(|e| e.org_id == org_id && e.user_id == user_id)
            .cloned())
    }

    async fn list_employees(&mut self, org_id: Uuid) -> Result<Vec<Employee>, AppError> {
        Ok(self.working.employees.iter().filter(|e| e.org_id == org_id).cloned().collect())
    }

    async fn upsert_employee_role(&mut self, org_id: Uuid, user_id: Uuid, role_id: i32) -> Result<Employee, AppError> {
        if !self.working.roles.iter().any(|r| r.id == role_id) {
            return Err(AppError::not_found("role"));
        }
        let employees = &mut self.working.employees;
        match employees.iter_mut().find(|e| e.org_id == org_id && e.user_id == user_id) {
            Some(existing) => {
                existing.role_id = role_id;
                Ok(existing.clone())
            }
            None => {
                let employee = Employee {
                    org_id,
                    user_id,
                    role_id,
                    created_at: Utc::now(),
                };
                employees.push(employee.clone());
                Ok(employee)
            }
        }
    }

    async fn delete_employee(&mut self, org_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let before = self.working.employees.len();
        self.working
            .employees
            .retain(|e| !(e.org_id == org_id && e.user_id == user_id));
        Ok(self.working.employees.len() < before)
    }

    async fn find_org_by_api_token(&mut self, token: &str) -> Result<Option<Uuid>, AppError> {
        Ok(self
            .working
            .api_tokens
            .iter()
            .find(|t| t.token == token && !t.is_revoked())
            .map(|t| t.org_id))
    }

    async fn insert_api_token(&mut self, org_id: Uuid, name: &str, token: &str) -> Result<ApiToken, AppError> {
        if self.working.api_tokens.iter().any(|t| t.token == token) {
            return Err(AppError::Duplication("api token violates app_api_token_token_key".into()));
        }
        let api_token = ApiToken {
            id: Uuid::new_v4(),
            org_id,
            name: name.to_string(),
            token: token.to_string(),
            created_at: Utc::now(),
            revoked_at: None,
        };
        self.working.api_tokens.push(api_token.clone());
        Ok(api_token)
    }

    async fn list_api_tokens(&mut self, org_id: Uuid) -> Result<Vec<ApiToken>, AppError> {
        Ok(self
            .working
            .api_tokens
            .iter()
            .rev()
            .filter(|t| t.org_id == org_id)
            .cloned()
            .collect())
    }

    async fn find_api_token(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<ApiToken>, AppError> {
        Ok(self
            .working
            .api_tokens
            .iter()
            .find(|t| t.org_id == org_id && t.id == id)
            .cloned())
    }

    async fn revoke_api_token(&mut self, org_id: Uuid, id: Uuid) -> Result<ApiToken, AppError> {
        let token = self
            .working
            .api_tokens
            .iter_mut()
            .find(|t| t.org_id == org_id && t.id == id)
            .ok_or_else(|| AppError::not_found("api token"))?;
        token.revoked_at.get_or_insert_with(Utc::now);
        Ok(token.clone())
    }
}

// --- Inventory ---

#[async_trait]
impl InventoryRepository for MemoryTransaction {
    async fn insert_item(&mut self, org_id: Uuid, name: &str, description: Option<&str>) -> Result<Item, AppError> {
        let item = Item {
            id: Uuid::new_v4(),
            org_id,
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
            variants: Vec::new(),
        };
        self.working.items.push(item.clone());
        Ok(item)
    }

    async fn insert_item_variant(&mut self, org_id: Uuid, item_id: Uuid, variant: &NewItemVariant) -> Result<ItemVariant, AppError> {
        let row = ItemVariant {
            id: Uuid::new_v4(),
            org_id,
            item_id,
            name: variant.name.clone(),
            article: variant.article.clone(),
            ean13: variant.ean13,
            created_at: Utc::now(),
        };
        self.working.variants.push(row.clone());
        Ok(row)
    }

    async fn find_item(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<Item>, AppError> {
        Ok(self
            .working
            .items
            .iter()
            .find(|i| i.org_id == org_id && i.id == id)
            .cloned())
    }

    async fn list_items(&mut self, org_id: Uuid) -> Result<Vec<Item>, AppError> {
        let mut items: Vec<Item> = self.working.items.iter().filter(|i| i.org_id == org_id).cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn list_item_variants(&mut self, org_id: Uuid, item_id: Uuid) -> Result<Vec<ItemVariant>, AppError> {
        Ok(self
            .working
            .variants
            .iter()
            .filter(|v| v.org_id == org_id && v.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn find_item_variant(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<ItemVariant>, AppError> {
        Ok(self
            .working
            .variants
            .iter()
            .find(|v| v.org_id == org_id && v.id == id)
            .cloned())
    }

    async fn insert_item_instance(&mut self, org_id: Uuid, instance: &NewItemInstance) -> Result<ItemInstance, AppError> {
        let row = ItemInstance {
            id: Uuid::new_v4(),
            org_id,
            item_id: instance.item_id,
            variant_id: instance.variant_id,
            cell_id: instance.cell_id,
            status: ItemInstanceStatus::Available,
            affected_by_task_id: None,
            created_at: Utc::now(),
        };
        self.working.instances.push(row.clone());
        Ok(row)
    }

    async fn find_item_instance(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<ItemInstance>, AppError> {
        Ok(self
            .working
            .instances
            .iter()
            .find(|i| i.org_id == org_id && i.id == id)
            .cloned())
    }

    async fn lock_item_instance(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<ItemInstance>, AppError> {
        // The whole store is already locked by this transaction.
        self.find_item_instance(org_id, id).await
    }

    async fn list_item_instances(&mut self, org_id: Uuid, item_id: Uuid) -> Result<Vec<ItemInstance>, AppError> {
        Ok(self
            .working
            .instances
            .iter()
            .filter(|i| i.org_id == org_id && i.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn update_instance_cell(&mut self, org_id: Uuid, id: Uuid, cell_id: Option<Uuid>) -> Result<ItemInstance, AppError> {
        let instance = self.instance_mut(org_id, id)?;
        instance.cell_id = cell_id;
        Ok(instance.clone())
    }

    async fn update_instance_status(
        &mut self,
        org_id: Uuid,
        id: Uuid,
        status: ItemInstanceStatus,
        affected_by_task_id: Option<Uuid>,
    ) -> Result<ItemInstance, AppError> {
        let instance = self.instance_mut(org_id, id)?;
        instance.status = status;
        instance.affected_by_task_id = affected_by_task_id;
        Ok(instance.clone())
    }
}

// --- Storage ---

#[async_trait]
impl StorageRepository for MemoryTransaction {
    async fn find_unit(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<OrganizationUnit>, AppError> {
        Ok(self.working.units.iter().find(|u| u.org_id == org_id && u.id == id).cloned())
    }

    async fn find_storage_group(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<StorageGroup>, AppError> {
        Ok(self
            .working
            .storage_groups
            .iter()
            .find(|g| g.org_id == org_id && g.id == id)
            .cloned())
    }

    async fn find_cells_group(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<CellsGroup>, AppError> {
        Ok(self
            .working
            .cells_groups
            .iter()
            .find(|g| g.org_id == org_id && g.id == id)
            .cloned())
    }

    async fn find_cell(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<Cell>, AppError> {
        Ok(self.working.cells.iter().find(|c| c.org_id == org_id && c.id == id).cloned())
    }
}

// --- Tasks ---

#[async_trait]
impl TaskRepository for MemoryTransaction {
    async fn insert_task(&mut self, org_id: Uuid, task: &NewTask) -> Result<Task, AppError> {
        let now = Utc::now();
        let row = Task {
            id: Uuid::new_v4(),
            org_id,
            unit_id: task.unit_id,
            name: task.name.clone(),
            description: task.description.clone(),
            status: TaskStatus::Pending,
            task_type: task.task_type,
            assigned_to_user_id: task.assigned_to_user_id,
            created_at: now,
            assigned_at: task.assigned_to_user_id.map(|_| now),
            completed_at: None,
            items: Vec::new(),
        };
        self.working.tasks.push(row.clone());
        Ok(row)
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
        let duplicate = self
            .working
            .task_items
            .iter()
            .any(|i| i.task_id == task_id && i.instance_id == instance_id);
        if duplicate {
            return Err(AppError::Duplication("task item violates task_item_task_id_instance_id_key".into()));
        }
        let row = TaskItem {
            id: Uuid::new_v4(),
            org_id,
            task_id,
            instance_id,
            source_cell_id,
            target_cell_id,
            status: TaskItemStatus::Pending,
            position,
        };
        self.working.task_items.push(row.clone());
        Ok(row)
    }

    async fn find_task(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<Task>, AppError> {
        Ok(self.working.tasks.iter().find(|t| t.org_id == org_id && t.id == id).cloned())
    }

    async fn lock_task(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<Task>, AppError> {
        self.find_task(org_id, id).await
    }

    async fn list_tasks(&mut self, org_id: Uuid) -> Result<Vec<Task>, AppError> {
        Ok(self.working.tasks.iter().rev().filter(|t| t.org_id == org_id).cloned().collect())
    }

    async fn list_unit_tasks(&mut self, org_id: Uuid, unit_id: Uuid) -> Result<Vec<Task>, AppError> {
        Ok(self
            .working
            .tasks
            .iter()
            .filter(|t| t.org_id == org_id && t.unit_id == unit_id)
            .cloned()
            .collect())
    }

    async fn list_task_items(&mut self, org_id: Uuid, task_id: Uuid) -> Result<Vec<TaskItem>, AppError> {
        let mut items: Vec<TaskItem> = self
            .working
            .task_items
            .iter()
            .filter(|i| i.org_id == org_id && i.task_id == task_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.position);
        Ok(items)
    }

    async fn lock_task_item(&mut self, org_id: Uuid, task_id: Uuid, instance_id: Uuid) -> Result<Option<TaskItem>, AppError> {
        Ok(self
            .working
            .task_items
            .iter()
            .find(|i| i.org_id == org_id && i.task_id == task_id && i.instance_id == instance_id)
            .cloned())
    }

    async fn update_task_item_status(&mut self, org_id: Uuid, id: Uuid, status: TaskItemStatus) -> Result<TaskItem, AppError> {
        let item = self
            .working
            .task_items
            .iter_mut()
            .find(|i| i.org_id == org_id && i.id == id)
            .ok_or_else(|| AppError::not_found("task item"))?;
        item.status = status;
        Ok(item.clone())
    }

    async fn update_task_status(
        &mut self,
        org_id: Uuid,
        id: Uuid,
        status: TaskStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Task, AppError> {
        let task = self.task_mut(org_id, id)?;
        task.status = status;
        if completed_at.is_some() {
            task.completed_at = completed_at;
        }
        Ok(task.clone())
    }

    async fn update_task_assignee(&mut self, org_id: Uuid, id: Uuid, user_id: Option<Uuid>) -> Result<Task, AppError> {
        let task = self.task_mut(org_id, id)?;
        task.assigned_to_user_id = user_id;
        task.assigned_at = user_id.map(|_| Utc::now());
        Ok(task.clone())
    }
}

// --- TV boards ---

#[async_trait]
impl TvBoardRepository for MemoryTransaction {
    async fn insert_tv_board(&mut self, org_id: Uuid, unit_id: Uuid, name: &str, token: &str) -> Result<TvBoard, AppError> {
        if self.working.tv_boards.iter().any(|b| b.token == token) {
            return Err(AppError::Duplication("tv board token".into()));
        }
        let board = TvBoard {
            id: Uuid::new_v4(),
            org_id,
            unit_id,
            name: name.to_string(),
            token: token.to_string(),
            created_at: Utc::now(),
        };
        self.working.tv_boards.push(board.clone());
        Ok(board)
    }

    async fn find_tv_board(&mut self, org_id: Uuid, id: Uuid) -> Result<Option<TvBoard>, AppError> {
        Ok(self
            .working
            .tv_boards
            .iter()
            .find(|b| b.org_id == org_id && b.id == id)
            .cloned())
    }

    async fn list_tv_boards(&mut self, org_id: Uuid) -> Result<Vec<TvBoard>, AppError> {
        Ok(self.working.tv_boards.iter().filter(|b| b.org_id == org_id).cloned().collect())
    }

    async fn delete_tv_board(&mut self, org_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let before = self.working.tv_boards.len();
        self.working.tv_boards.retain(|b| !(b.org_id == org_id && b.id == id));
        Ok(self.working.tv_boards.len() < before)
    }

    async fn find_tv_board_by_token(&mut self, token: &str) -> Result<Option<TvBoard>, AppError> {
        Ok(self.working.tv_boards.iter().find(|b| b.token == token).cloned())
    }
}

// --- Audit ---

#[async_trait]
impl AuditRepository for MemoryTransaction {
    async fn insert_object_change(&mut self, change: &NewObjectChange) -> Result<ObjectChange, AppError> {
        if self.working.fail_audit_writes {
            return Err(AppError::Internal(anyhow::anyhow!("audit store unavailable")));
        }
        let row = ObjectChange {
            id: Uuid::new_v4(),
            org_id: change.org_id,
            user_id: change.user_id,
            action: change.action,
            target_object_type: change.target_object_type.id(),
            target_object_id: change.target_object_id,
            prechange_state: change.prechange_state.clone(),
            postchange_state: change.postchange_state.clone(),
            time: Utc::now(),
        };
        self.working.object_changes.push(row.clone());
        Ok(row)
    }

    async fn list_object_changes(
        &mut self,
        org_id: Uuid,
        target_object_type: i32,
        target_object_id: Uuid,
    ) -> Result<Vec<ObjectChange>, AppError> {
        Ok(self
            .working
            .object_changes
            .iter()
            .rev()
            .filter(|c| {
                c.org_id == org_id
                    && c.target_object_type == target_object_type
                    && c.target_object_id == target_object_id
            })
            .cloned()
            .collect())
    }
}

impl MemoryTransaction {
    fn instance_mut(&mut self, org_id: Uuid, id: Uuid) -> Result<&mut ItemInstance, AppError> {
        self.working
            .instances
            .iter_mut()
            .find(|i| i.org_id == org_id && i.id == id)
            .ok_or_else(|| AppError::not_found("item instance"))
    }

    fn task_mut(&mut self, org_id: Uuid, id: Uuid) -> Result<&mut Task, AppError> {
        self.working
            .tasks
            .iter_mut()
            .find(|t| t.org_id == org_id && t.id == id)
            .ok_or_else(|| AppError::not_found("task"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let db = MemoryDatabase::new();
        let org = Uuid::new_v4();

        {
            let mut tx = db.begin().await.unwrap();
            tx.insert_item(org, "Bolt", None).await.unwrap();
        }

        let items = db.with_state(|s| s.items.len()).await;
        assert_eq!(items, 0);
    }

    #[tokio::test]
    async fn committed_transaction_is_visible() {
        let db = MemoryDatabase::new();
        let org = Uuid::new_v4();

        let mut tx = db.begin().await.unwrap();
        tx.insert_item(org, "Bolt", None).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = db.begin().await.unwrap();
        assert_eq!(tx.list_items(org).await.unwrap().len(), 1);
        assert!(tx.list_items(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn revoked_tokens_do_not_resolve() {
        let db = MemoryDatabase::new();
        let org = Uuid::new_v4();

        let mut tx = db.begin().await.unwrap();
        let token = tx.insert_api_token(org, "ci", "secret").await.unwrap();
        assert_eq!(tx.find_org_by_api_token("secret").await.unwrap(), Some(org));

        let revoked = tx.revoke_api_token(org, token.id).await.unwrap();
        assert!(revoked.is_revoked());
        assert_eq!(tx.find_org_by_api_token("secret").await.unwrap(), None);
    }
}
