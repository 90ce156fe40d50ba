// src/services/task_service.rs
//
// Task workflow engine. Every method runs inside the caller's transaction;
// the task, task item and instance rows it mutates are locked first.

use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::Transaction,
    models::{
        audit::{ObjectChangeAction, ObjectType},
        inventory::ItemInstanceStatus,
        task::{NewTask, Task, TaskItemStatus, TaskStatus, TaskType},
    },
    services::{
        audit_service::AuditService,
        completion::CompletionStrategies,
        inventory_service::{validate_name, InventoryService},
        storage_service::StorageService,
    },
};

#[derive(Clone, Default)]
pub struct TaskService {
    audit: AuditService,
    inventory: InventoryService,
    storage: StorageService,
    completion: CompletionStrategies,
}

impl TaskService {
    pub fn new(
        audit: AuditService,
        inventory: InventoryService,
        storage: StorageService,
        completion: CompletionStrategies,
    ) -> Self {
        Self {
            audit,
            inventory,
            storage,
            completion,
        }
    }

    // --- Reads ---

    pub async fn get_task(&self, tx: &mut dyn Transaction, org_id: Uuid, task_id: Uuid) -> Result<Task, AppError> {
        let mut task = tx
            .find_task(org_id, task_id)
            .await?
            .ok_or_else(|| AppError::not_found("task"))?;
        task.items = tx.list_task_items(org_id, task.id).await?;
        Ok(task)
    }

    pub async fn list_tasks(&self, tx: &mut dyn Transaction, org_id: Uuid) -> Result<Vec<Task>, AppError> {
        tx.list_tasks(org_id).await
    }

    /// Open tasks of a unit with their items, oldest first.
    pub async fn list_board_tasks(&self, tx: &mut dyn Transaction, org_id: Uuid, unit_id: Uuid) -> Result<Vec<Task>, AppError> {
        self.storage.require_unit(tx, org_id, unit_id).await?;
        let mut tasks: Vec<Task> = tx
            .list_unit_tasks(org_id, unit_id)
            .await?
            .into_iter()
            .filter(|t| !t.status.is_terminal())
            .collect();
        for task in &mut tasks {
            task.items = tx.list_task_items(org_id, task.id).await?;
        }
        Ok(tasks)
    }

    // --- Creation & assignment ---

    #[tracing::instrument(skip(self, tx, input), fields(unit_id = %input.unit_id, items = input.items.len()))]
    pub async fn create_task(
        &self,
        tx: &mut dyn Transaction,
        org_id: Uuid,
        user_id: Option<Uuid>,
        input: &NewTask,
    ) -> Result<Task, AppError> {
        // 1. Shape of the request
        validate_name("name", &input.name)?;
        if input.items.is_empty() {
            return Err(AppError::validation("task must have at least one item"));
        }
        let mut seen = HashSet::new();
        for item in &input.items {
            if !seen.insert(item.instance_id) {
                return Err(AppError::validation(format!("instance {} is listed twice", item.instance_id)));
            }
            if input.task_type == TaskType::Movement && item.target_cell_id.is_none() {
                return Err(AppError::validation("movement task items require a target cell"));
            }
        }

        // 2. References inside the organization
        self.storage.require_unit(tx, org_id, input.unit_id).await?;
        for target in input.items.iter().filter_map(|i| i.target_cell_id) {
            self.storage.require_cell(tx, org_id, target).await?;
        }
        if let Some(assignee) = input.assigned_to_user_id {
            self.require_employee(tx, org_id, assignee).await?;
        }

        // 3. Task + items. Instances are resolved at pick time; the source
        //    cell is captured now when the instance is visible.
        let normalized = NewTask {
            name: input.name.trim().to_string(),
            ..input.clone()
        };
        let mut task = tx.insert_task(org_id, &normalized).await?;
        for (position, item) in input.items.iter().enumerate() {
            let source_cell_id = tx
                .find_item_instance(org_id, item.instance_id)
                .await?
                .and_then(|instance| instance.cell_id);
            let row = tx
                .insert_task_item(
                    org_id,
                    task.id,
                    item.instance_id,
                    source_cell_id,
                    item.target_cell_id,
                    position as i32,
                )
                .await?;
            task.items.push(row);
        }

        // 4. Audit
        self.audit
            .record(tx, org_id, user_id, ObjectChangeAction::Create, ObjectType::Task, task.id, None, Some(&task))
            .await?;

        tracing::info!(task_id = %task.id, task_type = ?task.task_type, "task created");
        Ok(task)
    }

    #[tracing::instrument(skip(self, tx))]
    pub async fn assign_task(
        &self,
        tx: &mut dyn Transaction,
        org_id: Uuid,
        user_id: Option<Uuid>,
        task_id: Uuid,
        assignee: Option<Uuid>,
    ) -> Result<Task, AppError> {
        let before = self.lock_task_with_items(tx, org_id, task_id).await?;
        if before.status.is_terminal() {
            return Err(AppError::invalid_state(format!("task is {:?}", before.status)));
        }
        if let Some(assignee) = assignee {
            self.require_employee(tx, org_id, assignee).await?;
        }

        let mut after = tx.update_task_assignee(org_id, task_id, assignee).await?;
        after.items = before.items.clone();
        self.record_task_update(tx, user_id, &before, &after).await?;

        tracing::info!(assignee = ?assignee, "task assigned");
        Ok(after)
    }

    // --- Execution ---

    /// A worker takes `instance_id` off its shelf for `task_id`.
    ///
    /// The task item must be pending; a second pick of the same instance is
    /// rejected with `NotFound` and changes nothing. An instance reserved by
    /// another task is `InvalidState`.
    #[tracing::instrument(skip(self, tx))]
    pub async fn pick_instance_from_cell(
        &self,
        tx: &mut dyn Transaction,
        org_id: Uuid,
        user_id: Option<Uuid>,
        task_id: Uuid,
        instance_id: Uuid,
    ) -> Result<Task, AppError> {
        // 1. Task and its pending item, both locked
        let before = self.lock_task_with_items(tx, org_id, task_id).await?;
        if before.status.is_terminal() {
            return Err(AppError::invalid_state(format!("task is {:?}", before.status)));
        }
        let task_item = tx
            .lock_task_item(org_id, task_id, instance_id)
            .await?
            .filter(|item| item.status == TaskItemStatus::Pending)
            .ok_or_else(|| AppError::not_found("pending task item for instance"))?;

        // 2. Instance must be free or already held by this task
        let instance = tx
            .lock_item_instance(org_id, instance_id)
            .await?
            .ok_or_else(|| AppError::not_found("item instance"))?;
        match instance.status {
            ItemInstanceStatus::Consumed => {
                return Err(AppError::invalid_state("item instance is consumed"));
            }
            ItemInstanceStatus::Reserved if instance.affected_by_task_id != Some(task_id) => {
                tracing::warn!(held_by = ?instance.affected_by_task_id, "instance held by another task");
                return Err(AppError::invalid_state("item instance is reserved by another task"));
            }
            _ => {}
        }

        // 3. Off the shelf, reserved for this task
        self.inventory
            .set_instance_cell(tx, org_id, user_id, instance_id, None)
            .await?;
        self.inventory
            .set_item_instance_status(tx, org_id, user_id, instance_id, ItemInstanceStatus::Reserved, Some(task_id))
            .await?;

        // 4. Task item picked
        tx.update_task_item_status(org_id, task_item.id, TaskItemStatus::Picked)
            .await?;

        // 5. Task ready once nothing is pending
        let items = tx.list_task_items(org_id, task_id).await?;
        let next = if items.iter().any(|i| i.status == TaskItemStatus::Pending) {
            TaskStatus::InProgress
        } else {
            TaskStatus::Ready
        };
        let mut after = if next != before.status && before.status.can_transition_to(next) {
            tx.update_task_status(org_id, task_id, next, None).await?
        } else {
            before.clone()
        };
        after.items = items;

        self.record_task_update(tx, user_id, &before, &after).await?;

        tracing::info!(status = ?after.status, "instance picked");
        Ok(after)
    }

    /// Compensating step: a picked instance goes back to a cell instead of
    /// being delivered. Defaults to the cell it was picked from.
    #[tracing::instrument(skip(self, tx))]
    pub async fn return_instance_to_cell(
        &self,
        tx: &mut dyn Transaction,
        org_id: Uuid,
        user_id: Option<Uuid>,
        task_id: Uuid,
        instance_id: Uuid,
        cell_id: Option<Uuid>,
    ) -> Result<Task, AppError> {
        let before = self.lock_task_with_items(tx, org_id, task_id).await?;
        if before.status.is_terminal() {
            return Err(AppError::invalid_state(format!("task is {:?}", before.status)));
        }
        let task_item = tx
            .lock_task_item(org_id, task_id, instance_id)
            .await?
            .ok_or_else(|| AppError::not_found("task item for instance"))?;
        if !task_item.status.can_transition_to(TaskItemStatus::Returned) {
            return Err(AppError::invalid_state("task item is not picked"));
        }

        let destination = cell_id.or(task_item.source_cell_id);
        self.inventory
            .set_instance_cell(tx, org_id, user_id, instance_id, destination)
            .await?;
        self.inventory
            .set_item_instance_status(tx, org_id, user_id, instance_id, ItemInstanceStatus::Available, None)
            .await?;
        tx.update_task_item_status(org_id, task_item.id, TaskItemStatus::Returned)
            .await?;

        let mut after = before.clone();
        after.items = tx.list_task_items(org_id, task_id).await?;
        self.record_task_update(tx, user_id, &before, &after).await?;

        tracing::info!(cell_id = ?destination, "instance returned");
        Ok(after)
    }

    /// ready -> completed. Picked items are finalized by the strategy of the
    /// task type and marked done; returned items stay returned. A task whose
    /// items were all returned has nothing to deliver and cannot complete.
    #[tracing::instrument(skip(self, tx))]
    pub async fn complete_task(
        &self,
        tx: &mut dyn Transaction,
        org_id: Uuid,
        user_id: Option<Uuid>,
        task_id: Uuid,
    ) -> Result<Task, AppError> {
        let before = self.lock_task_with_items(tx, org_id, task_id).await?;
        if !before.status.can_transition_to(TaskStatus::Completed) {
            return Err(AppError::invalid_state(format!(
                "task must be ready to complete, it is {:?}",
                before.status
            )));
        }
        if !before.items.iter().any(|i| i.status == TaskItemStatus::Picked) {
            return Err(AppError::invalid_state("task has no picked items to complete"));
        }

        let strategy = self.completion.for_type(before.task_type);
        for item in before.items.iter().filter(|i| i.status == TaskItemStatus::Picked) {
            strategy
                .finalize(&self.inventory, tx, user_id, &before, item)
                .await?;
            tx.update_task_item_status(org_id, item.id, TaskItemStatus::Done)
                .await?;
        }

        let mut after = tx
            .update_task_status(org_id, task_id, TaskStatus::Completed, Some(Utc::now()))
            .await?;
        after.items = tx.list_task_items(org_id, task_id).await?;
        self.record_task_update(tx, user_id, &before, &after).await?;

        tracing::info!("task completed");
        Ok(after)
    }

    /// Any open state -> cancelled. Picked instances go back to the cell
    /// they were taken from.
    #[tracing::instrument(skip(self, tx))]
    pub async fn cancel_task(
        &self,
        tx: &mut dyn Transaction,
        org_id: Uuid,
        user_id: Option<Uuid>,
        task_id: Uuid,
    ) -> Result<Task, AppError> {
        let before = self.lock_task_with_items(tx, org_id, task_id).await?;
        if !before.status.can_transition_to(TaskStatus::Cancelled) {
            return Err(AppError::invalid_state(format!("task is {:?}", before.status)));
        }

        for item in before.items.iter().filter(|i| i.status == TaskItemStatus::Picked) {
            self.inventory
                .set_instance_cell(tx, org_id, user_id, item.instance_id, item.source_cell_id)
                .await?;
            self.inventory
                .set_item_instance_status(tx, org_id, user_id, item.instance_id, ItemInstanceStatus::Available, None)
                .await?;
            tx.update_task_item_status(org_id, item.id, TaskItemStatus::Returned)
                .await?;
        }

        let mut after = tx
            .update_task_status(org_id, task_id, TaskStatus::Cancelled, None)
            .await?;
        after.items = tx.list_task_items(org_id, task_id).await?;
        self.record_task_update(tx, user_id, &before, &after).await?;

        tracing::info!("task cancelled");
        Ok(after)
    }

    // --- Helpers ---

    async fn lock_task_with_items(&self, tx: &mut dyn Transaction, org_id: Uuid, task_id: Uuid) -> Result<Task, AppError> {
        let mut task = tx
            .lock_task(org_id, task_id)
            .await?
            .ok_or_else(|| AppError::not_found("task"))?;
        task.items = tx.list_task_items(org_id, task_id).await?;
        Ok(task)
    }

    async fn require_employee(&self, tx: &mut dyn Transaction, org_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        tx.find_employee(org_id, user_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("employee"))
    }

    async fn record_task_update(
        &self,
        tx: &mut dyn Transaction,
        user_id: Option<Uuid>,
        before: &Task,
        after: &Task,
    ) -> Result<(), AppError> {
        self.audit
            .record(
                tx,
                after.org_id,
                user_id,
                ObjectChangeAction::Update,
                ObjectType::Task,
                after.id,
                Some(before),
                Some(after),
            )
            .await?;
        Ok(())
    }
}
