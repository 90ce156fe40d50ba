// src/services/completion.rs
//
// What happens to a picked instance when its task is completed. Movement
// tasks always shelve at the target cell; for pick tasks the outcome is a
// deployment choice (`PICK_COMPLETION`).

use std::{str::FromStr, sync::Arc};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::Transaction,
    models::{
        inventory::ItemInstanceStatus,
        task::{Task, TaskItem, TaskType},
    },
    services::inventory_service::InventoryService,
};

#[async_trait]
pub trait CompletionStrategy: Send + Sync {
    async fn finalize(
        &self,
        inventory: &InventoryService,
        tx: &mut dyn Transaction,
        user_id: Option<Uuid>,
        task: &Task,
        item: &TaskItem,
    ) -> Result<(), AppError>;
}

/// Places the instance at the item's target cell and makes it available.
pub struct MovementCompletion;

#[async_trait]
impl CompletionStrategy for MovementCompletion {
    async fn finalize(
        &self,
        inventory: &InventoryService,
        tx: &mut dyn Transaction,
        user_id: Option<Uuid>,
        task: &Task,
        item: &TaskItem,
    ) -> Result<(), AppError> {
        let target = item
            .target_cell_id
            .ok_or_else(|| AppError::invalid_state("movement task item has no target cell"))?;
        inventory
            .set_instance_cell(tx, task.org_id, user_id, item.instance_id, Some(target))
            .await?;
        inventory
            .set_item_instance_status(tx, task.org_id, user_id, item.instance_id, ItemInstanceStatus::Available, None)
            .await?;
        Ok(())
    }
}

/// The instance left the warehouse; it stays unplaced and keeps the task stamp.
pub struct PickConsume;

#[async_trait]
impl CompletionStrategy for PickConsume {
    async fn finalize(
        &self,
        inventory: &InventoryService,
        tx: &mut dyn Transaction,
        user_id: Option<Uuid>,
        task: &Task,
        item: &TaskItem,
    ) -> Result<(), AppError> {
        inventory
            .set_item_instance_status(tx, task.org_id, user_id, item.instance_id, ItemInstanceStatus::Consumed, Some(task.id))
            .await?;
        Ok(())
    }
}

/// The instance is handed over but stays in stock: unplaced and available.
pub struct PickRelease;

#[async_trait]
impl CompletionStrategy for PickRelease {
    async fn finalize(
        &self,
        inventory: &InventoryService,
        tx: &mut dyn Transaction,
        user_id: Option<Uuid>,
        task: &Task,
        item: &TaskItem,
    ) -> Result<(), AppError> {
        inventory
            .set_item_instance_status(tx, task.org_id, user_id, item.instance_id, ItemInstanceStatus::Available, None)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickCompletion {
    #[default]
    Consume,
    Release,
}

impl FromStr for PickCompletion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "consume" => Ok(PickCompletion::Consume),
            "release" => Ok(PickCompletion::Release),
            other => anyhow::bail!("PICK_COMPLETION must be 'consume' or 'release', got '{other}'"),
        }
    }
}

/// Strategy per task type.
#[derive(Clone)]
pub struct CompletionStrategies {
    movement: Arc<dyn CompletionStrategy>,
    pick: Arc<dyn CompletionStrategy>,
}

impl CompletionStrategies {
    pub fn new(pick: PickCompletion) -> Self {
        let pick: Arc<dyn CompletionStrategy> = match pick {
            PickCompletion::Consume => Arc::new(PickConsume),
            PickCompletion::Release => Arc::new(PickRelease),
        };
        Self {
            movement: Arc::new(MovementCompletion),
            pick,
        }
    }

    pub fn for_type(&self, task_type: TaskType) -> &dyn CompletionStrategy {
        match task_type {
            TaskType::Movement => self.movement.as_ref(),
            TaskType::Pick => self.pick.as_ref(),
        }
    }
}

impl Default for CompletionStrategies {
    fn default() -> Self {
        Self::new(PickCompletion::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_completion_parses_from_config() {
        assert_eq!("consume".parse::<PickCompletion>().unwrap(), PickCompletion::Consume);
        assert_eq!(" Release ".parse::<PickCompletion>().unwrap(), PickCompletion::Release);
        assert!("discard".parse::<PickCompletion>().is_err());
    }
}
