// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "object_change_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ObjectChangeAction {
    Create,
    Update,
    Delete,
}

/// Stored as the integer id of `app_object_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Organization,
    Unit,
    StorageGroup,
    CellsGroup,
    Cell,
    Item,
    ItemInstance,
    Employee,
    Task,
    ItemVariant,
    ApiToken,
    TvBoard,
}

impl ObjectType {
    pub fn id(self) -> i32 {
        match self {
            ObjectType::Organization => 1,
            ObjectType::Unit => 2,
            ObjectType::StorageGroup => 3,
            ObjectType::CellsGroup => 4,
            ObjectType::Cell => 5,
            ObjectType::Item => 6,
            ObjectType::ItemInstance => 7,
            ObjectType::Employee => 8,
            ObjectType::Task => 9,
            ObjectType::ItemVariant => 10,
            ObjectType::ApiToken => 11,
            ObjectType::TvBoard => 12,
        }
    }

    pub fn from_id(id: i32) -> Option<ObjectType> {
        use ObjectType::*;
        [
            Organization, Unit, StorageGroup, CellsGroup, Cell, Item,
            ItemInstance, Employee, Task, ItemVariant, ApiToken, TvBoard,
        ]
        .into_iter()
        .find(|t| t.id() == id)
    }
}

/// Append-only audit record. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ObjectChange {
    pub id: Uuid,
    pub org_id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: ObjectChangeAction,
    pub target_object_type: i32,
    pub target_object_id: Uuid,
    pub prechange_state: Option<serde_json::Value>,
    pub postchange_state: Option<serde_json::Value>,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewObjectChange {
    pub org_id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: ObjectChangeAction,
    pub target_object_type: ObjectType,
    pub target_object_id: Uuid,
    pub prechange_state: Option<serde_json::Value>,
    pub postchange_state: Option<serde_json::Value>,
}
