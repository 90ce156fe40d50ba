// src/models/inventory.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// --- Catalog ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,

    #[sqlx(skip)]
    #[serde(default)]
    pub variants: Vec<ItemVariant>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ItemVariant {
    pub id: Uuid,
    pub org_id: Uuid,
    pub item_id: Uuid,
    pub name: String,
    pub article: Option<String>,
    pub ean13: Option<i64>,
    pub created_at: DateTime<Utc>,
}

// --- Physical units ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "item_instance_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemInstanceStatus {
    Available,
    Reserved,
    Consumed,
}

/// A countable physical unit. `cell_id` is the only record of where it is;
/// `None` means unplaced (in transit, picked, or never shelved).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ItemInstance {
    pub id: Uuid,
    pub org_id: Uuid,
    pub item_id: Uuid,
    pub variant_id: Uuid,
    pub cell_id: Option<Uuid>,
    pub status: ItemInstanceStatus,
    pub affected_by_task_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// --- Inputs ---

#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub description: Option<String>,
    pub variants: Vec<NewItemVariant>,
}

#[derive(Debug, Clone)]
pub struct NewItemVariant {
    pub name: String,
    pub article: Option<String>,
    pub ean13: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewItemInstance {
    pub item_id: Uuid,
    pub variant_id: Uuid,
    pub cell_id: Option<Uuid>,
}
