// src/models/storage.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationUnit {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub alias: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StorageGroup {
    pub id: Uuid,
    pub org_id: Uuid,
    pub unit_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub alias: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CellsGroup {
    pub id: Uuid,
    pub org_id: Uuid,
    pub unit_id: Uuid,
    pub storage_group_id: Option<Uuid>,
    pub name: String,
    pub alias: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub id: Uuid,
    pub org_id: Uuid,
    pub cells_group_id: Uuid,
    pub alias: String,
    pub row: i32,
    pub level: i32,
    pub position: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellPathObjectType {
    Unit,
    StorageGroup,
    CellsGroup,
}

impl CellPathObjectType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "unit" => Some(CellPathObjectType::Unit),
            "storage_group" => Some(CellPathObjectType::StorageGroup),
            "cells_group" => Some(CellPathObjectType::CellsGroup),
            _ => None,
        }
    }
}

/// One breadcrumb of a cell's location. Paths are ordered unit first,
/// then storage groups outermost to innermost, then the cells group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellPathSegment {
    pub id: Uuid,
    pub name: String,
    pub alias: String,
    pub object_type: CellPathObjectType,
}
