// src/models/tv_board.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A wall display bound to one unit. Its token only opens that unit's
/// task board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TvBoard {
    pub id: Uuid,
    pub org_id: Uuid,
    pub unit_id: Uuid,
    pub name: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTvBoard {
    pub unit_id: Uuid,
    pub name: String,
}

impl TvBoard {
    /// Copy with the display token blanked, for audit snapshots.
    pub fn redacted(&self) -> Self {
        Self {
            token: String::new(),
            ..self.clone()
        }
    }
}
