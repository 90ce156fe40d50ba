// src/models/rbac.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// --- Roles ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "role_name")]
pub enum RoleName {
    #[sqlx(rename = "org_owner")]
    #[serde(rename = "org_owner")]
    Owner,
    #[sqlx(rename = "org_admin")]
    #[serde(rename = "org_admin")]
    Admin,
    #[sqlx(rename = "org_manager")]
    #[serde(rename = "org_manager")]
    Manager,
    #[sqlx(rename = "org_worker")]
    #[serde(rename = "org_worker")]
    Worker,
}

impl RoleName {
    pub const ALL: [RoleName; 4] = [
        RoleName::Owner,
        RoleName::Admin,
        RoleName::Manager,
        RoleName::Worker,
    ];

    /// Seeded role ids: 1 owner, 2 admin, 3 manager, 4 worker.
    pub fn id(self) -> i32 {
        match self {
            RoleName::Owner => 1,
            RoleName::Admin => 2,
            RoleName::Manager => 3,
            RoleName::Worker => 4,
        }
    }

    pub fn from_id(id: i32) -> Option<RoleName> {
        RoleName::ALL.into_iter().find(|r| r.id() == id)
    }
}

/// Reference data, seeded once by the migrations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i32,
    pub name: RoleName,
    pub display_name: String,
    pub description: String,
}

impl Role {
    pub fn seeded() -> Vec<Role> {
        vec![
            Role::new(RoleName::Owner, "Owner", "Full control over the organization"),
            Role::new(RoleName::Admin, "Administrator", "Manages employees, tokens and settings"),
            Role::new(RoleName::Manager, "Manager", "Plans and assigns tasks"),
            Role::new(RoleName::Worker, "Worker", "Executes assigned tasks"),
        ]
    }

    fn new(name: RoleName, display_name: &str, description: &str) -> Self {
        Self {
            id: name.id(),
            name,
            display_name: display_name.to_string(),
            description: description.to_string(),
        }
    }
}

// --- Employees ---

/// An (organization, user) binding with exactly one role.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub role_id: i32,
    pub created_at: DateTime<Utc>,
}

impl Employee {
    pub fn role_name(&self) -> Option<RoleName> {
        RoleName::from_id(self.role_id)
    }
}

// --- Access levels ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Worker,
    Manager,
    Admin,
    Owner,
}

impl AccessLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessLevel::Worker => "worker",
            AccessLevel::Manager => "manager",
            AccessLevel::Admin => "admin",
            AccessLevel::Owner => "owner",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- API tokens ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApiToken {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiToken {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Copy with the secret blanked, for audit snapshots.
    pub fn redacted(&self) -> Self {
        Self {
            token: String::new(),
            ..self.clone()
        }
    }
}
