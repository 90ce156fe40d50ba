// src/services/access_policy.rs

use crate::models::rbac::{AccessLevel, RoleName};

// Each level lists the roles that satisfy it. This is a table, not a rank:
// worker and manager level admit the same set.
const WORKER_LEVEL: &[RoleName] = &[RoleName::Owner, RoleName::Admin, RoleName::Manager];
const MANAGER_LEVEL: &[RoleName] = &[RoleName::Owner, RoleName::Admin, RoleName::Manager];
const ADMIN_LEVEL: &[RoleName] = &[RoleName::Owner, RoleName::Admin];
const OWNER_LEVEL: &[RoleName] = &[RoleName::Owner];

pub fn allowed_roles(level: AccessLevel) -> &'static [RoleName] {
    match level {
        AccessLevel::Worker => WORKER_LEVEL,
        AccessLevel::Manager => MANAGER_LEVEL,
        AccessLevel::Admin => ADMIN_LEVEL,
        AccessLevel::Owner => OWNER_LEVEL,
    }
}

pub fn satisfies(role: RoleName, level: AccessLevel) -> bool {
    allowed_roles(level).contains(&role)
}
