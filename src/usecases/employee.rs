// src/usecases/employee.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{error::AppError, identity::RequestIdentity},
    db::Database,
    models::{
        audit::{ObjectChangeAction, ObjectType},
        rbac::{AccessLevel, Employee, Role, RoleName},
    },
    services::{
        audit_service::AuditService,
        auth::{AccessOptions, AuthService},
    },
};

#[derive(Clone)]
pub struct EmployeeUseCase {
    db: Arc<dyn Database>,
    auth: AuthService,
    audit: AuditService,
}

impl EmployeeUseCase {
    pub fn new(db: Arc<dyn Database>, auth: AuthService, audit: AuditService) -> Self {
        Self { db, auth, audit }
    }

    /// Reference data; no organization involved.
    pub async fn list_roles(&self) -> Result<Vec<Role>, AppError> {
        let mut tx = self.db.begin().await?;
        tx.list_roles().await
    }

    pub async fn list_employees(&self, identity: &RequestIdentity) -> Result<Vec<Employee>, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Worker, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        tx.list_employees(grant.org_id).await
    }

    pub async fn get_employee(&self, identity: &RequestIdentity, user_id: Uuid) -> Result<Employee, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Worker, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        tx.find_employee(grant.org_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("employee"))
    }

    /// Creates or changes the binding of `user_id`. Handing out or taking
    /// away the owner role takes owner access; nobody changes their own role.
    #[tracing::instrument(skip(self, identity))]
    pub async fn set_employee_role(&self, identity: &RequestIdentity, user_id: Uuid, role_id: i32) -> Result<Employee, AppError> {
        // 1. Input before any lookup
        let role = RoleName::from_id(role_id)
            .ok_or_else(|| AppError::validation(format!("role id must be between 1 and 4, got {role_id}")))?;
        let level = if role == RoleName::Owner {
            AccessLevel::Owner
        } else {
            AccessLevel::Admin
        };

        // 2. Gate
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, level, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;
        if grant.user_id == Some(user_id) {
            return Err(AppError::Forbidden("cannot change your own role".into()));
        }

        // 3. Demoting an owner takes owner access too
        let before = tx.find_employee(grant.org_id, user_id).await?;
        if level != AccessLevel::Owner && before.as_ref().and_then(Employee::role_name) == Some(RoleName::Owner) {
            self.auth
                .validate_access(&mut *tx, identity, AccessLevel::Owner, AccessOptions::WITH_API_TOKEN)
                .await?
                .ensure_allowed()?;
        }

        // 4. Upsert + audit
        let after = tx.upsert_employee_role(grant.org_id, user_id, role_id).await?;
        let action = if before.is_some() {
            ObjectChangeAction::Update
        } else {
            ObjectChangeAction::Create
        };
        self.audit
            .record(
                &mut *tx,
                grant.org_id,
                grant.user_id,
                action,
                ObjectType::Employee,
                user_id,
                before.as_ref(),
                Some(&after),
            )
            .await?;

        tx.commit().await?;
        tracing::info!(?role, "employee role set");
        Ok(after)
    }

    /// Removes the role binding; the user account itself is untouched.
    #[tracing::instrument(skip(self, identity))]
    pub async fn remove_employee(&self, identity: &RequestIdentity, user_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Admin, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        let before = tx
            .find_employee(grant.org_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("employee"))?;
        if before.role_name() == Some(RoleName::Owner) {
            // Removing an owner takes owner access.
            self.auth
                .validate_access(&mut *tx, identity, AccessLevel::Owner, AccessOptions::WITH_API_TOKEN)
                .await?
                .ensure_allowed()?;
        }

        tx.delete_employee(grant.org_id, user_id).await?;
        self.audit
            .record(
                &mut *tx,
                grant.org_id,
                grant.user_id,
                ObjectChangeAction::Delete,
                ObjectType::Employee,
                user_id,
                Some(&before),
                None,
            )
            .await?;

        tx.commit().await?;
        tracing::info!("employee removed");
        Ok(())
    }
}
