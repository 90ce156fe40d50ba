// src/usecases/audit.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{error::AppError, identity::RequestIdentity},
    db::Database,
    models::{
        audit::{ObjectChange, ObjectType},
        rbac::AccessLevel,
    },
    services::{
        audit_service::AuditService,
        auth::{AccessOptions, AuthService},
    },
};

#[derive(Clone)]
pub struct AuditUseCase {
    db: Arc<dyn Database>,
    auth: AuthService,
    audit: AuditService,
}

impl AuditUseCase {
    pub fn new(db: Arc<dyn Database>, auth: AuthService, audit: AuditService) -> Self {
        Self { db, auth, audit }
    }

    /// History of one object, newest first.
    pub async fn get_object_changes(
        &self,
        identity: &RequestIdentity,
        object_type: ObjectType,
        object_id: Uuid,
    ) -> Result<Vec<ObjectChange>, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Admin, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        self.audit.list(&mut *tx, grant.org_id, object_type, object_id).await
    }
}
