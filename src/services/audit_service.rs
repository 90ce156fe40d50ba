// src/services/audit_service.rs

use serde::Serialize;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::Transaction,
    models::audit::{NewObjectChange, ObjectChange, ObjectChangeAction, ObjectType},
};

/// Append-only change log. Records are written through the caller's
/// transaction: if the audit insert fails, the mutation it describes fails
/// and rolls back with it.
#[derive(Clone, Default)]
pub struct AuditService;

impl AuditService {
    pub fn new() -> Self {
        Self
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record<T: Serialize + Sync>(
        &self,
        tx: &mut dyn Transaction,
        org_id: Uuid,
        user_id: Option<Uuid>,
        action: ObjectChangeAction,
        object_type: ObjectType,
        object_id: Uuid,
        before: Option<&T>,
        after: Option<&T>,
    ) -> Result<ObjectChange, AppError> {
        let change = NewObjectChange {
            org_id,
            user_id,
            action,
            target_object_type: object_type,
            target_object_id: object_id,
            prechange_state: before.map(snapshot).transpose()?,
            postchange_state: after.map(snapshot).transpose()?,
        };

        let row = tx.insert_object_change(&change).await.inspect_err(|e| {
            tracing::error!(error = %e, ?object_type, %object_id, "audit write failed");
        })?;

        tracing::debug!(?action, ?object_type, %object_id, "object change recorded");
        Ok(row)
    }

    pub async fn list(
        &self,
        tx: &mut dyn Transaction,
        org_id: Uuid,
        object_type: ObjectType,
        object_id: Uuid,
    ) -> Result<Vec<ObjectChange>, AppError> {
        tx.list_object_changes(org_id, object_type.id(), object_id).await
    }
}

fn snapshot<T: Serialize>(value: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.into()))
}
