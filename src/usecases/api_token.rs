// src/usecases/api_token.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{error::AppError, identity::RequestIdentity},
    db::Database,
    models::{
        audit::{ObjectChangeAction, ObjectType},
        rbac::{AccessLevel, ApiToken},
    },
    services::{
        audit_service::AuditService,
        auth::{AccessOptions, AuthService},
        inventory_service::validate_name,
    },
};

#[derive(Clone)]
pub struct ApiTokenUseCase {
    db: Arc<dyn Database>,
    auth: AuthService,
    audit: AuditService,
}

impl ApiTokenUseCase {
    pub fn new(db: Arc<dyn Database>, auth: AuthService, audit: AuditService) -> Self {
        Self { db, auth, audit }
    }

    #[tracing::instrument(skip(self, identity))]
    pub async fn create_api_token(&self, identity: &RequestIdentity, name: &str) -> Result<ApiToken, AppError> {
        validate_name("name", name)?;

        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Admin, AccessOptions::USER_ONLY)
            .await?
            .ensure_allowed()?;

        let secret = Uuid::new_v4().to_string();
        let token = tx.insert_api_token(grant.org_id, name.trim(), &secret).await?;
        self.audit
            .record(
                &mut *tx,
                grant.org_id,
                grant.user_id,
                ObjectChangeAction::Create,
                ObjectType::ApiToken,
                token.id,
                None,
                Some(&token.redacted()),
            )
            .await?;

        tx.commit().await?;
        tracing::info!(token_id = %token.id, "api token created");
        Ok(token)
    }

    pub async fn list_api_tokens(&self, identity: &RequestIdentity) -> Result<Vec<ApiToken>, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Admin, AccessOptions::USER_ONLY)
            .await?
            .ensure_allowed()?;

        tx.list_api_tokens(grant.org_id).await
    }

    /// Sets the revocation timestamp; tokens are never deleted.
    #[tracing::instrument(skip(self, identity))]
    pub async fn revoke_api_token(&self, identity: &RequestIdentity, token_id: Uuid) -> Result<ApiToken, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Admin, AccessOptions::USER_ONLY)
            .await?
            .ensure_allowed()?;

        let before = tx
            .find_api_token(grant.org_id, token_id)
            .await?
            .ok_or_else(|| AppError::not_found("api token"))?;
        let after = tx.revoke_api_token(grant.org_id, token_id).await?;
        self.audit
            .record(
                &mut *tx,
                grant.org_id,
                grant.user_id,
                ObjectChangeAction::Update,
                ObjectType::ApiToken,
                token_id,
                Some(&before.redacted()),
                Some(&after.redacted()),
            )
            .await?;

        tx.commit().await?;
        tracing::info!("api token revoked");
        Ok(after)
    }
}
