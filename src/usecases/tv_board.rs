// src/usecases/tv_board.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{error::AppError, identity::RequestIdentity},
    db::Database,
    models::{
        audit::{ObjectChangeAction, ObjectType},
        rbac::AccessLevel,
        tv_board::{NewTvBoard, TvBoard},
    },
    services::{
        audit_service::AuditService,
        auth::{AccessOptions, AuthService},
        inventory_service::validate_name,
        storage_service::StorageService,
    },
};

#[derive(Clone)]
pub struct TvBoardUseCase {
    db: Arc<dyn Database>,
    auth: AuthService,
    audit: AuditService,
    storage: StorageService,
}

impl TvBoardUseCase {
    pub fn new(db: Arc<dyn Database>, auth: AuthService, audit: AuditService, storage: StorageService) -> Self {
        Self {
            db,
            auth,
            audit,
            storage,
        }
    }

    #[tracing::instrument(skip(self, identity, input), fields(unit_id = %input.unit_id))]
    pub async fn create_tv_board(&self, identity: &RequestIdentity, input: NewTvBoard) -> Result<TvBoard, AppError> {
        validate_name("name", &input.name)?;

        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Manager, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        self.storage.require_unit(&mut *tx, grant.org_id, input.unit_id).await?;
        let token = Uuid::new_v4().to_string();
        let board = tx
            .insert_tv_board(grant.org_id, input.unit_id, input.name.trim(), &token)
            .await?;
        self.audit
            .record(
                &mut *tx,
                grant.org_id,
                grant.user_id,
                ObjectChangeAction::Create,
                ObjectType::TvBoard,
                board.id,
                None,
                Some(&board.redacted()),
            )
            .await?;

        tx.commit().await?;
        tracing::info!(board_id = %board.id, "tv board created");
        Ok(board)
    }

    pub async fn get_tv_board(&self, identity: &RequestIdentity, board_id: Uuid) -> Result<TvBoard, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Manager, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        tx.find_tv_board(grant.org_id, board_id)
            .await?
            .ok_or_else(|| AppError::not_found("tv board"))
    }

    pub async fn list_tv_boards(&self, identity: &RequestIdentity) -> Result<Vec<TvBoard>, AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Manager, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        tx.list_tv_boards(grant.org_id).await
    }

    #[tracing::instrument(skip(self, identity))]
    pub async fn delete_tv_board(&self, identity: &RequestIdentity, board_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;
        let grant = self
            .auth
            .validate_access(&mut *tx, identity, AccessLevel::Manager, AccessOptions::WITH_API_TOKEN)
            .await?
            .ensure_allowed()?;

        let before = tx
            .find_tv_board(grant.org_id, board_id)
            .await?
            .ok_or_else(|| AppError::not_found("tv board"))?;
        tx.delete_tv_board(grant.org_id, board_id).await?;
        self.audit
            .record(
                &mut *tx,
                grant.org_id,
                grant.user_id,
                ObjectChangeAction::Delete,
                ObjectType::TvBoard,
                board_id,
                Some(&before.redacted()),
                None,
            )
            .await?;

        tx.commit().await?;
        tracing::info!("tv board deleted");
        Ok(())
    }

    /// The board a display token belongs to. Unknown or deleted boards are
    /// `NotAuthorized`.
    pub async fn resolve_board_token(&self, token: &str) -> Result<TvBoard, AppError> {
        let mut tx = self.db.begin().await?;
        tx.find_tv_board_by_token(token)
            .await?
            .ok_or(AppError::NotAuthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::rbac::RoleName,
        services::storage_service::fixtures::seed_warehouse,
        usecases::testing::{Harness, JWT_SECRET},
    };

    fn use_case(h: &Harness) -> TvBoardUseCase {
        TvBoardUseCase::new(
            h.database(),
            AuthService::new(JWT_SECRET.into()),
            AuditService::new(),
            StorageService::new(),
        )
    }

    #[tokio::test]
    async fn board_token_resolves_to_its_unit_until_deleted() {
        let h = Harness::new();
        let org = h.org_id;
        let wh = h.db.with_state(|s| seed_warehouse(s, org, 1, 1)).await;
        let manager = h.employee(RoleName::Manager).await;
        let uc = use_case(&h);

        let board = uc
            .create_tv_board(&manager, NewTvBoard { unit_id: wh.unit_id, name: " Dock A ".into() })
            .await
            .unwrap();
        assert_eq!(board.name, "Dock A");

        let resolved = uc.resolve_board_token(&board.token).await.unwrap();
        assert_eq!((resolved.org_id, resolved.unit_id), (org, wh.unit_id));
        assert_eq!(uc.list_tv_boards(&manager).await.unwrap().len(), 1);

        uc.delete_tv_board(&manager, board.id).await.unwrap();
        assert!(matches!(uc.resolve_board_token(&board.token).await, Err(AppError::NotAuthorized)));
        assert!(matches!(uc.get_tv_board(&manager, board.id).await, Err(AppError::NotFound(_))));
        assert_eq!(h.audit_count().await, 2);
    }

    #[tokio::test]
    async fn audit_snapshots_omit_the_board_token() {
        let h = Harness::new();
        let org = h.org_id;
        let wh = h.db.with_state(|s| seed_warehouse(s, org, 1, 1)).await;
        let manager = h.employee(RoleName::Manager).await;

        let board = use_case(&h)
            .create_tv_board(&manager, NewTvBoard { unit_id: wh.unit_id, name: "Dock".into() })
            .await
            .unwrap();

        let snapshot = h.db.with_state(|s| s.object_changes[0].postchange_state.clone()).await.unwrap();
        assert!(!snapshot.to_string().contains(&board.token));
    }

    #[tokio::test]
    async fn api_tokens_are_not_board_tokens() {
        let h = Harness::new();
        h.api_token("owner-secret", false).await;
        let err = use_case(&h).resolve_board_token("owner-secret").await.unwrap_err();
        assert!(matches!(err, AppError::NotAuthorized));
    }

    #[tokio::test]
    async fn board_needs_a_unit_of_the_org_and_manager_access() {
        let h = Harness::new();
        let foreign = Uuid::new_v4();
        let foreign_unit = h.db.with_state(|s| seed_warehouse(s, foreign, 1, 1).unit_id).await;
        let manager = h.employee(RoleName::Manager).await;
        let worker = h.employee(RoleName::Worker).await;
        let uc = use_case(&h);

        let err = uc
            .create_tv_board(&manager, NewTvBoard { unit_id: foreign_unit, name: "Dock".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = uc.list_tv_boards(&worker).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
