// src/services/auth.rs
//
// AuthContext resolution and the access gate every use case passes through.

use jsonwebtoken::{decode, DecodingKey, Validation};
use uuid::Uuid;

use crate::{
    common::{error::AppError, identity::RequestIdentity},
    db::Transaction,
    models::{
        auth::Claims,
        rbac::{AccessLevel, RoleName},
    },
    services::access_policy,
};

/// Which non-user identities an operation accepts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessOptions {
    pub allow_api_token: bool,
    pub allow_system_user: bool,
}

impl AccessOptions {
    pub const USER_ONLY: AccessOptions = AccessOptions {
        allow_api_token: false,
        allow_system_user: false,
    };

    pub const WITH_API_TOKEN: AccessOptions = AccessOptions {
        allow_api_token: true,
        allow_system_user: false,
    };

    pub const BOARD: AccessOptions = AccessOptions {
        allow_api_token: true,
        allow_system_user: true,
    };
}

/// Outcome of the access gate. `allowed == false` is a denial, not an error;
/// use cases turn it into `Forbidden` with `ensure_allowed`.
#[derive(Debug, Clone, Copy)]
pub struct AccessGrant {
    pub org_id: Uuid,
    pub user_id: Option<Uuid>,
    pub allowed: bool,
    pub via_api_token: bool,
    pub level: AccessLevel,
}

impl AccessGrant {
    pub fn ensure_allowed(self) -> Result<Self, AppError> {
        if self.allowed {
            Ok(self)
        } else {
            Err(AppError::Forbidden(format!("requires {} access", self.level)))
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    /// Decodes a session JWT into the user id it was issued for.
    pub fn decode_session(&self, token: &str) -> Result<Uuid, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::NotAuthorized)?;
        Ok(token_data.claims.sub)
    }

    /// Sessions are minted by the login service; this mirrors its claims.
    #[cfg(test)]
    pub fn issue_session(&self, user_id: Uuid) -> Result<String, AppError> {
        use chrono::Utc;
        use jsonwebtoken::{encode, EncodingKey, Header};

        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(7);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )
        .map_err(|e| AppError::Internal(e.into()))
    }

    /// Organization owning a non-revoked token.
    #[tracing::instrument(skip_all)]
    pub async fn resolve_api_token(&self, tx: &mut dyn Transaction, token: &str) -> Result<Option<Uuid>, AppError> {
        tx.find_org_by_api_token(token).await
    }

    /// Resolves who is calling and whether they reach `level` in the
    /// organization. Read-only; call once per use-case entry, before any
    /// other lookup or mutation.
    #[tracing::instrument(skip(self, tx, identity), fields(org_id = ?identity.org_id, user_id = ?identity.user_id))]
    pub async fn validate_access(
        &self,
        tx: &mut dyn Transaction,
        identity: &RequestIdentity,
        level: AccessLevel,
        options: AccessOptions,
    ) -> Result<AccessGrant, AppError> {
        // 1. Organization first; without it nothing else is meaningful
        let org_id = identity.require_org_id()?;

        // 2. System caller (TV board): org-scoped, read-only display
        if identity.is_system_user {
            if !options.allow_system_user {
                tracing::warn!("system identity rejected");
                return Err(AppError::Forbidden("system identity is not accepted here".into()));
            }
            return Ok(AccessGrant {
                org_id,
                user_id: None,
                allowed: true,
                via_api_token: false,
                level,
            });
        }

        // 3. API token: owner-equivalent for its own organization
        if let Some(token) = identity.api_token.as_deref() {
            match self.resolve_api_token(tx, token).await? {
                Some(token_org) if token_org != org_id => {
                    tracing::warn!(%token_org, "api token used for another organization");
                    return Err(AppError::Forbidden("api token belongs to another organization".into()));
                }
                Some(_) if options.allow_api_token => {
                    return Ok(AccessGrant {
                        org_id,
                        user_id: None,
                        allowed: access_policy::satisfies(RoleName::Owner, level),
                        via_api_token: true,
                        level,
                    });
                }
                Some(_) if identity.user_id.is_none() => {
                    return Err(AppError::Forbidden("api tokens are not accepted here".into()));
                }
                None if identity.user_id.is_none() => {
                    tracing::warn!("invalid or revoked api token");
                    return Err(AppError::NotAuthorized);
                }
                // A session is present as well; judge the call by the user.
                _ => {}
            }
        }

        // 4. User path
        let user_id = identity.require_user_id()?;

        let Some(employee) = tx.find_employee(org_id, user_id).await? else {
            tracing::info!("caller is not an employee of the organization");
            return Ok(AccessGrant {
                org_id,
                user_id: Some(user_id),
                allowed: false,
                via_api_token: false,
                level,
            });
        };

        // 5. Role table
        let allowed = employee
            .role_name()
            .is_some_and(|role| access_policy::satisfies(role, level));

        if !allowed {
            tracing::info!(role_id = employee.role_id, %level, "access denied");
        }

        Ok(AccessGrant {
            org_id,
            user_id: Some(user_id),
            allowed,
            via_api_token: false,
            level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::db::{Database, MemoryDatabase};
    use crate::models::rbac::{ApiToken, Employee};

    const LEVELS: [AccessLevel; 4] = [
        AccessLevel::Worker,
        AccessLevel::Manager,
        AccessLevel::Admin,
        AccessLevel::Owner,
    ];

    fn employee(org_id: Uuid, user_id: Uuid, role: RoleName) -> Employee {
        Employee {
            org_id,
            user_id,
            role_id: role.id(),
            created_at: Utc::now(),
        }
    }

    fn token(org_id: Uuid, secret: &str, revoked: bool) -> ApiToken {
        ApiToken {
            id: Uuid::new_v4(),
            org_id,
            name: "integration".into(),
            token: secret.into(),
            created_at: Utc::now(),
            revoked_at: revoked.then(Utc::now),
        }
    }

    fn service() -> AuthService {
        AuthService::new("test-secret".into())
    }

    #[tokio::test]
    async fn missing_org_fails_before_anything_else() {
        let db = MemoryDatabase::new();
        let mut tx = db.begin().await.unwrap();
        let err = service()
            .validate_access(&mut *tx, &RequestIdentity::default(), AccessLevel::Worker, AccessOptions::USER_ONLY)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OrganizationIdMissing));
    }

    #[tokio::test]
    async fn missing_user_is_reported() {
        let db = MemoryDatabase::new();
        let mut tx = db.begin().await.unwrap();
        let identity = RequestIdentity {
            org_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let err = service()
            .validate_access(&mut *tx, &identity, AccessLevel::Worker, AccessOptions::USER_ONLY)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UserIdMissing));
    }

    #[tokio::test]
    async fn non_employee_is_denied_not_errored() {
        let db = MemoryDatabase::new();
        let mut tx = db.begin().await.unwrap();
        let identity = RequestIdentity::user(Uuid::new_v4(), Uuid::new_v4());
        let grant = service()
            .validate_access(&mut *tx, &identity, AccessLevel::Worker, AccessOptions::USER_ONLY)
            .await
            .unwrap();
        assert!(!grant.allowed);
        assert!(matches!(grant.ensure_allowed(), Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn employee_role_is_checked_against_table() {
        let db = MemoryDatabase::new();
        let (org, admin) = (Uuid::new_v4(), Uuid::new_v4());
        db.with_state(|s| s.employees.push(employee(org, admin, RoleName::Admin))).await;

        let mut tx = db.begin().await.unwrap();
        let identity = RequestIdentity::user(org, admin);
        for level in LEVELS {
            let grant = service()
                .validate_access(&mut *tx, &identity, level, AccessOptions::USER_ONLY)
                .await
                .unwrap();
            assert_eq!(grant.allowed, level != AccessLevel::Owner, "admin at {level}");
            assert_eq!(grant.user_id, Some(admin));
        }
    }

    #[tokio::test]
    async fn valid_token_is_owner_equivalent_for_its_org() {
        let db = MemoryDatabase::new();
        let (org, other) = (Uuid::new_v4(), Uuid::new_v4());
        db.with_state(|s| s.api_tokens.push(token(org, "live", false))).await;

        let mut tx = db.begin().await.unwrap();
        for level in LEVELS {
            let grant = service()
                .validate_access(&mut *tx, &RequestIdentity::api_token(org, "live"), level, AccessOptions::WITH_API_TOKEN)
                .await
                .unwrap();
            assert!(grant.allowed);
            assert!(grant.via_api_token);
            assert_eq!(grant.user_id, None);

            let err = service()
                .validate_access(&mut *tx, &RequestIdentity::api_token(other, "live"), level, AccessOptions::WITH_API_TOKEN)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Forbidden(_)));
        }
    }

    #[tokio::test]
    async fn revoked_token_without_user_is_not_authorized() {
        let db = MemoryDatabase::new();
        let org = Uuid::new_v4();
        db.with_state(|s| s.api_tokens.push(token(org, "old", true))).await;

        let mut tx = db.begin().await.unwrap();
        for level in LEVELS {
            for options in [AccessOptions::WITH_API_TOKEN, AccessOptions::USER_ONLY] {
                let err = service()
                    .validate_access(&mut *tx, &RequestIdentity::api_token(org, "old"), level, options)
                    .await
                    .unwrap_err();
                assert!(matches!(err, AppError::NotAuthorized), "{level}: {err:?}");
            }
        }
    }

    #[tokio::test]
    async fn token_rejected_where_not_accepted() {
        let db = MemoryDatabase::new();
        let org = Uuid::new_v4();
        db.with_state(|s| s.api_tokens.push(token(org, "live", false))).await;

        let mut tx = db.begin().await.unwrap();
        let err = service()
            .validate_access(&mut *tx, &RequestIdentity::api_token(org, "live"), AccessLevel::Admin, AccessOptions::USER_ONLY)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn system_identity_only_where_opted_in() {
        let db = MemoryDatabase::new();
        let org = Uuid::new_v4();
        let mut tx = db.begin().await.unwrap();

        let grant = service()
            .validate_access(&mut *tx, &RequestIdentity::system(org), AccessLevel::Worker, AccessOptions::BOARD)
            .await
            .unwrap();
        assert!(grant.allowed);

        let err = service()
            .validate_access(&mut *tx, &RequestIdentity::system(org), AccessLevel::Worker, AccessOptions::WITH_API_TOKEN)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn session_round_trip_and_tampering() {
        let auth = service();
        let user = Uuid::new_v4();
        let jwt = auth.issue_session(user).unwrap();
        assert_eq!(auth.decode_session(&jwt).unwrap(), user);

        let other = AuthService::new("other-secret".into());
        assert!(matches!(other.decode_session(&jwt), Err(AppError::NotAuthorized)));
    }
}
