// src/common/identity.rs

use uuid::Uuid;

use crate::common::error::AppError;

/// Who is calling, as established by the HTTP middleware.
///
/// Passed explicitly into every use-case call. The API token is carried
/// verbatim so the access gate can check it against the token store instead
/// of trusting a boolean set upstream.
#[derive(Debug, Clone, Default)]
pub struct RequestIdentity {
    pub org_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub api_token: Option<String>,
    pub is_system_user: bool,
}

impl RequestIdentity {
    pub fn user(org_id: Uuid, user_id: Uuid) -> Self {
        Self {
            org_id: Some(org_id),
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn api_token(org_id: Uuid, token: impl Into<String>) -> Self {
        Self {
            org_id: Some(org_id),
            api_token: Some(token.into()),
            ..Default::default()
        }
    }

    /// Identity used by the TV-board data endpoint after board-token resolution.
    pub fn system(org_id: Uuid) -> Self {
        Self {
            org_id: Some(org_id),
            is_system_user: true,
            ..Default::default()
        }
    }

    pub fn require_org_id(&self) -> Result<Uuid, AppError> {
        match self.org_id {
            Some(id) if !id.is_nil() => Ok(id),
            _ => Err(AppError::OrganizationIdMissing),
        }
    }

    pub fn require_user_id(&self) -> Result<Uuid, AppError> {
        match self.user_id {
            Some(id) if !id.is_nil() => Ok(id),
            _ => Err(AppError::UserIdMissing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_org_id_counts_as_missing() {
        let identity = RequestIdentity {
            org_id: Some(Uuid::nil()),
            ..Default::default()
        };
        assert!(matches!(identity.require_org_id(), Err(AppError::OrganizationIdMissing)));
    }

    #[test]
    fn token_identity_has_no_user() {
        let identity = RequestIdentity::api_token(Uuid::new_v4(), "secret");
        assert_eq!(identity.api_token.as_deref(), Some("secret"));
        assert!(matches!(identity.require_user_id(), Err(AppError::UserIdMissing)));
    }
}
