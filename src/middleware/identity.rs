// src/middleware/identity.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    extract::CookieJar,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::{common::error::AppError, common::identity::RequestIdentity, config::AppState};

pub const ORGANIZATION_ID_HEADER: &str = "x-organization-id";
pub const API_KEY_HEADER: &str = "x-api-key";
pub const BOARD_TOKEN_HEADER: &str = "x-board-token";
pub const SESSION_COOKIE: &str = "session";

fn header_str<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, AppError> {
    match parts.headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|s| Some(s.trim()).filter(|s| !s.is_empty()))
            .map_err(|_| AppError::validation(format!("header {name} contains invalid characters"))),
    }
}

/// Builds the caller identity from headers and the session cookie.
///
/// Nothing is authorized here: a missing organization or user is left as
/// `None` and reported by the access gate of the use case. A session that is
/// present but does not decode is rejected right away, unless an API key was
/// sent alongside it; the key then stands on its own.
impl<S> FromRequestParts<S> for RequestIdentity
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        // 1. Organization
        let org_id = header_str(parts, ORGANIZATION_ID_HEADER)?
            .map(|raw| {
                Uuid::parse_str(raw)
                    .map_err(|_| AppError::validation(format!("header {ORGANIZATION_ID_HEADER} is not a UUID")))
            })
            .transpose()?;

        // 2. API key
        let api_token = header_str(parts, API_KEY_HEADER)?.map(str::to_owned);

        // 3. Session: cookie first, then bearer
        let jar = CookieJar::from_headers(&parts.headers);
        let session = match jar.get(SESSION_COOKIE) {
            Some(cookie) => Some(cookie.value().to_owned()),
            None => TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .ok()
                .map(|TypedHeader(Authorization(bearer))| bearer.token().to_owned()),
        };
        let user_id = match session.map(|token| app_state.auth_service.decode_session(&token)) {
            None => None,
            Some(Ok(user_id)) => Some(user_id),
            Some(Err(err)) if api_token.is_some() => {
                tracing::warn!(error = %err, "ignoring undecodable session next to an api key");
                None
            }
            Some(Err(err)) => return Err(err),
        };

        Ok(RequestIdentity {
            org_id,
            user_id,
            api_token,
            is_system_user: false,
        })
    }
}

/// Caller of the public TV-board endpoint, resolved from the board token
/// alone: the system identity of the board's organization plus the unit the
/// board is bound to.
pub struct BoardIdentity {
    pub identity: RequestIdentity,
    pub unit_id: Uuid,
}

impl<S> FromRequestParts<S> for BoardIdentity
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let token = header_str(parts, BOARD_TOKEN_HEADER)?.ok_or(AppError::NotAuthorized)?;
        let board = app_state.tv_boards.resolve_board_token(token).await?;
        Ok(BoardIdentity {
            identity: RequestIdentity::system(board.org_id),
            unit_id: board.unit_id,
        })
    }
}
