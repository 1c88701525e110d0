//! Bearer token authentication

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use common::jwt::TokenType;
use common::user::CurrentUser;
use tracing::warn;

use crate::{error::ApiError, state::AppState};

/// The authenticated, active user behind an access token
pub struct AuthUser(pub CurrentUser);

/// Like [`AuthUser`], but anonymous requests pass through as `None`
///
/// A token that is present but invalid is still rejected.
pub struct MaybeAuthUser(pub Option<CurrentUser>);

async fn authenticate(token: &str, state: &AppState) -> Result<CurrentUser, ApiError> {
    let claims = state.jwt_service.validate_token(token).map_err(|e| {
        warn!("Rejected access token: {}", e);
        ApiError::Unauthorized
    })?;

    if claims.token_type != TokenType::Access {
        return Err(ApiError::Unauthorized);
    }

    let user = state
        .properties
        .users()
        .find_by_id(claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or(ApiError::Unauthorized)?;

    let is_owner = state.properties.owns_any(user.id).await?;

    Ok(CurrentUser { user, is_owner })
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized)?;

        Ok(AuthUser(authenticate(bearer.token(), state).await?))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        if !parts.headers.contains_key(axum::http::header::AUTHORIZATION) {
            return Ok(MaybeAuthUser(None));
        }

        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        Ok(MaybeAuthUser(Some(user)))
    }
}
