//! Bearer token authentication

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use common::jwt::TokenType;
use common::user::CurrentUser;
use tracing::warn;

use crate::{AppState, error::ApiError};

/// The authenticated, active user behind an access token
pub struct AuthUser(pub CurrentUser);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized)?;

        let claims = state
            .jwt_service
            .validate_token(bearer.token())
            .map_err(|e| {
                warn!("Rejected access token: {}", e);
                ApiError::Unauthorized
            })?;

        if claims.token_type != TokenType::Access {
            return Err(ApiError::Unauthorized);
        }

        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or(ApiError::Unauthorized)?;

        let is_owner = state.users.owns_property(user.id).await?;

        Ok(AuthUser(CurrentUser { user, is_owner }))
    }
}
