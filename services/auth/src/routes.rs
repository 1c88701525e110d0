//! Authentication service routes

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
};
use common::pagination::{Page, PageParams};
use common::permissions::{IsAdmin, IsModerator, any_of};
use common::user::{CurrentUser, UserResponse};
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    accounts::is_invalid_credentials,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{
        ActivateQuery, ChangePasswordRequest, CreateUserRequest, EmailRequest,
        ResetPasswordRequest, SignupRequest, TokenPair, TokenQuery, TokenRequest, TokenString,
        UpdateUserRequest, VerifyEmailRequest,
    },
    users,
};

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/auth/signup/", post(signup))
        .route("/api/v1/auth/activate/", get(activate))
        .route("/api/v1/auth/verify_email/", post(verify_email))
        .route("/api/v1/auth/resend_activation/", post(resend_activation))
        .route("/api/v1/auth/token/", post(obtain_token))
        .route("/api/v1/auth/token/refresh/", post(refresh_token))
        .route("/api/v1/auth/token/verify/", post(verify_token))
        .route("/api/v1/users/", get(list_users).post(create_user))
        .route("/api/v1/users/me/", get(get_me).patch(update_me))
        .route(
            "/api/v1/users/reset_password/",
            post(request_password_reset).patch(reset_password),
        )
        .route("/api/v1/users/change_password/", patch(change_password))
        .route(
            "/api/v1/users/:id/",
            get(get_user).patch(update_user).delete(deactivate_user),
        )
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

/// Staff endpoints are open to moderators and administrators
fn require_staff(method: &Method, current: &CurrentUser) -> ApiResult<()> {
    if any_of(&[&IsModerator, &IsAdmin], method.as_str(), Some(current)) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let created = state.accounts.signup(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn activate(
    State(state): State<AppState>,
    Query(query): Query<ActivateQuery>,
) -> ApiResult<Json<Value>> {
    state.accounts.activate(query.token.as_deref()).await?;
    Ok(message("Account successfully activated"))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> ApiResult<Json<Value>> {
    state
        .accounts
        .verify_email(payload.email, payload.code)
        .await?;
    Ok(message("Email successfully verified"))
}

pub async fn resend_activation(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> ApiResult<Json<Value>> {
    state.accounts.resend_activation(payload.email).await?;
    Ok(message("Activation email sent"))
}

/// Exchange credentials for tokens; repeated failures ban the email
pub async fn obtain_token(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> ApiResult<Json<TokenPair>> {
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    if !email.is_empty() && state.rate_limiter.is_banned(&email).await {
        return Err(ApiError::TooManyRequests);
    }

    match state.accounts.obtain_token(&email, &password).await {
        Ok(pair) => {
            state.rate_limiter.reset(&email).await;
            Ok(Json(pair))
        }
        Err(e) => {
            if is_invalid_credentials(&e) {
                state.rate_limiter.record_failure(&email).await;
            }
            Err(e)
        }
    }
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<TokenString>,
) -> ApiResult<Json<Value>> {
    let refresh = payload.refresh.ok_or(ApiError::Unauthorized)?;
    let access = state.accounts.refresh_token(&refresh).await?;
    Ok(Json(json!({ "access": access })))
}

pub async fn verify_token(
    State(state): State<AppState>,
    Json(payload): Json<TokenString>,
) -> ApiResult<Json<Value>> {
    let token = payload.token.ok_or(ApiError::Unauthorized)?;
    state.accounts.verify_token(&token)?;
    Ok(Json(json!({})))
}

pub async fn get_me(AuthUser(current): AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(&current.user))
}

/// Self-service profile edit; the role can never change here
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Json(body): Json<Value>,
) -> ApiResult<Json<UserResponse>> {
    if body.get("role").is_some() {
        return Err(ApiError::BadRequest(
            "You cannot change your role here".to_string(),
        ));
    }

    let request: UpdateUserRequest =
        serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let previous_email = current.user.email.clone();
    let user = users::update_profile(state.users.as_ref(), current.user, request).await?;
    if user.email != previous_email {
        state.accounts.send_activation(&user).await?;
    }
    Ok(Json(UserResponse::from(&user)))
}

pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> ApiResult<Json<Value>> {
    state.accounts.request_password_reset(payload.email).await?;
    Ok(message("Password reset link sent"))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Json<Value>> {
    state
        .accounts
        .reset_password(query.token.as_deref(), payload)
        .await?;
    Ok(message("Password successfully reset"))
}

pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    state
        .accounts
        .change_password(&current.user, payload)
        .await?;
    Ok(message("Password changed successfully"))
}

pub async fn list_users(
    State(state): State<AppState>,
    method: Method,
    AuthUser(current): AuthUser,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<UserResponse>>> {
    require_staff(&method, &current)?;

    let (users, count) = state.users.list(params.offset(), params.limit()).await?;
    let base_url = format!("{}/api/v1/users/", state.public_url);
    let page = Page::new(users, count, &params, &base_url).map(|u| UserResponse::from(&u));
    Ok(Json(page))
}

pub async fn create_user(
    State(state): State<AppState>,
    method: Method,
    AuthUser(current): AuthUser,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    require_staff(&method, &current)?;

    let user = users::create_user(state.users.as_ref(), &current, payload).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

pub async fn get_user(
    State(state): State<AppState>,
    method: Method,
    AuthUser(current): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    require_staff(&method, &current)?;

    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(UserResponse::from(&user)))
}

/// Staff profile edit; changing the role requires an administrator
pub async fn update_user(
    State(state): State<AppState>,
    method: Method,
    AuthUser(current): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    require_staff(&method, &current)?;

    let role = payload.role;
    if role.is_some() && !current.user.is_admin() {
        return Err(ApiError::Forbidden);
    }

    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let previous_email = user.email.clone();
    let mut user = users::update_profile(state.users.as_ref(), user, payload).await?;
    if user.email != previous_email {
        state.accounts.send_activation(&user).await?;
    }
    if let Some(role) = role {
        if role != user.role {
            info!("User {} role changed to {} by {}", user.id, role, current.id());
            user.role = role;
            user = state.users.update(&user).await?;
        }
    }

    Ok(Json(UserResponse::from(&user)))
}

/// Accounts are deactivated, never deleted
pub async fn deactivate_user(
    State(state): State<AppState>,
    method: Method,
    AuthUser(current): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_staff(&method, &current)?;

    let mut user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    user.deactivate();
    state.users.update(&user).await?;
    info!("User {} deactivated by {}", user.id, current.id());

    Ok(StatusCode::NO_CONTENT)
}
