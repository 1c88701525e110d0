//! Profile edits and administrative account management

use common::user::{CurrentUser, Role, User};
use common::validation::FieldErrors;
use tracing::info;

use crate::accounts::unavailable;
use crate::error::{ApiError, ApiResult};
use crate::models::{CreateUserRequest, UpdateUserRequest};
use crate::password::hash_password;
use crate::repositories::UserRepository;
use crate::validation::{
    REQUIRED, UserAttributes, validate_email, validate_password, validate_phone_number,
    validate_username,
};

/// Apply a partial profile update
///
/// Changing the email address clears `email_verified`. The role is left
/// untouched; callers that allow role changes apply it themselves.
pub async fn update_profile(
    users: &dyn UserRepository,
    mut user: User,
    request: UpdateUserRequest,
) -> ApiResult<User> {
    let mut errors = FieldErrors::new();

    if let Some(email) = &request.email {
        errors.check("email", validate_email(email));
    }
    if let Some(username) = &request.username {
        errors.check("username", validate_username(username));
    }
    if let Some(phone_number) = &request.phone_number {
        errors.check("phone_number", validate_phone_number(phone_number));
    }
    errors.into_result()?;

    let mut taken = FieldErrors::new();
    if let Some(email) = &request.email {
        if email != &user.email && users.email_taken(email, Some(user.id)).await? {
            taken.add("email", "Email unavailable");
        }
    }
    if let Some(username) = &request.username {
        if username != &user.username && users.username_taken(username, Some(user.id)).await? {
            taken.add("username", "Username unavailable");
        }
    }
    taken.into_result()?;

    if let Some(email) = request.email {
        if email != user.email {
            user.email = email;
            user.email_verified = false;
        }
    }
    if let Some(username) = request.username {
        user.username = username;
    }
    if let Some(first_name) = request.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = request.last_name {
        user.last_name = last_name;
    }
    if let Some(phone_number) = request.phone_number {
        user.phone_number = phone_number;
    }

    Ok(users.update(&user).await.map_err(unavailable)?)
}

/// Create an active account on behalf of staff
///
/// Only administrators may assign a role other than the default.
pub async fn create_user(
    users: &dyn UserRepository,
    creator: &CurrentUser,
    request: CreateUserRequest,
) -> ApiResult<User> {
    let role = request.role.unwrap_or_default();
    if role != Role::User && !creator.user.is_admin() {
        return Err(ApiError::Forbidden);
    }

    let mut errors = FieldErrors::new();
    let email = request.email.unwrap_or_default();
    let username = request.username.unwrap_or_default();
    let password = request.password.unwrap_or_default();
    let first_name = request.first_name.unwrap_or_default();
    let last_name = request.last_name.unwrap_or_default();
    let phone_number = request.phone_number.unwrap_or_default();

    errors.check("email", validate_email(&email));
    errors.check("username", validate_username(&username));
    errors.check("phone_number", validate_phone_number(&phone_number));
    if password.is_empty() {
        errors.add("password", REQUIRED);
    } else {
        let attributes = UserAttributes {
            username: Some(&username),
            email: Some(&email),
            first_name: Some(&first_name),
            last_name: Some(&last_name),
        };
        errors.check("password", validate_password(&password, attributes));
    }
    errors.into_result()?;

    let mut taken = FieldErrors::new();
    if users.email_taken(&email, None).await? {
        taken.add("email", "Email unavailable");
    }
    if users.username_taken(&username, None).await? {
        taken.add("username", "Username unavailable");
    }
    taken.into_result()?;

    let mut user = User::new(&email, &username, &hash_password(&password)?);
    user.first_name = first_name;
    user.last_name = last_name;
    user.phone_number = phone_number;
    user.role = role;
    user.is_active = true;

    let user = users.create(&user).await.map_err(unavailable)?;
    info!("User {} created by {}", user.id, creator.id());
    Ok(user)
}
