//! Account lifecycle
//!
//! Signup, activation by signed token or confirmation code, credential
//! exchange for JWTs, password reset and password change. Every operation
//! either applies its whole state transition or none of it.

use chrono::Utc;
use common::error::{DatabaseError, TokenError};
use common::jwt::{JwtService, TokenType};
use common::mail::{MailJob, MailQueue};
use common::token::{EmailTokenService, TokenPurpose};
use common::user::User;
use common::validation::{FieldErrors, NON_FIELD_ERRORS};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::models::{
    ChangePasswordRequest, ResetPasswordRequest, SignupRequest, SignupResponse, TokenPair,
};
use crate::password::{hash_password, verify_password};
use crate::repositories::{ConfCodeRepository, UserRepository};
use crate::validation::{
    REQUIRED, UserAttributes, validate_email, validate_password, validate_username,
};

pub const USER_NOT_FOUND: &str = "User with given email not found";
pub const ALREADY_ACTIVATED: &str = "User already activated";
pub const ALREADY_VERIFIED: &str = "Email already verified";
pub const DEACTIVATED: &str = "Account has been deactivated";
pub const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Non-empty value of an optional field, or a "required" error on it
fn required(errors: &mut FieldErrors, field: &str, value: Option<String>) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => {
            errors.add(field, REQUIRED);
            String::new()
        }
    }
}

/// Activation only applies to an address that was never verified, on an
/// account staff have not switched off
fn ensure_pending(user: &User, already: &str) -> ApiResult<()> {
    if user.is_deactivated() {
        return Err(ApiError::Rejected(DEACTIVATED.to_string()));
    }
    if user.email_verified {
        return Err(ApiError::Rejected(already.to_string()));
    }
    Ok(())
}

/// Account lifecycle operations
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    conf_codes: Arc<dyn ConfCodeRepository>,
    mail_queue: Arc<dyn MailQueue>,
    email_tokens: EmailTokenService,
    jwt: JwtService,
    public_url: String,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        conf_codes: Arc<dyn ConfCodeRepository>,
        mail_queue: Arc<dyn MailQueue>,
        email_tokens: EmailTokenService,
        jwt: JwtService,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            conf_codes,
            mail_queue,
            email_tokens,
            jwt,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Push a mail job; a broker failure is logged and not surfaced
    async fn send(&self, job: MailJob) {
        let kind = job.kind();
        if let Err(e) = self.mail_queue.enqueue(job).await {
            error!("Failed to queue {} mail: {}", kind, e);
        }
    }

    /// Replace the user's codes with a fresh one and queue the activation mail
    pub async fn send_activation(&self, user: &User) -> ApiResult<()> {
        self.conf_codes.delete_for_user(user.id).await?;
        let code = crate::models::ConfCode::generate();
        self.conf_codes.create(user.id, &code).await?;

        let token = self
            .email_tokens
            .issue(&user.email, TokenPurpose::Activation)?;
        let activation_link = format!("{}/api/v1/auth/activate/?token={}", self.public_url, token);

        self.send(MailJob::Activation {
            username: user.username.clone(),
            email: user.email.clone(),
            activation_link,
            code,
        })
        .await;
        Ok(())
    }

    /// Register a new, inactive account
    pub async fn signup(&self, request: SignupRequest) -> ApiResult<SignupResponse> {
        let mut errors = FieldErrors::new();
        let email = required(&mut errors, "email", request.email);
        let username = required(&mut errors, "username", request.username);
        let password = required(&mut errors, "password", request.password);

        if !email.is_empty() {
            errors.check("email", validate_email(&email));
        }
        if !username.is_empty() {
            errors.check("username", validate_username(&username));
        }
        if !password.is_empty() {
            let attributes = UserAttributes {
                username: Some(&username),
                email: Some(&email),
                ..Default::default()
            };
            errors.check("password", validate_password(&password, attributes));
        }
        errors.into_result()?;

        let mut taken = FieldErrors::new();
        if self.users.email_taken(&email, None).await? {
            taken.add("email", "Email unavailable");
        }
        if self.users.username_taken(&username, None).await? {
            taken.add("username", "Username unavailable");
        }
        taken.into_result()?;

        let user = User::new(&email, &username, &hash_password(&password)?);
        let user = self.users.create(&user).await.map_err(unavailable)?;
        info!("Registered user {}", user.id);

        self.send_activation(&user).await?;

        Ok(SignupResponse {
            email: user.email,
            username: user.username,
        })
    }

    /// Activate the account named by an activation token
    pub async fn activate(&self, token: Option<&str>) -> ApiResult<()> {
        let token = token.ok_or(TokenError::Invalid)?;
        let email = self.email_tokens.verify(token, TokenPurpose::Activation)?;

        let mut user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::BadRequest(USER_NOT_FOUND.to_string()))?;

        ensure_pending(&user, ALREADY_ACTIVATED)?;

        user.is_active = true;
        user.email_verified = true;
        self.users.update(&user).await?;
        self.conf_codes.delete_for_user(user.id).await?;

        info!("Activated user {}", user.id);
        Ok(())
    }

    /// Activate the account with the code from the activation mail
    pub async fn verify_email(&self, email: Option<String>, code: Option<String>) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        let email = required(&mut errors, "email", email);
        let code = required(&mut errors, "code", code);
        errors.into_result()?;

        let mut user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))?;

        ensure_pending(&user, ALREADY_VERIFIED)?;

        let conf_code = self
            .conf_codes
            .find(user.id, &code)
            .await?
            .ok_or_else(|| FieldErrors::single("code", "Invalid confirmation code"))?;

        if conf_code.is_expired_at(Utc::now()) {
            return Err(FieldErrors::single("code", "Confirmation code expired").into());
        }

        user.is_active = true;
        user.email_verified = true;
        self.users.update(&user).await?;
        self.conf_codes.delete_for_user(user.id).await?;

        info!("Verified email of user {}", user.id);
        Ok(())
    }

    /// Issue a fresh code and activation link to an unverified address
    pub async fn resend_activation(&self, email: Option<String>) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        let email = required(&mut errors, "email", email);
        errors.into_result()?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))?;

        ensure_pending(&user, ALREADY_ACTIVATED)?;

        self.send_activation(&user).await
    }

    /// Exchange credentials for an access and refresh token
    pub async fn obtain_token(&self, email: &str, password: &str) -> ApiResult<TokenPair> {
        let mut errors = FieldErrors::new();
        if email.is_empty() {
            errors.add("email", REQUIRED);
        } else {
            errors.check("email", validate_email(email));
        }
        if password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result()?;

        let invalid = || FieldErrors::single(NON_FIELD_ERRORS, INVALID_CREDENTIALS);

        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                warn!("Token requested for unknown email");
                return Err(invalid().into());
            }
        };

        if !verify_password(password, &user.password_hash) {
            warn!("Invalid password for user {}", user.id);
            return Err(invalid().into());
        }

        if !user.is_active {
            return Err(FieldErrors::single(NON_FIELD_ERRORS, "Account is not active").into());
        }

        info!("Issued tokens for user {}", user.id);
        Ok(TokenPair {
            access: self.jwt.generate_access_token(&user)?,
            refresh: self.jwt.generate_refresh_token(&user)?,
        })
    }

    /// Issue a new access token from a refresh token
    pub async fn refresh_token(&self, refresh: &str) -> ApiResult<String> {
        let claims = self
            .jwt
            .validate_token(refresh)
            .map_err(|_| ApiError::Unauthorized)?;
        if claims.token_type != TokenType::Refresh {
            return Err(ApiError::Unauthorized);
        }

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or(ApiError::Unauthorized)?;

        Ok(self.jwt.generate_access_token(&user)?)
    }

    /// Check that a token was issued by this service and is still valid
    pub fn verify_token(&self, token: &str) -> ApiResult<()> {
        self.jwt
            .validate_token(token)
            .map(|_| ())
            .map_err(|_| ApiError::Unauthorized)
    }

    /// Send a password reset link
    pub async fn request_password_reset(&self, email: Option<String>) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        let email = required(&mut errors, "email", email);
        errors.into_result()?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))?;

        let token = self
            .email_tokens
            .issue(&user.email, TokenPurpose::PasswordReset)?;
        let reset_link = format!(
            "{}/api/v1/users/reset_password/?token={}",
            self.public_url, token
        );

        self.send(MailJob::PasswordReset {
            username: user.username.clone(),
            email: user.email.clone(),
            reset_link,
        })
        .await;

        info!("Password reset requested for user {}", user.id);
        Ok(())
    }

    /// Set a new password using a reset token
    pub async fn reset_password(
        &self,
        token: Option<&str>,
        request: ResetPasswordRequest,
    ) -> ApiResult<()> {
        let token = token.ok_or(TokenError::Invalid)?;
        let email = self
            .email_tokens
            .verify(token, TokenPurpose::PasswordReset)?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::BadRequest(USER_NOT_FOUND.to_string()))?;

        let mut errors = FieldErrors::new();
        let new = required(&mut errors, "new", request.new);
        let new_retype = required(&mut errors, "new_retype", request.new_retype);
        if !new.is_empty() {
            errors.check("new", validate_password(&new, attributes_of(&user)));
        }
        errors.into_result()?;

        if new != new_retype {
            return Err(FieldErrors::single("new", PASSWORDS_DO_NOT_MATCH).into());
        }

        self.users
            .set_password(user.id, &hash_password(&new)?)
            .await?;

        info!("Password reset for user {}", user.id);
        Ok(())
    }

    /// Change the password of an authenticated user
    pub async fn change_password(&self, user: &User, request: ChangePasswordRequest) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        let old = required(&mut errors, "old", request.old);
        let new = required(&mut errors, "new", request.new);
        let new_retype = required(&mut errors, "new_retype", request.new_retype);
        if !new.is_empty() {
            errors.check("new", validate_password(&new, attributes_of(user)));
        }
        errors.into_result()?;

        if old == new {
            return Err(FieldErrors::single(
                "new",
                "New password must be different from old password",
            )
            .into());
        }
        if !verify_password(&old, &user.password_hash) {
            warn!("Incorrect old password for user {}", user.id);
            return Err(FieldErrors::single("old", "Incorrect password").into());
        }
        if new != new_retype {
            return Err(FieldErrors::single("new", PASSWORDS_DO_NOT_MATCH).into());
        }

        self.users
            .set_password(user.id, &hash_password(&new)?)
            .await?;

        info!("Password changed for user {}", user.id);
        Ok(())
    }
}

pub fn attributes_of(user: &User) -> UserAttributes<'_> {
    UserAttributes {
        username: Some(&user.username),
        email: Some(&user.email),
        first_name: Some(&user.first_name),
        last_name: Some(&user.last_name),
    }
}

/// Whether `err` reports a wrong email or password
pub fn is_invalid_credentials(err: &ApiError) -> bool {
    matches!(
        err,
        ApiError::Validation(errors)
            if errors.get(NON_FIELD_ERRORS).is_some_and(|m| m == [INVALID_CREDENTIALS])
    )
}

/// Map a unique-constraint race on signup to the same field errors the
/// up-front checks produce
pub fn unavailable(err: DatabaseError) -> ApiError {
    match err {
        DatabaseError::UniqueViolation(constraint) if constraint.contains("email") => {
            FieldErrors::single("email", "Email unavailable").into()
        }
        DatabaseError::UniqueViolation(constraint) if constraint.contains("username") => {
            FieldErrors::single("username", "Username unavailable").into()
        }
        other => ApiError::Database(other),
    }
}
