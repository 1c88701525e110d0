//! Authentication service models

pub mod account;
pub mod conf_code;
pub mod user;

// Re-export for convenience
pub use account::{
    ActivateQuery, ChangePasswordRequest, EmailRequest, ResetPasswordRequest, SignupRequest,
    SignupResponse, TokenPair, TokenQuery, TokenRequest, TokenString, VerifyEmailRequest,
};
pub use conf_code::ConfCode;
pub use user::{CreateUserRequest, UpdateUserRequest};
