//! Repositories for database operations

pub mod conf_code;
pub mod user;

#[cfg(test)]
pub mod memory;

pub use conf_code::{ConfCodeRepository, PgConfCodeRepository};
pub use user::{PgUserRepository, UserRepository};
