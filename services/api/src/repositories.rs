//! Repositories for database operations

pub mod favorite;
pub mod image;
#[cfg(test)]
pub mod memory;
pub mod property;
pub mod user;

pub use favorite::{FavoriteRepository, PgFavoriteRepository};
pub use image::{ImageRepository, PgImageRepository};
pub use property::{PgPropertyRepository, PropertyRepository};
pub use user::{PgUserRepository, UserRepository};
