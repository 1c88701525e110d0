//! Common library for the housing backend
//!
//! This crate provides shared functionality used by the HTTP services and the
//! mail worker: database connectivity and migrations, the Redis-backed mail
//! queue, signed email tokens, JWT issuance, the user model with its roles,
//! permission guards, pagination and field-level validation errors.

pub mod broker;
pub mod database;
pub mod error;
pub mod jwt;
pub mod mail;
pub mod pagination;
pub mod permissions;
pub mod token;
pub mod user;
pub mod validation;
