//! Role-based permission guards
//!
//! A guard is a predicate over the request method and the authenticated
//! principal, if any. Guards compose with [`any_of`], which grants access
//! when at least one of them does.

use crate::user::CurrentUser;

/// Methods that never modify state
pub fn is_safe_method(method: &str) -> bool {
    matches!(method, "GET" | "HEAD" | "OPTIONS")
}

/// A permission check
pub trait Permission: Send + Sync {
    fn has_permission(&self, method: &str, user: Option<&CurrentUser>) -> bool;
}

pub struct IsAuthenticated;

impl Permission for IsAuthenticated {
    fn has_permission(&self, _method: &str, user: Option<&CurrentUser>) -> bool {
        user.is_some()
    }
}

pub struct IsAdmin;

impl Permission for IsAdmin {
    fn has_permission(&self, _method: &str, user: Option<&CurrentUser>) -> bool {
        user.is_some_and(|u| u.user.is_admin())
    }
}

pub struct IsAdminOrReadOnly;

impl Permission for IsAdminOrReadOnly {
    fn has_permission(&self, method: &str, user: Option<&CurrentUser>) -> bool {
        is_safe_method(method) || IsAdmin.has_permission(method, user)
    }
}

pub struct IsModerator;

impl Permission for IsModerator {
    fn has_permission(&self, _method: &str, user: Option<&CurrentUser>) -> bool {
        user.is_some_and(|u| u.user.is_moderator())
    }
}

/// The caller has confirmed their email address
pub struct EmailVerified;

impl Permission for EmailVerified {
    fn has_permission(&self, _method: &str, user: Option<&CurrentUser>) -> bool {
        user.is_some_and(|u| u.user.email_verified)
    }
}

/// The caller owns at least one property
pub struct IsOwner;

impl Permission for IsOwner {
    fn has_permission(&self, _method: &str, user: Option<&CurrentUser>) -> bool {
        user.is_some_and(|u| u.is_owner)
    }
}

pub struct IsOwnerOrReadOnly;

impl Permission for IsOwnerOrReadOnly {
    fn has_permission(&self, method: &str, user: Option<&CurrentUser>) -> bool {
        is_safe_method(method) || IsOwner.has_permission(method, user)
    }
}

/// Grant access when any of `guards` does
pub fn any_of(guards: &[&dyn Permission], method: &str, user: Option<&CurrentUser>) -> bool {
    guards.iter().any(|g| g.has_permission(method, user))
}
