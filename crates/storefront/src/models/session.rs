//! Session-related types.
//!
//! Types stored in the cookie session for authentication state.

use serde::{Deserialize, Serialize};

use wholesale_core::{Phone, UserId, UserRole};

use super::User;

/// Session-stored user identity.
///
/// Minimal data kept in the session (or resolved from a bearer token) to
/// identify the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's mobile number.
    pub phone: Phone,
    /// Role at sign-in time.
    pub role: UserRole,
}

impl CurrentUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            phone: user.phone.clone(),
            role: user.role,
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
