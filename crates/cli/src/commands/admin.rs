//! Admin user management.
//!
//! Admins sign in through the same OTP flow as buyers; promoting just flips
//! the role on an existing account.

use thiserror::Error;
use wholesale_core::{Phone, PhoneError, UserRole};
use wholesale_storefront::db::{RepositoryError, UserRepository};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Invalid phone number: {0}")]
    InvalidPhone(#[from] PhoneError),

    #[error("No user has signed in with {0} yet")]
    UnknownUser(String),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Setup(String),
}

/// Give the user with this phone number the admin role.
///
/// # Errors
///
/// Returns an error if the phone is malformed, the user does not exist, or
/// the database is unreachable.
pub async fn promote(phone: &str) -> Result<(), AdminError> {
    let phone = Phone::parse(phone)?;
    let pool = super::connect()
        .await
        .map_err(|e| AdminError::Setup(e.to_string()))?;

    let users = UserRepository::new(&pool);
    let user = users
        .get_by_phone(&phone)
        .await?
        .ok_or_else(|| AdminError::UnknownUser(phone.masked()))?;

    if user.role == UserRole::Admin {
        tracing::info!(user_id = %user.id, "User is already an admin");
        return Ok(());
    }

    users.set_role(user.id, UserRole::Admin).await?;
    tracing::info!(user_id = %user.id, phone = %phone.masked(), "User promoted to admin");
    Ok(())
}
