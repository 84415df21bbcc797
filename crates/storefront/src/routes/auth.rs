//! Phone + OTP sign-in.
//!
//! There are no passwords: a buyer asks for a one-time code by SMS and trades
//! it for a bearer token. Browser clients also get the identity stored in the
//! cookie session, so either mechanism works for later requests.

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use wholesale_core::Email;

use crate::db::UserRepository;
use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::middleware::auth::bearer_token;
use crate::models::{CurrentUser, ProfileUpdate, User};
use crate::services::auth::{AuthService, OTP_TTL_MINUTES};
use crate::state::AppState;

/// OTP request body.
#[derive(Debug, Deserialize)]
pub struct RequestOtp {
    pub phone: String,
}

/// OTP verification body.
#[derive(Debug, Deserialize)]
pub struct VerifyOtp {
    pub phone: String,
    pub otp: String,
    /// Display name, used only when the account is created.
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSent {
    pub success: bool,
    pub message: &'static str,
    pub expires_in_minutes: i64,
}

#[derive(Debug, Serialize)]
pub struct SignedIn {
    pub token: String,
    pub user: User,
}

/// POST /api/auth/request-otp
///
/// # Errors
///
/// Returns 400 for a malformed number, 429 when the phone has asked for too
/// many codes, 502 when the SMS could not be sent.
#[instrument(skip(state, body))]
pub async fn request_otp(
    State(state): State<AppState>,
    Json(body): Json<RequestOtp>,
) -> Result<Json<OtpSent>> {
    let auth = AuthService::new(state.pool(), state.otp_sender());
    let phone = auth.request_otp(&body.phone).await?;
    tracing::info!(phone = %phone.masked(), "OTP sent");

    Ok(Json(OtpSent {
        success: true,
        message: "OTP sent",
        expires_in_minutes: OTP_TTL_MINUTES,
    }))
}

/// POST /api/auth/verify-otp
///
/// # Errors
///
/// Returns 401 for a wrong, expired or exhausted code.
#[instrument(skip(state, session, body))]
pub async fn verify_otp(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<VerifyOtp>,
) -> Result<Json<SignedIn>> {
    let auth = AuthService::new(state.pool(), state.otp_sender());
    let name = body.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let (user, token) = auth.verify_otp(&body.phone, body.otp.trim(), name).await?;

    set_current_user(&session, &CurrentUser::from(&user))
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

    add_breadcrumb("auth", "Signed in with OTP", None);
    tracing::info!(user_id = %user.id, "User signed in");

    Ok(Json(SignedIn { token, user }))
}

/// POST /api/auth/logout
///
/// Clears the session and revokes the bearer token, if one was sent.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    if let Some(token) = bearer_token(&headers) {
        let auth = AuthService::new(state.pool(), state.otp_sender());
        if let Err(e) = auth.revoke_token(token).await {
            tracing::warn!("Failed to revoke token: {e}");
        }
    }

    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {e}");
    }
    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {e}");
    }
    clear_sentry_user();

    Json(serde_json::json!({ "success": true }))
}

/// GET /api/auth/me
///
/// # Errors
///
/// Returns 404 if the account was removed after sign-in.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<User>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;
    Ok(Json(user))
}

/// PUT /api/auth/me
///
/// # Errors
///
/// Returns 400 for a malformed email or GSTIN.
#[instrument(skip(state, update), fields(user_id = %current.id))]
pub async fn update_me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<User>> {
    let update = normalize_profile(update).map_err(AppError::BadRequest)?;
    let user = UserRepository::new(state.pool())
        .update_profile(current.id, &update)
        .await?;
    Ok(Json(user))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim fields and check the ones with a fixed format.
fn normalize_profile(update: ProfileUpdate) -> std::result::Result<ProfileUpdate, String> {
    let email = trimmed(update.email)
        .map(|e| Email::parse(&e).map(|e| e.as_str().to_string()))
        .transpose()
        .map_err(|e| e.to_string())?;

    let gstin = trimmed(update.gstin).map(|g| g.to_ascii_uppercase());
    if let Some(g) = &gstin
        && (g.len() != 15 || !g.bytes().all(|b| b.is_ascii_alphanumeric()))
    {
        return Err("GSTIN must be 15 letters and digits".to_string());
    }

    Ok(ProfileUpdate {
        name: trimmed(update.name),
        email,
        business_name: trimmed(update.business_name),
        gstin,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_profile_trims_and_uppercases() {
        let update = normalize_profile(ProfileUpdate {
            name: Some("  Asha Traders ".into()),
            email: Some(" asha@example.com ".into()),
            business_name: Some("   ".into()),
            gstin: Some("27aapfu0939f1zv".into()),
        })
        .unwrap();

        assert_eq!(update.name.as_deref(), Some("Asha Traders"));
        assert_eq!(update.email.as_deref(), Some("asha@example.com"));
        assert_eq!(update.business_name, None);
        assert_eq!(update.gstin.as_deref(), Some("27AAPFU0939F1ZV"));
    }

    #[test]
    fn test_normalize_profile_rejects_bad_gstin() {
        let err = normalize_profile(ProfileUpdate {
            gstin: Some("27AAPF".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.contains("GSTIN"));
    }

    #[test]
    fn test_normalize_profile_rejects_bad_email() {
        assert!(
            normalize_profile(ProfileUpdate {
                email: Some("not-an-email".into()),
                ..Default::default()
            })
            .is_err()
        );
    }
}
