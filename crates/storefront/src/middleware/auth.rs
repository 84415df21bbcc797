//! Authentication extractors.
//!
//! A caller is identified either by an `Authorization: Bearer <token>` header
//! (mobile and script clients) or by the session cookie set at sign-in
//! (browser clients). The bearer token wins when both are present.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use tower_sessions::Session;

use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentUser, session_keys};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Extract the bearer token from the `Authorization` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the caller from a bearer token or the session.
///
/// An invalid bearer token is an error rather than falling back to the
/// session, so clients learn their token has expired.
async fn resolve_user(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, AppError> {
    if let Some(token) = bearer_token(&parts.headers) {
        let auth = AuthService::new(state.pool(), state.otp_sender());
        return match auth.user_for_token(token).await? {
            Some(user) => Ok(Some(CurrentUser::from(&user))),
            None => Err(AppError::Unauthorized(
                "Invalid or expired token".to_string(),
            )),
        };
    }

    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(None);
    };

    Ok(session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten())
}

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.phone)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let user = resolve_user(parts, &state)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Please sign in".to_string()))?;

        set_sentry_user(&user.id);
        Ok(Self(user))
    }
}

/// Extractor that requires a signed-in admin.
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "Non-admin hit admin route");
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject anonymous requests. A bad
/// bearer token is treated as anonymous.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(Self(resolve_user(parts, &state).await.ok().flatten()))
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    // New identity, new session id
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn headers(auth: Option<&str>) -> HeaderMap {
        let mut builder = Request::builder().uri("/api/orders");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0.headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers(Some("Bearer abc123"))), Some("abc123"));
        assert_eq!(bearer_token(&headers(Some("Basic abc123"))), None);
        assert_eq!(bearer_token(&headers(Some("Bearer   "))), None);
        assert_eq!(bearer_token(&headers(None)), None);
    }
}
