//! Authentication extractor.
//!
//! Resolves the session token from the `Authorization` header into the
//! calling user. Both `Authorization: <token>` and
//! `Authorization: Bearer <token>` are accepted.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use shopcart_core::Actor;

use crate::error::AppError;
use crate::models::User;
use crate::services::AuthService;
use crate::state::AppState;

/// Extractor that requires an authenticated user.
///
/// Rejects with 401 Unauthorized if the header is missing or the token is
/// unknown.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(CurrentUser(user): CurrentUser) -> String {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// The identity the services act on behalf of.
    #[must_use]
    pub const fn actor(&self) -> Actor {
        self.0.actor()
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| AppError::Unauthorized("authorization token required".to_string()))?;

        let user = AuthService::new(state.store()).resolve_token(token).await?;
        set_sentry_user(&user);

        Ok(Self(user))
    }
}

/// Extract the token from an `Authorization` header value.
///
/// Returns `None` for a blank header.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    let header = header.trim();
    let token = match header.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ if header.eq_ignore_ascii_case("bearer") => "",
        _ => header,
    };
    (!token.is_empty()).then_some(token)
}

/// Set the Sentry user context for the current request.
fn set_sentry_user(user: &User) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.id.to_string()),
            username: Some(user.username.to_string()),
            ..Default::default()
        }));
    });
}
