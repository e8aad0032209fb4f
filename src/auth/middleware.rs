//! Authentication Middleware
//! Mission: Gate protected endpoints behind bearer-token validation

use crate::auth::{jwt::JwtHandler, models::User, user_store::UserStore};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Shared auth state, injected into the gate and the auth handlers.
#[derive(Clone)]
pub struct AuthState {
    pub user_store: Arc<UserStore>,
    pub jwt_handler: Arc<JwtHandler>,
}

/// The resolved principal, available to downstream handlers via extensions.
#[derive(Clone)]
pub struct CurrentUser(pub User);

/// Auth gate: verify the bearer token, then resolve the acting user.
///
/// The token only proves a past login; existence and the disabled flag are
/// not embedded in it, so the store is consulted on every request.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingToken)?;

    let username = state
        .jwt_handler
        .verify(token)
        .map_err(|_| AuthError::InvalidToken)?;

    let user = state
        .user_store
        .find(&username)
        .filter(|u| !u.disabled)
        .ok_or(AuthError::InvalidToken)?;

    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

/// Auth error types
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "Missing authorization token",
            AuthError::InvalidToken => "Could not validate credentials",
        };

        let mut response =
            (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response();
        response
            .headers_mut()
            .insert("WWW-Authenticate", "Bearer".parse().unwrap());
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_responses() {
        let missing = AuthError::MissingToken.into_response();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(missing.headers().get("WWW-Authenticate").unwrap(), "Bearer");

        let invalid = AuthError::InvalidToken.into_response();
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
    }
}
