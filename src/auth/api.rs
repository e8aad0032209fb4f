//! Authentication API Endpoints
//! Mission: Provide login, registration, and current-user endpoints

use crate::auth::{
    middleware::{AuthState, CurrentUser},
    models::{RegisterRequest, TokenForm, TokenResponse, UserResponse},
    user_store::StoreError,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Form, Json,
};
use serde_json::json;
use tracing::{info, warn};

/// OAuth2 password-flow login - POST /token
pub async fn login(
    State(state): State<AuthState>,
    Form(form): Form<TokenForm>,
) -> Result<Json<TokenResponse>, AuthApiError> {
    if let Some(grant_type) = form.grant_type.as_deref() {
        if grant_type != "password" {
            return Err(AuthApiError::UnsupportedGrantType);
        }
    }

    let user = state
        .user_store
        .authenticate(&form.username, &form.password)
        .ok_or_else(|| {
            warn!("❌ Failed login attempt: {}", form.username);
            AuthApiError::InvalidCredentials
        })?;

    let access_token = state
        .jwt_handler
        .issue(&user)
        .map_err(|_| AuthApiError::InternalError)?;

    info!("✅ Login successful: {}", user.username);

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// Register a new user - POST /register
pub async fn register(
    State(state): State<AuthState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AuthApiError> {
    let user = state.user_store.create(
        &payload.username,
        &payload.password,
        payload.full_name,
        payload.email,
    )?;

    Ok((StatusCode::CREATED, Json(UserResponse::from_user(&user))))
}

/// Current user info - GET /users/me
///
/// The auth gate already resolved and validated the principal; just echo it
/// back without the password hash.
pub async fn get_current_user(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<UserResponse> {
    Json(UserResponse::from_user(&user))
}

/// Auth API errors
#[derive(Debug)]
pub enum AuthApiError {
    InvalidCredentials,
    UnsupportedGrantType,
    UserAlreadyExists,
    WeakPassword,
    InvalidUsername,
    InternalError,
}

impl From<StoreError> for AuthApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists => {
                warn!("Registration attempt with existing username");
                AuthApiError::UserAlreadyExists
            }
            StoreError::WeakPassword => AuthApiError::WeakPassword,
            StoreError::InvalidUsername => AuthApiError::InvalidUsername,
            StoreError::Internal(e) => {
                warn!("User creation failed: {}", e);
                AuthApiError::InternalError
            }
        }
    }
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Incorrect username or password")
            }
            AuthApiError::UnsupportedGrantType => (
                StatusCode::BAD_REQUEST,
                "Only the password grant type is supported",
            ),
            AuthApiError::UserAlreadyExists => {
                (StatusCode::CONFLICT, "Username already registered")
            }
            AuthApiError::WeakPassword => (
                StatusCode::BAD_REQUEST,
                "Password must be at least 8 characters with an uppercase letter, a digit, and a special character",
            ),
            AuthApiError::InvalidUsername => (
                StatusCode::BAD_REQUEST,
                "Username must be between 3 and 50 characters",
            ),
            AuthApiError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert("WWW-Authenticate", "Bearer".parse().unwrap());
        }
        response
    }
}
