//! Authentication Models
//! Mission: Define secure user and authentication data structures

use serde::{Deserialize, Serialize};

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub disabled: bool,
    pub created_at: String,
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // subject (username)
    pub exp: usize,  // expiration timestamp
}

/// OAuth2 password-flow form body for POST /token
#[derive(Debug, Deserialize)]
pub struct TokenForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub grant_type: Option<String>,
}

/// Token response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String, // always "bearer"
}

/// Registration request body
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// User response (sanitized - no password hash)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub disabled: bool,
    pub created_at: String,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            disabled: user.disabled,
            created_at: user.created_at.clone(),
        }
    }
}
