//! User Storage
//! Mission: Securely store and manage user accounts in process memory

use crate::auth::models::User;
use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{info, warn};

/// Errors surfaced by account creation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("username already registered")]
    AlreadyExists,

    #[error("password does not meet security requirements")]
    WeakPassword,

    #[error("username must be between 3 and 50 characters")]
    InvalidUsername,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// In-memory user store keyed by username.
///
/// Owned by the process and injected into handlers; registration is the only
/// mutation, so reads vastly outnumber writes.
pub struct UserStore {
    users: RwLock<HashMap<String, User>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Seed the default admin account for initial setup. Idempotent.
    pub fn seed_admin(&self, username: &str, password: &str) -> Result<()> {
        if self.find(username).is_some() {
            return Ok(());
        }

        let password_hash = hash(password, DEFAULT_COST).context("Failed to hash password")?;
        let admin = User {
            username: username.to_string(),
            full_name: None,
            email: None,
            password_hash,
            disabled: false,
            created_at: Utc::now().to_rfc3339(),
        };
        self.users.write().insert(admin.username.clone(), admin);

        info!("🔐 Default admin user created (username: {})", username);
        warn!("⚠️  CHANGE DEFAULT ADMIN PASSWORD IN PRODUCTION!");
        Ok(())
    }

    /// Get user by username.
    pub fn find(&self, username: &str) -> Option<User> {
        self.users.read().get(username).cloned()
    }

    /// Create a new user with a freshly hashed password.
    pub fn create(
        &self,
        username: &str,
        password: &str,
        full_name: Option<String>,
        email: Option<String>,
    ) -> Result<User, StoreError> {
        if username.len() < 3 || username.len() > 50 {
            return Err(StoreError::InvalidUsername);
        }
        if !password_meets_policy(password) {
            return Err(StoreError::WeakPassword);
        }

        let mut users = self.users.write();
        if users.contains_key(username) {
            return Err(StoreError::AlreadyExists);
        }

        let password_hash = hash(password, DEFAULT_COST)
            .context("Failed to hash password")
            .map_err(StoreError::Internal)?;

        let user = User {
            username: username.to_string(),
            full_name,
            email,
            password_hash,
            disabled: false,
            created_at: Utc::now().to_rfc3339(),
        };
        users.insert(user.username.clone(), user.clone());

        info!("✅ Registered user: {}", user.username);
        Ok(user)
    }

    /// Verify credentials and return the account.
    ///
    /// Returns None for unknown user, wrong password, or disabled account --
    /// callers must not be able to tell which check failed.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        let user = self.find(username)?;
        match verify(password, &user.password_hash) {
            Ok(true) if !user.disabled => Some(user),
            Ok(_) => None,
            Err(e) => {
                warn!("Password verification error for {}: {}", username, e);
                None
            }
        }
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Password policy: minimum 8 characters with at least one uppercase letter,
/// one digit, and one special character.
fn password_meets_policy(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| "!@#$%^&*(),.?\":{}|<>".contains(c))
}
