//! JWT Token Handler
//! Mission: Issue and verify signed, time-limited bearer tokens

use crate::auth::models::{Claims, User};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

/// JWT Handler for token operations.
///
/// Verification is a pure function of the token string and the secret;
/// no session state is kept server-side.
pub struct JwtHandler {
    secret: String,
    algorithm: Algorithm,
    expire_minutes: i64,
    validation: Validation,
}

impl JwtHandler {
    /// Create a handler with the configured secret, algorithm name, and
    /// token lifetime. Only HMAC algorithms are valid for a shared secret.
    pub fn new(secret: String, algorithm: &str, expire_minutes: i64) -> Result<Self> {
        let algorithm: Algorithm = algorithm
            .parse()
            .with_context(|| format!("Unknown JWT algorithm: {}", algorithm))?;
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            bail!("JWT algorithm must be an HMAC variant (HS256/HS384/HS512)");
        }
        if expire_minutes <= 0 {
            bail!("Token expiry window must be positive");
        }

        // Expiry is a hard boundary: a token one second past its encoded
        // exp must already fail, so drop jsonwebtoken's default 60s leeway.
        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;

        Ok(Self {
            secret,
            algorithm,
            expire_minutes,
            validation,
        })
    }

    /// Issue a signed access token for a user.
    pub fn issue(&self, user: &User) -> Result<String> {
        let expiration = Utc::now()
            .checked_add_signed(chrono::Duration::minutes(self.expire_minutes))
            .context("Invalid timestamp")?
            .timestamp() as usize;

        let claims = Claims {
            sub: user.username.clone(),
            exp: expiration,
        };

        debug!(
            "Issuing token for {}, expires in {}m",
            user.username, self.expire_minutes
        );

        encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to sign token")
    }

    /// Verify a token and return the subject username.
    ///
    /// Fails on bad signature, malformed payload, or elapsed expiry
    /// (jsonwebtoken enforces `exp` during decode).
    pub fn verify(&self, token: &str) -> Result<String> {
        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &self.validation,
        )
        .context("Invalid or expired token")?;

        debug!("Verified token for {}", decoded.claims.sub);
        Ok(decoded.claims.sub)
    }
}
