//! Session token issuance and validation.
//!
//! A session's expiry is stamped once at sign-in (`exp = iat + ttl`) and is
//! never extended afterward: there is no sliding renewal, and validation never
//! rewrites claims. Past `exp` a token is unconditionally invalid.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identity resolved by a successful password or code verification.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub username: String,
    pub name: String,
}

/// Signed session claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub username: String,
    /// Display name
    pub name: String,
    /// Expiration time (Unix timestamp, seconds), fixed at sign-in
    pub exp: i64,
    /// Issued at (Unix timestamp, seconds)
    pub iat: i64,
    /// Token ID
    pub jti: String,
}

/// Client-facing session shape.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: String,
    pub email: String,
    pub username: String,
    pub name: String,
    /// Expiry in milliseconds since the epoch
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
    /// Expiry as an ISO-8601 timestamp
    pub expires: String,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session has expired")]
    Expired,
    #[error("Invalid session token")]
    Invalid,
}

#[derive(Clone)]
pub struct SessionService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
}

impl SessionService {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Issue a session token for a freshly authenticated identity.
    pub fn issue(&self, identity: &Identity) -> Result<(String, SessionClaims), anyhow::Error> {
        let now = Utc::now().timestamp();

        let claims = SessionClaims {
            sub: identity.id.clone(),
            email: identity.email.clone(),
            username: identity.username.clone(),
            name: identity.name.clone(),
            exp: now + self.ttl_seconds,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };

        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))?;

        Ok((token, claims))
    }

    /// Validate a token and return its claims unchanged.
    ///
    /// Expiry is checked here rather than by the decoder: the boundary
    /// instant `exp == now` already counts as expired, with no leeway.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| SessionError::Invalid)?
            .claims;

        if claims.exp <= Utc::now().timestamp() {
            return Err(SessionError::Expired);
        }

        Ok(claims)
    }

    /// Client-facing view of validated claims. Does not touch `exp`.
    pub fn view(&self, claims: &SessionClaims) -> SessionView {
        let expires = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();

        SessionView {
            id: claims.sub.clone(),
            email: claims.email.clone(),
            username: claims.username.clone(),
            name: claims.name.clone(),
            expires_at: claims.exp * 1000,
            expires,
        }
    }
}
