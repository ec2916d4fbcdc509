use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, AuthError},
    models::Role,
};

/// Lifetime of every issued session token.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Claims
///
/// The payload signed into every session token. `password_hash` is the stored
/// hash at issue time, used as an opaque identity tag: rotating a password
/// changes the tag carried by any token issued afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub login: String,
    #[serde(rename = "hashedpassword")]
    pub password_hash: String,
    pub role: Role,
    /// Expiry as a unix timestamp in seconds.
    pub exp: i64,
}

impl Claims {
    /// Builds claims that expire `TOKEN_TTL_HOURS` after `issued_at`.
    pub fn new(login: &str, password_hash: &str, role: Role, issued_at: DateTime<Utc>) -> Self {
        Self {
            login: login.to_string(),
            password_hash: password_hash.to_string(),
            role,
            exp: (issued_at + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        }
    }
}

/// TokenCodec
///
/// Signs and verifies session tokens (HS256) with the process-wide secret.
/// Holds no mutable state, so one instance is shared by every request.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

/// TokenState
pub type TokenState = Arc<TokenCodec>;

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked in `verify_at` against an explicit instant so the
        // outcome is a typed `Expired` with no leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// issue
    ///
    /// Signs the claims. A signing failure is a server fault, not a problem
    /// with the caller's credentials, so it surfaces as a 500.
    pub fn issue(&self, claims: &Claims) -> Result<String, ApiError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(signing_failed)
    }

    /// verify
    ///
    /// Checks the token against the current time.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// verify_at
    ///
    /// Checks structure, signature and expiry (in that order) as of `now`.
    /// A token is still valid at the exact second of its expiry.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => AuthError::BadSignature,
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Malformed,
            }
        })?;

        if now.timestamp() > data.claims.exp {
            return Err(AuthError::Expired);
        }

        Ok(data.claims)
    }
}

fn signing_failed(error: jsonwebtoken::errors::Error) -> ApiError {
    ApiError::Internal(format!("failed to sign session token: {error}"))
}
