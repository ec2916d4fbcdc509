use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::extract::FromRef;
use chrono::Utc;

use crate::{
    AppState,
    config::AppConfig,
    error::{ApiError, AuthError, RegisterError, StoreError},
    models::{User, UserRequest},
    repository::CredentialState,
    token::{Claims, TokenState},
};

/// PasswordHashing
///
/// Argon2id cost settings. Verification reads the parameters back from the
/// stored PHC string, so raising the cost only affects new registrations.
#[derive(Clone, Copy, Debug)]
pub struct PasswordHashing {
    pub memory_kib: u32,
    pub iterations: u32,
}

impl From<&AppConfig> for PasswordHashing {
    fn from(config: &AppConfig) -> Self {
        Self {
            memory_kib: config.hash_memory_kib,
            iterations: config.hash_iterations,
        }
    }
}

impl PasswordHashing {
    fn hasher(&self) -> Result<Argon2<'static>, ApiError> {
        let params = Params::new(self.memory_kib, self.iterations, 1, None)
            .map_err(|e| ApiError::Internal(format!("invalid argon2 parameters: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hashes with a fresh random salt. Runs on the blocking pool.
    pub async fn hash(&self, password: String) -> Result<String, ApiError> {
        let hasher = self.hasher()?;
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            hasher
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
    }

    /// Slow comparison of `password` against a stored PHC string.
    pub async fn verify(&self, password: String, stored: String) -> Result<bool, ApiError> {
        tokio::task::spawn_blocking(move || -> Result<bool, ApiError> {
            let parsed = PasswordHash::new(&stored)
                .map_err(|e| StoreError::Corrupt(format!("unparsable password hash: {e}")))?;
            Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
    }
}

/// Authenticator
///
/// Registration and login. The only component that talks to the credential
/// store; everything downstream works from verified token claims.
#[derive(Clone)]
pub struct Authenticator {
    credentials: CredentialState,
    tokens: TokenState,
    hashing: PasswordHashing,
}

impl FromRef<AppState> for Authenticator {
    fn from_ref(state: &AppState) -> Self {
        Authenticator::new(
            state.credentials.clone(),
            state.tokens.clone(),
            PasswordHashing::from(&state.config),
        )
    }
}

impl Authenticator {
    pub fn new(credentials: CredentialState, tokens: TokenState, hashing: PasswordHashing) -> Self {
        Self {
            credentials,
            tokens,
            hashing,
        }
    }

    /// login
    ///
    /// Looks the user up, checks the password and issues a 24h token carrying
    /// the login, the stored hash and the stored role.
    pub async fn login(&self, login: &str, password: &str) -> Result<String, ApiError> {
        let user = self
            .credentials
            .find_user(login.trim())
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let matches = self
            .hashing
            .verify(password.to_string(), user.password_hash.clone())
            .await?;
        if !matches {
            return Err(AuthError::BadCredentials.into());
        }

        let claims = Claims::new(&user.login, &user.password_hash, user.role, Utc::now());
        let token = self.tokens.issue(&claims)?;
        tracing::info!(login = %user.login, role = ?user.role, "session token issued");
        Ok(token)
    }

    /// register
    ///
    /// Persists a new user. There is no pre-check for an existing login: the
    /// store's unique constraint decides, and its violation becomes
    /// `DuplicateLogin`.
    pub async fn register(&self, request: UserRequest) -> Result<(), ApiError> {
        let login = request.login.trim().to_string();
        if login.is_empty() {
            return Err(ApiError::validation("login must not be empty"));
        }
        if request.password.trim().is_empty() {
            return Err(ApiError::validation("password must not be empty"));
        }

        let password_hash = self.hashing.hash(request.password).await?;
        let user = User {
            login: login.clone(),
            password_hash,
            role: request.role,
        };

        match self.credentials.insert_user(user).await {
            Ok(()) => {
                tracing::info!(login = %login, role = ?request.role, "user registered");
                Ok(())
            }
            Err(StoreError::UniqueViolation(_)) => Err(RegisterError::DuplicateLogin(login).into()),
            Err(e) => Err(e.into()),
        }
    }
}
