use std::env;

/// AppConfig
///
/// Process-wide configuration, loaded once at startup and immutable afterwards.
/// It is handed to the token codec, the authenticator and the stores when the
/// application state is assembled.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects log format and which values are mandatory.
    pub env: Env,
    // Postgres connection string. When absent (local only) the in-memory store is used.
    pub db_url: Option<String>,
    // Upper bound of the Postgres connection pool.
    pub db_max_connections: u32,
    // How long a request waits for a pooled connection before failing with a store error.
    pub db_acquire_timeout_secs: u64,
    // Shared HMAC secret used to sign and verify session tokens.
    pub jwt_secret: String,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Argon2id cost parameters for newly hashed passwords.
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
}

/// Env
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_JWT_SECRET: &str = "film-library-local-development-secret";

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking values for test scaffolding. The hashing cost is
    /// minimal so tests that register users stay fast.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            db_max_connections: 5,
            db_acquire_timeout_secs: 5,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            bind_addr: "127.0.0.1:8080".to_string(),
            hash_memory_kib: 1024,
            hash_iterations: 1,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics when a variable required by the current environment is missing
    /// (`JWT_SECRET` and `DATABASE_URL` in production) or when a numeric
    /// variable does not parse. The service must not start half-configured.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let (jwt_secret, db_url) = match env {
            Env::Production => (
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production."),
                Some(
                    env::var("DATABASE_URL")
                        .expect("FATAL: DATABASE_URL must be set in production."),
                ),
            ),
            Env::Local => (
                env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                env::var("DATABASE_URL").ok(),
            ),
        };

        Self {
            env,
            db_url,
            db_max_connections: numeric_var("DB_MAX_CONNECTIONS", 5),
            db_acquire_timeout_secs: numeric_var("DB_ACQUIRE_TIMEOUT_SECS", 5),
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            hash_memory_kib: numeric_var("PASSWORD_HASH_MEMORY_KIB", 19 * 1024),
            hash_iterations: numeric_var("PASSWORD_HASH_ITERATIONS", 2),
        }
    }
}

fn numeric_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("FATAL: {name} must be a number, got '{raw}'.")),
        Err(_) => default,
    }
}
