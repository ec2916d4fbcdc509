use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{
    error::{ApiError, AuthError},
    models::Role,
    token::{TokenCodec, TokenState},
};

/// AuthUser
///
/// The verified identity of a request, produced by the access guard from the
/// token claims and forwarded to handlers through request extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub login: String,
    pub role: Role,
}

/// Access
///
/// What a route group demands of its callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Any valid, unexpired token.
    User,
    /// A valid token whose role claim is `Admin`.
    Admin,
}

/// Pulls the token out of the `Authorization` header. The raw token is what
/// `/login` hands out; a `Bearer ` prefix is tolerated.
fn extract_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::MissingToken)?;

    Ok(value.strip_prefix("Bearer ").unwrap_or(value).trim())
}

/// admit
///
/// One pass through the guard. Each step either moves on or rejects with a
/// typed `AuthError`; nothing is retried and the store is never consulted.
///
/// 1. Token Extraction: the `Authorization` header, raw or `Bearer`-prefixed.
/// 2. Verification: structure, HS256 signature and expiry via the codec.
/// 3. Role Check: admin routes demand the `Admin` role claim.
///
/// The role comes from the token, so a role change takes effect only for
/// tokens issued afterwards.
pub fn admit(headers: &HeaderMap, codec: &TokenCodec, access: Access) -> Result<AuthUser, AuthError> {
    // 1. Token Extraction
    let token = extract_token(headers)?;

    // 2. Verification (signature before expiry, see `TokenCodec::verify_at`)
    let claims = codec.verify(token)?;

    // 3. Role Check
    if access == Access::Admin && claims.role != Role::Admin {
        return Err(AuthError::InsufficientRole);
    }

    Ok(AuthUser {
        login: claims.login,
        role: claims.role,
    })
}

/// guard
///
/// Shared body of both route-group middlewares. A rejected request never
/// reaches the handler; its `AuthError` renders as 401 through `ApiError`.
async fn guard(access: Access, tokens: TokenState, mut request: Request, next: Next) -> Result<Response, ApiError> {
    // 1. Admission (extract, verify, role check)
    let user = admit(request.headers(), &tokens, access)?;
    tracing::debug!(login = %user.login, role = ?user.role, ?access, "request admitted");

    // 2. Identity Forwarding: handlers read it back through the `AuthUser` extractor
    request.extensions_mut().insert(user);

    // 3. Continue down the stack
    Ok(next.run(request).await)
}

/// user_guard
///
/// Middleware for the user route group.
pub async fn user_guard(
    State(tokens): State<TokenState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    guard(Access::User, tokens, request, next).await
}

/// admin_guard
///
/// Middleware for the admin route group. Mutations are mounted only behind it.
pub async fn admin_guard(
    State(tokens): State<TokenState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    guard(Access::Admin, tokens, request, next).await
}

/// AuthUser Extractor Implementation
///
/// Handlers behind a guard receive the identity the guard stored. Used on an
/// unguarded route, the extractor verifies the header itself with user-level
/// access, so it never yields an unverified identity.
///
/// 1. Guard Hand-off: reuse the `AuthUser` placed in the request extensions.
/// 2. Fallback Admission: resolve the codec from state and run `admit`.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Guard Hand-off
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        // 2. Fallback Admission
        let tokens = TokenState::from_ref(state);
        Ok(admit(&parts.headers, &tokens, Access::User)?)
    }
}
