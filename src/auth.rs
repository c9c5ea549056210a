use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::AppConfig;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Session token lifetime. Tokens are stateless; expiry and client-side cookie
/// deletion are the only invalidation mechanisms.
pub const TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

// Anything shorter than this cannot be a JWT; rejected before decoding.
const MIN_TOKEN_LEN: usize = 10;

/// Role
///
/// The RBAC field carried by every identity and session token. Stored as TEXT in
/// the `users` table and serialized in uppercase on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ts_rs::TS, utoipa::ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    Admin,
    Teacher,
    #[default]
    Student,
}

impl Role {
    /// The dashboard path this role lands on after login and on any wrong-role redirect.
    pub fn home(self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::Teacher => "/teacher/dashboard",
            Role::Student => "/student/dashboard",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Teacher => "TEACHER",
            Role::Student => "STUDENT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "ADMIN" => Ok(Role::Admin),
            "TEACHER" => Ok(Role::Teacher),
            "STUDENT" => Ok(Role::Student),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::try_from(s.to_string())
    }
}

/// Claims
///
/// Payload structure of the session token. Signed with the server secret at login
/// and validated on every authenticated request; nothing here is persisted
/// server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the numeric user id from the `users` table.
    pub sub: i32,
    /// Email at issue time, echoed into the resolved identity.
    pub email: String,
    /// Role at issue time. A role change does not take effect until re-login.
    pub role: Role,
    /// Issued At timestamp (seconds since epoch).
    pub iat: usize,
    /// Expiration timestamp. Tokens past this point fail verification.
    pub exp: usize,
}

/// issue_token
///
/// Signs a session token embedding the identity's id, email and role, valid for
/// seven days from the current wall clock.
pub fn issue_token(
    secret: &str,
    user_id: i32,
    email: &str,
    role: Role,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        iat: now as usize,
        exp: (now + TOKEN_TTL_SECS) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// verify_token
///
/// Validates a session token against the configured secret and the current wall
/// clock. Returns `None` for anything that does not verify: empty or implausibly
/// short strings, bad signatures, malformed tokens, expired tokens. Callers are
/// on the request hot path with attacker-supplied input, so this never panics and
/// never surfaces an error value.
///
/// Expiry is re-evaluated on every call; validity is never cached across requests.
pub fn verify_token(secret: &str, token: &str) -> Option<Claims> {
    if token.len() < MIN_TOKEN_LEN {
        return None;
    }

    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &key, &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!("token verification failed: {:?}", e.kind());
            None
        }
    }
}

/// extract_token
///
/// Pulls the session token off a request: `Authorization: Bearer` header first,
/// the session cookie as fallback.
pub fn extract_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string());

    from_header.or_else(|| jar.get(SESSION_COOKIE).map(|c| c.value().to_string()))
}

/// AuthError
///
/// The complete taxonomy of authentication/authorization failures on API routes.
/// Page navigations never see these; the page gate reports failures as redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No token supplied on a protected request.
    NoCredential,
    /// Token present but fails signature or expiry checks.
    InvalidCredential,
    /// Valid identity, insufficient privilege for the target resource.
    RoleMismatch,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::NoCredential => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            AuthError::InvalidCredential => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::RoleMismatch => (StatusCode::FORBIDDEN, "Forbidden"),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request, and the only source of
/// caller identity downstream handlers may trust. Attached to request extensions
/// by the page gate, or resolved directly from the token by the extractor below.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub email: String,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// AuthUser Extractor
///
/// Makes `AuthUser` usable as a handler argument on any route. When the page gate
/// has already run, the identity it attached is reused; otherwise the token is
/// extracted (header first, cookie fallback) and verified here, so API routes not
/// covered by the path-prefix policy still get the full check.
///
/// Rejection: JSON 401 (`NoCredential` / `InvalidCredential`).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let config = AppConfig::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        let token = extract_token(&parts.headers, &jar).ok_or(AuthError::NoCredential)?;
        let claims =
            verify_token(&config.jwt_secret, &token).ok_or(AuthError::InvalidCredential)?;

        Ok(AuthUser::from(claims))
    }
}

// --- Role guard extractors ---
//
// The per-handler authorization layer. The page gate's path-prefix policy is
// coarse (one prefix can serve several roles); these wrappers are the narrow
// check at the handler boundary. A handler taking one of these never executes
// for an identity outside the allowed set.

/// Admits ADMIN only. Rejection: JSON 403.
pub struct AdminUser(pub AuthUser);

/// Admits TEACHER and ADMIN. Rejection: JSON 403.
pub struct TeacherUser(pub AuthUser);

/// Admits STUDENT only. Rejection: JSON 403.
pub struct StudentUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(AuthError::RoleMismatch);
        }
        Ok(AdminUser(user))
    }
}

impl<S> FromRequestParts<S> for TeacherUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        // Admins may do anything a teacher can.
        if user.role != Role::Teacher && user.role != Role::Admin {
            return Err(AuthError::RoleMismatch);
        }
        Ok(TeacherUser(user))
    }
}

impl<S> FromRequestParts<S> for StudentUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Student {
            return Err(AuthError::RoleMismatch);
        }
        Ok(StudentUser(user))
    }
}
