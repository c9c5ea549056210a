use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::{
    AppState,
    auth::{self, AuthUser, Role},
};

/// The role-agnostic landing path. Always allowed through with a valid token;
/// the page itself redirects to the caller's role home. This is an explicit
/// exception to the prefix policy below.
pub const DASHBOARD_PATH: &str = "/dashboard";

const LOGIN_PATH: &str = "/login";
const REGISTER_PATH: &str = "/register";

// Static path-prefix policy. Invariant: every protected prefix maps to a
// non-empty role set. The /teacher area admits admins; the /student area does not.
const PREFIX_POLICY: &[(&str, &[Role])] = &[
    ("/admin", &[Role::Admin]),
    ("/teacher", &[Role::Teacher, Role::Admin]),
    ("/student", &[Role::Student]),
];

/// allowed_roles
///
/// Looks up the set of roles permitted under the given path's prefix. `None`
/// means the path is not covered by the prefix policy; such paths still require
/// a valid token on page routes, and API routes fall back to per-handler guards.
pub fn allowed_roles(path: &str) -> Option<&'static [Role]> {
    PREFIX_POLICY
        .iter()
        .find(|(prefix, _)| path.starts_with(prefix))
        .map(|(_, roles)| *roles)
}

/// Whether the path is a public page (login/registration) that authenticated
/// users get bounced away from.
pub fn is_public_page(path: &str) -> bool {
    path == LOGIN_PATH || path == REGISTER_PATH
}

fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    // Removal must match the path the login handler set, or browsers keep the cookie.
    jar.remove(Cookie::build((auth::SESSION_COOKIE, "")).path("/").build())
}

/// page_gate
///
/// Request-interception middleware for page navigations. Runs ahead of every
/// page handler and decides allow/deny/redirect per request:
///
/// - no token on a protected path        -> redirect to /login
/// - token present but invalid           -> delete the session cookie, redirect to /login
/// - valid token on /login or /register  -> redirect to the role's home dashboard
/// - valid token, role outside the       -> redirect to the caller's own role home
///   prefix's allowed set                   (never to /login, never an error page)
/// - valid token, allowed                -> attach the verified identity and proceed
///
/// Verification failures are terminal for the request and reported only as
/// redirects; this layer runs ahead of page rendering and never emits JSON.
/// Tokens are stateless, so nothing here is retried.
pub async fn page_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let token = auth::extract_token(request.headers(), &jar);

    if is_public_page(&path) {
        // Prevent re-login while authenticated; invalid tokens fall through to the page.
        if let Some(token) = token {
            if let Some(claims) = auth::verify_token(&state.config.jwt_secret, &token) {
                tracing::debug!(path, role = %claims.role, "authenticated user on public page");
                return Redirect::to(claims.role.home()).into_response();
            }
        }
        return next.run(request).await;
    }

    let Some(token) = token else {
        tracing::debug!(path, "no session token on protected page");
        return Redirect::to(LOGIN_PATH).into_response();
    };

    let Some(claims) = auth::verify_token(&state.config.jwt_secret, &token) else {
        tracing::debug!(path, "invalid session token, clearing cookie");
        return (clear_session_cookie(jar), Redirect::to(LOGIN_PATH)).into_response();
    };

    if path != DASHBOARD_PATH {
        if let Some(roles) = allowed_roles(&path) {
            if !roles.contains(&claims.role) {
                return Redirect::to(claims.role.home()).into_response();
            }
        }
    }

    request.extensions_mut().insert(AuthUser::from(claims));
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_protected_prefix_has_roles() {
        for (prefix, roles) in PREFIX_POLICY {
            assert!(!roles.is_empty(), "empty role set for {prefix}");
        }
    }

    #[test]
    fn prefix_lookup() {
        assert_eq!(allowed_roles("/admin/dashboard"), Some(&[Role::Admin][..]));
        assert_eq!(
            allowed_roles("/teacher/attendance/view"),
            Some(&[Role::Teacher, Role::Admin][..])
        );
        assert_eq!(allowed_roles("/student/dashboard"), Some(&[Role::Student][..]));
        assert_eq!(allowed_roles("/dashboard"), None);
        assert_eq!(allowed_roles("/login"), None);
    }

    #[test]
    fn public_pages() {
        assert!(is_public_page("/login"));
        assert!(is_public_page("/register"));
        assert!(!is_public_page("/admin/dashboard"));
    }
}
