use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines the API endpoints that are **unauthenticated** and accessible to any
/// client. These are the identity gateway (login/registration), the liveness
/// probe, and the lookup data the registration form needs before a session
/// exists.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /api/health
        // Unauthenticated liveness probe reporting database connectivity.
        .route("/api/health", get(handlers::health))
        // POST /api/auth/login
        // Credential verification and session establishment. Sets the session
        // cookie and echoes the token in the body.
        .route("/api/auth/login", post(handlers::login))
        // POST /api/auth/logout
        // Clears the session cookie. Public so an expired session can still log out.
        .route("/api/auth/logout", post(handlers::logout))
        // POST /api/auth/register
        // Self-service registration; accounts land PENDING until approved.
        .route("/api/auth/register", post(handlers::register))
        // GET /api/departments, GET /api/classes
        // Read-only lookup data for the registration form's dropdowns. The
        // mutating verbs on these paths live in the authenticated router.
        .route("/api/departments", get(handlers::list_departments))
        .route("/api/classes", get(handlers::list_classes))
}
