use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to the ADMIN role: the account
/// approval queue. Nested under `/api/admin` behind the authentication layer;
/// every handler here additionally takes the `AdminUser` guard, so a
/// non-admin token that clears the outer layer still gets a JSON 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/users/pending
        // Registrations awaiting an approval decision, newest first.
        .route("/users/pending", get(handlers::pending_users))
        // POST /api/admin/users/approve
        // Resolves a pending registration ("approve" or "reject"). Approval
        // also notifies the account owner.
        .route("/users/approve", post(handlers::approve_user))
}
