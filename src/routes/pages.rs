use crate::{AppState, auth::AuthUser};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};

/// Pages Router Module
///
/// Browser-facing navigation routes. The entire router is wrapped in the page
/// gate middleware (applied in `create_router`), which handles every
/// authentication and role decision before a handler runs: handlers here only
/// ever see requests the gate has already allowed, with the verified identity
/// attached to request extensions.
///
/// The handlers serve minimal server-rendered shells; the interactive frontend
/// is a separate client consuming the `/api` surface.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        // Public pages. The gate bounces authenticated users to their dashboard.
        .route("/login", get(login_page))
        .route("/register", get(register_page))
        // Role-agnostic landing path: always admitted with a valid token, then
        // forwarded to the caller's role home.
        .route("/dashboard", get(dashboard_redirect))
        // Role-scoped dashboards. The gate's prefix policy guarantees the role
        // before these run.
        .route("/admin/dashboard", get(admin_dashboard))
        .route("/teacher/dashboard", get(teacher_dashboard))
        .route("/student/dashboard", get(student_dashboard))
        // Catch-alls for the rest of each protected prefix. Every subpath must
        // route through the gate so an unknown URL still redirects by token
        // state instead of falling through to a bare 404.
        .route("/admin", get(section_not_found))
        .route("/admin/{*path}", get(section_not_found))
        .route("/teacher", get(section_not_found))
        .route("/teacher/{*path}", get(section_not_found))
        .route("/student", get(section_not_found))
        .route("/student/{*path}", get(section_not_found))
        .route("/dashboard/{*path}", get(section_not_found))
}

/// 404s only after the gate has let the caller into the area.
async fn section_not_found() -> (StatusCode, Html<&'static str>) {
    (StatusCode::NOT_FOUND, Html("<h1>Page not found</h1>"))
}

async fn login_page() -> Html<&'static str> {
    Html(include_str!("../../pages/login.html"))
}

async fn register_page() -> Html<&'static str> {
    Html(include_str!("../../pages/register.html"))
}

/// The gate already verified the token and attached the identity; this handler
/// only picks the destination.
async fn dashboard_redirect(user: AuthUser) -> Response {
    Redirect::to(user.role.home()).into_response()
}

async fn admin_dashboard() -> Html<&'static str> {
    Html(include_str!("../../pages/admin_dashboard.html"))
}

async fn teacher_dashboard() -> Html<&'static str> {
    Html(include_str!("../../pages/teacher_dashboard.html"))
}

async fn student_dashboard() -> Html<&'static str> {
    Html(include_str!("../../pages/student_dashboard.html"))
}
