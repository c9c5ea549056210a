use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repository;

// Module for routing segregation (Public, Authenticated, Admin, Pages).
pub mod routes;
use auth::AuthUser; // The resolved authenticated user identity.
use routes::{admin, authenticated, pages, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::AppConfig;
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the API surface.
/// It aggregates all handlers decorated with `#[utoipa::path]` and all schemas
/// deriving `utoipa::ToSchema`. The resulting JSON is served at
/// `/api-docs/openapi.json`; page routes are deliberately absent, they are not
/// part of the programmatic contract.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health, handlers::login, handlers::logout, handlers::register, handlers::me,
        handlers::pending_users, handlers::approve_user,
        handlers::list_departments, handlers::create_department,
        handlers::update_department, handlers::delete_department,
        handlers::list_classes, handlers::create_class,
        handlers::update_class, handlers::delete_class,
        handlers::list_students, handlers::get_student, handlers::create_student,
        handlers::update_student, handlers::delete_student,
        handlers::list_teachers, handlers::get_teacher, handlers::create_teacher,
        handlers::update_teacher, handlers::delete_teacher,
        handlers::list_attendance, handlers::mark_attendance, handlers::bulk_attendance,
        handlers::update_attendance, handlers::delete_attendance, handlers::my_attendance,
        handlers::dashboard_stats,
        handlers::list_notifications, handlers::mark_notification_read,
    ),
    components(
        schemas(
            models::Role, models::ApprovalStatus, models::AttendanceStatus,
            models::UserSummary, models::Department, models::ClassRoom,
            models::Student, models::StudentRecord, models::Teacher, models::TeacherRecord,
            models::Attendance, models::AttendanceRecord, models::Notification,
            models::LoginRequest, models::RegisterRequest, models::ApprovalRequest,
            models::CreateDepartmentRequest, models::UpdateDepartmentRequest,
            models::CreateClassRequest, models::UpdateClassRequest,
            models::CreateStudentRequest, models::UpdateStudentRequest,
            models::CreateTeacherRequest, models::UpdateTeacherRequest,
            models::MarkAttendanceRequest, models::BulkAttendanceRequest,
            models::BulkAttendanceEntry, models::UpdateAttendanceRequest,
            models::MessageResponse, models::LoginResponse, models::RegisterResponse,
            models::ProfileResponse, models::AdminStats, models::TeacherStats,
            models::StudentStats, models::HealthResponse,
        )
    ),
    tags(
        (name = "attendance-portal", description = "Role-Based Attendance Management API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all application
/// services and configuration, shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: abstracts database access via the PgPool connection.
    pub repo: RepositoryState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Allow handlers and extractors to selectively pull components from AppState.
// The auth extractors in particular depend on `AppConfig: FromRef<S>` for the
// signing secret.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the `authenticated_routes` and the nested admin
/// router.
///
/// *Mechanism*: it attempts to extract `AuthUser` from the request. Since
/// `AuthUser` implements `FromRequestParts`, if token extraction or
/// verification fails the request is rejected with a JSON 401 before any
/// handler executes. The resolved identity is stashed in request extensions so
/// downstream extractors reuse it instead of verifying twice.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and
/// scoped middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public API routes: no middleware applied.
        .merge(public::public_routes())
        // Authenticated API routes: rejected with JSON 401 without a valid token.
        // Role guards inside the handlers are the second authorization layer.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Admin API routes: nested under /api/admin behind the same
        // authentication layer; the AdminUser guard runs inside each handler.
        .nest(
            "/api/admin",
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Page routes: wrapped in the page gate, which answers every failure
        // with a redirect instead of JSON.
        .merge(
            pages::page_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), policy::page_gate)),
        )
        // Apply the unified state to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID generation: a unique UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: wraps the request/response lifecycle in a span
                // carrying the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS layer.
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes `TraceLayer` span creation: extracts the `x-request-id` header
/// and includes it in the structured logging metadata alongside the HTTP
/// method and URI, so every log line for a single request is correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
