use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Defines the API routes accessible to any caller holding a valid session
/// token. The router layer above this module enforces authentication up front;
/// role restrictions narrower than "any authenticated user" are enforced a
/// second time inside the handlers via the role guard extractors (`AdminUser`,
/// `TeacherUser`, `StudentUser`), so a route wired into the wrong module still
/// cannot leak a privileged operation.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/auth/me
        // The caller's account plus role-specific sub-record.
        .route("/api/auth/me", get(handlers::me))
        // --- Departments & Classes (mutations; listings are public) ---
        // Admin-only via the AdminUser guard.
        .route("/api/departments", post(handlers::create_department))
        .route(
            "/api/departments/{id}",
            put(handlers::update_department).delete(handlers::delete_department),
        )
        .route("/api/classes", post(handlers::create_class))
        .route(
            "/api/classes/{id}",
            put(handlers::update_class).delete(handlers::delete_class),
        )
        // --- Student Roster ---
        // Open to all authenticated roles except deletion, which takes the
        // AdminUser guard.
        .route(
            "/api/students",
            get(handlers::list_students).post(handlers::create_student),
        )
        .route(
            "/api/students/{id}",
            get(handlers::get_student)
                .put(handlers::update_student)
                .delete(handlers::delete_student),
        )
        // --- Teacher Roster ---
        .route(
            "/api/teachers",
            get(handlers::list_teachers).post(handlers::create_teacher),
        )
        .route(
            "/api/teachers/{id}",
            get(handlers::get_teacher)
                .put(handlers::update_teacher)
                .delete(handlers::delete_teacher),
        )
        // --- Attendance ---
        // POST rejects a second mark for the same (student, date); the bulk
        // endpoint overwrites instead.
        .route(
            "/api/attendance",
            get(handlers::list_attendance).post(handlers::mark_attendance),
        )
        .route("/api/attendance/bulk", post(handlers::bulk_attendance))
        .route(
            "/api/attendance/{id}",
            put(handlers::update_attendance).delete(handlers::delete_attendance),
        )
        // GET /api/student/attendance
        // A student's own history; identity comes from the token, not the query.
        .route("/api/student/attendance", get(handlers::my_attendance))
        // GET /api/dashboard/stats
        // Role-dispatched counters; one endpoint, three payload shapes.
        .route("/api/dashboard/stats", get(handlers::dashboard_stats))
        // --- Notification System ---
        .route("/api/notifications", get(handlers::list_notifications))
        .route(
            "/api/notifications/{id}/read",
            put(handlers::mark_notification_read),
        )
}
