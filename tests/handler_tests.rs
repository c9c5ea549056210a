//! End-to-end handler coverage through the full router: login and the approval
//! workflow, registration validation, attendance marking rules, dashboards and
//! the liveness probe.

mod common;

use attendance_portal::{
    auth::Role,
    create_router,
    models::{ApprovalStatus, Attendance, Student, Teacher},
};
use axum::http::{StatusCode, header};
use common::{
    MockRepository, approved_user, body_json, get_request, get_request_with_cookie, json_request,
    test_state, token_for,
};
use std::sync::Arc;
use tower::util::ServiceExt;

fn login_body(password: &str) -> serde_json::Value {
    serde_json::json!({ "email": "user@example.com", "password": password })
}

// --- Login & Approval ---

#[tokio::test]
async fn login_sets_cookie_and_returns_token() {
    let repo = Arc::new(MockRepository {
        user_by_email: Some(approved_user(Role::Teacher)),
        ..Default::default()
    });
    let app = create_router(test_state(repo));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            login_body("password123"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("login should set the session cookie")
        .to_string();
    assert!(set_cookie.starts_with("token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Path=/"));

    let body = body_json(response).await;
    assert_eq!(body["user"]["role"], "TEACHER");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    // The hash must never serialize.
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let repo = Arc::new(MockRepository {
        user_by_email: Some(approved_user(Role::Teacher)),
        ..Default::default()
    });
    let app = create_router(test_state(repo));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            login_body("wrong-password"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn login_rejects_unknown_email_with_same_message() {
    let app = create_router(test_state(Arc::new(MockRepository::default())));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            login_body("password123"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn login_blocks_pending_account() {
    let mut user = approved_user(Role::Student);
    user.status = ApprovalStatus::Pending;
    let repo = Arc::new(MockRepository {
        user_by_email: Some(user),
        ..Default::default()
    });
    let app = create_router(test_state(repo));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            login_body("password123"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Your account is pending approval");
}

#[tokio::test]
async fn pending_account_sees_approval_block_even_with_wrong_password() {
    // The approval check runs ahead of password verification.
    let mut user = approved_user(Role::Student);
    user.status = ApprovalStatus::Pending;
    let repo = Arc::new(MockRepository {
        user_by_email: Some(user),
        ..Default::default()
    });
    let app = create_router(test_state(repo));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            login_body("wrong-password"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Your account is pending approval");
}

#[tokio::test]
async fn login_blocks_rejected_account() {
    let mut user = approved_user(Role::Teacher);
    user.status = ApprovalStatus::Rejected;
    let repo = Arc::new(MockRepository {
        user_by_email: Some(user),
        ..Default::default()
    });
    let app = create_router(test_state(repo));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            login_body("password123"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Your account has been rejected");
}

#[tokio::test]
async fn pending_admin_may_still_log_in() {
    // Seeded admin rows can predate the approval column.
    let mut user = approved_user(Role::Admin);
    user.status = ApprovalStatus::Pending;
    let repo = Arc::new(MockRepository {
        user_by_email: Some(user.clone()),
        user_by_id: Some(user),
        ..Default::default()
    });
    let app = create_router(test_state(repo));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            login_body("password123"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn approval_resolves_user_and_notifies() {
    let mut pending = approved_user(Role::Student);
    pending.status = ApprovalStatus::Pending;
    let repo = Arc::new(MockRepository {
        user_by_id: Some(pending),
        ..Default::default()
    });
    let app = create_router(test_state(repo.clone()));
    let token = token_for(Role::Admin);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/admin/users/approve",
            Some(&token),
            serde_json::json!({ "user_id": 7, "action": "approve" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // One status write plus one notification write.
    assert_eq!(repo.mutations(), 2);
}

#[tokio::test]
async fn approval_rejects_unknown_action() {
    let app = create_router(test_state(Arc::new(MockRepository::default())));
    let token = token_for(Role::Admin);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/admin/users/approve",
            Some(&token),
            serde_json::json!({ "user_id": 7, "action": "promote" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// --- Registration ---

#[tokio::test]
async fn registration_collects_all_field_errors() {
    let repo = Arc::new(MockRepository::default());
    let app = create_router(test_state(repo.clone()));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            serde_json::json!({
                "email": "not-an-email",
                "password": "short",
                "full_name": "",
                "role": "STUDENT",
                "department": ""
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Validation failed");
    let details = body["details"].as_array().expect("field error list");
    assert!(details.len() >= 4);
    assert_eq!(repo.mutations(), 0);
}

#[tokio::test]
async fn registration_refuses_admin_role() {
    let app = create_router(test_state(Arc::new(MockRepository::default())));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            serde_json::json!({
                "email": "boss@example.com",
                "password": "password123",
                "full_name": "Wannabe Admin",
                "role": "ADMIN",
                "department": "CS"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn registration_creates_pending_student() {
    let repo = Arc::new(MockRepository::default());
    let app = create_router(test_state(repo.clone()));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            serde_json::json!({
                "email": "fresh@example.com",
                "password": "password123",
                "full_name": "Fresh Student",
                "role": "STUDENT",
                "department": "CS",
                "roll_no": "CS-101",
                "class": "CS-A"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["user"]["status"], "PENDING");
    assert_eq!(repo.mutations(), 1);
}

#[tokio::test]
async fn registration_conflicts_on_existing_email() {
    let repo = Arc::new(MockRepository {
        user_by_email: Some(approved_user(Role::Student)),
        ..Default::default()
    });
    let app = create_router(test_state(repo.clone()));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            serde_json::json!({
                "email": "user@example.com",
                "password": "password123",
                "full_name": "Duplicate",
                "role": "TEACHER",
                "department": "CS"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(repo.mutations(), 0);
}

// --- Attendance ---

fn teacher_repo() -> MockRepository {
    MockRepository {
        teacher: Some(Teacher {
            id: 3,
            user_id: 7,
            department: "CS".to_string(),
        }),
        ..Default::default()
    }
}

#[tokio::test]
async fn teacher_marks_attendance() {
    let repo = Arc::new(teacher_repo());
    let app = create_router(test_state(repo.clone()));
    let token = token_for(Role::Teacher);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/attendance",
            Some(&token),
            serde_json::json!({
                "student_id": 12,
                "date": "2026-08-28",
                "status": "PRESENT"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    // The mark is attributed to the caller's teacher row.
    assert_eq!(body["teacher_id"], 3);
    assert_eq!(repo.mutations(), 1);
}

#[tokio::test]
async fn duplicate_mark_for_same_date_is_rejected() {
    let mut repo = teacher_repo();
    repo.existing_attendance = Some(Attendance::default());
    let repo = Arc::new(repo);
    let app = create_router(test_state(repo.clone()));
    let token = token_for(Role::Teacher);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/attendance",
            Some(&token),
            serde_json::json!({
                "student_id": 12,
                "date": "2026-08-28",
                "status": "ABSENT"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Attendance already marked for this date");
    assert_eq!(repo.mutations(), 0);
}

#[tokio::test]
async fn admin_mark_is_attributed_to_first_teacher() {
    let repo = Arc::new(teacher_repo());
    let app = create_router(test_state(repo.clone()));
    let token = token_for(Role::Admin);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/attendance",
            Some(&token),
            serde_json::json!({
                "student_id": 12,
                "date": "2026-08-28",
                "status": "PRESENT"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["teacher_id"], 3);
}

#[tokio::test]
async fn admin_mark_fails_without_any_teacher() {
    let repo = Arc::new(MockRepository::default());
    let app = create_router(test_state(repo));
    let token = token_for(Role::Admin);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/attendance",
            Some(&token),
            serde_json::json!({
                "student_id": 12,
                "date": "2026-08-28",
                "status": "PRESENT"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_marking_reports_batch_size() {
    let repo = Arc::new(teacher_repo());
    let app = create_router(test_state(repo.clone()));
    let token = token_for(Role::Teacher);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/attendance/bulk",
            Some(&token),
            serde_json::json!({
                "date": "2026-08-28",
                "entries": [
                    { "student_id": 1, "status": "PRESENT" },
                    { "student_id": 2, "status": "ABSENT", "remarks": "sick" },
                    { "student_id": 3, "status": "PRESENT" }
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Attendance marked for 3 students");
    assert_eq!(repo.mutations(), 3);
}

// --- Dashboards, Profile & Health ---

#[tokio::test]
async fn student_dashboard_requires_a_student_profile() {
    let app = create_router(test_state(Arc::new(MockRepository::default())));
    let token = token_for(Role::Student);

    let response = app
        .oneshot(get_request_with_cookie("/api/dashboard/stats", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn student_dashboard_returns_percentage_shape() {
    let repo = Arc::new(MockRepository {
        student: Some(Student {
            id: 5,
            user_id: 7,
            roll_no: "CS-101".to_string(),
            class_name: "CS-A".to_string(),
            department: "CS".to_string(),
            status: "Active".to_string(),
        }),
        ..Default::default()
    });
    let app = create_router(test_state(repo));
    let token = token_for(Role::Student);

    let response = app
        .oneshot(get_request_with_cookie("/api/dashboard/stats", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body.get("attendance_percentage").is_some());
}

#[tokio::test]
async fn admin_dashboard_returns_counters() {
    let app = create_router(test_state(Arc::new(MockRepository::default())));
    let token = token_for(Role::Admin);

    let response = app
        .oneshot(get_request_with_cookie("/api/dashboard/stats", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body.get("pending_users").is_some());
}

#[tokio::test]
async fn me_returns_profile_with_role_record() {
    let repo = Arc::new(MockRepository {
        user_by_id: Some(approved_user(Role::Teacher)),
        teacher: Some(Teacher {
            id: 3,
            user_id: 7,
            department: "CS".to_string(),
        }),
        ..Default::default()
    });
    let app = create_router(test_state(repo));
    let token = token_for(Role::Teacher);

    let response = app
        .oneshot(get_request_with_cookie("/api/auth/me", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["role"], "TEACHER");
    assert_eq!(body["teacher"]["id"], 3);
    assert!(body["student"].is_null());
}

#[tokio::test]
async fn health_reports_database_state() {
    let app = create_router(test_state(Arc::new(MockRepository::default())));

    let response = app.oneshot(get_request("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let app = create_router(test_state(Arc::new(MockRepository::default())));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/logout",
            None,
            serde_json::json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // The removal cookie is sent even when the request carried no session
    // cookie, so a stale browser cookie cannot survive a logout.
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("logout should clear the cookie");
    assert!(set_cookie.starts_with("token="));
    assert!(set_cookie.contains("Max-Age=0"));
}
