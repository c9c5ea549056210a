use crate::{
    AppState,
    auth::{self, AdminUser, AuthUser, Role, StudentUser, TeacherUser},
    config::Env,
    error::ApiError,
    models::{
        ApprovalRequest, ApprovalStatus, AttendanceFilter, AttendanceRecord, BulkAttendanceRequest,
        ClassRoom, CreateClassRequest, CreateDepartmentRequest, CreateStudentRequest,
        CreateTeacherRequest, DashboardStats, DateRangeFilter, Department, HealthResponse,
        LoginRequest, LoginResponse, MarkAttendanceRequest, MessageResponse, NewAttendance,
        NewUser, Notification, ProfileResponse, RegisterRequest, RegisterResponse, StudentFilter,
        StudentProfile, StudentRecord, TeacherFilter, TeacherRecord, UpdateAttendanceRequest,
        UpdateClassRequest, UpdateDepartmentRequest, UpdateStudentRequest, UpdateTeacherRequest,
        UserSummary,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

// --- Filter Structs ---

/// ClassFilter
///
/// Defines the accepted query parameters for the class listing endpoint.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct ClassFilter {
    /// Optional filter restricting classes to one department.
    pub department: Option<String>,
}

// --- Auth Handlers ---

fn session_cookie(token: String, env: &Env) -> Cookie<'static> {
    let mut cookie = Cookie::build((auth::SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::days(7))
        .build();
    if *env == Env::Production {
        cookie.set_secure(true);
    }
    cookie
}

/// login
///
/// [Public Route] Verifies credentials, enforces the approval workflow, and
/// establishes a session. The signed token travels both ways: set as an
/// HttpOnly cookie for browser navigation and echoed in the body for clients
/// that prefer the `Authorization: Bearer` header.
///
/// Failure modes are deliberately indistinguishable for unknown email and wrong
/// password (both 401 "Invalid credentials").
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account not approved")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let user = state
        .repo
        .get_user_by_email(&payload.email)
        .await
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    // Approval is checked ahead of the password: an unapproved account learns
    // its status, not whether the password happened to be right.
    let user = match user.status {
        ApprovalStatus::Approved => user,
        // Seeded or legacy admin rows may predate the approval column.
        ApprovalStatus::Pending if user.role == Role::Admin => state
            .repo
            .set_user_status(user.id, ApprovalStatus::Approved)
            .await
            .unwrap_or(user),
        ApprovalStatus::Pending => {
            return Err(ApiError::forbidden("Your account is pending approval"));
        }
        ApprovalStatus::Rejected => {
            return Err(ApiError::forbidden("Your account has been rejected"));
        }
    };

    let password_ok =
        bcrypt::verify(&payload.password, &user.password_hash).unwrap_or(false);
    if !password_ok {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = auth::issue_token(&state.config.jwt_secret, user.id, &user.email, user.role)
        .map_err(|e| {
            tracing::error!("token signing failed: {:?}", e);
            ApiError::internal("Login failed")
        })?;

    let jar = jar.add(session_cookie(token.clone(), &state.config.env));

    Ok((
        jar,
        Json(LoginResponse {
            message: "Login successful".to_string(),
            user: UserSummary::from(user),
            token,
        }),
    ))
}

/// logout
///
/// [Public Route] Clears the session cookie. Tokens are stateless, so a copy
/// the client retained stays valid until expiry; this only ends the browser
/// session.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    // Always emit the removal cookie; `jar.remove` only covers cookies the
    // request actually carried.
    let mut removal = Cookie::build((auth::SESSION_COOKIE, "")).path("/").build();
    removal.make_removal();
    let jar = jar.add(removal);
    (
        jar,
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    )
}

fn validate_registration(payload: &RegisterRequest) -> Vec<String> {
    let mut errors = Vec::new();

    if payload.email.is_empty() || !payload.email.contains('@') {
        errors.push("A valid email is required".to_string());
    }
    if payload.password.len() < 6 {
        errors.push("Password must be at least 6 characters".to_string());
    }
    if payload.full_name.trim().is_empty() {
        errors.push("Full name is required".to_string());
    }
    if payload.department.trim().is_empty() {
        errors.push("Department is required".to_string());
    }

    match payload.role.parse::<Role>() {
        Ok(Role::Student) => {
            if payload.roll_no.as_deref().unwrap_or("").trim().is_empty() {
                errors.push("Roll number is required for students".to_string());
            }
            if payload.class_name.as_deref().unwrap_or("").trim().is_empty() {
                errors.push("Class is required for students".to_string());
            }
        }
        Ok(Role::Teacher) => {}
        // Admin accounts are provisioned out of band, never self-registered.
        _ => errors.push("Role must be STUDENT or TEACHER".to_string()),
    }

    errors
}

/// register
///
/// [Public Route] Self-service registration for students and teachers. The new
/// account lands in PENDING status and cannot log in until an admin approves
/// it. Validation failures return the full list of field errors in `details`.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered, pending approval", body = RegisterResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email or roll number already taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let errors = validate_registration(&payload);
    if !errors.is_empty() {
        return Err(
            ApiError::bad_request("Validation failed").with_details(serde_json::json!(errors))
        );
    }
    // Safe after validation.
    let role = payload.role.parse::<Role>().unwrap_or_default();

    if state.repo.get_user_by_email(&payload.email).await.is_some() {
        return Err(ApiError::conflict("Email already registered"));
    }

    let profile = if role == Role::Student {
        let roll_no = payload.roll_no.clone().unwrap_or_default();
        if state.repo.roll_no_exists(&roll_no).await {
            return Err(ApiError::conflict("Roll number already registered"));
        }
        Some(StudentProfile {
            roll_no,
            class_name: payload.class_name.clone().unwrap_or_default(),
            department: payload.department.clone(),
        })
    } else {
        None
    };

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST).map_err(|e| {
        tracing::error!("password hashing failed: {:?}", e);
        ApiError::internal("Registration failed")
    })?;

    let user = state
        .repo
        .register_user(
            NewUser {
                email: payload.email,
                password_hash,
                full_name: payload.full_name,
                role,
                department: Some(payload.department),
                mobile: payload.mobile,
                status: ApprovalStatus::Pending,
            },
            profile,
        )
        .await
        .ok_or_else(|| ApiError::internal("Registration failed"))?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful. Your account is pending approval.".to_string(),
            user: UserSummary::from(user),
        }),
    ))
}

/// me
///
/// [Authenticated Route] Returns the caller's account plus the role-specific
/// sub-record (student or teacher row) when one exists.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current profile", body = ProfileResponse),
        (status = 404, description = "Account no longer exists")
    )
)]
pub async fn me(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let account = state
        .repo
        .get_user(user.id)
        .await
        .ok_or_else(|| ApiError::not_found("Account not found"))?;

    let (student, teacher) = match account.role {
        Role::Student => (state.repo.get_student_by_user(account.id).await, None),
        Role::Teacher => (None, state.repo.get_teacher_by_user(account.id).await),
        Role::Admin => (None, None),
    };

    Ok(Json(ProfileResponse {
        user: UserSummary::from(account),
        student,
        teacher,
    }))
}

// --- Approval Workflow (Admin) ---

/// pending_users
///
/// [Admin Route] Lists accounts awaiting approval, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/users/pending",
    responses((status = 200, description = "Pending accounts", body = [UserSummary]))
)]
pub async fn pending_users(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Json<Vec<UserSummary>> {
    Json(state.repo.pending_users().await)
}

/// approve_user
///
/// [Admin Route] Resolves a pending registration. Approval also drops a
/// notification for the account so the user learns they can log in.
#[utoipa::path(
    post,
    path = "/api/admin/users/approve",
    request_body = ApprovalRequest,
    responses(
        (status = 200, description = "Account resolved", body = MessageResponse),
        (status = 400, description = "Unknown action"),
        (status = 404, description = "User not found")
    )
)]
pub async fn approve_user(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<ApprovalRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let status = match payload.action.as_str() {
        "approve" => ApprovalStatus::Approved,
        "reject" => ApprovalStatus::Rejected,
        _ => return Err(ApiError::bad_request("Action must be 'approve' or 'reject'")),
    };

    let user = state
        .repo
        .set_user_status(payload.user_id, status)
        .await
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if status == ApprovalStatus::Approved {
        state
            .repo
            .create_notification(
                user.id,
                "Your account has been approved. You can now log in.",
            )
            .await;
    }

    Ok(Json(MessageResponse {
        message: format!("User {}", status.as_str().to_lowercase()),
    }))
}

// --- Departments ---

/// [Public Route] Lists all departments, used by the registration form.
#[utoipa::path(
    get,
    path = "/api/departments",
    responses((status = 200, description = "Departments", body = [Department]))
)]
pub async fn list_departments(State(state): State<AppState>) -> Json<Vec<Department>> {
    Json(state.repo.list_departments().await)
}

/// [Admin Route] Creates a department.
#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Created", body = Department),
        (status = 400, description = "Missing fields")
    )
)]
pub async fn create_department(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateDepartmentRequest>,
) -> Result<(StatusCode, Json<Department>), ApiError> {
    if payload.name.trim().is_empty() || payload.code.trim().is_empty() {
        return Err(ApiError::bad_request("Name and code are required"));
    }
    let department = state
        .repo
        .create_department(&payload.name, &payload.code)
        .await
        .ok_or_else(|| ApiError::conflict("Department already exists"))?;
    Ok((StatusCode::CREATED, Json(department)))
}

/// [Admin Route] Partially updates a department.
#[utoipa::path(
    put,
    path = "/api/departments/{id}",
    request_body = UpdateDepartmentRequest,
    responses(
        (status = 200, description = "Updated", body = Department),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_department(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateDepartmentRequest>,
) -> Result<Json<Department>, ApiError> {
    state
        .repo
        .update_department(id, payload)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Department not found"))
}

/// [Admin Route] Deletes a department.
#[utoipa::path(
    delete,
    path = "/api/departments/{id}",
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_department(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.repo.delete_department(id).await {
        return Err(ApiError::not_found("Department not found"));
    }
    Ok(Json(MessageResponse {
        message: "Department deleted".to_string(),
    }))
}

// --- Classes ---

/// [Public Route] Lists classes, optionally narrowed to one department.
#[utoipa::path(
    get,
    path = "/api/classes",
    params(ClassFilter),
    responses((status = 200, description = "Classes", body = [ClassRoom]))
)]
pub async fn list_classes(
    State(state): State<AppState>,
    Query(filter): Query<ClassFilter>,
) -> Json<Vec<ClassRoom>> {
    Json(state.repo.list_classes(filter.department).await)
}

/// [Admin Route] Creates a class within a department.
#[utoipa::path(
    post,
    path = "/api/classes",
    request_body = CreateClassRequest,
    responses(
        (status = 201, description = "Created", body = ClassRoom),
        (status = 400, description = "Missing fields")
    )
)]
pub async fn create_class(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateClassRequest>,
) -> Result<(StatusCode, Json<ClassRoom>), ApiError> {
    if payload.name.trim().is_empty() || payload.department.trim().is_empty() {
        return Err(ApiError::bad_request("Name and department are required"));
    }
    let class = state
        .repo
        .create_class(&payload.name, &payload.department)
        .await
        .ok_or_else(|| ApiError::conflict("Class already exists"))?;
    Ok((StatusCode::CREATED, Json(class)))
}

/// [Admin Route] Partially updates a class.
#[utoipa::path(
    put,
    path = "/api/classes/{id}",
    request_body = UpdateClassRequest,
    responses(
        (status = 200, description = "Updated", body = ClassRoom),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_class(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateClassRequest>,
) -> Result<Json<ClassRoom>, ApiError> {
    state
        .repo
        .update_class(id, payload)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Class not found"))
}

/// [Admin Route] Deletes a class.
#[utoipa::path(
    delete,
    path = "/api/classes/{id}",
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_class(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.repo.delete_class(id).await {
        return Err(ApiError::not_found("Class not found"));
    }
    Ok(Json(MessageResponse {
        message: "Class deleted".to_string(),
    }))
}

// --- Students ---

/// [Authenticated Route] Lists the student roster with optional search and filters.
#[utoipa::path(
    get,
    path = "/api/students",
    params(StudentFilter),
    responses((status = 200, description = "Students", body = [StudentRecord]))
)]
pub async fn list_students(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<StudentFilter>,
) -> Json<Vec<StudentRecord>> {
    Json(state.repo.list_students(filter).await)
}

/// [Authenticated Route] Fetches one student with joined user fields.
#[utoipa::path(
    get,
    path = "/api/students/{id}",
    responses(
        (status = 200, description = "Student", body = StudentRecord),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_student(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<StudentRecord>, ApiError> {
    state
        .repo
        .get_student(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Student not found"))
}

/// create_student
///
/// [Authenticated Route] Creates a student account directly, skipping the
/// approval queue: accounts created from inside the portal land APPROVED.
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudentRequest,
    responses(
        (status = 201, description = "Created", body = StudentRecord),
        (status = 409, description = "Email or roll number already taken")
    )
)]
pub async fn create_student(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<StudentRecord>), ApiError> {
    if state.repo.get_user_by_email(&payload.email).await.is_some() {
        return Err(ApiError::conflict("Email already registered"));
    }
    if state.repo.roll_no_exists(&payload.roll_no).await {
        return Err(ApiError::conflict("Roll number already registered"));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST).map_err(|e| {
        tracing::error!("password hashing failed: {:?}", e);
        ApiError::internal("Could not create student")
    })?;

    let student = state
        .repo
        .create_student(
            NewUser {
                email: payload.email,
                password_hash,
                full_name: payload.full_name,
                role: Role::Student,
                department: Some(payload.department.clone()),
                mobile: payload.mobile,
                status: ApprovalStatus::Approved,
            },
            StudentProfile {
                roll_no: payload.roll_no,
                class_name: payload.class_name,
                department: payload.department,
            },
        )
        .await
        .ok_or_else(|| ApiError::internal("Could not create student"))?;

    Ok((StatusCode::CREATED, Json(student)))
}

/// [Authenticated Route] Partially updates a student's profile and user fields.
#[utoipa::path(
    put,
    path = "/api/students/{id}",
    request_body = UpdateStudentRequest,
    responses(
        (status = 200, description = "Updated", body = StudentRecord),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_student(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateStudentRequest>,
) -> Result<Json<StudentRecord>, ApiError> {
    state
        .repo
        .update_student(id, payload)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Student not found"))
}

/// [Admin Route] Deletes a student account, attendance history included.
#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_student(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.repo.delete_student(id).await {
        return Err(ApiError::not_found("Student not found"));
    }
    Ok(Json(MessageResponse {
        message: "Student deleted".to_string(),
    }))
}

// --- Teachers ---

/// [Authenticated Route] Lists teachers with optional search and department filter.
#[utoipa::path(
    get,
    path = "/api/teachers",
    params(TeacherFilter),
    responses((status = 200, description = "Teachers", body = [TeacherRecord]))
)]
pub async fn list_teachers(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<TeacherFilter>,
) -> Json<Vec<TeacherRecord>> {
    Json(state.repo.list_teachers(filter).await)
}

/// [Authenticated Route] Fetches one teacher with joined user fields.
#[utoipa::path(
    get,
    path = "/api/teachers/{id}",
    responses(
        (status = 200, description = "Teacher", body = TeacherRecord),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_teacher(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TeacherRecord>, ApiError> {
    state
        .repo
        .get_teacher(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Teacher not found"))
}

/// [Admin Route] Creates a teacher account, pre-approved.
#[utoipa::path(
    post,
    path = "/api/teachers",
    request_body = CreateTeacherRequest,
    responses(
        (status = 201, description = "Created", body = TeacherRecord),
        (status = 409, description = "Email already taken")
    )
)]
pub async fn create_teacher(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateTeacherRequest>,
) -> Result<(StatusCode, Json<TeacherRecord>), ApiError> {
    if state.repo.get_user_by_email(&payload.email).await.is_some() {
        return Err(ApiError::conflict("Email already registered"));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST).map_err(|e| {
        tracing::error!("password hashing failed: {:?}", e);
        ApiError::internal("Could not create teacher")
    })?;

    let teacher = state
        .repo
        .create_teacher(
            NewUser {
                email: payload.email,
                password_hash,
                full_name: payload.full_name,
                role: Role::Teacher,
                department: Some(payload.department.clone()),
                mobile: payload.mobile,
                status: ApprovalStatus::Approved,
            },
            &payload.department,
        )
        .await
        .ok_or_else(|| ApiError::internal("Could not create teacher"))?;

    Ok((StatusCode::CREATED, Json(teacher)))
}

/// [Admin Route] Partially updates a teacher. A supplied password is re-hashed.
#[utoipa::path(
    put,
    path = "/api/teachers/{id}",
    request_body = UpdateTeacherRequest,
    responses(
        (status = 200, description = "Updated", body = TeacherRecord),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_teacher(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateTeacherRequest>,
) -> Result<Json<TeacherRecord>, ApiError> {
    let password_hash = match &payload.password {
        Some(password) => Some(bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| {
            tracing::error!("password hashing failed: {:?}", e);
            ApiError::internal("Could not update teacher")
        })?),
        None => None,
    };

    state
        .repo
        .update_teacher(id, payload, password_hash)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Teacher not found"))
}

/// [Admin Route] Deletes a teacher account.
#[utoipa::path(
    delete,
    path = "/api/teachers/{id}",
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_teacher(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.repo.delete_teacher(id).await {
        return Err(ApiError::not_found("Teacher not found"));
    }
    Ok(Json(MessageResponse {
        message: "Teacher deleted".to_string(),
    }))
}

// --- Attendance ---

/// Resolves which teacher row an attendance write is attributed to. Teachers
/// mark as themselves; admins fall back to the first teacher on record so the
/// row always has an attributable marker. The `TeacherUser` guard keeps
/// students out before this runs.
async fn resolve_marking_teacher(state: &AppState, user: &AuthUser) -> Result<i32, ApiError> {
    match user.role {
        Role::Admin => state
            .repo
            .first_teacher()
            .await
            .map(|t| t.id)
            .ok_or_else(|| {
                ApiError::bad_request("No teacher found to attribute attendance to")
            }),
        _ => state
            .repo
            .get_teacher_by_user(user.id)
            .await
            .map(|t| t.id)
            .ok_or_else(|| ApiError::not_found("Teacher profile not found")),
    }
}

/// [Authenticated Route] Lists attendance, filterable by date, student and class.
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceFilter),
    responses((status = 200, description = "Attendance records", body = [AttendanceRecord]))
)]
pub async fn list_attendance(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<AttendanceFilter>,
) -> Json<Vec<AttendanceRecord>> {
    Json(state.repo.list_attendance(filter).await)
}

/// mark_attendance
///
/// [Teacher/Admin Route] Marks one student on one date. A second mark for the
/// same (student, date) pair is rejected; corrections go through the update
/// endpoint instead.
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = MarkAttendanceRequest,
    responses(
        (status = 201, description = "Marked", body = AttendanceRecord),
        (status = 400, description = "Already marked for this date"),
        (status = 403, description = "Forbidden for students")
    )
)]
pub async fn mark_attendance(
    marker: TeacherUser,
    State(state): State<AppState>,
    Json(payload): Json<MarkAttendanceRequest>,
) -> Result<(StatusCode, Json<AttendanceRecord>), ApiError> {
    let teacher_id = resolve_marking_teacher(&state, &marker.0).await?;

    if state
        .repo
        .find_attendance(payload.student_id, payload.date)
        .await
        .is_some()
    {
        return Err(ApiError::bad_request(
            "Attendance already marked for this date",
        ));
    }

    let record = state
        .repo
        .mark_attendance(NewAttendance {
            student_id: payload.student_id,
            teacher_id,
            date: payload.date,
            status: payload.status,
            remarks: payload.remarks,
        })
        .await
        .ok_or_else(|| ApiError::internal("Could not mark attendance"))?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// bulk_attendance
///
/// [Teacher/Admin Route] Marks a whole class in one request. Unlike the single
/// endpoint, existing rows for the date are overwritten, so re-submitting a
/// corrected sheet just works.
#[utoipa::path(
    post,
    path = "/api/attendance/bulk",
    request_body = BulkAttendanceRequest,
    responses(
        (status = 200, description = "Batch processed", body = MessageResponse),
        (status = 403, description = "Forbidden for students")
    )
)]
pub async fn bulk_attendance(
    marker: TeacherUser,
    State(state): State<AppState>,
    Json(payload): Json<BulkAttendanceRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let teacher_id = resolve_marking_teacher(&state, &marker.0).await?;

    let mut marked = 0usize;
    for entry in payload.entries {
        let saved = state
            .repo
            .upsert_attendance(NewAttendance {
                student_id: entry.student_id,
                teacher_id,
                date: payload.date,
                status: entry.status,
                remarks: entry.remarks,
            })
            .await;
        if saved.is_some() {
            marked += 1;
        }
    }

    Ok(Json(MessageResponse {
        message: format!("Attendance marked for {marked} students"),
    }))
}

/// [Authenticated Route] Corrects an existing attendance record.
#[utoipa::path(
    put,
    path = "/api/attendance/{id}",
    request_body = UpdateAttendanceRequest,
    responses(
        (status = 200, description = "Updated", body = AttendanceRecord),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_attendance(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateAttendanceRequest>,
) -> Result<Json<AttendanceRecord>, ApiError> {
    state
        .repo
        .update_attendance(id, payload)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Attendance record not found"))
}

/// [Authenticated Route] Deletes an attendance record.
#[utoipa::path(
    delete,
    path = "/api/attendance/{id}",
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_attendance(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.repo.delete_attendance(id).await {
        return Err(ApiError::not_found("Attendance record not found"));
    }
    Ok(Json(MessageResponse {
        message: "Attendance record deleted".to_string(),
    }))
}

/// my_attendance
///
/// [Student Route] A student's own attendance history, optionally bounded by a
/// date range. The student id comes from the token, never from the query, so a
/// student cannot read another student's records.
#[utoipa::path(
    get,
    path = "/api/student/attendance",
    params(DateRangeFilter),
    responses(
        (status = 200, description = "Own attendance", body = [AttendanceRecord]),
        (status = 404, description = "Student profile not found")
    )
)]
pub async fn my_attendance(
    viewer: StudentUser,
    State(state): State<AppState>,
    Query(range): Query<DateRangeFilter>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError> {
    let student = state
        .repo
        .get_student_by_user(viewer.0.id)
        .await
        .ok_or_else(|| ApiError::not_found("Student profile not found"))?;

    Ok(Json(state.repo.student_attendance(student.id, range).await))
}

// --- Dashboards ---

/// dashboard_stats
///
/// [Authenticated Route] Role-dispatched dashboard payload. All three roles hit
/// the same endpoint; the shape of the response depends on who is asking.
#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    responses(
        (status = 200, description = "Stats for the caller's role"),
        (status = 404, description = "Role profile not found")
    )
)]
pub async fn dashboard_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, ApiError> {
    let stats = match user.role {
        Role::Admin => DashboardStats::Admin(state.repo.admin_stats().await),
        Role::Teacher => {
            let teacher = state
                .repo
                .get_teacher_by_user(user.id)
                .await
                .ok_or_else(|| ApiError::not_found("Teacher profile not found"))?;
            DashboardStats::Teacher(state.repo.teacher_stats(teacher.id).await)
        }
        Role::Student => {
            let student = state
                .repo
                .get_student_by_user(user.id)
                .await
                .ok_or_else(|| ApiError::not_found("Student profile not found"))?;
            DashboardStats::Student(state.repo.student_stats(student.id).await)
        }
    };
    Ok(Json(stats))
}

// --- Notifications ---

/// [Authenticated Route] Lists the caller's notifications, newest first.
#[utoipa::path(
    get,
    path = "/api/notifications",
    responses((status = 200, description = "Notifications", body = [Notification]))
)]
pub async fn list_notifications(
    user: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<Notification>> {
    Json(state.repo.notifications_for(user.id).await)
}

/// mark_notification_read
///
/// [Authenticated Route] Marks one of the caller's notifications as read. The
/// update is scoped to the caller's user id, so marking someone else's
/// notification reports 404 rather than leaking its existence.
#[utoipa::path(
    put,
    path = "/api/notifications/{id}/read",
    responses(
        (status = 200, description = "Marked read", body = MessageResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn mark_notification_read(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.repo.mark_notification_read(id, user.id).await {
        return Err(ApiError::not_found("Notification not found"));
    }
    Ok(Json(MessageResponse {
        message: "Notification marked as read".to_string(),
    }))
}

// --- Health ---

/// [Public Route] Liveness probe reporting database connectivity.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service health", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = if state.repo.ping().await {
        "connected"
    } else {
        "disconnected"
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        database: database.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
