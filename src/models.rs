use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

pub use crate::auth::Role;

// --- Enumerations (stored as TEXT) ---

/// ApprovalStatus
///
/// Lifecycle of a registered account. New registrations start PENDING; an admin
/// approval action transitions them to APPROVED or REJECTED. ADMIN accounts are
/// implicitly APPROVED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "PENDING",
            ApprovalStatus::Approved => "APPROVED",
            ApprovalStatus::Rejected => "REJECTED",
        }
    }
}

impl TryFrom<String> for ApprovalStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "PENDING" => Ok(ApprovalStatus::Pending),
            "APPROVED" => Ok(ApprovalStatus::Approved),
            "REJECTED" => Ok(ApprovalStatus::Rejected),
            other => Err(format!("unknown approval status: {other}")),
        }
    }
}

/// AttendanceStatus
///
/// Daily attendance marking for a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Absent => "ABSENT",
        }
    }
}

impl TryFrom<String> for AttendanceStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        // Tolerates lowercase values written by earlier tooling.
        match value.to_uppercase().as_str() {
            "PRESENT" => Ok(AttendanceStatus::Present),
            "ABSENT" => Ok(AttendanceStatus::Absent),
            other => Err(format!("unknown attendance status: {other}")),
        }
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Canonical identity record from the `users` table. The password hash never
/// serializes; response payloads use [`UserSummary`] instead.
#[derive(Debug, Clone, Serialize, FromRow, Default)]
pub struct User {
    pub id: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub department: Option<String>,
    pub mobile: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
}

/// UserSummary
///
/// The identity shape returned by the API: everything in `users` except the
/// password hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct UserSummary {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub department: Option<String>,
    pub mobile: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ApprovalStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            department: user.department,
            mobile: user.mobile,
            status: user.status,
            created_at: user.created_at,
        }
    }
}

/// NewUser
///
/// Internal insert payload for the `users` table. Built by handlers after
/// validation and password hashing; never deserialized from a request.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub department: Option<String>,
    pub mobile: Option<String>,
    pub status: ApprovalStatus,
}

/// StudentProfile
///
/// Internal insert payload for the `students` table, paired with a [`NewUser`]
/// when a student account is created.
#[derive(Debug, Clone)]
pub struct StudentProfile {
    pub roll_no: String,
    pub class_name: String,
    pub department: String,
}

/// NewAttendance
///
/// Internal insert payload for the `attendance` table.
#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub student_id: i32,
    pub teacher_id: i32,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub remarks: Option<String>,
}

/// Department record from the `departments` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Department {
    pub id: i32,
    pub name: String,
    pub code: String,
}

/// ClassRoom
///
/// A class record from the `classes` table. Named `ClassRoom` because `class`
/// collides with other tooling; the JSON field stays `class` where embedded.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ClassRoom {
    pub id: i32,
    pub name: String,
    pub department: String,
}

/// Student row from the `students` table (no user fields).
///
/// Maps SQL column "class" to Rust field "class_name"; `class` is unusable as a
/// field name on the TypeScript side.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Student {
    pub id: i32,
    pub user_id: i32,
    pub roll_no: String,
    #[serde(rename = "class")]
    #[sqlx(rename = "class")]
    pub class_name: String,
    pub department: String,
    pub status: String,
}

/// StudentRecord
///
/// A student enriched with the joined user fields, as returned by roster queries.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct StudentRecord {
    pub id: i32,
    pub user_id: i32,
    pub roll_no: String,
    #[serde(rename = "class")]
    #[sqlx(rename = "class")]
    pub class_name: String,
    pub department: String,
    pub status: String,
    pub full_name: String,
    pub email: String,
    pub mobile: Option<String>,
}

/// Teacher row from the `teachers` table (no user fields).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Teacher {
    pub id: i32,
    pub user_id: i32,
    pub department: String,
}

/// TeacherRecord
///
/// A teacher enriched with the joined user fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct TeacherRecord {
    pub id: i32,
    pub user_id: i32,
    pub department: String,
    pub full_name: String,
    pub email: String,
    pub mobile: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ApprovalStatus,
}

/// Attendance row from the `attendance` table. Unique on (student_id, date).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Attendance {
    pub id: i32,
    pub student_id: i32,
    pub teacher_id: i32,
    #[ts(type = "string")]
    pub date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: AttendanceStatus,
    pub remarks: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// AttendanceRecord
///
/// An attendance row enriched with student/teacher display fields. The joined
/// fields default to None when a query does not select them.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct AttendanceRecord {
    pub id: i32,
    pub student_id: i32,
    pub teacher_id: i32,
    #[ts(type = "string")]
    pub date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: AttendanceStatus,
    pub remarks: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub student_name: Option<String>,
    #[sqlx(default)]
    pub roll_no: Option<String>,
    #[sqlx(default)]
    pub teacher_name: Option<String>,
}

/// Notification record from the `notifications` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Notification {
    pub id: i32,
    pub user_id: i32,
    pub message: String,
    pub read: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// Input payload for POST /api/auth/login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// RegisterRequest
///
/// Input payload for the public registration endpoint. `role` arrives as a raw
/// string so validation can reject ADMIN self-registration with a field error
/// instead of a deserialization failure. Students must supply `roll_no` and
/// `class`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: String,
    pub department: String,
    pub mobile: Option<String>,
    pub roll_no: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
}

/// Input payload for the admin approval action. `action` is "approve" or "reject".
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ApprovalRequest {
    pub user_id: i32,
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateDepartmentRequest {
    pub name: String,
    pub code: String,
}

/// Partial update payload; only provided fields change.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateDepartmentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateClassRequest {
    pub name: String,
    pub department: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateClassRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

/// Accepted query parameters for the student roster listing.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams, Default)]
pub struct StudentFilter {
    pub search: Option<String>,
    pub department: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
}

/// Admin/teacher payload creating a pre-approved student account.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateStudentRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub roll_no: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub department: String,
    pub mobile: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateStudentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_no: Option<String>,
    #[serde(rename = "class", skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Accepted query parameters for the teacher listing.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams, Default)]
pub struct TeacherFilter {
    pub search: Option<String>,
    pub department: Option<String>,
}

/// Admin payload creating a pre-approved teacher account.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateTeacherRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub department: String,
    pub mobile: Option<String>,
}

/// Partial teacher update. A provided `password` is re-hashed before storage.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateTeacherRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApprovalStatus>,
}

/// Accepted query parameters for the attendance listing.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams, Default)]
pub struct AttendanceFilter {
    pub date: Option<NaiveDate>,
    pub student_id: Option<i32>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MarkAttendanceRequest {
    pub student_id: i32,
    #[ts(type = "string")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub remarks: Option<String>,
}

/// A dated batch of attendance entries. Existing (student, date) rows are
/// updated rather than duplicated.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BulkAttendanceRequest {
    #[ts(type = "string")]
    pub date: NaiveDate,
    pub entries: Vec<BulkAttendanceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BulkAttendanceEntry {
    pub student_id: i32,
    pub status: AttendanceStatus,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateAttendanceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AttendanceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Optional date range for a student's own attendance view.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams, Default)]
pub struct DateRangeFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

// --- Response Schemas (Output) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

/// Output of a successful login. The token also travels in the session cookie;
/// it is echoed in the body for programmatic clients using the Bearer header.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserSummary,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserSummary,
}

/// Output of GET /api/auth/me: the account plus its role-specific sub-record.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ProfileResponse {
    pub user: UserSummary,
    pub student: Option<Student>,
    pub teacher: Option<Teacher>,
}

/// Admin dashboard counters.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminStats {
    pub total_students: i64,
    pub total_teachers: i64,
    pub pending_users: i64,
    pub total_attendance: i64,
}

/// Teacher dashboard counters, scoped to the teacher's own marking activity.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TeacherStats {
    pub my_attendance: i64,
    pub today_attendance: i64,
    pub week_attendance: i64,
    pub recent_attendance: Vec<AttendanceRecord>,
}

/// Student dashboard counters over the student's own records.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct StudentStats {
    pub total_records: i64,
    pub present_records: i64,
    pub attendance_percentage: f64,
    pub recent_attendance: Vec<AttendanceRecord>,
}

/// DashboardStats
///
/// Role-dispatched stats payload for GET /api/dashboard/stats. Serialized
/// untagged: clients receive exactly the variant matching their role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(untagged)]
#[ts(export)]
pub enum DashboardStats {
    Admin(AdminStats),
    Teacher(TeacherStats),
    Student(StudentStats),
}

/// Output of the liveness probe.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub timestamp: String,
}
