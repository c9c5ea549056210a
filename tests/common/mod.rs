use async_trait::async_trait;
use attendance_portal::{
    AppState,
    auth::Role,
    config::AppConfig,
    models::{
        AdminStats, ApprovalStatus, Attendance, AttendanceFilter, AttendanceRecord, ClassRoom,
        DateRangeFilter, Department, NewAttendance, NewUser, Notification, Student, StudentFilter,
        StudentProfile, StudentRecord, StudentStats, Teacher, TeacherFilter, TeacherRecord,
        TeacherStats, UpdateAttendanceRequest, UpdateClassRequest, UpdateDepartmentRequest,
        UpdateStudentRequest, UpdateTeacherRequest, User, UserSummary,
    },
    repository::Repository,
};
use axum::{
    body::Body,
    http::{Request, header},
    response::Response,
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
pub const TEST_USER_ID: i32 = 7;

/// MockRepository
///
/// In-memory stand-in for the Postgres repository. Fields preload the rows the
/// scenario needs; `mutation_count` observes every write so authorization
/// tests can assert a denied request touched nothing.
#[derive(Default)]
pub struct MockRepository {
    pub user_by_email: Option<User>,
    pub user_by_id: Option<User>,
    pub student: Option<Student>,
    pub teacher: Option<Teacher>,
    pub existing_attendance: Option<Attendance>,
    pub mutation_count: AtomicUsize,
}

impl MockRepository {
    pub fn mutations(&self) -> usize {
        self.mutation_count.load(Ordering::SeqCst)
    }

    fn record_mutation(&self) {
        self.mutation_count.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn get_user(&self, _id: i32) -> Option<User> {
        self.user_by_id.clone()
    }
    async fn get_user_by_email(&self, _email: &str) -> Option<User> {
        self.user_by_email.clone()
    }
    async fn register_user(&self, user: NewUser, _student: Option<StudentProfile>) -> Option<User> {
        self.record_mutation();
        Some(User {
            id: TEST_USER_ID,
            email: user.email,
            password_hash: user.password_hash,
            full_name: user.full_name,
            role: user.role,
            department: user.department,
            mobile: user.mobile,
            status: user.status,
            created_at: chrono::Utc::now(),
        })
    }
    async fn set_user_status(&self, _user_id: i32, status: ApprovalStatus) -> Option<User> {
        self.record_mutation();
        self.user_by_id.clone().map(|mut user| {
            user.status = status;
            user
        })
    }
    async fn pending_users(&self) -> Vec<UserSummary> {
        self.user_by_id
            .clone()
            .filter(|u| u.status == ApprovalStatus::Pending)
            .map(UserSummary::from)
            .into_iter()
            .collect()
    }
    async fn roll_no_exists(&self, _roll_no: &str) -> bool {
        false
    }

    async fn list_departments(&self) -> Vec<Department> {
        vec![]
    }
    async fn create_department(&self, name: &str, code: &str) -> Option<Department> {
        self.record_mutation();
        Some(Department {
            id: 1,
            name: name.to_string(),
            code: code.to_string(),
        })
    }
    async fn update_department(
        &self,
        _id: i32,
        _req: UpdateDepartmentRequest,
    ) -> Option<Department> {
        self.record_mutation();
        None
    }
    async fn delete_department(&self, _id: i32) -> bool {
        self.record_mutation();
        false
    }

    async fn list_classes(&self, _department: Option<String>) -> Vec<ClassRoom> {
        vec![]
    }
    async fn create_class(&self, name: &str, department: &str) -> Option<ClassRoom> {
        self.record_mutation();
        Some(ClassRoom {
            id: 1,
            name: name.to_string(),
            department: department.to_string(),
        })
    }
    async fn update_class(&self, _id: i32, _req: UpdateClassRequest) -> Option<ClassRoom> {
        self.record_mutation();
        None
    }
    async fn delete_class(&self, _id: i32) -> bool {
        self.record_mutation();
        false
    }

    async fn list_students(&self, _filter: StudentFilter) -> Vec<StudentRecord> {
        vec![]
    }
    async fn get_student(&self, _id: i32) -> Option<StudentRecord> {
        None
    }
    async fn get_student_by_user(&self, _user_id: i32) -> Option<Student> {
        self.student.clone()
    }
    async fn create_student(
        &self,
        _user: NewUser,
        _profile: StudentProfile,
    ) -> Option<StudentRecord> {
        self.record_mutation();
        Some(StudentRecord::default())
    }
    async fn update_student(&self, _id: i32, _req: UpdateStudentRequest) -> Option<StudentRecord> {
        self.record_mutation();
        None
    }
    async fn delete_student(&self, _id: i32) -> bool {
        self.record_mutation();
        false
    }

    async fn list_teachers(&self, _filter: TeacherFilter) -> Vec<TeacherRecord> {
        vec![]
    }
    async fn get_teacher(&self, _id: i32) -> Option<TeacherRecord> {
        None
    }
    async fn get_teacher_by_user(&self, _user_id: i32) -> Option<Teacher> {
        self.teacher.clone()
    }
    async fn first_teacher(&self) -> Option<Teacher> {
        self.teacher.clone()
    }
    async fn create_teacher(&self, _user: NewUser, _department: &str) -> Option<TeacherRecord> {
        self.record_mutation();
        Some(TeacherRecord::default())
    }
    async fn update_teacher(
        &self,
        _id: i32,
        _req: UpdateTeacherRequest,
        _password_hash: Option<String>,
    ) -> Option<TeacherRecord> {
        self.record_mutation();
        None
    }
    async fn delete_teacher(&self, _id: i32) -> bool {
        self.record_mutation();
        false
    }

    async fn list_attendance(&self, _filter: AttendanceFilter) -> Vec<AttendanceRecord> {
        vec![]
    }
    async fn find_attendance(&self, _student_id: i32, _date: NaiveDate) -> Option<Attendance> {
        self.existing_attendance.clone()
    }
    async fn mark_attendance(&self, record: NewAttendance) -> Option<AttendanceRecord> {
        self.record_mutation();
        Some(AttendanceRecord {
            id: 1,
            student_id: record.student_id,
            teacher_id: record.teacher_id,
            date: record.date,
            status: record.status,
            remarks: record.remarks,
            created_at: chrono::Utc::now(),
            ..Default::default()
        })
    }
    async fn upsert_attendance(&self, record: NewAttendance) -> Option<Attendance> {
        self.record_mutation();
        Some(Attendance {
            id: 1,
            student_id: record.student_id,
            teacher_id: record.teacher_id,
            date: record.date,
            status: record.status,
            remarks: record.remarks,
            created_at: chrono::Utc::now(),
        })
    }
    async fn update_attendance(
        &self,
        _id: i32,
        _req: UpdateAttendanceRequest,
    ) -> Option<AttendanceRecord> {
        self.record_mutation();
        None
    }
    async fn delete_attendance(&self, _id: i32) -> bool {
        self.record_mutation();
        false
    }
    async fn student_attendance(
        &self,
        _student_id: i32,
        _range: DateRangeFilter,
    ) -> Vec<AttendanceRecord> {
        vec![]
    }

    async fn admin_stats(&self) -> AdminStats {
        AdminStats::default()
    }
    async fn teacher_stats(&self, _teacher_id: i32) -> TeacherStats {
        TeacherStats::default()
    }
    async fn student_stats(&self, _student_id: i32) -> StudentStats {
        StudentStats::default()
    }

    async fn notifications_for(&self, _user_id: i32) -> Vec<Notification> {
        vec![]
    }
    async fn create_notification(&self, user_id: i32, message: &str) -> Option<Notification> {
        self.record_mutation();
        Some(Notification {
            id: 1,
            user_id,
            message: message.to_string(),
            read: false,
            created_at: chrono::Utc::now(),
        })
    }
    async fn mark_notification_read(&self, _id: i32, _user_id: i32) -> bool {
        self.record_mutation();
        false
    }

    async fn ping(&self) -> bool {
        true
    }
}

// --- Helper Functions ---

/// Builds an AppState around the mock with the test signing secret.
pub fn test_state(repo: Arc<MockRepository>) -> AppState {
    let mut config = AppConfig::default();
    config.jwt_secret = TEST_JWT_SECRET.to_string();
    AppState { repo, config }
}

/// A user row ready to log in: APPROVED, with `password123` behind the hash.
pub fn approved_user(role: Role) -> User {
    User {
        id: TEST_USER_ID,
        email: "user@example.com".to_string(),
        password_hash: bcrypt::hash("password123", 4).unwrap(),
        full_name: "Test User".to_string(),
        role,
        department: Some("CS".to_string()),
        mobile: None,
        status: ApprovalStatus::Approved,
        created_at: chrono::Utc::now(),
    }
}

/// A fresh, unexpired session token for the given role.
pub fn token_for(role: Role) -> String {
    attendance_portal::auth::issue_token(TEST_JWT_SECRET, TEST_USER_ID, "user@example.com", role)
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn get_request_with_cookie(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::COOKIE, format!("token={token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
