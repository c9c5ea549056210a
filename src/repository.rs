use crate::models::{
    AdminStats, ApprovalStatus, Attendance, AttendanceFilter, AttendanceRecord, ClassRoom,
    DateRangeFilter, Department, NewAttendance, NewUser, Notification, Role, Student,
    StudentFilter, StudentProfile, StudentRecord, StudentStats, Teacher, TeacherFilter,
    TeacherRecord, TeacherStats, UpdateAttendanceRequest, UpdateClassRequest,
    UpdateDepartmentRequest, UpdateStudentRequest, UpdateTeacherRequest, User, UserSummary,
};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;

const STUDENT_RECORD_SELECT: &str = r#"
    SELECT s.id, s.user_id, s.roll_no, s.class, s.department, s.status,
           u.full_name, u.email, u.mobile
    FROM students s
    JOIN users u ON s.user_id = u.id
"#;

const TEACHER_RECORD_SELECT: &str = r#"
    SELECT t.id, t.user_id, t.department, u.full_name, u.email, u.mobile, u.status
    FROM teachers t
    JOIN users u ON t.user_id = u.id
"#;

const ATTENDANCE_RECORD_SELECT: &str = r#"
    SELECT a.id, a.student_id, a.teacher_id, a.date, a.status, a.remarks, a.created_at,
           su.full_name AS student_name, s.roll_no AS roll_no, tu.full_name AS teacher_name
    FROM attendance a
    JOIN students s ON a.student_id = s.id
    JOIN users su ON s.user_id = su.id
    JOIN teachers t ON a.teacher_id = t.id
    JOIN users tu ON t.user_id = tu.id
"#;

/// Repository Trait
///
/// Abstract contract for all persistence operations. Handlers interact with the
/// data layer only through this trait, so tests can substitute a mock and the
/// auth gate never touches the database at all.
///
/// **Send + Sync + async_trait** are required so the trait object
/// (`Arc<dyn Repository>`) is shareable across request task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users & Approval ---
    async fn get_user(&self, id: i32) -> Option<User>;
    async fn get_user_by_email(&self, email: &str) -> Option<User>;
    /// Creates the user plus its role-specific row in one transaction.
    /// Students require a profile; the whole registration rolls back on any failure.
    async fn register_user(&self, user: NewUser, student: Option<StudentProfile>) -> Option<User>;
    /// Admin approval action: PENDING -> APPROVED | REJECTED.
    async fn set_user_status(&self, user_id: i32, status: ApprovalStatus) -> Option<User>;
    async fn pending_users(&self) -> Vec<UserSummary>;
    async fn roll_no_exists(&self, roll_no: &str) -> bool;

    // --- Departments ---
    async fn list_departments(&self) -> Vec<Department>;
    async fn create_department(&self, name: &str, code: &str) -> Option<Department>;
    async fn update_department(&self, id: i32, req: UpdateDepartmentRequest) -> Option<Department>;
    async fn delete_department(&self, id: i32) -> bool;

    // --- Classes ---
    async fn list_classes(&self, department: Option<String>) -> Vec<ClassRoom>;
    async fn create_class(&self, name: &str, department: &str) -> Option<ClassRoom>;
    async fn update_class(&self, id: i32, req: UpdateClassRequest) -> Option<ClassRoom>;
    async fn delete_class(&self, id: i32) -> bool;

    // --- Students ---
    async fn list_students(&self, filter: StudentFilter) -> Vec<StudentRecord>;
    async fn get_student(&self, id: i32) -> Option<StudentRecord>;
    async fn get_student_by_user(&self, user_id: i32) -> Option<Student>;
    /// Creates a pre-approved user plus student row in one transaction.
    async fn create_student(&self, user: NewUser, profile: StudentProfile)
    -> Option<StudentRecord>;
    async fn update_student(&self, id: i32, req: UpdateStudentRequest) -> Option<StudentRecord>;
    /// Deletes the backing user; the student row goes with it via cascade.
    async fn delete_student(&self, id: i32) -> bool;

    // --- Teachers ---
    async fn list_teachers(&self, filter: TeacherFilter) -> Vec<TeacherRecord>;
    async fn get_teacher(&self, id: i32) -> Option<TeacherRecord>;
    async fn get_teacher_by_user(&self, user_id: i32) -> Option<Teacher>;
    /// Fallback teacher used when an admin marks attendance directly.
    async fn first_teacher(&self) -> Option<Teacher>;
    async fn create_teacher(&self, user: NewUser, department: &str) -> Option<TeacherRecord>;
    /// `password_hash` is already hashed by the caller when a new password was supplied.
    async fn update_teacher(
        &self,
        id: i32,
        req: UpdateTeacherRequest,
        password_hash: Option<String>,
    ) -> Option<TeacherRecord>;
    async fn delete_teacher(&self, id: i32) -> bool;

    // --- Attendance ---
    async fn list_attendance(&self, filter: AttendanceFilter) -> Vec<AttendanceRecord>;
    async fn find_attendance(&self, student_id: i32, date: NaiveDate) -> Option<Attendance>;
    async fn mark_attendance(&self, record: NewAttendance) -> Option<AttendanceRecord>;
    /// Insert-or-update on the (student_id, date) unique key, used by bulk marking.
    async fn upsert_attendance(&self, record: NewAttendance) -> Option<Attendance>;
    async fn update_attendance(
        &self,
        id: i32,
        req: UpdateAttendanceRequest,
    ) -> Option<AttendanceRecord>;
    async fn delete_attendance(&self, id: i32) -> bool;
    async fn student_attendance(
        &self,
        student_id: i32,
        range: DateRangeFilter,
    ) -> Vec<AttendanceRecord>;

    // --- Dashboards ---
    async fn admin_stats(&self) -> AdminStats;
    async fn teacher_stats(&self, teacher_id: i32) -> TeacherStats;
    async fn student_stats(&self, student_id: i32) -> StudentStats;

    // --- Notifications ---
    async fn notifications_for(&self, user_id: i32) -> Vec<Notification>;
    async fn create_notification(&self, user_id: i32, message: &str) -> Option<Notification>;
    /// Ownership-checked: only the recipient may mark their notification read.
    async fn mark_notification_read(&self, id: i32, user_id: i32) -> bool;

    // --- Health ---
    async fn ping(&self) -> bool;
}

/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: i32) -> Option<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
    }

    async fn get_user_by_email(&self, email: &str) -> Option<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user_by_email error: {:?}", e);
                None
            })
    }

    /// register_user
    ///
    /// Inserts the user row and the role-specific row inside one transaction so a
    /// half-created account can never be observed.
    async fn register_user(&self, user: NewUser, student: Option<StudentProfile>) -> Option<User> {
        let mut tx = match self.pool.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                tracing::error!("register_user begin error: {:?}", e);
                return None;
            }
        };

        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, full_name, role, department, mobile, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            RETURNING *
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(&user.department)
        .bind(&user.mobile)
        .bind(user.status.as_str())
        .fetch_one(&mut *tx)
        .await;

        let created = match created {
            Ok(u) => u,
            Err(e) => {
                tracing::error!("register_user insert error: {:?}", e);
                return None;
            }
        };

        let role_row = match (user.role, student) {
            (Role::Student, Some(profile)) => sqlx::query(
                "INSERT INTO students (user_id, roll_no, class, department, status) VALUES ($1, $2, $3, $4, 'Active')",
            )
            .bind(created.id)
            .bind(&profile.roll_no)
            .bind(&profile.class_name)
            .bind(&profile.department)
            .execute(&mut *tx)
            .await
            .map(|_| ()),
            (Role::Student, None) => {
                tracing::error!("register_user: student registration without profile");
                return None;
            }
            (Role::Teacher, _) => sqlx::query(
                "INSERT INTO teachers (user_id, department) VALUES ($1, $2)",
            )
            .bind(created.id)
            .bind(user.department.as_deref().unwrap_or_default())
            .execute(&mut *tx)
            .await
            .map(|_| ()),
            (Role::Admin, _) => Ok(()),
        };

        if let Err(e) = role_row {
            tracing::error!("register_user role row error: {:?}", e);
            return None;
        }

        match tx.commit().await {
            Ok(()) => Some(created),
            Err(e) => {
                tracing::error!("register_user commit error: {:?}", e);
                None
            }
        }
    }

    async fn set_user_status(&self, user_id: i32, status: ApprovalStatus) -> Option<User> {
        sqlx::query_as::<_, User>("UPDATE users SET status = $1 WHERE id = $2 RETURNING *")
            .bind(status.as_str())
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("set_user_status error: {:?}", e);
                None
            })
    }

    async fn pending_users(&self) -> Vec<UserSummary> {
        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, email, full_name, role, department, mobile, status, created_at
            FROM users WHERE status = 'PENDING' ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("pending_users error: {:?}", e);
            vec![]
        })
    }

    async fn roll_no_exists(&self, roll_no: &str) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students WHERE roll_no = $1")
            .bind(roll_no)
            .fetch_one(&self.pool)
            .await
            .map(|count| count > 0)
            .unwrap_or_else(|e| {
                tracing::error!("roll_no_exists error: {:?}", e);
                false
            })
    }

    // --- DEPARTMENTS ---

    async fn list_departments(&self) -> Vec<Department> {
        sqlx::query_as::<_, Department>("SELECT id, name, code FROM departments ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("list_departments error: {:?}", e);
                vec![]
            })
    }

    async fn create_department(&self, name: &str, code: &str) -> Option<Department> {
        sqlx::query_as::<_, Department>(
            "INSERT INTO departments (name, code) VALUES ($1, $2) RETURNING id, name, code",
        )
        .bind(name)
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_department error: {:?}", e);
            None
        })
    }

    /// Uses COALESCE so only provided fields change.
    async fn update_department(&self, id: i32, req: UpdateDepartmentRequest) -> Option<Department> {
        sqlx::query_as::<_, Department>(
            r#"
            UPDATE departments SET name = COALESCE($2, name), code = COALESCE($3, code)
            WHERE id = $1 RETURNING id, name, code
            "#,
        )
        .bind(id)
        .bind(req.name)
        .bind(req.code)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_department error: {:?}", e);
            None
        })
    }

    async fn delete_department(&self, id: i32) -> bool {
        match sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_department error: {:?}", e);
                false
            }
        }
    }

    // --- CLASSES ---

    async fn list_classes(&self, department: Option<String>) -> Vec<ClassRoom> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT id, name, department FROM classes");
        if let Some(dept) = department {
            builder.push(" WHERE department = ");
            builder.push_bind(dept);
        }
        builder.push(" ORDER BY name ASC");

        builder
            .build_query_as::<ClassRoom>()
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("list_classes error: {:?}", e);
                vec![]
            })
    }

    async fn create_class(&self, name: &str, department: &str) -> Option<ClassRoom> {
        sqlx::query_as::<_, ClassRoom>(
            "INSERT INTO classes (name, department) VALUES ($1, $2) RETURNING id, name, department",
        )
        .bind(name)
        .bind(department)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_class error: {:?}", e);
            None
        })
    }

    async fn update_class(&self, id: i32, req: UpdateClassRequest) -> Option<ClassRoom> {
        sqlx::query_as::<_, ClassRoom>(
            r#"
            UPDATE classes SET name = COALESCE($2, name), department = COALESCE($3, department)
            WHERE id = $1 RETURNING id, name, department
            "#,
        )
        .bind(id)
        .bind(req.name)
        .bind(req.department)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_class error: {:?}", e);
            None
        })
    }

    async fn delete_class(&self, id: i32) -> bool {
        match sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_class error: {:?}", e);
                false
            }
        }
    }

    // --- STUDENTS ---

    /// list_students
    ///
    /// Roster listing with optional search (name or roll number, case-insensitive)
    /// and department/class filters. QueryBuilder keeps every user-supplied value
    /// parameterized.
    async fn list_students(&self, filter: StudentFilter) -> Vec<StudentRecord> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(STUDENT_RECORD_SELECT);
        builder.push(" WHERE TRUE");

        if let Some(search) = filter.search.filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            builder.push(" AND (u.full_name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR s.roll_no ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }
        if let Some(dept) = filter.department.filter(|d| !d.is_empty()) {
            builder.push(" AND s.department = ");
            builder.push_bind(dept);
        }
        if let Some(class_name) = filter.class_name.filter(|c| !c.is_empty()) {
            builder.push(" AND s.class = ");
            builder.push_bind(class_name);
        }
        builder.push(" ORDER BY s.roll_no ASC");

        builder
            .build_query_as::<StudentRecord>()
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("list_students error: {:?}", e);
                vec![]
            })
    }

    async fn get_student(&self, id: i32) -> Option<StudentRecord> {
        let query = format!("{STUDENT_RECORD_SELECT} WHERE s.id = $1");
        sqlx::query_as::<_, StudentRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_student error: {:?}", e);
                None
            })
    }

    async fn get_student_by_user(&self, user_id: i32) -> Option<Student> {
        sqlx::query_as::<_, Student>(
            "SELECT id, user_id, roll_no, class, department, status FROM students WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_student_by_user error: {:?}", e);
            None
        })
    }

    async fn create_student(
        &self,
        user: NewUser,
        profile: StudentProfile,
    ) -> Option<StudentRecord> {
        let created = self.register_user(user, Some(profile)).await?;
        let query = format!("{STUDENT_RECORD_SELECT} WHERE s.user_id = $1");
        sqlx::query_as::<_, StudentRecord>(&query)
            .bind(created.id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("create_student reselect error: {:?}", e);
                None
            })
    }

    /// update_student
    ///
    /// Student rows span two tables (students + users); both updates run in one
    /// transaction with COALESCE partial-update semantics.
    async fn update_student(&self, id: i32, req: UpdateStudentRequest) -> Option<StudentRecord> {
        let mut tx = match self.pool.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                tracing::error!("update_student begin error: {:?}", e);
                return None;
            }
        };

        let updated = sqlx::query(
            r#"
            UPDATE students
            SET roll_no = COALESCE($2, roll_no),
                class = COALESCE($3, class),
                department = COALESCE($4, department),
                status = COALESCE($5, status)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&req.roll_no)
        .bind(&req.class_name)
        .bind(&req.department)
        .bind(&req.status)
        .execute(&mut *tx)
        .await;

        match updated {
            Ok(res) if res.rows_affected() > 0 => {}
            Ok(_) => return None,
            Err(e) => {
                tracing::error!("update_student error: {:?}", e);
                return None;
            }
        }

        let user_update = sqlx::query(
            r#"
            UPDATE users
            SET full_name = COALESCE($2, full_name),
                department = COALESCE($3, department),
                mobile = COALESCE($4, mobile)
            WHERE id = (SELECT user_id FROM students WHERE id = $1)
            "#,
        )
        .bind(id)
        .bind(&req.full_name)
        .bind(&req.department)
        .bind(&req.mobile)
        .execute(&mut *tx)
        .await;

        if let Err(e) = user_update {
            tracing::error!("update_student user error: {:?}", e);
            return None;
        }

        if let Err(e) = tx.commit().await {
            tracing::error!("update_student commit error: {:?}", e);
            return None;
        }

        self.get_student(id).await
    }

    async fn delete_student(&self, id: i32) -> bool {
        // Deleting the user cascades to the student row.
        match sqlx::query("DELETE FROM users WHERE id = (SELECT user_id FROM students WHERE id = $1)")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_student error: {:?}", e);
                false
            }
        }
    }

    // --- TEACHERS ---

    async fn list_teachers(&self, filter: TeacherFilter) -> Vec<TeacherRecord> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(TEACHER_RECORD_SELECT);
        builder.push(" WHERE TRUE");

        if let Some(search) = filter.search.filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            builder.push(" AND (u.full_name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR u.email ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }
        if let Some(dept) = filter.department.filter(|d| !d.is_empty()) {
            builder.push(" AND t.department = ");
            builder.push_bind(dept);
        }
        builder.push(" ORDER BY t.id DESC");

        builder
            .build_query_as::<TeacherRecord>()
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("list_teachers error: {:?}", e);
                vec![]
            })
    }

    async fn get_teacher(&self, id: i32) -> Option<TeacherRecord> {
        let query = format!("{TEACHER_RECORD_SELECT} WHERE t.id = $1");
        sqlx::query_as::<_, TeacherRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_teacher error: {:?}", e);
                None
            })
    }

    async fn get_teacher_by_user(&self, user_id: i32) -> Option<Teacher> {
        sqlx::query_as::<_, Teacher>(
            "SELECT id, user_id, department FROM teachers WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_teacher_by_user error: {:?}", e);
            None
        })
    }

    async fn first_teacher(&self) -> Option<Teacher> {
        sqlx::query_as::<_, Teacher>(
            "SELECT id, user_id, department FROM teachers ORDER BY id ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("first_teacher error: {:?}", e);
            None
        })
    }

    async fn create_teacher(&self, user: NewUser, department: &str) -> Option<TeacherRecord> {
        let user = NewUser {
            department: Some(department.to_string()),
            ..user
        };
        let created = self.register_user(user, None).await?;
        let query = format!("{TEACHER_RECORD_SELECT} WHERE t.user_id = $1");
        sqlx::query_as::<_, TeacherRecord>(&query)
            .bind(created.id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("create_teacher reselect error: {:?}", e);
                None
            })
    }

    async fn update_teacher(
        &self,
        id: i32,
        req: UpdateTeacherRequest,
        password_hash: Option<String>,
    ) -> Option<TeacherRecord> {
        let mut tx = match self.pool.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                tracing::error!("update_teacher begin error: {:?}", e);
                return None;
            }
        };

        let user_update = sqlx::query(
            r#"
            UPDATE users
            SET full_name = COALESCE($2, full_name),
                department = COALESCE($3, department),
                mobile = COALESCE($4, mobile),
                status = COALESCE($5, status),
                password_hash = COALESCE($6, password_hash)
            WHERE id = (SELECT user_id FROM teachers WHERE id = $1)
            "#,
        )
        .bind(id)
        .bind(&req.full_name)
        .bind(&req.department)
        .bind(&req.mobile)
        .bind(req.status.map(|s| s.as_str()))
        .bind(&password_hash)
        .execute(&mut *tx)
        .await;

        match user_update {
            Ok(res) if res.rows_affected() > 0 => {}
            Ok(_) => return None,
            Err(e) => {
                tracing::error!("update_teacher user error: {:?}", e);
                return None;
            }
        }

        if let Some(dept) = &req.department {
            let teacher_update = sqlx::query("UPDATE teachers SET department = $2 WHERE id = $1")
                .bind(id)
                .bind(dept)
                .execute(&mut *tx)
                .await;
            if let Err(e) = teacher_update {
                tracing::error!("update_teacher dept error: {:?}", e);
                return None;
            }
        }

        if let Err(e) = tx.commit().await {
            tracing::error!("update_teacher commit error: {:?}", e);
            return None;
        }

        self.get_teacher(id).await
    }

    async fn delete_teacher(&self, id: i32) -> bool {
        // Deleting the user cascades to the teacher row.
        match sqlx::query("DELETE FROM users WHERE id = (SELECT user_id FROM teachers WHERE id = $1)")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_teacher error: {:?}", e);
                false
            }
        }
    }

    // --- ATTENDANCE ---

    async fn list_attendance(&self, filter: AttendanceFilter) -> Vec<AttendanceRecord> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(ATTENDANCE_RECORD_SELECT);
        builder.push(" WHERE TRUE");

        if let Some(date) = filter.date {
            builder.push(" AND a.date = ");
            builder.push_bind(date);
        }
        if let Some(student_id) = filter.student_id {
            builder.push(" AND a.student_id = ");
            builder.push_bind(student_id);
        }
        if let Some(class_name) = filter.class_name.filter(|c| !c.is_empty()) {
            builder.push(" AND s.class = ");
            builder.push_bind(class_name);
        }
        builder.push(" ORDER BY a.date DESC");

        builder
            .build_query_as::<AttendanceRecord>()
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("list_attendance error: {:?}", e);
                vec![]
            })
    }

    async fn find_attendance(&self, student_id: i32, date: NaiveDate) -> Option<Attendance> {
        sqlx::query_as::<_, Attendance>(
            "SELECT * FROM attendance WHERE student_id = $1 AND date = $2",
        )
        .bind(student_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("find_attendance error: {:?}", e);
            None
        })
    }

    async fn mark_attendance(&self, record: NewAttendance) -> Option<AttendanceRecord> {
        let inserted = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO attendance (student_id, teacher_id, date, status, remarks, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id
            "#,
        )
        .bind(record.student_id)
        .bind(record.teacher_id)
        .bind(record.date)
        .bind(record.status.as_str())
        .bind(&record.remarks)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("mark_attendance error: {:?}", e);
            None
        })?;

        let query = format!("{ATTENDANCE_RECORD_SELECT} WHERE a.id = $1");
        sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(inserted)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("mark_attendance reselect error: {:?}", e);
                None
            })
    }

    async fn upsert_attendance(&self, record: NewAttendance) -> Option<Attendance> {
        sqlx::query_as::<_, Attendance>(
            r#"
            INSERT INTO attendance (student_id, teacher_id, date, status, remarks, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (student_id, date)
            DO UPDATE SET status = EXCLUDED.status, remarks = EXCLUDED.remarks
            RETURNING *
            "#,
        )
        .bind(record.student_id)
        .bind(record.teacher_id)
        .bind(record.date)
        .bind(record.status.as_str())
        .bind(&record.remarks)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("upsert_attendance error: {:?}", e);
            None
        })
    }

    async fn update_attendance(
        &self,
        id: i32,
        req: UpdateAttendanceRequest,
    ) -> Option<AttendanceRecord> {
        let updated = sqlx::query(
            r#"
            UPDATE attendance
            SET status = COALESCE($2, status), remarks = COALESCE($3, remarks)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(req.status.map(|s| s.as_str()))
        .bind(&req.remarks)
        .execute(&self.pool)
        .await;

        match updated {
            Ok(res) if res.rows_affected() > 0 => {
                let query = format!("{ATTENDANCE_RECORD_SELECT} WHERE a.id = $1");
                sqlx::query_as::<_, AttendanceRecord>(&query)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::error!("update_attendance reselect error: {:?}", e);
                        None
                    })
            }
            Ok(_) => None,
            Err(e) => {
                tracing::error!("update_attendance error: {:?}", e);
                None
            }
        }
    }

    async fn delete_attendance(&self, id: i32) -> bool {
        match sqlx::query("DELETE FROM attendance WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_attendance error: {:?}", e);
                false
            }
        }
    }

    async fn student_attendance(
        &self,
        student_id: i32,
        range: DateRangeFilter,
    ) -> Vec<AttendanceRecord> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(ATTENDANCE_RECORD_SELECT);
        builder.push(" WHERE a.student_id = ");
        builder.push_bind(student_id);

        if let (Some(start), Some(end)) = (range.start_date, range.end_date) {
            builder.push(" AND a.date >= ");
            builder.push_bind(start);
            builder.push(" AND a.date <= ");
            builder.push_bind(end);
        }
        builder.push(" ORDER BY a.date DESC");

        builder
            .build_query_as::<AttendanceRecord>()
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("student_attendance error: {:?}", e);
                vec![]
            })
    }

    // --- DASHBOARDS ---

    /// Compiles all counters for the admin dashboard in a single call.
    async fn admin_stats(&self) -> AdminStats {
        let count = |sql: &'static str| async move {
            sqlx::query_scalar::<_, i64>(sql)
                .fetch_one(&self.pool)
                .await
                .unwrap_or_else(|e| {
                    tracing::error!("admin_stats error: {:?}", e);
                    0
                })
        };

        AdminStats {
            total_students: count("SELECT COUNT(*) FROM students").await,
            total_teachers: count("SELECT COUNT(*) FROM teachers").await,
            pending_users: count("SELECT COUNT(*) FROM users WHERE status = 'PENDING'").await,
            total_attendance: count("SELECT COUNT(*) FROM attendance").await,
        }
    }

    async fn teacher_stats(&self, teacher_id: i32) -> TeacherStats {
        let today = Utc::now().date_naive();
        // Week starts on Sunday, matching the dashboard's expectations.
        let week_start =
            today - chrono::Duration::days(today.weekday().num_days_from_sunday() as i64);

        let count_since = |date: Option<NaiveDate>| async move {
            let mut builder: QueryBuilder<sqlx::Postgres> =
                QueryBuilder::new("SELECT COUNT(*) FROM attendance WHERE teacher_id = ");
            builder.push_bind(teacher_id);
            if let Some(date) = date {
                builder.push(" AND date >= ");
                builder.push_bind(date);
            }
            builder
                .build_query_scalar::<i64>()
                .fetch_one(&self.pool)
                .await
                .unwrap_or_else(|e| {
                    tracing::error!("teacher_stats error: {:?}", e);
                    0
                })
        };

        let recent_query =
            format!("{ATTENDANCE_RECORD_SELECT} WHERE a.teacher_id = $1 ORDER BY a.date DESC LIMIT 5");
        let recent = sqlx::query_as::<_, AttendanceRecord>(&recent_query)
            .bind(teacher_id)
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("teacher_stats recent error: {:?}", e);
                vec![]
            });

        TeacherStats {
            my_attendance: count_since(None).await,
            today_attendance: count_since(Some(today)).await,
            week_attendance: count_since(Some(week_start)).await,
            recent_attendance: recent,
        }
    }

    async fn student_stats(&self, student_id: i32) -> StudentStats {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attendance WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("student_stats error: {:?}", e);
            0
        });

        let present = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attendance WHERE student_id = $1 AND status = 'PRESENT'",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("student_stats present error: {:?}", e);
            0
        });

        let recent_query =
            format!("{ATTENDANCE_RECORD_SELECT} WHERE a.student_id = $1 ORDER BY a.date DESC LIMIT 5");
        let recent = sqlx::query_as::<_, AttendanceRecord>(&recent_query)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("student_stats recent error: {:?}", e);
                vec![]
            });

        let percentage = if total > 0 {
            (present as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        StudentStats {
            total_records: total,
            present_records: present,
            attendance_percentage: percentage,
            recent_attendance: recent,
        }
    }

    // --- NOTIFICATIONS ---

    async fn notifications_for(&self, user_id: i32) -> Vec<Notification> {
        sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("notifications_for error: {:?}", e);
            vec![]
        })
    }

    async fn create_notification(&self, user_id: i32, message: &str) -> Option<Notification> {
        sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, message, read, created_at)
            VALUES ($1, $2, FALSE, NOW())
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(message)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_notification error: {:?}", e);
            None
        })
    }

    async fn mark_notification_read(&self, id: i32, user_id: i32) -> bool {
        match sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("mark_notification_read error: {:?}", e);
                false
            }
        }
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
