//! crates/kazusa_core/src/domain.rs
//!
//! Defines the pure, core data structures for the course platform.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Courses
//=========================================================================================

/// A course offered on the platform.
///
/// `modules` and `is_paid` are never persisted. They are attached by the
/// course read pipeline for the single selected course of a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Price in the smallest currency unit.
    pub price: i64,
    pub cover_url: String,
    pub attachment_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub modules: Option<Vec<Module>>,
    /// `None` when the read carried no caller.
    pub is_paid: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub price: i64,
    pub cover_url: String,
    pub attachment_urls: Vec<String>,
}

/// Partial update of a course. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseUpdate {
    pub id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CourseFilters {
    pub id: Option<Uuid>,
}

impl CourseFilters {
    pub fn by_id(id: Uuid) -> Self {
        Self { id: Some(id) }
    }
}

//=========================================================================================
// Modules
//=========================================================================================

/// One ordered unit of a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub id: Uuid,
    pub course_id: Uuid,
    pub name: String,
    pub content: String,
    pub duration_minutes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Request-scoped: whether the caller has a progress event for this module.
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewModule {
    pub course_id: Uuid,
    pub name: String,
    pub content: String,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleUpdate {
    pub id: Uuid,
    pub name: Option<String>,
    pub content: Option<String>,
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleFilters {
    pub id: Option<Uuid>,
    pub course_id: Option<Uuid>,
}

impl ModuleFilters {
    pub fn for_course(course_id: Uuid) -> Self {
        Self {
            id: None,
            course_id: Some(course_id),
        }
    }
}

//=========================================================================================
// Users
//=========================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

// Contains the password hash; never hand this to a response body directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilters {
    pub id: Option<Uuid>,
    pub email: Option<String>,
}

//=========================================================================================
// Progress and Payments
//=========================================================================================

/// A progress event: the user reached or completed a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub module_id: Uuid,
    pub is_last: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewActivity {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub module_id: Uuid,
    pub is_last: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityFilters {
    pub user_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub module_id: Option<Uuid>,
}

/// A purchase of a course. Created unconfirmed; confirmed later by the
/// payment provider's callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub order_id: Uuid,
    pub confirmed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub order_id: Uuid,
}

/// Both fields are required by the payment store; they are optional here so
/// that a missing one is reported as an invalid filter rather than being
/// impossible to express.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentFilters {
    pub user_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
}

//=========================================================================================
// Request Context
//=========================================================================================

/// The authenticated identity a read or write is performed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Caller {
    pub user_id: Uuid,
}

impl Caller {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// An outbound message produced by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}
