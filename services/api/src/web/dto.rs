//! services/api/src/web/dto.rs
//!
//! JSON payloads of the REST API and their conversions to and from the
//! domain types. Bodies use camelCase; query strings keep the column names.

use chrono::{DateTime, Utc};
use kazusa_core::domain::{
    Course, CourseFilters, CourseUpdate, Module, ModuleFilters, ModuleUpdate, NewModule, User,
    UserFilters,
};
use kazusa_core::query::Pagination;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Query Strings
//=========================================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CourseQuery {
    pub id: Option<Uuid>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

impl CourseQuery {
    pub fn filters(&self) -> CourseFilters {
        CourseFilters { id: self.id }
    }

    pub fn pagination(&self) -> Pagination {
        pagination(self.offset, self.limit)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ModuleQuery {
    pub id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

impl ModuleQuery {
    pub fn filters(&self) -> ModuleFilters {
        ModuleFilters {
            id: self.id,
            course_id: self.course_id,
        }
    }

    pub fn pagination(&self) -> Pagination {
        pagination(self.offset, self.limit)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    pub id: Option<Uuid>,
    pub email: Option<String>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

impl UserQuery {
    pub fn filters(&self) -> UserFilters {
        UserFilters {
            id: self.id,
            email: self.email.clone(),
        }
    }

    pub fn pagination(&self) -> Pagination {
        pagination(self.offset, self.limit)
    }
}

fn pagination(offset: Option<u32>, limit: Option<u32>) -> Pagination {
    Pagination {
        offset: offset.unwrap_or(0),
        limit,
    }
}

//=========================================================================================
// Responses
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub cover_url: String,
    pub attachment_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<ModuleResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_paid: Option<bool>,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            price: course.price,
            cover_url: course.cover_url,
            attachment_urls: course.attachment_urls,
            created_at: course.created_at,
            updated_at: course.updated_at,
            modules: course
                .modules
                .map(|modules| modules.into_iter().map(ModuleResponse::from).collect()),
            is_paid: course.is_paid,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleResponse {
    pub id: Uuid,
    pub course_id: Uuid,
    pub name: String,
    pub content: String,
    pub duration_minutes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_completed: bool,
}

impl From<Module> for ModuleResponse {
    fn from(module: Module) -> Self {
        Self {
            id: module.id,
            course_id: module.course_id,
            name: module.name,
            content: module.content,
            duration_minutes: module.duration_minutes,
            created_at: module.created_at,
            updated_at: module.updated_at,
            is_completed: module.is_completed,
        }
    }
}

/// A user as shown to clients. The password hash is never included.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role.as_str().to_string(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    pub id: Uuid,
}

//=========================================================================================
// Request Bodies
//=========================================================================================

/// The multipart form accepted by `POST /courses`. Only used to document the
/// request; the handler reads the parts one by one.
#[derive(ToSchema)]
pub struct CreateCourseForm {
    pub title: String,
    pub description: Option<String>,
    /// Must not be negative.
    pub price: i64,
    #[schema(value_type = String, format = Binary)]
    pub cover: Vec<u8>,
    /// Binary file parts. Repeat the part once per file.
    #[schema(value_type = Vec<String>)]
    pub attachments: Vec<Vec<u8>>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    pub id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
}

impl From<UpdateCourseRequest> for CourseUpdate {
    fn from(req: UpdateCourseRequest) -> Self {
        CourseUpdate {
            id: req.id,
            title: req.title,
            description: req.description,
            price: req.price,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateModuleRequest {
    pub course_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub duration_minutes: i64,
}

impl From<CreateModuleRequest> for NewModule {
    fn from(req: CreateModuleRequest) -> Self {
        NewModule {
            course_id: req.course_id,
            name: req.name,
            content: req.content,
            duration_minutes: req.duration_minutes,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateModuleRequest {
    pub id: Uuid,
    pub name: Option<String>,
    pub content: Option<String>,
    pub duration_minutes: Option<i64>,
}

impl From<UpdateModuleRequest> for ModuleUpdate {
    fn from(req: UpdateModuleRequest) -> Self {
        ModuleUpdate {
            id: req.id,
            name: req.name,
            content: req.content,
            duration_minutes: req.duration_minutes,
        }
    }
}

/// The password, when present, is hashed before it reaches the store.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordActivityRequest {
    pub course_id: Uuid,
    pub module_id: Uuid,
    #[serde(default)]
    pub is_last: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub course_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
}

/// The payment provider's callback. `data` is base64-encoded JSON.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentCallback {
    pub data: String,
}

/// The decoded content of `PaymentCallback::data`.
#[derive(Debug, Deserialize)]
pub struct PaymentStatus {
    pub order_id: Uuid,
    pub operation_status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kazusa_core::domain::Role;

    #[test]
    fn uncomputed_enrichment_is_omitted() {
        let course = Course {
            id: Uuid::new_v4(),
            title: "Rust Basics".to_string(),
            description: String::new(),
            price: 4900,
            cover_url: String::new(),
            attachment_urls: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            modules: None,
            is_paid: None,
        };

        let json = serde_json::to_value(CourseResponse::from(course)).unwrap();

        assert!(json.get("modules").is_none());
        assert!(json.get("isPaid").is_none());
        assert_eq!(json["coverUrl"], "");
        assert_eq!(json["price"], 4900);
    }

    #[test]
    fn computed_enrichment_is_present() {
        let course_id = Uuid::new_v4();
        let course = Course {
            id: course_id,
            title: "Rust Basics".to_string(),
            description: String::new(),
            price: 0,
            cover_url: String::new(),
            attachment_urls: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            modules: Some(vec![Module {
                id: Uuid::new_v4(),
                course_id,
                name: "Ownership".to_string(),
                content: String::new(),
                duration_minutes: 15,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                is_completed: true,
            }]),
            is_paid: Some(false),
        };

        let json = serde_json::to_value(CourseResponse::from(course)).unwrap();

        assert_eq!(json["isPaid"], false);
        assert_eq!(json["modules"][0]["isCompleted"], true);
        assert_eq!(json["modules"][0]["durationMinutes"], 15);
    }

    #[test]
    fn user_response_has_no_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: String::new(),
            role: Role::Admin,
            password_hash: "$argon2id$secret".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();

        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"admin\""));
    }

    #[test]
    fn missing_offset_defaults_to_zero() {
        let query = ModuleQuery {
            limit: Some(5),
            ..Default::default()
        };
        assert_eq!(query.pagination(), Pagination::new(0, 5));
    }
}
