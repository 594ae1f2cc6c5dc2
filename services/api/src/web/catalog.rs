//! services/api/src/web/catalog.rs
//!
//! Handlers for courses and their modules.

use axum::{
    extract::{multipart::Field, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use kazusa_core::domain::{Caller, CourseUpdate, ModuleUpdate, NewCourse, NewModule};
use kazusa_core::ports::{FileStorage, PortResult};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{http_error, HttpError};
use crate::web::dto::{
    CourseQuery, CourseResponse, CreateCourseForm, CreateModuleRequest, CreatedResponse,
    ModuleQuery, ModuleResponse, UpdateCourseRequest, UpdateModuleRequest,
};
use crate::web::middleware::require_admin;
use crate::web::state::AppState;

fn bad_request(msg: &str) -> HttpError {
    (StatusCode::BAD_REQUEST, msg.to_string())
}

pub(crate) fn affected(found: bool, what: &str, id: Uuid) -> Result<StatusCode, HttpError> {
    if found {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, format!("{what} {id} not found")))
    }
}

//=========================================================================================
// Courses
//=========================================================================================

/// List courses, or fetch one course with its modules.
///
/// Selecting a single course attaches its modules and, for a signed-in caller,
/// whether the course has been paid for.
#[utoipa::path(
    get,
    path = "/courses",
    params(CourseQuery),
    responses(
        (status = 200, description = "Matching courses", body = [CourseResponse]),
        (status = 400, description = "Missing pagination"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_courses_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<Caller>>,
    Query(query): Query<CourseQuery>,
) -> Result<Json<Vec<CourseResponse>>, HttpError> {
    let courses = state
        .course_reader
        .read(&query.filters(), query.pagination(), caller)
        .await
        .map_err(http_error)?;
    Ok(Json(courses.into_iter().map(CourseResponse::from).collect()))
}

/// Create a course from a multipart form.
///
/// Text parts: `title`, `description`, `price`. File parts: `cover` (required)
/// and any number of `attachments`. Files are stored first and their URLs are
/// saved with the course.
#[utoipa::path(
    post,
    path = "/courses",
    request_body(content = CreateCourseForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Course created", body = CreatedResponse),
        (status = 400, description = "Invalid course form"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Administrator role required"),
        (status = 422, description = "Unreadable file part"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer" = []))
)]
pub async fn create_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<Caller>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    require_admin(&state, caller).await?;

    let form = CourseForm::read(&mut multipart).await?;
    let title = form
        .title
        .filter(|title| !title.trim().is_empty())
        .ok_or_else(|| bad_request("title is required"))?;
    let price: i64 = form
        .price
        .as_deref()
        .ok_or_else(|| bad_request("price is required"))?
        .trim()
        .parse()
        .map_err(|_| bad_request("price must be a whole number"))?;
    if price < 0 {
        return Err(bad_request("price must not be negative"));
    }
    let cover = form
        .cover
        .filter(|cover| !cover.data.is_empty())
        .ok_or_else(|| bad_request("cover file is required"))?;

    let uploads = std::iter::once(cover).chain(form.attachments).collect();
    let urls = store_uploads(state.files.as_ref(), uploads)
        .await
        .map_err(http_error)?;
    let mut stored = urls.iter().cloned();
    let course = NewCourse {
        title,
        description: form.description.unwrap_or_default(),
        price,
        cover_url: stored.next().unwrap_or_default(),
        attachment_urls: stored.collect(),
    };

    match state.courses.create(course).await {
        Ok(id) => {
            info!(course_id = %id, files = urls.len(), "course created");
            Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
        }
        Err(e) => {
            discard_uploads(state.files.as_ref(), &urls).await;
            Err(http_error(e))
        }
    }
}

/// A file part of the course form.
struct Upload {
    filename: String,
    data: Vec<u8>,
}

#[derive(Default)]
struct CourseForm {
    title: Option<String>,
    description: Option<String>,
    price: Option<String>,
    cover: Option<Upload>,
    attachments: Vec<Upload>,
}

impl CourseForm {
    /// Collects the known parts. Unknown parts are skipped.
    async fn read(multipart: &mut Multipart) -> Result<Self, HttpError> {
        let mut form = CourseForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| (e.status(), e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "title" => form.title = Some(text(field).await?),
                "description" => form.description = Some(text(field).await?),
                "price" => form.price = Some(text(field).await?),
                "cover" => form.cover = Some(upload(field).await?),
                "attachments" => form.attachments.push(upload(field).await?),
                other => warn!(part = %other, "ignoring unknown course form part"),
            }
        }
        Ok(form)
    }
}

async fn text(field: Field<'_>) -> Result<String, HttpError> {
    field.text().await.map_err(|e| (e.status(), e.body_text()))
}

async fn upload(field: Field<'_>) -> Result<Upload, HttpError> {
    let name = field.name().unwrap_or_default().to_string();
    let filename = field.file_name().unwrap_or(&name).to_string();
    let data = field.bytes().await.map_err(|e| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("failed to read {name}: {}", e.body_text()),
        )
    })?;
    Ok(Upload {
        filename,
        data: data.to_vec(),
    })
}

/// Stores every upload in order. If one fails, the ones already stored are
/// removed before the error is returned.
async fn store_uploads(files: &dyn FileStorage, uploads: Vec<Upload>) -> PortResult<Vec<String>> {
    let mut urls = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match files.put(&upload.filename, upload.data).await {
            Ok(url) => urls.push(url),
            Err(e) => {
                discard_uploads(files, &urls).await;
                return Err(e);
            }
        }
    }
    Ok(urls)
}

async fn discard_uploads(files: &dyn FileStorage, urls: &[String]) {
    for url in urls {
        if let Err(e) = files.delete(url).await {
            warn!(url = %url, error = %e, "failed to remove an orphaned upload");
        }
    }
}

#[utoipa::path(
    put,
    path = "/courses",
    request_body = UpdateCourseRequest,
    responses(
        (status = 204, description = "Course updated"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Administrator role required"),
        (status = 400, description = "Empty update"),
        (status = 404, description = "No such course"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<Caller>>,
    Json(req): Json<UpdateCourseRequest>,
) -> Result<StatusCode, HttpError> {
    require_admin(&state, caller).await?;
    if req.price.is_some_and(|price| price < 0) {
        return Err(bad_request("price must not be negative"));
    }
    let update = CourseUpdate::from(req);
    let id = update.id;
    let found = state.courses.update(update).await.map_err(http_error)?;
    affected(found, "course", id)
}

#[utoipa::path(
    delete,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Administrator role required"),
        (status = 404, description = "No such course"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<Caller>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    require_admin(&state, caller).await?;
    let found = state.courses.delete(id).await.map_err(http_error)?;
    affected(found, "course", id)
}

//=========================================================================================
// Modules
//=========================================================================================

/// List modules. A course-scoped listing marks the caller's completed modules.
#[utoipa::path(
    get,
    path = "/modules",
    params(ModuleQuery),
    responses(
        (status = 200, description = "Matching modules", body = [ModuleResponse]),
        (status = 400, description = "Missing pagination"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_modules_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<Caller>>,
    Query(query): Query<ModuleQuery>,
) -> Result<Json<Vec<ModuleResponse>>, HttpError> {
    let modules = state
        .module_reader
        .read(&query.filters(), query.pagination(), caller)
        .await
        .map_err(http_error)?;
    Ok(Json(modules.into_iter().map(ModuleResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/modules",
    request_body = CreateModuleRequest,
    responses(
        (status = 201, description = "Module created", body = CreatedResponse),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Administrator role required"),
        (status = 400, description = "Invalid module"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_module_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<Caller>>,
    Json(req): Json<CreateModuleRequest>,
) -> Result<impl IntoResponse, HttpError> {
    require_admin(&state, caller).await?;
    if req.name.trim().is_empty() {
        return Err(bad_request("name is required"));
    }

    let id = state
        .modules
        .create(NewModule::from(req))
        .await
        .map_err(http_error)?;
    info!(module_id = %id, "module created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

#[utoipa::path(
    put,
    path = "/modules",
    request_body = UpdateModuleRequest,
    responses(
        (status = 204, description = "Module updated"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Administrator role required"),
        (status = 400, description = "Empty update"),
        (status = 404, description = "No such module"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_module_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<Caller>>,
    Json(req): Json<UpdateModuleRequest>,
) -> Result<StatusCode, HttpError> {
    require_admin(&state, caller).await?;
    let update = ModuleUpdate::from(req);
    let id = update.id;
    let found = state.modules.update(update).await.map_err(http_error)?;
    affected(found, "module", id)
}

#[utoipa::path(
    delete,
    path = "/modules/{id}",
    params(("id" = Uuid, Path, description = "Module id")),
    responses(
        (status = 204, description = "Module deleted"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Administrator role required"),
        (status = 404, description = "No such module"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_module_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<Caller>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    require_admin(&state, caller).await?;
    let found = state.modules.delete(id).await.map_err(http_error)?;
    affected(found, "module", id)
}
