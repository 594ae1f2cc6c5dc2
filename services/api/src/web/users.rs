//! services/api/src/web/users.rs
//!
//! Account management. Every handler here is restricted to administrators.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use kazusa_core::domain::{Caller, Role, UserUpdate};
use kazusa_core::query::Page;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{http_error, HttpError};
use crate::web::auth::hash_password;
use crate::web::catalog::affected;
use crate::web::dto::{UpdateUserRequest, UserQuery, UserResponse};
use crate::web::middleware::require_admin;
use crate::web::state::AppState;

#[utoipa::path(
    get,
    path = "/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Matching users", body = [UserResponse]),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Administrator role required"),
        (status = 400, description = "Missing pagination"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<Caller>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<UserResponse>>, HttpError> {
    require_admin(&state, caller).await?;
    let filters = query.filters();
    let page = Page::resolve(query.pagination(), filters.predicate().scope()).map_err(http_error)?;
    let users = state
        .users
        .read(&filters, page)
        .await
        .map_err(http_error)?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    put,
    path = "/users",
    request_body = UpdateUserRequest,
    responses(
        (status = 204, description = "User updated"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Administrator role required"),
        (status = 400, description = "Empty update or unknown role"),
        (status = 404, description = "No such user"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<Caller>>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<StatusCode, HttpError> {
    require_admin(&state, caller).await?;
    let role = match req.role.as_deref() {
        Some(value) => Some(Role::parse(value).ok_or((
            StatusCode::BAD_REQUEST,
            format!("unknown role '{value}'"),
        ))?),
        None => None,
    };
    let password_hash = match req.password.as_deref() {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let update = UserUpdate {
        id: req.id,
        name: req.name,
        email: req.email,
        phone: req.phone,
        role,
        password_hash,
    };
    let found = state.users.update(update).await.map_err(http_error)?;
    affected(found, "user", req.id)
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Administrator role required"),
        (status = 404, description = "No such user"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<Caller>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    require_admin(&state, caller).await?;
    let found = state.users.delete(id).await.map_err(http_error)?;
    affected(found, "user", id)
}
