//! services/api/src/web/middleware.rs
//!
//! Resolves the optional bearer token into the request's caller, and the
//! guards handlers use to demand a signed-in caller or an administrator.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use kazusa_core::domain::{Caller, Role, UserFilters};
use kazusa_core::query::Page;
use std::sync::Arc;
use tracing::warn;

use crate::error::{http_error, HttpError};
use crate::web::state::AppState;

/// Inserts an `Option<Caller>` into the request extensions.
///
/// A request without an `Authorization` header proceeds anonymously. A header
/// that is present but not a valid bearer token is rejected with 401.
pub async fn resolve_caller(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let caller = match req.headers().get(header::AUTHORIZATION) {
        None => None,
        Some(value) => {
            let token = value
                .to_str()
                .ok()
                .and_then(|v| v.strip_prefix("Bearer "))
                .ok_or(StatusCode::UNAUTHORIZED)?;
            let caller = state.tokens.verify(token.trim()).map_err(|_| {
                warn!("Rejected request with an invalid bearer token");
                StatusCode::UNAUTHORIZED
            })?;
            Some(caller)
        }
    };

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

/// For handlers that only make sense for a signed-in user.
pub fn require_caller(caller: Option<Caller>) -> Result<Caller, HttpError> {
    caller.ok_or((
        StatusCode::UNAUTHORIZED,
        "Authentication required".to_string(),
    ))
}

/// For catalog and account management. The role is read from the user store
/// on every call, so a demotion takes effect before the token expires.
pub async fn require_admin(state: &AppState, caller: Option<Caller>) -> Result<Caller, HttpError> {
    let caller = require_caller(caller)?;
    let filters = UserFilters {
        id: Some(caller.user_id),
        email: None,
    };
    let user = state
        .users
        .read(&filters, Page::single())
        .await
        .map_err(http_error)?
        .into_iter()
        .next();

    match user {
        Some(user) if user.role == Role::Admin => Ok(caller),
        _ => {
            warn!(user_id = %caller.user_id, "Rejected a non-admin caller");
            Err((
                StatusCode::FORBIDDEN,
                "Administrator role required".to_string(),
            ))
        }
    }
}
