//! services/api/src/web/rest.rs
//!
//! Assembles the REST router and holds the master definition for the OpenAPI
//! specification.

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::web::{auth, catalog, dto, middleware::resolve_caller, progress, state::AppState, users};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        catalog::list_courses_handler,
        catalog::create_course_handler,
        catalog::update_course_handler,
        catalog::delete_course_handler,
        catalog::list_modules_handler,
        catalog::create_module_handler,
        catalog::update_module_handler,
        catalog::delete_module_handler,
        users::list_users_handler,
        users::update_user_handler,
        users::delete_user_handler,
        progress::record_activity_handler,
        progress::create_payment_handler,
        progress::confirm_payment_handler,
    ),
    components(
        schemas(
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::TokenResponse,
            dto::CourseResponse,
            dto::ModuleResponse,
            dto::UserResponse,
            dto::CreatedResponse,
            dto::CreateCourseForm,
            dto::UpdateCourseRequest,
            dto::CreateModuleRequest,
            dto::UpdateModuleRequest,
            dto::UpdateUserRequest,
            dto::RecordActivityRequest,
            dto::CreatePaymentRequest,
            dto::PaymentResponse,
            dto::PaymentCallback,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Kazusa Courses API", description = "Courses, modules, learning progress and purchases.")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// Router
//=========================================================================================

/// Every API route. Each request passes through `resolve_caller` first.
///
/// Course creation carries file uploads, so only that route gets the larger
/// `max_upload_bytes` body limit.
pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route(
            "/courses",
            get(catalog::list_courses_handler)
                .put(catalog::update_course_handler)
                .merge(post(catalog::create_course_handler).layer(upload_limit)),
        )
        .route("/courses/{id}", delete(catalog::delete_course_handler))
        .route(
            "/modules",
            get(catalog::list_modules_handler)
                .post(catalog::create_module_handler)
                .put(catalog::update_module_handler),
        )
        .route("/modules/{id}", delete(catalog::delete_module_handler))
        .route(
            "/users",
            get(users::list_users_handler).put(users::update_user_handler),
        )
        .route("/users/{id}", delete(users::delete_user_handler))
        .route("/activity", post(progress::record_activity_handler))
        .route("/payments", post(progress::create_payment_handler))
        .route("/payments/confirm", post(progress::confirm_payment_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            resolve_caller,
        ))
        .with_state(state)
}
