//! services/api/src/web/auth.rs
//!
//! Registration, login and bearer token handling.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use kazusa_core::domain::{Caller, NewUser, Role, UserFilters};
use kazusa_core::ports::{PortError, PortResult};
use kazusa_core::query::Page;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{http_error, HttpError};
use crate::web::state::AppState;

//=========================================================================================
// Tokens
//=========================================================================================

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    iat: i64,
    exp: i64,
}

/// Signs and verifies HS256 bearer tokens whose subject is the user id.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user_id: Uuid) -> PortResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| PortError::Unexpected(format!("failed to sign token: {e}")))
    }

    /// Any malformed, expired or foreign token is `Unauthorized`.
    pub fn verify(&self, token: &str) -> PortResult<Caller> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|_| PortError::Unauthorized)?;
        Ok(Caller::new(data.claims.sub))
    }
}

//=========================================================================================
// Passwords
//=========================================================================================

pub fn hash_password(password: &str) -> Result<String, HttpError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to hash password".to_string(),
            )
        })
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("Stored password hash is unreadable: {:?}", e);
            false
        }
    }
}

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub password: String,
    pub confirmation: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), HttpError> {
        let bad = |msg: &str| Err((StatusCode::BAD_REQUEST, msg.to_string()));
        if self.name.trim().is_empty() {
            return bad("name is required");
        }
        if self.email.trim().is_empty() {
            return bad("email is required");
        }
        if self.password.is_empty() {
            return bad("password is required");
        }
        if self.password != self.confirmation {
            return bad("passwords do not match");
        }
        Ok(())
    }
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub user_id: Uuid,
    pub token: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a user account and sign them in
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = TokenResponse),
        (status = 400, description = "Invalid registration data"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, HttpError> {
    req.validate()?;

    let existing = state
        .users
        .read(
            &UserFilters {
                id: None,
                email: Some(req.email.clone()),
            },
            Page::single(),
        )
        .await
        .map_err(http_error)?;
    if !existing.is_empty() {
        return Err((
            StatusCode::CONFLICT,
            "email is already registered".to_string(),
        ));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = state
        .users
        .create(NewUser {
            name: req.name,
            email: req.email,
            phone: req.phone,
            role: Role::User,
            password_hash,
        })
        .await
        .map_err(http_error)?;
    let token = state.tokens.issue(user_id).map_err(http_error)?;

    info!(user_id = %user_id, "user registered");
    Ok((StatusCode::CREATED, Json(TokenResponse { user_id, token })))
}

/// POST /auth/login - Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let invalid = || {
        (
            StatusCode::UNAUTHORIZED,
            "Invalid email or password".to_string(),
        )
    };

    let user = state
        .users
        .read(
            &UserFilters {
                id: None,
                email: Some(req.email),
            },
            Page::single(),
        )
        .await
        .map_err(http_error)?
        .into_iter()
        .next()
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(invalid());
    }

    let token = state.tokens.issue(user.id).map_err(http_error)?;
    Ok(Json(TokenResponse {
        user_id: user.id,
        token,
    }))
}
