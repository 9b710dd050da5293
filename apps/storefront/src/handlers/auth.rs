//! Account handlers: login, registration, current user.
//!
//! Password hashing and verification run on the blocking pool; one argon2
//! call takes tens of milliseconds.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::{info, warn};

use jewel_core::validation::{validate_email, validate_password, validate_person_name};
use jewel_core::{Role, ValidationError};
use jewel_db::DbError;

use crate::auth::{hash_password, verify_password, AuthUser, Claims};
use crate::dto::{AuthResponse, LoginRequest, RegisterRequest, UserDto};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const USER_EXISTS: &str = "User already exists";

/// `POST /api/auth/login`
///
/// - `200 OK` - `{ user, token }`
/// - `400 Bad Request` - malformed body
/// - `401 Unauthorized` - unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(req) = payload?;

    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Invalid request data"));
    }

    let user = state.db.users().find_by_email(&req.email).await?;

    // Unknown emails still pay for one verification
    let stored = user.as_ref().map(|u| u.password_hash.clone());
    let password = req.password;
    let matched = tokio::task::spawn_blocking(move || match stored {
        Some(hash) => verify_password(&password, &hash),
        None => {
            let _ = verify_password(&password, DUMMY_HASH);
            false
        }
    })
    .await
    .map_err(|e| ApiError::internal(format!("Password check failed: {}", e)))?;

    let user = match user {
        Some(user) if matched => user,
        _ => {
            warn!(email = %req.email.trim(), "Login failed");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let token = state.jwt.issue(&user)?;
    info!(user_id = %user.id, role = user.role.as_str(), "User logged in");

    Ok(Json(AuthResponse {
        user: UserDto::from(&user),
        token,
    }))
}

/// `POST /api/auth/register`
///
/// Creates a `guest` account and signs it in.
///
/// - `200 OK` - `{ user, token }`
/// - `400 Bad Request` - invalid fields, or "User already exists"
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(req) = payload?;

    validate_person_name("name", req.name.trim())?;
    validate_email(&req.email)?;
    validate_password(&req.password)?;

    let users = state.db.users();
    if users.find_by_email(&req.email).await?.is_some() {
        return Err(ApiError::bad_request(USER_EXISTS));
    }

    let hash = hash_in_background(req.password).await?;

    let user = match users.create(&req.name, &req.email, &hash, Role::Guest).await {
        Ok(user) => user,
        // Lost a race with a concurrent registration
        Err(DbError::UniqueViolation { .. }) => return Err(ApiError::bad_request(USER_EXISTS)),
        Err(e) => return Err(e.into()),
    };

    let token = state.jwt.issue(&user)?;
    info!(user_id = %user.id, "User registered");

    Ok(Json(AuthResponse {
        user: UserDto::from(&user),
        token,
    }))
}

/// `GET /api/auth/me` - the claims of the presented token.
pub async fn me(AuthUser(claims): AuthUser) -> Json<Claims> {
    Json(claims)
}

/// Hashes a password off the async runtime.
pub async fn hash_in_background(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(format!("Password hashing failed: {}", e)))?
}

/// Validates bootstrap admin credentials the same way registration does.
pub fn validate_admin_bootstrap(email: &str, password: &str) -> Result<(), ValidationError> {
    validate_email(email)?;
    validate_password(password)
}

// argon2id of a random string; never matches a real password
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$Zx3gJ6M0bKk4pQw3m2n5yq1G8Wc4r7tQeF0aHn2bL9s";
