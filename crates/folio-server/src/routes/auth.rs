//! Authentication route handlers: register, login, logout, status, password.

use axum::extract::{Extension, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use folio_core::{Error, Role};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::auth::{extract_token, resolve_token, CurrentUser, SESSION_COOKIE};

const MIN_PASSWORD: usize = 8;
/// bcrypt ignores everything past 72 bytes.
const MAX_PASSWORD: usize = 72;

/// Credentials payload for login and registration.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub role: Role,
}

/// Login/registration response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
}

/// Auth status response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    pub registration_open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
}

/// Password change request.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

fn validate_username(username: &str) -> folio_core::Result<String> {
    let username = username.trim();
    let valid = (3..=32).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(username.to_string())
    } else {
        Err(Error::Validation(
            "Username must be 3-32 characters of letters, digits, '_', '.' or '-'".into(),
        ))
    }
}

fn validate_password(password: &str) -> folio_core::Result<()> {
    if password.chars().count() < MIN_PASSWORD {
        return Err(Error::Validation(format!(
            "Password must be at least {MIN_PASSWORD} characters"
        )));
    }
    if password.len() > MAX_PASSWORD {
        return Err(Error::Validation(format!(
            "Password must be at most {MAX_PASSWORD} bytes"
        )));
    }
    Ok(())
}

/// Hash on the blocking pool; bcrypt is deliberately slow.
pub async fn hash_password(password: String) -> folio_core::Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| Error::Internal(format!("hashing task failed: {e}")))?
        .map_err(|e| Error::Internal(format!("bcrypt error: {e}")))
}

/// Hash checked when the username does not exist, so unknown and known
/// usernames cost the same.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| {
        bcrypt::hash("folio-unknown-user", bcrypt::DEFAULT_COST).unwrap_or_default()
    })
}

async fn verify_unknown_user(password: String) -> folio_core::Result<()> {
    tokio::task::spawn_blocking(move || {
        let _ = bcrypt::verify(password, dummy_hash());
    })
    .await
    .map_err(|e| Error::Internal(format!("hashing task failed: {e}")))
}

async fn verify_password(password: String, hash: String) -> folio_core::Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| Error::Internal(format!("hashing task failed: {e}")))
}

fn session_cookie(token: &str, max_age_secs: i64) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    ))
    .ok()
}

/// Issue a session token for `user` and build the response carrying it.
fn start_session(
    ctx: &AppContext,
    user: folio_db::models::User,
    status: StatusCode,
    message: &str,
) -> Result<Response, AppError> {
    let hours = ctx.config.auth.session_timeout_hours as i64;
    let token = uuid::Uuid::new_v4().to_string();
    let conn = ctx.conn()?;
    folio_db::queries::auth::create_token(&conn, user.id, &token, Utc::now() + Duration::hours(hours))?;

    let mut response = (
        status,
        Json(AuthResponse {
            success: true,
            message: message.into(),
            token: Some(token.clone()),
            user: Some(UserInfo {
                id: user.id.to_string(),
                username: user.username,
                role: user.role,
            }),
        }),
    )
        .into_response();
    if let Some(cookie) = session_cookie(&token, hours * 3600) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

/// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = LoginRequest,
    responses(
        (status = 201, description = "Account created and logged in", body = AuthResponse),
        (status = 400, description = "Invalid username or password"),
        (status = 403, description = "Registration disabled"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn register(
    State(ctx): State<AppContext>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    if !ctx.config.auth.allow_registration {
        return Err(Error::Forbidden("Registration is disabled".into()).into());
    }
    let username = validate_username(&payload.username)?;
    validate_password(&payload.password)?;

    let hash = hash_password(payload.password).await?;
    let user = {
        let conn = ctx.conn()?;
        folio_db::queries::users::create_user_first_admin(&conn, &username, &hash)?
    };
    tracing::info!(username = %user.username, role = %user.role, "User registered");

    start_session(&ctx, user, StatusCode::CREATED, "Account created")
}

/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many attempts")
    )
)]
pub async fn login(
    State(ctx): State<AppContext>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let user = {
        let conn = ctx.conn()?;
        folio_db::queries::users::get_user_by_username(&conn, payload.username.trim())?
    };
    let Some(user) = user else {
        verify_unknown_user(payload.password).await?;
        return Err(Error::Unauthorized("Invalid credentials".into()).into());
    };

    if !verify_password(payload.password, user.password_hash.clone()).await? {
        tracing::info!(username = %user.username, "Failed login");
        return Err(Error::Unauthorized("Invalid credentials".into()).into());
    }

    start_session(&ctx, user, StatusCode::OK, "Login successful")
}

/// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out")
    )
)]
pub async fn logout(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = extract_token(&headers) {
        let conn = ctx.conn()?;
        folio_db::queries::auth::delete_token(&conn, &token)?;
    }

    let mut response = Json(AuthResponse {
        success: true,
        message: "Logged out".into(),
        token: None,
        user: None,
    })
    .into_response();
    if let Some(cookie) = session_cookie("", 0) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

/// GET /api/auth/status
#[utoipa::path(
    get,
    path = "/api/auth/status",
    responses(
        (status = 200, description = "Auth status", body = AuthStatusResponse)
    )
)]
pub async fn auth_status(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<AuthStatusResponse>, AppError> {
    let user = match extract_token(&headers) {
        Some(token) => resolve_token(&ctx.db, &token)?,
        None => None,
    };

    Ok(Json(AuthStatusResponse {
        authenticated: user.is_some(),
        registration_open: ctx.config.auth.allow_registration,
        user: user.map(|u| UserInfo {
            id: u.id.to_string(),
            username: u.username,
            role: u.role,
        }),
    }))
}

/// PUT /api/auth/password
///
/// Every other session of the user is revoked.
#[utoipa::path(
    put,
    path = "/api/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Current password incorrect")
    )
)]
pub async fn change_password(
    State(ctx): State<AppContext>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    validate_password(&payload.new_password)?;

    let user = {
        let conn = ctx.conn()?;
        folio_db::queries::users::get_user_by_id(&conn, current.id)?
    }
    .ok_or_else(|| Error::Unauthorized("User not found".into()))?;

    if !verify_password(payload.current_password, user.password_hash).await? {
        return Err(Error::Unauthorized("Current password is incorrect".into()).into());
    }

    let new_hash = hash_password(payload.new_password).await?;
    let conn = ctx.conn()?;
    folio_db::queries::users::update_password(&conn, user.id, &new_hash)?;
    let revoked = folio_db::queries::auth::delete_other_tokens(&conn, user.id, &current.token)?;
    tracing::info!(username = %user.username, revoked, "Password changed");

    Ok(Json(AuthResponse {
        success: true,
        message: "Password changed".into(),
        token: None,
        user: None,
    }))
}
