//! Authentication middleware.
//!
//! Validates a bearer token or the session cookie against `auth_tokens` and
//! injects the authenticated [`CurrentUser`] into request extensions so that
//! downstream handlers can scope every query to it.

use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use folio_core::{Error, Role, UserId};
use folio_db::pool::DbPool;

use crate::context::AppContext;
use crate::error::AppError;

/// Cookie name for browser sessions.
pub const SESSION_COOKIE: &str = "folio_session";

/// The user a request was authenticated as.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    /// The session token the request presented.
    pub token: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with 403 unless this user is an admin.
    pub fn require_admin(&self) -> folio_core::Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden("Admin access required".into()))
        }
    }
}

/// Pull the session token out of request headers.
///
/// Resolution order:
/// 1. `Authorization: Bearer <token>`
/// 2. Cookie: `folio_session=<token>`
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    let cookies = headers
        .get(axum::http::header::COOKIE)
        .and_then(|v| v.to_str().ok())?;
    cookies_value(cookies, SESSION_COOKIE)
}

fn cookies_value(cookies: &str, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix(prefix.as_str()))
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Resolve a token to its user. Expired tokens and deleted users fail.
pub fn resolve_token(db: &DbPool, token: &str) -> folio_core::Result<Option<CurrentUser>> {
    let conn = folio_db::pool::get_conn(db)?;
    let Some(tok) = folio_db::queries::auth::get_valid_token(&conn, token, Utc::now())? else {
        return Ok(None);
    };
    let user = folio_db::queries::users::get_user_by_id(&conn, tok.user_id)?;
    Ok(user.map(|u| CurrentUser {
        id: u.id,
        username: u.username,
        role: u.role,
        token: tok.token,
    }))
}

/// Authentication middleware. Applied to protected routes only.
///
/// On success, inserts the resolved [`CurrentUser`] and its [`UserId`] into
/// request extensions.
pub async fn auth_middleware(
    State(ctx): State<AppContext>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let unauthorized =
        || AppError::new(Error::Unauthorized("Authentication required".into())).into_response();

    let Some(token) = extract_token(request.headers()) else {
        return Err(unauthorized());
    };

    match resolve_token(&ctx.db, &token) {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user.id);
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        Ok(None) => Err(unauthorized()),
        Err(e) => Err(AppError::new(e).into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc"));
        headers.insert("cookie", HeaderValue::from_static("folio_session=xyz"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("theme=dark; folio_session=xyz; lang=fr"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn empty_or_missing_token_is_none() {
        let mut headers = HeaderMap::new();
        assert!(extract_token(&headers).is_none());
        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        headers.insert("cookie", HeaderValue::from_static("folio_session="));
        assert!(extract_token(&headers).is_none());
    }

    #[test]
    fn other_schemes_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert!(extract_token(&headers).is_none());
    }

    #[test]
    fn require_admin_checks_role() {
        let mut user = CurrentUser {
            id: UserId::new(),
            username: "reader".into(),
            role: Role::User,
            token: "t".into(),
        };
        assert!(matches!(user.require_admin(), Err(Error::Forbidden(_))));
        user.role = Role::Admin;
        assert!(user.require_admin().is_ok());
    }
}
