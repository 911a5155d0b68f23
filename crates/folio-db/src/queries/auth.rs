//! Session token operations.
//!
//! `expires_at` is stored as RFC 3339 UTC with a `Z` suffix so that string
//! comparison in SQL matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use folio_core::{Error, Result, SessionId, UserId};
use rusqlite::Connection;

use crate::models::AuthToken;

const COLS: &str = "id, user_id, token, expires_at";

/// Format a timestamp the way `auth_tokens.expires_at` stores it.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Create a new session token.
pub fn create_token(
    conn: &Connection,
    user_id: UserId,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<AuthToken> {
    let id = SessionId::new();
    let expires_at = timestamp(expires_at);

    conn.execute(
        "INSERT INTO auth_tokens (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![id.to_string(), user_id.to_string(), token, expires_at],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(AuthToken {
        id,
        user_id,
        token: token.to_string(),
        expires_at,
    })
}

/// Look up a token that has not yet expired at `now`.
pub fn get_valid_token(
    conn: &Connection,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<AuthToken>> {
    let q = format!("SELECT {COLS} FROM auth_tokens WHERE token = ?1 AND expires_at > ?2");
    let result = conn.query_row(&q, rusqlite::params![token, timestamp(now)], AuthToken::from_row);
    match result {
        Ok(t) => Ok(Some(t)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Delete a specific token by value.
pub fn delete_token(conn: &Connection, token: &str) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM auth_tokens WHERE token = ?1", [token])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Delete every token of a user except `keep` (used after a password change).
pub fn delete_other_tokens(conn: &Connection, user_id: UserId, keep: &str) -> Result<usize> {
    conn.execute(
        "DELETE FROM auth_tokens WHERE user_id = ?1 AND token != ?2",
        rusqlite::params![user_id.to_string(), keep],
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Delete all tokens whose `expires_at` is at or before `now`.
pub fn delete_expired_tokens(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
    conn.execute(
        "DELETE FROM auth_tokens WHERE expires_at <= ?1",
        [timestamp(now)],
    )
    .map_err(|e| Error::database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::queries::users;
    use chrono::Duration;
    use folio_core::Role;

    #[test]
    fn create_get_delete() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, "tok_user", "hash", Role::User).unwrap();
        let now = Utc::now();

        let tok = create_token(&conn, user.id, "abc123", now + Duration::hours(1)).unwrap();
        assert_eq!(tok.token, "abc123");

        let found = get_valid_token(&conn, "abc123", now).unwrap().unwrap();
        assert_eq!(found.user_id, user.id);

        assert!(delete_token(&conn, "abc123").unwrap());
        assert!(get_valid_token(&conn, "abc123", now).unwrap().is_none());
    }

    #[test]
    fn expired_tokens_are_invisible_and_swept() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, "exp_user", "hash", Role::User).unwrap();
        let now = Utc::now();

        create_token(&conn, user.id, "old", now - Duration::hours(1)).unwrap();
        create_token(&conn, user.id, "new", now + Duration::hours(1)).unwrap();

        assert!(get_valid_token(&conn, "old", now).unwrap().is_none());
        assert_eq!(delete_expired_tokens(&conn, now).unwrap(), 1);
        assert!(get_valid_token(&conn, "new", now).unwrap().is_some());
    }

    #[test]
    fn other_tokens_revoked() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, "multi", "hash", Role::User).unwrap();
        let later = Utc::now() + Duration::hours(1);
        create_token(&conn, user.id, "a", later).unwrap();
        create_token(&conn, user.id, "b", later).unwrap();
        create_token(&conn, user.id, "c", later).unwrap();
        assert_eq!(delete_other_tokens(&conn, user.id, "b").unwrap(), 2);
    }

    #[test]
    fn deleting_user_cascades() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, "gone", "hash", Role::User).unwrap();
        let now = Utc::now();
        create_token(&conn, user.id, "t", now + Duration::hours(1)).unwrap();
        users::delete_user(&conn, user.id).unwrap();
        assert!(get_valid_token(&conn, "t", now).unwrap().is_none());
    }
}
