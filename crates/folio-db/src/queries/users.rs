//! User CRUD operations.

use chrono::Utc;
use folio_core::{Error, Result, Role, UserId};
use rusqlite::Connection;

use crate::models::User;

const COLS: &str = "id, username, password_hash, role, created_at";

/// Create a new user and return it.
pub fn create_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    role: Role,
) -> Result<User> {
    let id = UserId::new();
    let created_at = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO users (id, username, password_hash, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id.to_string(), username, password_hash, role.as_str(), created_at],
    )
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            Error::Conflict(format!("Username '{username}' already exists"))
        } else {
            Error::database(e.to_string())
        }
    })?;

    Ok(User {
        id,
        username: username.to_string(),
        password_hash: password_hash.to_string(),
        role,
        created_at,
    })
}

/// Create a user, making them admin when the table is empty.
///
/// Runs in one transaction so two simultaneous first registrations cannot
/// both become admin.
pub fn create_user_first_admin(
    conn: &Connection,
    username: &str,
    password_hash: &str,
) -> Result<User> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    let role = if count_users(&tx)? == 0 {
        Role::Admin
    } else {
        Role::User
    };
    let user = create_user(&tx, username, password_hash, role)?;
    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(user)
}

/// Get a user by primary key.
pub fn get_user_by_id(conn: &Connection, id: UserId) -> Result<Option<User>> {
    let result = conn.query_row(
        &format!("SELECT {COLS} FROM users WHERE id = ?1"),
        [id.to_string()],
        User::from_row,
    );
    match result {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get a user by username (case-insensitive).
pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    let result = conn.query_row(
        &format!("SELECT {COLS} FROM users WHERE username = ?1"),
        [username],
        User::from_row,
    );
    match result {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List all users ordered by username.
pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {COLS} FROM users ORDER BY username ASC"))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], User::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

pub fn count_users(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))
}

pub fn count_admins(conn: &Connection) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM users WHERE role = 'admin'",
        [],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Update a user's role.
pub fn update_user_role(conn: &Connection, id: UserId, role: Role) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE users SET role = ?1 WHERE id = ?2",
            rusqlite::params![role.as_str(), id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Update a user's password hash.
pub fn update_password(conn: &Connection, id: UserId, password_hash: &str) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            rusqlite::params![password_hash, id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Delete a user and, by cascade, everything they own.
pub fn delete_user(conn: &Connection, id: UserId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM users WHERE id = ?1", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;

    #[test]
    fn create_and_get() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let u = create_user(&conn, "alice", "hash", Role::Admin).unwrap();
        assert_eq!(u.username, "alice");

        let found = get_user_by_id(&conn, u.id).unwrap().unwrap();
        assert_eq!(found.username, "alice");
        assert!(found.is_admin());
    }

    #[test]
    fn username_lookup_ignores_case() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        create_user(&conn, "Bob", "hash", Role::User).unwrap();
        assert!(get_user_by_username(&conn, "bob").unwrap().is_some());
    }

    #[test]
    fn duplicate_username() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        create_user(&conn, "carol", "hash", Role::User).unwrap();
        let err = create_user(&conn, "CAROL", "hash", Role::User).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn first_user_becomes_admin() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let first = create_user_first_admin(&conn, "first", "h").unwrap();
        let second = create_user_first_admin(&conn, "second", "h").unwrap();
        assert_eq!(first.role, Role::Admin);
        assert_eq!(second.role, Role::User);
        assert_eq!(count_admins(&conn).unwrap(), 1);
    }

    #[test]
    fn role_and_password_updates() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let u = create_user(&conn, "dave", "old", Role::User).unwrap();
        assert!(update_user_role(&conn, u.id, Role::Admin).unwrap());
        assert!(update_password(&conn, u.id, "new").unwrap());
        let found = get_user_by_id(&conn, u.id).unwrap().unwrap();
        assert_eq!(found.role, Role::Admin);
        assert_eq!(found.password_hash, "new");
    }

    #[test]
    fn delete() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let u = create_user(&conn, "erin", "hash", Role::User).unwrap();
        assert!(delete_user(&conn, u.id).unwrap());
        assert!(get_user_by_id(&conn, u.id).unwrap().is_none());
        assert!(!delete_user(&conn, u.id).unwrap());
    }
}
