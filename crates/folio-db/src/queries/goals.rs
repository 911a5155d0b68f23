//! Yearly reading goals.

use chrono::Utc;
use folio_core::{Error, GoalId, Result, UserId};
use rusqlite::{Connection, OptionalExtension};

use crate::models::ReadingGoal;

const COLS: &str = "id, year, target_books, target_pages, created_at";

/// Set the goal for `year`, replacing any existing one.
pub fn upsert_goal(
    conn: &Connection,
    user_id: UserId,
    year: i32,
    target_books: u32,
    target_pages: Option<u32>,
) -> Result<ReadingGoal> {
    conn.execute(
        "INSERT INTO reading_goals (id, user_id, year, target_books, target_pages, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (user_id, year)
         DO UPDATE SET target_books = excluded.target_books, target_pages = excluded.target_pages",
        rusqlite::params![
            GoalId::new().to_string(),
            user_id.to_string(),
            year,
            target_books,
            target_pages,
            Utc::now().to_rfc3339()
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    get_goal(conn, user_id, year)?.ok_or_else(|| Error::Internal("Goal vanished after upsert".into()))
}

pub fn get_goal(conn: &Connection, user_id: UserId, year: i32) -> Result<Option<ReadingGoal>> {
    conn.query_row(
        &format!("SELECT {COLS} FROM reading_goals WHERE user_id = ?1 AND year = ?2"),
        rusqlite::params![user_id.to_string(), year],
        ReadingGoal::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

pub fn list_goals(conn: &Connection, user_id: UserId) -> Result<Vec<ReadingGoal>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLS} FROM reading_goals WHERE user_id = ?1 ORDER BY year DESC"
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([user_id.to_string()], ReadingGoal::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

pub fn delete_goal(conn: &Connection, user_id: UserId, year: i32) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM reading_goals WHERE user_id = ?1 AND year = ?2",
            rusqlite::params![user_id.to_string(), year],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::queries::books::tests::user;

    #[test]
    fn upsert_replaces() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let u = user(&conn, "goalie");
        let first = upsert_goal(&conn, u, 2024, 12, None).unwrap();
        let second = upsert_goal(&conn, u, 2024, 24, Some(8000)).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.target_books, 24);
        assert_eq!(second.target_pages, Some(8000));
        assert_eq!(list_goals(&conn, u).unwrap().len(), 1);
    }

    #[test]
    fn delete() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let u = user(&conn, "goalie");
        upsert_goal(&conn, u, 2023, 5, None).unwrap();
        upsert_goal(&conn, u, 2024, 10, None).unwrap();
        assert_eq!(list_goals(&conn, u).unwrap()[0].year, 2024);
        assert!(delete_goal(&conn, u, 2023).unwrap());
        assert!(get_goal(&conn, u, 2023).unwrap().is_none());
        assert!(!delete_goal(&conn, u, 2023).unwrap());
    }
}
