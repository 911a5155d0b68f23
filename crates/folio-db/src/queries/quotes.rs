//! Quote operations.

use chrono::Utc;
use folio_core::{BookId, Error, QuoteId, Result, UserId};
use rand::Rng;
use rusqlite::{Connection, OptionalExtension};

use crate::models::Quote;

const SELECT: &str = "SELECT q.id, q.book_id, b.title, q.text, q.page, q.created_at
     FROM quotes q JOIN books b ON b.id = q.book_id";

pub fn create_quote(
    conn: &Connection,
    user_id: UserId,
    book_id: BookId,
    text: &str,
    page: Option<i64>,
) -> Result<QuoteId> {
    let id = QuoteId::new();
    conn.execute(
        "INSERT INTO quotes (id, user_id, book_id, text, page, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            id.to_string(),
            user_id.to_string(),
            book_id.to_string(),
            text,
            page,
            Utc::now().to_rfc3339()
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(id)
}

pub fn get_quote(conn: &Connection, user_id: UserId, id: QuoteId) -> Result<Option<Quote>> {
    conn.query_row(
        &format!("{SELECT} WHERE q.id = ?1 AND q.user_id = ?2"),
        [id.to_string(), user_id.to_string()],
        Quote::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

fn query(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Quote>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(params, Quote::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Every quote of a user, newest first. `limit` of `None` returns all.
pub fn list_quotes(conn: &Connection, user_id: UserId, limit: Option<u32>) -> Result<Vec<Quote>> {
    query(
        conn,
        &format!("{SELECT} WHERE q.user_id = ?1 ORDER BY q.created_at DESC, q.id LIMIT ?2"),
        rusqlite::params![user_id.to_string(), limit.map(i64::from).unwrap_or(-1)],
    )
}

/// Quotes from one book in page order.
pub fn for_book(conn: &Connection, user_id: UserId, book_id: BookId) -> Result<Vec<Quote>> {
    query(
        conn,
        &format!(
            "{SELECT} WHERE q.user_id = ?1 AND q.book_id = ?2
             ORDER BY q.page IS NULL, q.page, q.created_at"
        ),
        [user_id.to_string(), book_id.to_string()],
    )
}

pub fn count_quotes(conn: &Connection, user_id: UserId) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM quotes WHERE user_id = ?1",
        [user_id.to_string()],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// A uniformly random quote, or `None` when the user has none.
pub fn random_quote(conn: &Connection, user_id: UserId) -> Result<Option<Quote>> {
    let count = count_quotes(conn, user_id)?;
    if count == 0 {
        return Ok(None);
    }
    let offset = rand::thread_rng().gen_range(0..count);
    conn.query_row(
        &format!("{SELECT} WHERE q.user_id = ?1 ORDER BY q.id LIMIT 1 OFFSET ?2"),
        rusqlite::params![user_id.to_string(), offset],
        Quote::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

pub fn update_quote(
    conn: &Connection,
    user_id: UserId,
    id: QuoteId,
    text: &str,
    page: Option<i64>,
) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE quotes SET text = ?1, page = ?2 WHERE id = ?3 AND user_id = ?4",
            rusqlite::params![text, page, id.to_string(), user_id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

pub fn delete_quote(conn: &Connection, user_id: UserId, id: QuoteId) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM quotes WHERE id = ?1 AND user_id = ?2",
            [id.to_string(), user_id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::queries::books::tests::{book, user};

    #[test]
    fn crud() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let u = user(&conn, "quoter");
        let b = book(&conn, u, "Meditations");
        let id = create_quote(&conn, u, b.id, "Waste no more time.", Some(12)).unwrap();

        let q = get_quote(&conn, u, id).unwrap().unwrap();
        assert_eq!(q.book_title, "Meditations");
        assert_eq!(q.page, Some(12));

        assert!(update_quote(&conn, u, id, "Waste no more time arguing.", None).unwrap());
        assert_eq!(for_book(&conn, u, b.id).unwrap()[0].page, None);

        assert!(delete_quote(&conn, u, id).unwrap());
        assert_eq!(count_quotes(&conn, u).unwrap(), 0);
    }

    #[test]
    fn list_limit_and_random() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let u = user(&conn, "quoter");
        let other = user(&conn, "other");
        assert!(random_quote(&conn, u).unwrap().is_none());

        let b = book(&conn, u, "Walden");
        for i in 0..4 {
            create_quote(&conn, u, b.id, &format!("line {i}"), Some(i)).unwrap();
        }
        assert_eq!(list_quotes(&conn, u, None).unwrap().len(), 4);
        assert_eq!(list_quotes(&conn, u, Some(2)).unwrap().len(), 2);
        assert!(random_quote(&conn, u).unwrap().is_some());
        assert!(random_quote(&conn, other).unwrap().is_none());
    }
}
