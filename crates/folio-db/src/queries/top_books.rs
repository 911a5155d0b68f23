//! Top-10 lists. Year `0` holds the all-time list.

use folio_core::{BookId, Error, Result, UserId};
use rusqlite::Connection;

use crate::models::TopBook;

/// Storage key for the all-time list.
pub const ALL_TIME: i32 = 0;
pub const MAX_ENTRIES: u8 = 10;

pub fn get_top(conn: &Connection, user_id: UserId, year: i32) -> Result<Vec<TopBook>> {
    let mut stmt = conn
        .prepare(
            "SELECT t.position, t.book_id, b.title, b.cover_url, b.rating
             FROM top_books t JOIN books b ON b.id = t.book_id
             WHERE t.user_id = ?1 AND t.year = ?2
             ORDER BY t.position",
        )
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params![user_id.to_string(), year], TopBook::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Replace the list for `year` with `entries` (position, book) atomically.
///
/// Positions must be within `1..=10` and unique, books unique and owned by
/// the user. On any error the previous list is left untouched.
pub fn replace_top(
    conn: &Connection,
    user_id: UserId,
    year: i32,
    entries: &[(u8, BookId)],
) -> Result<Vec<TopBook>> {
    let mut positions: Vec<u8> = entries.iter().map(|(p, _)| *p).collect();
    if let Some(bad) = positions.iter().find(|p| !(1..=MAX_ENTRIES).contains(*p)) {
        return Err(Error::Validation(format!(
            "Position {bad} is outside 1..={MAX_ENTRIES}"
        )));
    }
    positions.sort_unstable();
    positions.dedup();
    if positions.len() != entries.len() {
        return Err(Error::Validation("Positions must be unique".into()));
    }
    let mut books: Vec<String> = entries.iter().map(|(_, b)| b.to_string()).collect();
    books.sort_unstable();
    books.dedup();
    if books.len() != entries.len() {
        return Err(Error::Validation("A book can appear only once".into()));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    for (_, book_id) in entries {
        let owned: bool = tx
            .query_row(
                "SELECT COUNT(*) > 0 FROM books WHERE id = ?1 AND user_id = ?2",
                [book_id.to_string(), user_id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;
        if !owned {
            return Err(Error::not_found(BookId::ENTITY, book_id));
        }
    }

    tx.execute(
        "DELETE FROM top_books WHERE user_id = ?1 AND year = ?2",
        rusqlite::params![user_id.to_string(), year],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    for (position, book_id) in entries {
        tx.execute(
            "INSERT INTO top_books (user_id, year, position, book_id) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![user_id.to_string(), year, position, book_id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    }
    tx.commit().map_err(|e| Error::database(e.to_string()))?;

    get_top(conn, user_id, year)
}

/// Years (other than all-time) that have a list, newest first.
pub fn years(conn: &Connection, user_id: UserId) -> Result<Vec<i32>> {
    let mut stmt = conn
        .prepare(
            "SELECT DISTINCT year FROM top_books WHERE user_id = ?1 AND year != 0
             ORDER BY year DESC",
        )
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([user_id.to_string()], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::queries::books::tests::{book, user};

    #[test]
    fn replace_and_read_back() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let u = user(&conn, "ranker");
        let a = book(&conn, u, "A");
        let b = book(&conn, u, "B");

        let list = replace_top(&conn, u, 2024, &[(2, a.id), (1, b.id)]).unwrap();
        let titles: Vec<_> = list.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["B", "A"]);

        replace_top(&conn, u, 2024, &[(1, a.id)]).unwrap();
        assert_eq!(get_top(&conn, u, 2024).unwrap().len(), 1);
        assert!(get_top(&conn, u, ALL_TIME).unwrap().is_empty());
        assert_eq!(years(&conn, u).unwrap(), vec![2024]);
    }

    #[test]
    fn invalid_input_keeps_previous_list() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let u = user(&conn, "ranker");
        let other = user(&conn, "other");
        let a = book(&conn, u, "A");
        let b = book(&conn, u, "B");
        let foreign = book(&conn, other, "Not mine");
        replace_top(&conn, u, ALL_TIME, &[(1, a.id)]).unwrap();

        assert!(matches!(
            replace_top(&conn, u, ALL_TIME, &[(11, b.id)]),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            replace_top(&conn, u, ALL_TIME, &[(1, b.id), (1, a.id)]),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            replace_top(&conn, u, ALL_TIME, &[(1, b.id), (2, b.id)]),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            replace_top(&conn, u, ALL_TIME, &[(1, b.id), (2, foreign.id)]),
            Err(Error::NotFound { .. })
        ));

        let list = get_top(&conn, u, ALL_TIME).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].book_id, a.id);
    }
}
