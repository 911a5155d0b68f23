//! Reading sessions.

use chrono::{NaiveDate, Utc};
use folio_core::{BookId, Error, ReadingLogId, Result, UserId};
use rusqlite::{Connection, OptionalExtension};

use crate::models::ReadingLog;

const SELECT: &str = "SELECT l.id, l.book_id, b.title, l.date, l.pages_read, l.minutes, l.note,
        l.created_at
     FROM reading_logs l JOIN books b ON b.id = l.book_id";

#[derive(Debug, Clone)]
pub struct NewLog {
    pub book_id: BookId,
    pub date: NaiveDate,
    pub pages_read: i64,
    pub minutes: Option<i64>,
    pub note: Option<String>,
}

fn day(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub fn create_log(conn: &Connection, user_id: UserId, new: &NewLog) -> Result<ReadingLog> {
    let id = ReadingLogId::new();
    conn.execute(
        "INSERT INTO reading_logs (id, user_id, book_id, date, pages_read, minutes, note, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            id.to_string(),
            user_id.to_string(),
            new.book_id.to_string(),
            day(new.date),
            new.pages_read,
            new.minutes,
            new.note,
            Utc::now().to_rfc3339()
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    get_log(conn, user_id, id)?.ok_or_else(|| Error::not_found(ReadingLogId::ENTITY, id))
}

pub fn get_log(conn: &Connection, user_id: UserId, id: ReadingLogId) -> Result<Option<ReadingLog>> {
    conn.query_row(
        &format!("{SELECT} WHERE l.id = ?1 AND l.user_id = ?2"),
        [id.to_string(), user_id.to_string()],
        ReadingLog::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Sessions of a user between two dates (inclusive), newest first. Either
/// bound may be open. `book_id` narrows to one book.
pub fn list_logs(
    conn: &Connection,
    user_id: UserId,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    book_id: Option<BookId>,
) -> Result<Vec<ReadingLog>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT}
             WHERE l.user_id = ?1
               AND (?2 IS NULL OR l.date >= ?2)
               AND (?3 IS NULL OR l.date <= ?3)
               AND (?4 IS NULL OR l.book_id = ?4)
             ORDER BY l.date DESC, l.created_at DESC"
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![
                user_id.to_string(),
                from.map(day),
                to.map(day),
                book_id.map(|b| b.to_string())
            ],
            ReadingLog::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

pub fn update_log(conn: &Connection, user_id: UserId, log: &ReadingLog) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE reading_logs SET date = ?1, pages_read = ?2, minutes = ?3, note = ?4
             WHERE id = ?5 AND user_id = ?6",
            rusqlite::params![
                day(log.date),
                log.pages_read,
                log.minutes,
                log.note,
                log.id.to_string(),
                user_id.to_string()
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

pub fn delete_log(conn: &Connection, user_id: UserId, id: ReadingLogId) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM reading_logs WHERE id = ?1 AND user_id = ?2",
            [id.to_string(), user_id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Distinct days with at least one session, ascending.
pub fn active_dates(conn: &Connection, user_id: UserId) -> Result<Vec<NaiveDate>> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT date FROM reading_logs WHERE user_id = ?1 ORDER BY date")
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([user_id.to_string()], |row| crate::models::parse_date(row, 0))
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

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn crud_and_range() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let u = user(&conn, "logger");
        let b = book(&conn, u, "Middlemarch");
        let mut log = create_log(
            &conn,
            u,
            &NewLog {
                book_id: b.id,
                date: d("2024-03-01"),
                pages_read: 40,
                minutes: Some(60),
                note: None,
            },
        )
        .unwrap();
        assert_eq!(log.book_title, "Middlemarch");
        create_log(
            &conn,
            u,
            &NewLog {
                book_id: b.id,
                date: d("2024-04-01"),
                pages_read: 10,
                minutes: None,
                note: Some("train".into()),
            },
        )
        .unwrap();

        let march = list_logs(&conn, u, Some(d("2024-03-01")), Some(d("2024-03-31")), None).unwrap();
        assert_eq!(march.len(), 1);
        assert_eq!(list_logs(&conn, u, None, None, Some(b.id)).unwrap().len(), 2);

        log.pages_read = 55;
        assert!(update_log(&conn, u, &log).unwrap());
        assert_eq!(get_log(&conn, u, log.id).unwrap().unwrap().pages_read, 55);

        assert!(delete_log(&conn, u, log.id).unwrap());
        assert_eq!(active_dates(&conn, u).unwrap(), vec![d("2024-04-01")]);
    }

    #[test]
    fn active_dates_are_distinct() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let u = user(&conn, "logger");
        let b = book(&conn, u, "Emma");
        for date in ["2024-01-02", "2024-01-01", "2024-01-02"] {
            create_log(
                &conn,
                u,
                &NewLog {
                    book_id: b.id,
                    date: d(date),
                    pages_read: 5,
                    minutes: None,
                    note: None,
                },
            )
            .unwrap();
        }
        assert_eq!(
            active_dates(&conn, u).unwrap(),
            vec![d("2024-01-01"), d("2024-01-02")]
        );
    }
}
