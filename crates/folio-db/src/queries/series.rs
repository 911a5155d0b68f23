//! Series CRUD and reading progress.

use chrono::Utc;
use folio_core::{Error, Result, SeriesId, UserId};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::models::{Book, Series};
use crate::queries::books::COLS as BOOK_COLS;

const COLS: &str = "id, name, description, total_volumes, created_at";

fn map_unique(e: rusqlite::Error, name: &str) -> Error {
    if e.to_string().contains("UNIQUE constraint failed") {
        Error::Conflict(format!("Series '{name}' already exists"))
    } else {
        Error::database(e.to_string())
    }
}

pub fn create_series(
    conn: &Connection,
    user_id: UserId,
    name: &str,
    description: Option<&str>,
    total_volumes: Option<i64>,
) -> Result<Series> {
    let id = SeriesId::new();
    let created_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO series (id, user_id, name, description, total_volumes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            id.to_string(),
            user_id.to_string(),
            name,
            description,
            total_volumes,
            created_at
        ],
    )
    .map_err(|e| map_unique(e, name))?;

    Ok(Series {
        id,
        name: name.to_string(),
        description: description.map(str::to_string),
        total_volumes,
        created_at,
    })
}

pub fn get_series(conn: &Connection, user_id: UserId, id: SeriesId) -> Result<Option<Series>> {
    conn.query_row(
        &format!("SELECT {COLS} FROM series WHERE id = ?1 AND user_id = ?2"),
        [id.to_string(), user_id.to_string()],
        Series::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

pub fn require_series(conn: &Connection, user_id: UserId, id: SeriesId) -> Result<Series> {
    get_series(conn, user_id, id)?.ok_or_else(|| Error::not_found(SeriesId::ENTITY, id))
}

pub fn list_series(conn: &Connection, user_id: UserId) -> Result<Vec<Series>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLS} FROM series WHERE user_id = ?1 ORDER BY name COLLATE NOCASE"
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([user_id.to_string()], Series::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

pub fn update_series(conn: &Connection, user_id: UserId, series: &Series) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE series SET name = ?1, description = ?2, total_volumes = ?3
             WHERE id = ?4 AND user_id = ?5",
            rusqlite::params![
                series.name,
                series.description,
                series.total_volumes,
                series.id.to_string(),
                user_id.to_string()
            ],
        )
        .map_err(|e| map_unique(e, &series.name))?;
    Ok(n > 0)
}

/// Delete a series; its books stay and lose the reference.
pub fn delete_series(conn: &Connection, user_id: UserId, id: SeriesId) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM series WHERE id = ?1 AND user_id = ?2",
            [id.to_string(), user_id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Books in a series ordered by volume index, then title.
pub fn books_in(conn: &Connection, id: SeriesId) -> Result<Vec<Book>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {BOOK_COLS} FROM books b WHERE b.series_id = ?1
             ORDER BY b.series_index IS NULL, b.series_index, b.title COLLATE NOCASE"
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([id.to_string()], Book::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesProgress {
    pub read: i64,
    pub known: i64,
    /// `total_volumes` when set, otherwise the number of known books.
    pub total: i64,
    pub percent: f64,
    pub complete: bool,
}

impl SeriesProgress {
    pub fn compute(books: &[Book], total_volumes: Option<i64>) -> Self {
        let read = books
            .iter()
            .filter(|b| b.status == folio_core::BookStatus::Read)
            .count() as i64;
        let known = books.len() as i64;
        let total = total_volumes.filter(|t| *t > 0).unwrap_or(known);
        let percent = if total == 0 {
            0.0
        } else {
            (read as f64 / total as f64 * 100.0).min(100.0)
        };
        Self {
            read,
            known,
            total,
            percent,
            complete: total > 0 && read >= total,
        }
    }
}

/// Number of series where every volume has been read.
pub fn count_completed(conn: &Connection, user_id: UserId) -> Result<u32> {
    let mut completed = 0;
    for series in list_series(conn, user_id)? {
        let books = books_in(conn, series.id)?;
        if SeriesProgress::compute(&books, series.total_volumes).complete {
            completed += 1;
        }
    }
    Ok(completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::queries::books::{self, tests::user, NewBook};
    use folio_core::BookStatus;

    fn volume(conn: &Connection, u: UserId, s: SeriesId, title: &str, index: f64, status: BookStatus) {
        books::create_book(
            conn,
            u,
            &NewBook {
                title: title.into(),
                series_id: Some(s),
                series_index: Some(index),
                status,
                ..Default::default()
            },
        )
        .unwrap();
    }

    #[test]
    fn ordered_volumes_and_progress() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let u = user(&conn, "fan");
        let s = create_series(&conn, u, "Earthsea", None, Some(3)).unwrap();
        volume(&conn, u, s.id, "The Tombs of Atuan", 2.0, BookStatus::Read);
        volume(&conn, u, s.id, "A Wizard of Earthsea", 1.0, BookStatus::Read);

        let list = books_in(&conn, s.id).unwrap();
        assert_eq!(list[0].title, "A Wizard of Earthsea");

        let progress = SeriesProgress::compute(&list, s.total_volumes);
        assert_eq!(progress.read, 2);
        assert_eq!(progress.total, 3);
        assert!(!progress.complete);
        assert_eq!(count_completed(&conn, u).unwrap(), 0);

        volume(&conn, u, s.id, "The Farthest Shore", 3.0, BookStatus::Read);
        assert_eq!(count_completed(&conn, u).unwrap(), 1);
    }

    #[test]
    fn progress_without_total_uses_known_books() {
        let p = SeriesProgress::compute(&[], None);
        assert_eq!(p.total, 0);
        assert!(!p.complete);
        assert_eq!(p.percent, 0.0);
    }

    #[test]
    fn delete_keeps_books() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let u = user(&conn, "fan");
        let s = create_series(&conn, u, "Dune", None, None).unwrap();
        volume(&conn, u, s.id, "Dune", 1.0, BookStatus::ToRead);
        assert!(delete_series(&conn, u, s.id).unwrap());
        let all = books::all_books(&conn, u).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].series_id, None);
    }
}
