//! Genre operations and book-genre links.

use folio_core::{BookId, Error, GenreId, Result, UserId};
use rusqlite::{Connection, OptionalExtension};

use crate::models::{Genre, GenreWithCount};

/// Find a genre by name (case-insensitive) or create it.
pub fn upsert(conn: &Connection, user_id: UserId, name: &str) -> Result<Genre> {
    conn.execute(
        "INSERT OR IGNORE INTO genres (id, user_id, name) VALUES (?1, ?2, ?3)",
        rusqlite::params![GenreId::new().to_string(), user_id.to_string(), name],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    conn.query_row(
        "SELECT id, name FROM genres WHERE user_id = ?1 AND name = ?2",
        [user_id.to_string(), name.to_string()],
        Genre::from_row,
    )
    .map_err(|e| Error::database(e.to_string()))
}

pub fn get_genre(conn: &Connection, user_id: UserId, id: GenreId) -> Result<Option<Genre>> {
    conn.query_row(
        "SELECT id, name FROM genres WHERE id = ?1 AND user_id = ?2",
        [id.to_string(), user_id.to_string()],
        Genre::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

pub fn list_with_counts(conn: &Connection, user_id: UserId) -> Result<Vec<GenreWithCount>> {
    let mut stmt = conn
        .prepare(
            "SELECT g.id, g.name, COUNT(bg.book_id)
             FROM genres g LEFT JOIN book_genres bg ON bg.genre_id = g.id
             WHERE g.user_id = ?1
             GROUP BY g.id
             ORDER BY g.name COLLATE NOCASE",
        )
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([user_id.to_string()], |row| {
            Ok(GenreWithCount {
                genre: Genre::from_row(row)?,
                book_count: row.get(2)?,
            })
        })
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

pub fn for_book(conn: &Connection, book_id: BookId) -> Result<Vec<Genre>> {
    let mut stmt = conn
        .prepare(
            "SELECT g.id, g.name FROM genres g JOIN book_genres bg ON bg.genre_id = g.id
             WHERE bg.book_id = ?1 ORDER BY g.name COLLATE NOCASE",
        )
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([book_id.to_string()], Genre::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Replace the genres of a book.
pub fn set_book_genres(conn: &Connection, book_id: BookId, genres: &[GenreId]) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    tx.execute(
        "DELETE FROM book_genres WHERE book_id = ?1",
        [book_id.to_string()],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    for genre_id in genres {
        tx.execute(
            "INSERT OR IGNORE INTO book_genres (book_id, genre_id) VALUES (?1, ?2)",
            [book_id.to_string(), genre_id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    }
    tx.commit().map_err(|e| Error::database(e.to_string()))
}

/// Upsert each name and make them the book's genres.
pub fn link_by_name(
    conn: &Connection,
    user_id: UserId,
    book_id: BookId,
    names: &[String],
) -> Result<Vec<Genre>> {
    let genres = names
        .iter()
        .map(|name| upsert(conn, user_id, name))
        .collect::<Result<Vec<_>>>()?;
    let ids: Vec<_> = genres.iter().map(|g| g.id).collect();
    set_book_genres(conn, book_id, &ids)?;
    Ok(genres)
}

pub fn rename(conn: &Connection, user_id: UserId, id: GenreId, name: &str) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE genres SET name = ?1 WHERE id = ?2 AND user_id = ?3",
            rusqlite::params![name, id.to_string(), user_id.to_string()],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                Error::Conflict(format!("Genre '{name}' already exists"))
            } else {
                Error::database(e.to_string())
            }
        })?;
    Ok(n > 0)
}

pub fn delete_genre(conn: &Connection, user_id: UserId, id: GenreId) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM genres WHERE id = ?1 AND user_id = ?2",
            [id.to_string(), user_id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
