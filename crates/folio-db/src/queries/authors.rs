//! Author operations and book-author links.

use chrono::Utc;
use folio_core::{AuthorId, BookId, Error, Result, UserId};
use rusqlite::{Connection, OptionalExtension};

use crate::models::{Author, AuthorWithCount};

const COLS: &str = "a.id, a.name, a.bio, a.wikipedia_url, a.created_at";

fn unique_violation(e: rusqlite::Error, name: &str) -> Error {
    if e.to_string().contains("UNIQUE constraint failed") {
        Error::Conflict(format!("Author '{name}' already exists"))
    } else {
        Error::database(e.to_string())
    }
}

/// Find an author by name (case-insensitive) or create it.
pub fn upsert(conn: &Connection, user_id: UserId, name: &str) -> Result<Author> {
    conn.execute(
        "INSERT OR IGNORE INTO authors (id, user_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            AuthorId::new().to_string(),
            user_id.to_string(),
            name,
            Utc::now().to_rfc3339()
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    conn.query_row(
        &format!("SELECT {COLS} FROM authors a WHERE a.user_id = ?1 AND a.name = ?2"),
        [user_id.to_string(), name.to_string()],
        Author::from_row,
    )
    .map_err(|e| Error::database(e.to_string()))
}

pub fn get_author(conn: &Connection, user_id: UserId, id: AuthorId) -> Result<Option<Author>> {
    conn.query_row(
        &format!("SELECT {COLS} FROM authors a WHERE a.id = ?1 AND a.user_id = ?2"),
        [id.to_string(), user_id.to_string()],
        Author::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// All authors of a user with how many books each is linked to.
pub fn list_with_counts(conn: &Connection, user_id: UserId) -> Result<Vec<AuthorWithCount>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLS}, COUNT(ba.book_id)
             FROM authors a LEFT JOIN book_authors ba ON ba.author_id = a.id
             WHERE a.user_id = ?1
             GROUP BY a.id
             ORDER BY a.name COLLATE NOCASE"
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([user_id.to_string()], |row| {
            Ok(AuthorWithCount {
                author: Author::from_row(row)?,
                book_count: row.get(5)?,
            })
        })
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Authors of a book in credit order.
pub fn for_book(conn: &Connection, book_id: BookId) -> Result<Vec<Author>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLS} FROM authors a JOIN book_authors ba ON ba.author_id = a.id
             WHERE ba.book_id = ?1 ORDER BY ba.position"
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([book_id.to_string()], Author::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Replace the author list of a book, keeping the given order.
pub fn set_book_authors(conn: &Connection, book_id: BookId, authors: &[AuthorId]) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    tx.execute(
        "DELETE FROM book_authors WHERE book_id = ?1",
        [book_id.to_string()],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    for (position, author_id) in authors.iter().enumerate() {
        tx.execute(
            "INSERT OR IGNORE INTO book_authors (book_id, author_id, position) VALUES (?1, ?2, ?3)",
            rusqlite::params![book_id.to_string(), author_id.to_string(), position as i64],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    }
    tx.commit().map_err(|e| Error::database(e.to_string()))
}

/// Upsert each name and link them to the book in order.
pub fn link_by_name(
    conn: &Connection,
    user_id: UserId,
    book_id: BookId,
    names: &[String],
) -> Result<Vec<Author>> {
    let authors = names
        .iter()
        .map(|name| upsert(conn, user_id, name))
        .collect::<Result<Vec<_>>>()?;
    let ids: Vec<_> = authors.iter().map(|a| a.id).collect();
    set_book_authors(conn, book_id, &ids)?;
    Ok(authors)
}

pub fn rename(conn: &Connection, user_id: UserId, id: AuthorId, name: &str) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE authors SET name = ?1 WHERE id = ?2 AND user_id = ?3",
            rusqlite::params![name, id.to_string(), user_id.to_string()],
        )
        .map_err(|e| unique_violation(e, name))?;
    Ok(n > 0)
}

/// Store the Wikipedia extract and page URL for an author.
pub fn set_biography(
    conn: &Connection,
    user_id: UserId,
    id: AuthorId,
    bio: Option<&str>,
    wikipedia_url: Option<&str>,
) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE authors SET bio = ?1, wikipedia_url = ?2 WHERE id = ?3 AND user_id = ?4",
            rusqlite::params![bio, wikipedia_url, id.to_string(), user_id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Delete an author; its book links go with it.
pub fn delete_author(conn: &Connection, user_id: UserId, id: AuthorId) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM authors WHERE id = ?1 AND user_id = ?2",
            [id.to_string(), user_id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
