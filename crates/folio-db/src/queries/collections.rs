//! Collections and their book membership.

use chrono::Utc;
use folio_core::{BookId, CollectionId, Error, Result, UserId};
use rusqlite::{Connection, OptionalExtension};

use crate::models::{Book, Collection};
use crate::queries::books::COLS as BOOK_COLS;

const SELECT: &str = "SELECT c.id, c.name, c.description, c.created_at,
        (SELECT COUNT(*) FROM collection_books cb WHERE cb.collection_id = c.id)
     FROM collections c";

fn map_unique(e: rusqlite::Error, name: &str) -> Error {
    if e.to_string().contains("UNIQUE constraint failed") {
        Error::Conflict(format!("Collection '{name}' already exists"))
    } else {
        Error::database(e.to_string())
    }
}

pub fn create_collection(
    conn: &Connection,
    user_id: UserId,
    name: &str,
    description: Option<&str>,
) -> Result<Collection> {
    let id = CollectionId::new();
    let created_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO collections (id, user_id, name, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id.to_string(), user_id.to_string(), name, description, created_at],
    )
    .map_err(|e| map_unique(e, name))?;

    Ok(Collection {
        id,
        name: name.to_string(),
        description: description.map(str::to_string),
        created_at,
        book_count: 0,
    })
}

pub fn get_collection(
    conn: &Connection,
    user_id: UserId,
    id: CollectionId,
) -> Result<Option<Collection>> {
    conn.query_row(
        &format!("{SELECT} WHERE c.id = ?1 AND c.user_id = ?2"),
        [id.to_string(), user_id.to_string()],
        Collection::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

pub fn require_collection(conn: &Connection, user_id: UserId, id: CollectionId) -> Result<Collection> {
    get_collection(conn, user_id, id)?.ok_or_else(|| Error::not_found(CollectionId::ENTITY, id))
}

pub fn list_collections(conn: &Connection, user_id: UserId) -> Result<Vec<Collection>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT} WHERE c.user_id = ?1 ORDER BY c.name COLLATE NOCASE"
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([user_id.to_string()], Collection::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

pub fn update_collection(
    conn: &Connection,
    user_id: UserId,
    id: CollectionId,
    name: &str,
    description: Option<&str>,
) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE collections SET name = ?1, description = ?2 WHERE id = ?3 AND user_id = ?4",
            rusqlite::params![name, description, id.to_string(), user_id.to_string()],
        )
        .map_err(|e| map_unique(e, name))?;
    Ok(n > 0)
}

pub fn delete_collection(conn: &Connection, user_id: UserId, id: CollectionId) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM collections WHERE id = ?1 AND user_id = ?2",
            [id.to_string(), user_id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Add a book to a collection. Adding a book twice is a no-op; returns
/// whether a row was inserted.
pub fn add_book(conn: &Connection, id: CollectionId, book_id: BookId) -> Result<bool> {
    let n = conn
        .execute(
            "INSERT OR IGNORE INTO collection_books (collection_id, book_id, added_at)
             VALUES (?1, ?2, ?3)",
            [id.to_string(), book_id.to_string(), Utc::now().to_rfc3339()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

pub fn remove_book(conn: &Connection, id: CollectionId, book_id: BookId) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM collection_books WHERE collection_id = ?1 AND book_id = ?2",
            [id.to_string(), book_id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Books of a collection, most recently added first.
pub fn books_in(conn: &Connection, id: CollectionId) -> Result<Vec<Book>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {BOOK_COLS} FROM books b JOIN collection_books cb ON cb.book_id = b.id
             WHERE cb.collection_id = ?1
             ORDER BY cb.added_at DESC, b.title COLLATE NOCASE"
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([id.to_string()], Book::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Collections a book belongs to.
pub fn for_book(conn: &Connection, book_id: BookId) -> Result<Vec<Collection>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT} JOIN collection_books m ON m.collection_id = c.id
             WHERE m.book_id = ?1 ORDER BY c.name COLLATE NOCASE"
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([book_id.to_string()], Collection::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}
