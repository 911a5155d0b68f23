//! Book image records. The bytes live on disk; see the server's image store.

use chrono::Utc;
use folio_core::{BookId, Error, ImageId, ImageProvider, Result, UserId};
use rusqlite::{Connection, OptionalExtension};

use crate::models::BookImage;

const COLS: &str = "i.id, i.book_id, i.path, i.provider, i.width, i.height, i.hash, i.is_cover, \
     i.created_at";

#[derive(Debug, Clone)]
pub struct NewImage {
    pub path: String,
    pub provider: ImageProvider,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub hash: String,
}

/// Record an image for a book. A second image with the same content hash
/// returns the existing record.
pub fn create_image(conn: &Connection, book_id: BookId, new: &NewImage) -> Result<BookImage> {
    let existing = conn
        .query_row(
            &format!("SELECT {COLS} FROM book_images i WHERE i.book_id = ?1 AND i.hash = ?2"),
            [book_id.to_string(), new.hash.clone()],
            BookImage::from_row,
        )
        .optional()
        .map_err(|e| Error::database(e.to_string()))?;
    if let Some(image) = existing {
        return Ok(image);
    }

    let id = ImageId::new();
    let created_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO book_images (id, book_id, path, provider, width, height, hash, is_cover, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
        rusqlite::params![
            id.to_string(),
            book_id.to_string(),
            new.path,
            new.provider.as_str(),
            new.width,
            new.height,
            new.hash,
            created_at
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(BookImage {
        id,
        book_id,
        path: new.path.clone(),
        provider: new.provider,
        width: new.width,
        height: new.height,
        hash: new.hash.clone(),
        is_cover: false,
        created_at,
    })
}

/// Get an image whose book belongs to `user_id`.
pub fn get_image(conn: &Connection, user_id: UserId, id: ImageId) -> Result<Option<BookImage>> {
    conn.query_row(
        &format!(
            "SELECT {COLS} FROM book_images i JOIN books b ON b.id = i.book_id
             WHERE i.id = ?1 AND b.user_id = ?2"
        ),
        [id.to_string(), user_id.to_string()],
        BookImage::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Images of a book, cover first.
pub fn list_for_book(conn: &Connection, book_id: BookId) -> Result<Vec<BookImage>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLS} FROM book_images i WHERE i.book_id = ?1
             ORDER BY i.is_cover DESC, i.created_at"
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([book_id.to_string()], BookImage::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Make `image` the only cover of its book and point the book's
/// `cover_url` at `cover_url`.
pub fn set_cover(conn: &Connection, image: &BookImage, cover_url: &str) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    tx.execute(
        "UPDATE book_images SET is_cover = (id = ?1) WHERE book_id = ?2",
        [image.id.to_string(), image.book_id.to_string()],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    tx.execute(
        "UPDATE books SET cover_url = ?1, updated_at = ?2 WHERE id = ?3",
        [cover_url.to_string(), Utc::now().to_rfc3339(), image.book_id.to_string()],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    tx.commit().map_err(|e| Error::database(e.to_string()))
}

/// Delete an image record. Clears the book's `cover_url` when the image was
/// its cover.
pub fn delete_image(conn: &Connection, image: &BookImage) -> Result<bool> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    let n = tx
        .execute("DELETE FROM book_images WHERE id = ?1", [image.id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    if image.is_cover {
        tx.execute(
            "UPDATE books SET cover_url = NULL WHERE id = ?1",
            [image.book_id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    }
    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Whether any other record still points at `path`.
pub fn path_in_use(conn: &Connection, path: &str) -> Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM book_images WHERE path = ?1",
        [path],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}
