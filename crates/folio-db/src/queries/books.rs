//! Book CRUD, filtered listing, and random selection.

use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use folio_core::{BookId, BookStatus, CollectionId, Error, Result, SeriesId, UserId};
use rand::Rng;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};

use crate::models::Book;

/// Book columns in `Book::from_row` order, qualified with the `b` alias.
pub(crate) const COLS: &str = "b.id, b.user_id, b.title, b.subtitle, b.isbn, b.publisher, \
     b.published_year, b.page_count, b.language, b.description, b.cover_url, b.google_books_id, \
     b.status, b.rating, b.comment, b.started_at, b.finished_at, b.series_id, b.series_index, \
     b.favorite, b.created_at, b.updated_at";

/// Largest page size accepted by [`list_books`].
pub const MAX_LIMIT: u32 = 200;

/// Fields needed to insert a book. Shelf fields must already satisfy the
/// status rules; see [`folio_core::shelf::ShelfState`].
#[derive(Debug, Clone, Default)]
pub struct NewBook {
    pub title: String,
    pub subtitle: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub page_count: Option<i64>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub google_books_id: Option<String>,
    pub status: BookStatus,
    pub rating: Option<f64>,
    pub comment: Option<String>,
    pub started_at: Option<NaiveDate>,
    pub finished_at: Option<NaiveDate>,
    pub series_id: Option<SeriesId>,
    pub series_index: Option<f64>,
    pub favorite: bool,
}

fn date_str(d: Option<NaiveDate>) -> Option<String> {
    d.map(|d| d.format("%Y-%m-%d").to_string())
}

/// Insert a book and return it.
pub fn create_book(conn: &Connection, user_id: UserId, new: &NewBook) -> Result<Book> {
    let id = BookId::new();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO books (id, user_id, title, subtitle, isbn, publisher, published_year,
             page_count, language, description, cover_url, google_books_id, status, rating,
             comment, started_at, finished_at, series_id, series_index, favorite,
             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                 ?18, ?19, ?20, ?21, ?21)",
        rusqlite::params![
            id.to_string(),
            user_id.to_string(),
            new.title,
            new.subtitle,
            new.isbn,
            new.publisher,
            new.published_year,
            new.page_count,
            new.language,
            new.description,
            new.cover_url,
            new.google_books_id,
            new.status.as_str(),
            new.rating,
            new.comment,
            date_str(new.started_at),
            date_str(new.finished_at),
            new.series_id.map(|s| s.to_string()),
            new.series_index,
            new.favorite,
            now,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    require_book(conn, user_id, id)
}

/// Get a book owned by `user_id`.
pub fn get_book(conn: &Connection, user_id: UserId, id: BookId) -> Result<Option<Book>> {
    conn.query_row(
        &format!("SELECT {COLS} FROM books b WHERE b.id = ?1 AND b.user_id = ?2"),
        [id.to_string(), user_id.to_string()],
        Book::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Like [`get_book`] but a missing book is an error.
pub fn require_book(conn: &Connection, user_id: UserId, id: BookId) -> Result<Book> {
    get_book(conn, user_id, id)?.ok_or_else(|| Error::not_found(BookId::ENTITY, id))
}

/// Write every mutable column of `book` back and bump `updated_at`.
pub fn save_book(conn: &Connection, book: &Book) -> Result<Book> {
    let now = Utc::now().to_rfc3339();
    let n = conn
        .execute(
            "UPDATE books SET title = ?1, subtitle = ?2, isbn = ?3, publisher = ?4,
                 published_year = ?5, page_count = ?6, language = ?7, description = ?8,
                 cover_url = ?9, google_books_id = ?10, status = ?11, rating = ?12,
                 comment = ?13, started_at = ?14, finished_at = ?15, series_id = ?16,
                 series_index = ?17, favorite = ?18, updated_at = ?19
             WHERE id = ?20 AND user_id = ?21",
            rusqlite::params![
                book.title,
                book.subtitle,
                book.isbn,
                book.publisher,
                book.published_year,
                book.page_count,
                book.language,
                book.description,
                book.cover_url,
                book.google_books_id,
                book.status.as_str(),
                book.rating,
                book.comment,
                date_str(book.started_at),
                date_str(book.finished_at),
                book.series_id.map(|s| s.to_string()),
                book.series_index,
                book.favorite,
                now,
                book.id.to_string(),
                book.user_id.to_string(),
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    if n == 0 {
        return Err(Error::not_found(BookId::ENTITY, book.id));
    }
    require_book(conn, book.user_id, book.id)
}

/// Delete a book. Returns true if a row was deleted.
pub fn delete_book(conn: &Connection, user_id: UserId, id: BookId) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM books WHERE id = ?1 AND user_id = ?2",
            [id.to_string(), user_id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookSort {
    Title,
    #[default]
    Created,
    Updated,
    Rating,
    Finished,
}

impl BookSort {
    fn column(self) -> &'static str {
        match self {
            Self::Title => "b.title COLLATE NOCASE",
            Self::Created => "b.created_at",
            Self::Updated => "b.updated_at",
            Self::Rating => "b.rating",
            Self::Finished => "b.finished_at",
        }
    }
}

impl FromStr for BookSort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "title" => Ok(Self::Title),
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "rating" => Ok(Self::Rating),
            "finished" => Ok(Self::Finished),
            other => Err(Error::Validation(format!("Unknown sort '{other}'"))),
        }
    }
}

/// Filter, sort and paging options for [`list_books`].
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub status: Option<BookStatus>,
    pub genre: Option<String>,
    pub author: Option<String>,
    pub collection: Option<CollectionId>,
    pub series: Option<SeriesId>,
    pub favorite: Option<bool>,
    /// Case-insensitive match on title, subtitle, ISBN or author name.
    pub q: Option<String>,
    pub sort: BookSort,
    pub descending: bool,
    pub offset: u32,
    pub limit: Option<u32>,
}

/// One page of books plus the total number of matches.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BookPage {
    pub items: Vec<Book>,
    pub total: i64,
    pub offset: u32,
    pub limit: u32,
}

fn like_pattern(q: &str) -> String {
    let escaped = q
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Build the `FROM ... WHERE ...` part shared by listing, counting and
/// random selection.
fn filter_sql(user_id: UserId, filter: &BookFilter) -> (String, Vec<Value>) {
    let mut sql = String::from("FROM books b WHERE b.user_id = ?");
    let mut params = vec![Value::Text(user_id.to_string())];

    if let Some(status) = filter.status {
        sql.push_str(" AND b.status = ?");
        params.push(Value::Text(status.as_str().into()));
    }
    if let Some(genre) = &filter.genre {
        sql.push_str(
            " AND EXISTS (SELECT 1 FROM book_genres bg JOIN genres g ON g.id = bg.genre_id
                          WHERE bg.book_id = b.id AND g.name = ?)",
        );
        params.push(Value::Text(genre.clone()));
    }
    if let Some(author) = &filter.author {
        sql.push_str(
            " AND EXISTS (SELECT 1 FROM book_authors ba JOIN authors a ON a.id = ba.author_id
                          WHERE ba.book_id = b.id AND a.name = ?)",
        );
        params.push(Value::Text(author.clone()));
    }
    if let Some(collection) = filter.collection {
        sql.push_str(
            " AND EXISTS (SELECT 1 FROM collection_books cb
                          WHERE cb.book_id = b.id AND cb.collection_id = ?)",
        );
        params.push(Value::Text(collection.to_string()));
    }
    if let Some(series) = filter.series {
        sql.push_str(" AND b.series_id = ?");
        params.push(Value::Text(series.to_string()));
    }
    if let Some(favorite) = filter.favorite {
        sql.push_str(" AND b.favorite = ?");
        params.push(Value::Integer(favorite as i64));
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        sql.push_str(
            " AND (b.title LIKE ? ESCAPE '\\' OR b.subtitle LIKE ? ESCAPE '\\'
                   OR b.isbn LIKE ? ESCAPE '\\'
                   OR EXISTS (SELECT 1 FROM book_authors ba JOIN authors a ON a.id = ba.author_id
                              WHERE ba.book_id = b.id AND a.name LIKE ? ESCAPE '\\'))",
        );
        let pattern = like_pattern(q);
        for _ in 0..4 {
            params.push(Value::Text(pattern.clone()));
        }
    }
    (sql, params)
}

/// Count books matching `filter` (paging is ignored).
pub fn count_books(conn: &Connection, user_id: UserId, filter: &BookFilter) -> Result<i64> {
    let (from, params) = filter_sql(user_id, filter);
    conn.query_row(
        &format!("SELECT COUNT(*) {from}"),
        params_from_iter(params),
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// List books matching `filter`. The limit is clamped to `1..=200`.
pub fn list_books(conn: &Connection, user_id: UserId, filter: &BookFilter) -> Result<BookPage> {
    let limit = filter.limit.unwrap_or(50).clamp(1, MAX_LIMIT);
    let total = count_books(conn, user_id, filter)?;

    let (from, mut params) = filter_sql(user_id, filter);
    let column = filter.sort.column();
    let dir = if filter.descending { "DESC" } else { "ASC" };
    let sql = format!(
        "SELECT {COLS} {from}
         ORDER BY {column} IS NULL, {column} {dir}, b.title COLLATE NOCASE ASC, b.id
         LIMIT ? OFFSET ?"
    );
    params.push(Value::Integer(limit as i64));
    params.push(Value::Integer(filter.offset as i64));

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| Error::database(e.to_string()))?;
    let items = stmt
        .query_map(params_from_iter(params), Book::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(BookPage {
        items,
        total,
        offset: filter.offset,
        limit,
    })
}

/// Every book of a user, ordered by title.
pub fn all_books(conn: &Connection, user_id: UserId) -> Result<Vec<Book>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLS} FROM books b WHERE b.user_id = ?1 ORDER BY b.title COLLATE NOCASE, b.id"
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([user_id.to_string()], Book::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Pick a uniformly random book among those matching `filter` by counting
/// the matches and fetching one at a random offset.
pub fn random_book(conn: &Connection, user_id: UserId, filter: &BookFilter) -> Result<Option<Book>> {
    let count = count_books(conn, user_id, filter)?;
    if count == 0 {
        return Ok(None);
    }
    let offset = rand::thread_rng().gen_range(0..count);

    let (from, mut params) = filter_sql(user_id, filter);
    params.push(Value::Integer(offset));
    conn.query_row(
        &format!("SELECT {COLS} {from} ORDER BY b.id LIMIT 1 OFFSET ?"),
        params_from_iter(params),
        Book::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Check that every id in `ids` is a book owned by `user_id`.
pub fn all_owned(conn: &Connection, user_id: UserId, ids: &[BookId]) -> Result<bool> {
    for id in ids {
        if get_book(conn, user_id, *id)?.is_none() {
            return Ok(false);
        }
    }
    Ok(true)
}
