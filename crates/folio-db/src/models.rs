//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`; column order is fixed by the `COLS` constant of the
//! matching query module.

use chrono::NaiveDate;
use folio_core::rating::StoredRating;
use folio_core::{
    AuthorId, BookId, BookStatus, CollectionId, GenreId, GoalId, ImageId, ImageProvider, QuoteId,
    ReadingLogId, Role, SeriesId, SessionId, UserId, WordId,
};
use rusqlite::types::{Type, Value};
use serde::Serialize;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Parse a UUID-based ID from a text column.
pub(crate) fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))?;
    Ok(T::from(uuid))
}

pub(crate) fn parse_opt_id<T: From<Uuid>>(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|v| Uuid::parse_str(&v).map(T::from).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// Parse a column holding a string that round-trips through `FromStr`.
fn parse_enum<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = folio_core::Error>,
{
    let s: String = row.get(idx)?;
    s.parse().map_err(|e| conversion_error(idx, e))
}

pub(crate) fn parse_opt_date(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<Option<NaiveDate>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d").map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(crate) fn parse_date(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conversion_error(idx, e))
}

/// Read a rating column without coercion.
pub(crate) fn stored_rating(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<StoredRating> {
    Ok(match row.get::<_, Value>(idx)? {
        Value::Null | Value::Blob(_) => StoredRating::Null,
        Value::Integer(i) => StoredRating::Integer(i),
        Value::Real(r) => StoredRating::Real(r),
        Value::Text(s) => StoredRating::Text(s),
    })
}

/// Read a rating column, treating anything that is not a valid number on the
/// grid as absent.
fn lenient_rating(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match stored_rating(row, idx)? {
        StoredRating::Integer(i) => folio_core::validate_rating(i as f64).ok(),
        StoredRating::Real(r) => folio_core::validate_rating(r).ok(),
        StoredRating::Null | StoredRating::Text(_) => None,
    })
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: String,
}

impl User {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            role: parse_enum(row, 3)?,
            created_at: row.get(4)?,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// ---------------------------------------------------------------------------
// AuthToken
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AuthToken {
    pub id: SessionId,
    pub user_id: UserId,
    pub token: String,
    pub expires_at: String,
}

impl AuthToken {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            user_id: parse_id(row, 1)?,
            token: row.get(2)?,
            expires_at: row.get(3)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Book
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Book {
    pub id: BookId,
    #[serde(skip)]
    pub user_id: UserId,
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
    pub created_at: String,
    pub updated_at: String,
}

impl Book {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            user_id: parse_id(row, 1)?,
            title: row.get(2)?,
            subtitle: row.get(3)?,
            isbn: row.get(4)?,
            publisher: row.get(5)?,
            published_year: row.get(6)?,
            page_count: row.get(7)?,
            language: row.get(8)?,
            description: row.get(9)?,
            cover_url: row.get(10)?,
            google_books_id: row.get(11)?,
            status: parse_enum(row, 12)?,
            rating: lenient_rating(row, 13)?,
            comment: row.get(14)?,
            started_at: parse_opt_date(row, 15)?,
            finished_at: parse_opt_date(row, 16)?,
            series_id: parse_opt_id(row, 17)?,
            series_index: row.get(18)?,
            favorite: row.get(19)?,
            created_at: row.get(20)?,
            updated_at: row.get(21)?,
        })
    }

    pub fn shelf(&self) -> folio_core::shelf::ShelfState {
        folio_core::shelf::ShelfState {
            status: self.status,
            rating: self.rating,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Author / Genre
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
    pub bio: Option<String>,
    pub wikipedia_url: Option<String>,
    pub created_at: String,
}

impl Author {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            name: row.get(1)?,
            bio: row.get(2)?,
            wikipedia_url: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorWithCount {
    #[serde(flatten)]
    pub author: Author,
    pub book_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

impl Genre {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            name: row.get(1)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenreWithCount {
    #[serde(flatten)]
    pub genre: Genre,
    pub book_count: i64,
}

// ---------------------------------------------------------------------------
// Collection / Series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub book_count: i64,
}

impl Collection {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            created_at: row.get(3)?,
            book_count: row.get(4)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Series {
    pub id: SeriesId,
    pub name: String,
    pub description: Option<String>,
    pub total_volumes: Option<i64>,
    pub created_at: String,
}

impl Series {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            total_volumes: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Quote / Word
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub id: QuoteId,
    pub book_id: BookId,
    pub book_title: String,
    pub text: String,
    pub page: Option<i64>,
    pub created_at: String,
}

impl Quote {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            book_id: parse_id(row, 1)?,
            book_title: row.get(2)?,
            text: row.get(3)?,
            page: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Word {
    pub id: WordId,
    pub book_id: Option<BookId>,
    pub word: String,
    pub definition: Option<String>,
    pub note: Option<String>,
    pub language: String,
    pub created_at: String,
}

impl Word {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            book_id: parse_opt_id(row, 1)?,
            word: row.get(2)?,
            definition: row.get(3)?,
            note: row.get(4)?,
            language: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Goals and logs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReadingGoal {
    pub id: GoalId,
    pub year: i32,
    pub target_books: u32,
    pub target_pages: Option<u32>,
    pub created_at: String,
}

impl ReadingGoal {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            year: row.get(1)?,
            target_books: row.get(2)?,
            target_pages: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadingLog {
    pub id: ReadingLogId,
    pub book_id: BookId,
    pub book_title: String,
    pub date: NaiveDate,
    pub pages_read: i64,
    pub minutes: Option<i64>,
    pub note: Option<String>,
    pub created_at: String,
}

impl ReadingLog {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            book_id: parse_id(row, 1)?,
            book_title: row.get(2)?,
            date: parse_date(row, 3)?,
            pages_read: row.get(4)?,
            minutes: row.get(5)?,
            note: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Top books
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TopBook {
    pub position: u8,
    pub book_id: BookId,
    pub title: String,
    pub cover_url: Option<String>,
    pub rating: Option<f64>,
}

impl TopBook {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            position: row.get(0)?,
            book_id: parse_id(row, 1)?,
            title: row.get(2)?,
            cover_url: row.get(3)?,
            rating: lenient_rating(row, 4)?,
        })
    }
}

// ---------------------------------------------------------------------------
// BookImage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct BookImage {
    pub id: ImageId,
    pub book_id: BookId,
    /// Path relative to the image storage directory.
    pub path: String,
    pub provider: ImageProvider,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub hash: String,
    pub is_cover: bool,
    pub created_at: String,
}

impl BookImage {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            book_id: parse_id(row, 1)?,
            path: row.get(2)?,
            provider: parse_enum(row, 3)?,
            width: row.get(4)?,
            height: row.get(5)?,
            hash: row.get(6)?,
            is_cover: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    /// Relative path of the thumbnail variant.
    pub fn thumb_path(&self) -> String {
        match self.path.strip_suffix(".jpg") {
            Some(stem) => format!("{stem}_thumb.jpg"),
            None => format!("{}_thumb", self.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumb_path_variant() {
        let img = BookImage {
            id: ImageId::new(),
            book_id: BookId::new(),
            path: "abc/deadbeef.jpg".into(),
            provider: ImageProvider::Upload,
            width: None,
            height: None,
            hash: "deadbeef".into(),
            is_cover: false,
            created_at: String::new(),
        };
        assert_eq!(img.thumb_path(), "abc/deadbeef_thumb.jpg");
    }

    #[test]
    fn user_serialization_hides_hash() {
        let user = User {
            id: UserId::new(),
            username: "ada".into(),
            password_hash: "secret-hash".into(),
            role: Role::User,
            created_at: "2024-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"role\":\"user\""));
    }
}
