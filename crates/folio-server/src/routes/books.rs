//! Book CRUD, listing, and the shelf operations (status, rating, favorite).

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use folio_core::shelf::ShelfState;
use folio_core::{BookId, BookStatus, CollectionId, Error, SeriesId, UserId};
use folio_db::models::{Author, Book, BookImage, Collection, Genre, Series};
use folio_db::queries::books::{self, BookFilter, BookPage, NewBook};
use folio_db::queries::{authors, collections, genres, images, series};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use super::{clean, nullable, opt_date};
use crate::context::AppContext;
use crate::error::AppError;

const MAX_TITLE: usize = 300;
const MAX_NAME: usize = 120;

/// A book with everything linked to it.
#[derive(Debug, Serialize)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Book,
    pub authors: Vec<Author>,
    pub genres: Vec<Genre>,
    pub collections: Vec<Collection>,
    pub series: Option<Series>,
    pub images: Vec<BookImage>,
}

pub(crate) fn detail(conn: &Connection, user_id: UserId, book: Book) -> folio_core::Result<BookDetail> {
    let series = match book.series_id {
        Some(id) => series::get_series(conn, user_id, id)?,
        None => None,
    };
    Ok(BookDetail {
        authors: authors::for_book(conn, book.id)?,
        genres: genres::for_book(conn, book.id)?,
        collections: collections::for_book(conn, book.id)?,
        images: images::list_for_book(conn, book.id)?,
        series,
        book,
    })
}

fn parse_status(status: Option<&str>) -> folio_core::Result<Option<BookStatus>> {
    status
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .transpose()
}

fn check_page_count(pages: Option<i64>) -> folio_core::Result<Option<i64>> {
    match pages {
        Some(p) if p < 0 => Err(Error::Validation("page_count cannot be negative".into())),
        other => Ok(other),
    }
}

fn names(field: &str, list: &[String]) -> folio_core::Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for raw in list {
        let name = folio_core::normalize_name(raw);
        if name.is_empty() {
            continue;
        }
        let name = folio_core::require_name(field, &name, MAX_NAME)?;
        if !out.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            out.push(name);
        }
    }
    Ok(out)
}

fn owned_series(conn: &Connection, user_id: UserId, raw: Option<&str>) -> folio_core::Result<Option<SeriesId>> {
    raw.map(|s| {
        let id = SeriesId::parse_param(s)?;
        series::require_series(conn, user_id, id).map(|s| s.id)
    })
    .transpose()
}

/// Apply the status transition and check the resulting shelf state. A
/// rating given in the same request is never silently dropped.
fn settle_shelf(
    mut shelf: ShelfState,
    status: Option<BookStatus>,
    rating_given: bool,
    today: NaiveDate,
) -> folio_core::Result<ShelfState> {
    if let Some(status) = status {
        if rating_given && shelf.rating.is_some() && !status.accepts_rating() {
            return Err(Error::Validation(format!(
                "A book with status '{status}' cannot be rated"
            )));
        }
        shelf = shelf.transition(status, today);
    }
    shelf.validate()?;
    Ok(shelf)
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct CreateBookRequest {
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
    /// Defaults to `to_read`.
    pub status: Option<String>,
    pub rating: Option<f64>,
    pub comment: Option<String>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub series_id: Option<String>,
    pub series_index: Option<f64>,
    pub favorite: bool,
    pub authors: Vec<String>,
    pub genres: Vec<String>,
}

/// Validate a create request and insert the book with its links.
pub(crate) fn create(
    conn: &Connection,
    user_id: UserId,
    req: CreateBookRequest,
    today: NaiveDate,
) -> folio_core::Result<BookDetail> {
    let title = folio_core::require_name("title", &req.title, MAX_TITLE)?;
    let status = parse_status(req.status.as_deref())?.unwrap_or_default();
    let authors_in = names("author", &req.authors)?;
    let genres_in = names("genre", &req.genres)?;
    let shelf = settle_shelf(
        ShelfState {
            status,
            rating: req.rating,
            started_at: opt_date("started_at", req.started_at.as_deref())?,
            finished_at: opt_date("finished_at", req.finished_at.as_deref())?,
        },
        Some(status),
        req.rating.is_some(),
        today,
    )?;

    let new = NewBook {
        title,
        subtitle: clean(req.subtitle),
        isbn: clean(req.isbn),
        publisher: clean(req.publisher),
        published_year: req.published_year,
        page_count: check_page_count(req.page_count)?,
        language: clean(req.language),
        description: clean(req.description),
        cover_url: clean(req.cover_url),
        google_books_id: clean(req.google_books_id),
        status: shelf.status,
        rating: shelf.rating,
        comment: clean(req.comment),
        started_at: shelf.started_at,
        finished_at: shelf.finished_at,
        series_id: owned_series(conn, user_id, req.series_id.as_deref())?,
        series_index: req.series_index,
        favorite: req.favorite,
    };

    let book = books::create_book(conn, user_id, &new)?;
    authors::link_by_name(conn, user_id, book.id, &authors_in)?;
    genres::link_by_name(conn, user_id, book.id, &genres_in)?;

    detail(conn, user_id, book)
}

/// POST /api/books
#[utoipa::path(
    post,
    path = "/api/books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created"),
        (status = 400, description = "Invalid book")
    )
)]
pub async fn create_book(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Json(payload): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<BookDetail>), AppError> {
    let conn = ctx.conn()?;
    let detail = create(&conn, user_id, payload, ctx.today())?;
    tracing::debug!(book_id = %detail.book.id, "Book created");
    Ok((StatusCode::CREATED, Json(detail)))
}

// ---------------------------------------------------------------------------
// Read / list
// ---------------------------------------------------------------------------

/// GET /api/books/{id}
#[utoipa::path(
    get,
    path = "/api/books/{id}",
    params(("id" = String, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book with its authors, genres, collections and images"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<Json<BookDetail>, AppError> {
    let id = BookId::parse_param(&id)?;
    let conn = ctx.conn()?;
    let book = books::require_book(&conn, user_id, id)?;
    Ok(Json(detail(&conn, user_id, book)?))
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(default)]
#[into_params(parameter_in = Query)]
pub struct ListBooksQuery {
    pub status: Option<String>,
    pub genre: Option<String>,
    pub author: Option<String>,
    pub collection: Option<String>,
    pub series: Option<String>,
    pub favorite: Option<bool>,
    pub q: Option<String>,
    pub sort: Option<String>,
    /// `asc` or `desc`.
    pub order: Option<String>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

impl ListBooksQuery {
    pub(crate) fn into_filter(self) -> folio_core::Result<BookFilter> {
        let sort = match clean(self.sort) {
            Some(s) => s.parse()?,
            None => Default::default(),
        };
        let descending = match clean(self.order).as_deref() {
            None => sort != books::BookSort::Title,
            Some("asc") => false,
            Some("desc") => true,
            Some(other) => {
                return Err(Error::Validation(format!(
                    "order must be 'asc' or 'desc', got '{other}'"
                )))
            }
        };
        Ok(BookFilter {
            status: parse_status(self.status.as_deref())?,
            genre: clean(self.genre),
            author: clean(self.author),
            collection: clean(self.collection)
                .map(|c| CollectionId::parse_param(&c))
                .transpose()?,
            series: clean(self.series)
                .map(|s| SeriesId::parse_param(&s))
                .transpose()?,
            favorite: self.favorite,
            q: clean(self.q),
            sort,
            descending,
            offset: self.offset.unwrap_or(0),
            limit: self.limit,
        })
    }
}

/// GET /api/books
#[utoipa::path(
    get,
    path = "/api/books",
    params(ListBooksQuery),
    responses(
        (status = 200, description = "One page of books"),
        (status = 400, description = "Invalid filter")
    )
)]
pub async fn list_books(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<ListBooksQuery>,
) -> Result<Json<BookPage>, AppError> {
    let filter = query.into_filter()?;
    let conn = ctx.conn()?;
    Ok(Json(books::list_books(&conn, user_id, &filter)?))
}

// ---------------------------------------------------------------------------
// Update / delete
// ---------------------------------------------------------------------------

/// Partial update. Absent fields are left alone; `null` clears nullable
/// fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub subtitle: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub isbn: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub publisher: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub published_year: Option<Option<i32>>,
    #[serde(deserialize_with = "nullable")]
    pub page_count: Option<Option<i64>>,
    #[serde(deserialize_with = "nullable")]
    pub language: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub cover_url: Option<Option<String>>,
    pub status: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub rating: Option<Option<f64>>,
    #[serde(deserialize_with = "nullable")]
    pub comment: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub started_at: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub finished_at: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub series_id: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub series_index: Option<Option<f64>>,
    pub favorite: Option<bool>,
    /// Replaces the author list when present.
    pub authors: Option<Vec<String>>,
    /// Replaces the genre list when present.
    pub genres: Option<Vec<String>>,
}

fn apply_update(
    conn: &Connection,
    mut book: Book,
    req: UpdateBookRequest,
    today: NaiveDate,
) -> folio_core::Result<Book> {
    if let Some(title) = req.title {
        book.title = folio_core::require_name("title", &title, MAX_TITLE)?;
    }
    if let Some(v) = req.subtitle {
        book.subtitle = clean(v);
    }
    if let Some(v) = req.isbn {
        book.isbn = clean(v);
    }
    if let Some(v) = req.publisher {
        book.publisher = clean(v);
    }
    if let Some(v) = req.published_year {
        book.published_year = v;
    }
    if let Some(v) = req.page_count {
        book.page_count = check_page_count(v)?;
    }
    if let Some(v) = req.language {
        book.language = clean(v);
    }
    if let Some(v) = req.description {
        book.description = clean(v);
    }
    if let Some(v) = req.cover_url {
        book.cover_url = clean(v);
    }
    if let Some(v) = req.comment {
        book.comment = clean(v);
    }
    if let Some(v) = req.series_id {
        book.series_id = owned_series(conn, book.user_id, v.as_deref())?;
    }
    if let Some(v) = req.series_index {
        book.series_index = v;
    }
    if let Some(v) = req.favorite {
        book.favorite = v;
    }

    let mut shelf = book.shelf();
    let rating_given = matches!(req.rating, Some(Some(_)));
    if let Some(v) = req.rating {
        shelf.rating = v;
    }
    if let Some(v) = req.started_at {
        shelf.started_at = opt_date("started_at", v.as_deref())?;
    }
    if let Some(v) = req.finished_at {
        shelf.finished_at = opt_date("finished_at", v.as_deref())?;
    }
    let status = parse_status(req.status.as_deref())?.filter(|s| *s != book.status);
    let shelf = settle_shelf(shelf, status, rating_given, today)?;
    book.status = shelf.status;
    book.rating = shelf.rating;
    book.started_at = shelf.started_at;
    book.finished_at = shelf.finished_at;

    let authors_in = req.authors.map(|l| names("author", &l)).transpose()?;
    let genres_in = req.genres.map(|l| names("genre", &l)).transpose()?;
    let saved = books::save_book(conn, &book)?;
    if let Some(list) = authors_in {
        authors::link_by_name(conn, book.user_id, book.id, &list)?;
    }
    if let Some(list) = genres_in {
        genres::link_by_name(conn, book.user_id, book.id, &list)?;
    }
    Ok(saved)
}

/// PUT /api/books/{id}
pub async fn update_book(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateBookRequest>,
) -> Result<Json<BookDetail>, AppError> {
    let id = BookId::parse_param(&id)?;
    let conn = ctx.conn()?;
    let book = books::require_book(&conn, user_id, id)?;
    let book = apply_update(&conn, book, payload, ctx.today())?;
    Ok(Json(detail(&conn, user_id, book)?))
}

/// DELETE /api/books/{id}
#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    params(("id" = String, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = BookId::parse_param(&id)?;
    let conn = ctx.conn()?;
    let files: Vec<String> = images::list_for_book(&conn, id)?
        .into_iter()
        .map(|i| i.path)
        .collect();
    if !books::delete_book(&conn, user_id, id)? {
        return Err(Error::not_found(BookId::ENTITY, id).into());
    }
    for path in files {
        if let Err(e) = ctx.images.remove(&path) {
            tracing::warn!(%path, "Failed to remove image file: {e}");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Shelf operations
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct StatusRequest {
    pub status: String,
}

/// PUT /api/books/{id}/status
#[utoipa::path(
    put,
    path = "/api/books/{id}/status",
    params(("id" = String, Path, description = "Book ID")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Status changed"),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn set_status(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
    Json(payload): Json<StatusRequest>,
) -> Result<Json<Book>, AppError> {
    let id = BookId::parse_param(&id)?;
    let status: BookStatus = payload.status.trim().parse()?;
    let conn = ctx.conn()?;
    let mut book = books::require_book(&conn, user_id, id)?;
    if book.status == status {
        return Ok(Json(book));
    }

    let shelf = book.shelf().transition(status, ctx.today());
    // Leaving a rated status drops the rating instead of failing.
    let shelf = ShelfState {
        rating: shelf.rating.filter(|_| status.accepts_rating()),
        ..shelf
    };
    shelf.validate()?;
    book.status = shelf.status;
    book.rating = shelf.rating;
    book.started_at = shelf.started_at;
    book.finished_at = shelf.finished_at;
    Ok(Json(books::save_book(&conn, &book)?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RateRequest {
    /// `null` removes the rating.
    pub rating: Option<f64>,
    #[serde(deserialize_with = "nullable")]
    pub comment: Option<Option<String>>,
}

/// PUT /api/books/{id}/rating
pub async fn rate_book(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
    Json(payload): Json<RateRequest>,
) -> Result<Json<Book>, AppError> {
    let id = BookId::parse_param(&id)?;
    let conn = ctx.conn()?;
    let mut book = books::require_book(&conn, user_id, id)?;

    let mut shelf = book.shelf();
    shelf.rating = payload.rating;
    shelf.validate()?;
    book.rating = shelf.rating;
    if let Some(comment) = payload.comment {
        book.comment = clean(comment);
    }
    Ok(Json(books::save_book(&conn, &book)?))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct FavoriteRequest {
    pub favorite: bool,
}

/// PUT /api/books/{id}/favorite
pub async fn set_favorite(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
    Json(payload): Json<FavoriteRequest>,
) -> Result<Json<Book>, AppError> {
    let id = BookId::parse_param(&id)?;
    let conn = ctx.conn()?;
    let mut book = books::require_book(&conn, user_id, id)?;
    book.favorite = payload.favorite;
    Ok(Json(books::save_book(&conn, &book)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_db::pool::init_memory_pool;
    use folio_db::queries::users;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn setup() -> (folio_db::pool::DbPool, UserId) {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, "shelver", "hash", folio_core::Role::User)
            .unwrap()
            .id;
        (pool, user)
    }

    #[test]
    fn create_links_names_and_stamps_dates() {
        let (pool, user) = setup();
        let conn = pool.get().unwrap();
        let detail = create(
            &conn,
            user,
            CreateBookRequest {
                title: "  The   Dispossessed ".into(),
                status: Some("read".into()),
                rating: Some(4.5),
                authors: vec!["Ursula K. Le Guin".into(), "ursula k. le guin".into()],
                genres: vec!["Science Fiction".into(), "".into()],
                ..Default::default()
            },
            d("2024-05-01"),
        )
        .unwrap();
        assert_eq!(detail.book.title, "The Dispossessed");
        assert_eq!(detail.book.finished_at, Some(d("2024-05-01")));
        assert_eq!(detail.authors.len(), 1);
        assert_eq!(detail.genres.len(), 1);
    }

    #[test]
    fn create_rejects_rating_on_unread_book() {
        let (pool, user) = setup();
        let conn = pool.get().unwrap();
        let err = create(
            &conn,
            user,
            CreateBookRequest {
                title: "Unread".into(),
                rating: Some(3.0),
                ..Default::default()
            },
            d("2024-05-01"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn update_back_to_to_read_clears_shelf() {
        let (pool, user) = setup();
        let conn = pool.get().unwrap();
        let detail = create(
            &conn,
            user,
            CreateBookRequest {
                title: "Round Trip".into(),
                status: Some("read".into()),
                rating: Some(3.5),
                started_at: Some("2024-01-01".into()),
                ..Default::default()
            },
            d("2024-02-01"),
        )
        .unwrap();

        let updated: UpdateBookRequest =
            serde_json::from_str(r#"{"status": "to_read", "subtitle": null}"#).unwrap();
        let book = apply_update(&conn, detail.book, updated, d("2024-03-01")).unwrap();
        assert_eq!(book.status, BookStatus::ToRead);
        assert_eq!(book.rating, None);
        assert_eq!(book.started_at, None);
        assert_eq!(book.finished_at, None);
    }

    #[test]
    fn update_rejects_finish_before_start() {
        let (pool, user) = setup();
        let conn = pool.get().unwrap();
        let detail = create(
            &conn,
            user,
            CreateBookRequest {
                title: "Backwards".into(),
                status: Some("reading".into()),
                ..Default::default()
            },
            d("2024-06-10"),
        )
        .unwrap();
        let req: UpdateBookRequest =
            serde_json::from_str(r#"{"status": "read", "finished_at": "2024-06-01"}"#).unwrap();
        assert!(matches!(
            apply_update(&conn, detail.book, req, d("2024-06-20")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn list_query_parsing() {
        let filter = ListBooksQuery {
            status: Some("to-read".into()),
            sort: Some("title".into()),
            ..Default::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.status, Some(BookStatus::ToRead));
        assert!(!filter.descending);

        assert!(ListBooksQuery {
            order: Some("sideways".into()),
            ..Default::default()
        }
        .into_filter()
        .is_err());
        assert!(ListBooksQuery {
            collection: Some("not-a-uuid".into()),
            ..Default::default()
        }
        .into_filter()
        .is_err());
    }
}
