//! Google Books lookups and import, plus Wikipedia author summaries.

use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use folio_core::{Error, ImageProvider, UserId};
use serde::Deserialize;

use super::books::{detail, BookDetail, CreateBookRequest};
use super::images::save_image;
use crate::clients::google_books::BookMetadata;
use crate::clients::wikipedia::PageSummary;
use crate::context::AppContext;
use crate::error::AppError;

const MAX_SEARCH_RESULTS: u32 = 40;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorQuery {
    pub name: String,
    pub lang: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ImportRequest {
    pub volume_id: String,
    /// Defaults to `to_read`.
    #[serde(default)]
    pub status: Option<String>,
}

/// GET /api/metadata/search?q=
pub async fn search(
    State(ctx): State<AppContext>,
    Extension(_user_id): Extension<UserId>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<BookMetadata>>, AppError> {
    let limit = query.limit.unwrap_or(20).clamp(1, MAX_SEARCH_RESULTS);
    Ok(Json(ctx.google_books.search(&query.q, limit).await?))
}

/// GET /api/metadata/isbn/{isbn}
pub async fn by_isbn(
    State(ctx): State<AppContext>,
    Extension(_user_id): Extension<UserId>,
    Path(isbn): Path<String>,
) -> Result<Json<Vec<BookMetadata>>, AppError> {
    Ok(Json(ctx.google_books.by_isbn(&isbn).await?))
}

/// GET /api/metadata/volumes/{id}
pub async fn volume(
    State(ctx): State<AppContext>,
    Extension(_user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<Json<BookMetadata>, AppError> {
    Ok(Json(ctx.google_books.volume(&id).await?))
}

/// GET /api/metadata/authors?name=
pub async fn author_summary(
    State(ctx): State<AppContext>,
    Extension(_user_id): Extension<UserId>,
    Query(query): Query<AuthorQuery>,
) -> Result<Json<PageSummary>, AppError> {
    let name = query.name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Author name is required".into()).into());
    }
    let summary = ctx
        .wikipedia
        .summary(name, query.lang.as_deref())
        .await?
        .ok_or_else(|| Error::not_found("wikipedia page", name))?;
    Ok(Json(summary))
}

impl CreateBookRequest {
    fn from_metadata(meta: BookMetadata, status: Option<String>) -> Self {
        Self {
            title: meta.title,
            subtitle: meta.subtitle,
            isbn: meta.isbn,
            publisher: meta.publisher,
            published_year: meta.published_year,
            page_count: meta.page_count,
            language: meta.language,
            description: meta.description,
            cover_url: meta.thumbnail_url,
            google_books_id: Some(meta.google_books_id),
            status,
            authors: meta.authors,
            genres: meta.genres,
            ..Default::default()
        }
    }
}

/// POST /api/metadata/import
///
/// Create a book from a Google Books volume. The cover thumbnail is copied
/// into image storage; a failed download keeps the remote URL instead.
pub async fn import(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Json(payload): Json<ImportRequest>,
) -> Result<(StatusCode, Json<BookDetail>), AppError> {
    let meta = ctx.google_books.volume(&payload.volume_id).await?;
    let thumbnail = meta.thumbnail_url.clone();
    let request = CreateBookRequest::from_metadata(meta, payload.status);

    let created = {
        let conn = ctx.conn()?;
        super::books::create(&conn, user_id, request, ctx.today())?
    };
    let book_id = created.book.id;
    tracing::info!(%book_id, title = %created.book.title, "Imported book from Google Books");

    let Some(url) = thumbnail else {
        return Ok((StatusCode::CREATED, Json(created)));
    };
    let copied = match ctx
        .google_books
        .download_cover(&url, ctx.images.max_upload_bytes())
        .await
    {
        Ok(data) => save_image(&ctx, book_id, Bytes::from(data), ImageProvider::GoogleBooks).await,
        Err(e) => Err(e),
    };
    if let Err(e) = copied {
        tracing::warn!(%book_id, %url, "Cover download failed: {e}");
        return Ok((StatusCode::CREATED, Json(created)));
    }

    let conn = ctx.conn()?;
    let book = folio_db::queries::books::require_book(&conn, user_id, book_id)?;
    Ok((StatusCode::CREATED, Json(detail(&conn, user_id, book)?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_maps_onto_create_request() {
        let meta = BookMetadata {
            google_books_id: "zyTCAlFPjgYC".into(),
            title: "The Google Story".into(),
            subtitle: None,
            authors: vec!["David A. Vise".into(), "Mark Malseed".into()],
            publisher: Some("Random House".into()),
            published_year: Some(2005),
            page_count: Some(207),
            isbn: Some("9780553804577".into()),
            language: Some("en".into()),
            description: None,
            genres: vec!["Business & Economics".into()],
            thumbnail_url: Some("https://books.google.com/thumb".into()),
        };
        let req = CreateBookRequest::from_metadata(meta, None);
        assert_eq!(req.title, "The Google Story");
        assert_eq!(req.google_books_id.as_deref(), Some("zyTCAlFPjgYC"));
        assert_eq!(req.authors.len(), 2);
        assert_eq!(req.status, None);
        assert!(!req.favorite);
    }
}
