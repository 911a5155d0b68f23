//! Book cover images: upload, download from a URL, list, serve, choose the
//! cover, delete.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use folio_core::{BookId, Error, ImageId, ImageProvider, UserId};
use folio_db::models::BookImage;
use folio_db::queries::images::{self, NewImage};
use folio_db::queries::books;
use serde::Deserialize;

use crate::context::AppContext;
use crate::error::AppError;
use crate::images::{ImageStore, StoredImage};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct FromUrlRequest {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    #[serde(default)]
    pub thumb: bool,
}

/// URL the front end loads an image from; stored as the book's `cover_url`.
pub fn file_url(id: ImageId) -> String {
    format!("/api/images/{id}/file")
}

async fn store_blocking(store: Arc<ImageStore>, book_id: BookId, data: Bytes) -> folio_core::Result<StoredImage> {
    tokio::task::spawn_blocking(move || store.store(book_id, &data))
        .await
        .map_err(|e| Error::Internal(format!("image task failed: {e}")))?
}

/// Decode and store `data`, record it, and make it the cover when the book
/// has none yet.
pub(crate) async fn save_image(
    ctx: &AppContext,
    book_id: BookId,
    data: Bytes,
    provider: ImageProvider,
) -> folio_core::Result<BookImage> {
    let stored = store_blocking(ctx.images.clone(), book_id, data).await?;

    let conn = ctx.conn()?;
    let image = images::create_image(
        &conn,
        book_id,
        &NewImage {
            path: stored.path,
            provider,
            width: Some(stored.width),
            height: Some(stored.height),
            hash: stored.hash,
        },
    )?;
    let has_cover = images::list_for_book(&conn, book_id)?.iter().any(|i| i.is_cover);
    if !has_cover {
        images::set_cover(&conn, &image, &file_url(image.id))?;
        return Ok(BookImage {
            is_cover: true,
            ..image
        });
    }
    Ok(image)
}

fn require_image(ctx: &AppContext, user_id: UserId, id: &str) -> folio_core::Result<BookImage> {
    let id = ImageId::parse_param(id)?;
    let conn = ctx.conn()?;
    images::get_image(&conn, user_id, id)?.ok_or_else(|| Error::not_found(ImageId::ENTITY, id))
}

fn owned_book(ctx: &AppContext, user_id: UserId, id: &str) -> folio_core::Result<BookId> {
    let id = BookId::parse_param(id)?;
    let conn = ctx.conn()?;
    Ok(books::require_book(&conn, user_id, id)?.id)
}

/// GET /api/books/{id}/images
pub async fn list_images(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(book_id): Path<String>,
) -> Result<Json<Vec<BookImage>>, AppError> {
    let book_id = owned_book(&ctx, user_id, &book_id)?;
    let conn = ctx.conn()?;
    Ok(Json(images::list_for_book(&conn, book_id)?))
}

/// POST /api/books/{id}/images
///
/// The request body is the raw image file.
pub async fn upload_image(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(book_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<BookImage>), AppError> {
    let book_id = owned_book(&ctx, user_id, &book_id)?;
    let image = save_image(&ctx, book_id, body, ImageProvider::Upload).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

/// POST /api/books/{id}/images/from-url
pub async fn image_from_url(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(book_id): Path<String>,
    Json(payload): Json<FromUrlRequest>,
) -> Result<(StatusCode, Json<BookImage>), AppError> {
    let book_id = owned_book(&ctx, user_id, &book_id)?;
    let url = payload.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::Validation("Image URL must be http or https".into()).into());
    }
    let data = ctx
        .google_books
        .download_cover(url, ctx.images.max_upload_bytes())
        .await?;
    let image = save_image(&ctx, book_id, Bytes::from(data), ImageProvider::Url).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

/// GET /api/images/{id}/file?thumb=
pub async fn image_file(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
    Query(query): Query<FileQuery>,
) -> Result<Response, AppError> {
    let image = require_image(&ctx, user_id, &id)?;
    let store = ctx.images.clone();
    let bytes = tokio::task::spawn_blocking(move || store.read(&image.path, query.thumb))
        .await
        .map_err(|e| Error::Internal(format!("image task failed: {e}")))??;
    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "private, max-age=86400"),
        ],
        bytes,
    )
        .into_response())
}

/// PUT /api/images/{id}/cover
pub async fn set_cover(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<Json<BookImage>, AppError> {
    let image = require_image(&ctx, user_id, &id)?;
    let conn = ctx.conn()?;
    images::set_cover(&conn, &image, &file_url(image.id))?;
    Ok(Json(BookImage {
        is_cover: true,
        ..image
    }))
}

/// DELETE /api/images/{id}
///
/// The file is removed once no record points at it anymore.
pub async fn delete_image(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let image = require_image(&ctx, user_id, &id)?;
    let orphaned = {
        let conn = ctx.conn()?;
        images::delete_image(&conn, &image)?;
        !images::path_in_use(&conn, &image.path)?
    };
    if orphaned {
        ctx.images.remove(&image.path)?;
    }
    Ok(StatusCode::NO_CONTENT)
}
