//! Author listing, renaming and Wikipedia enrichment.

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use folio_core::{AuthorId, Error, UserId};
use folio_db::models::{Author, AuthorWithCount};
use folio_db::queries::authors;
use serde::Deserialize;

use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RenameRequest {
    pub name: String,
}

/// GET /api/authors
pub async fn list_authors(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<Vec<AuthorWithCount>>, AppError> {
    let conn = ctx.conn()?;
    Ok(Json(authors::list_with_counts(&conn, user_id)?))
}

fn require_author(conn: &rusqlite::Connection, user_id: UserId, id: AuthorId) -> folio_core::Result<Author> {
    authors::get_author(conn, user_id, id)?.ok_or_else(|| Error::not_found(AuthorId::ENTITY, id))
}

/// GET /api/authors/{id}
pub async fn get_author(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<Json<Author>, AppError> {
    let id = AuthorId::parse_param(&id)?;
    let conn = ctx.conn()?;
    Ok(Json(require_author(&conn, user_id, id)?))
}

/// PUT /api/authors/{id}
pub async fn rename_author(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
    Json(payload): Json<RenameRequest>,
) -> Result<Json<Author>, AppError> {
    let id = AuthorId::parse_param(&id)?;
    let name = folio_core::require_name("name", &payload.name, 120)?;
    let conn = ctx.conn()?;
    if !authors::rename(&conn, user_id, id, &name)? {
        return Err(Error::not_found(AuthorId::ENTITY, id).into());
    }
    Ok(Json(require_author(&conn, user_id, id)?))
}

/// DELETE /api/authors/{id}
pub async fn delete_author(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = AuthorId::parse_param(&id)?;
    let conn = ctx.conn()?;
    if !authors::delete_author(&conn, user_id, id)? {
        return Err(Error::not_found(AuthorId::ENTITY, id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/authors/{id}/enrich
///
/// Pull the author's biography and page link from Wikipedia.
pub async fn enrich_author(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<Json<Author>, AppError> {
    let id = AuthorId::parse_param(&id)?;
    let author = {
        let conn = ctx.conn()?;
        require_author(&conn, user_id, id)?
    };

    let summary = ctx
        .wikipedia
        .summary(&author.name, None)
        .await?
        .ok_or_else(|| Error::not_found("wikipedia page", &author.name))?;

    let conn = ctx.conn()?;
    authors::set_biography(&conn, user_id, id, Some(&summary.extract), summary.url.as_deref())?;
    tracing::debug!(author = %author.name, "Author enriched from Wikipedia");
    Ok(Json(require_author(&conn, user_id, id)?))
}
