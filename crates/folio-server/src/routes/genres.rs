use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use folio_core::{Error, GenreId, UserId};
use folio_db::models::{Genre, GenreWithCount};
use folio_db::queries::genres;

use super::authors::RenameRequest;
use crate::context::AppContext;
use crate::error::AppError;

/// GET /api/genres
pub async fn list_genres(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<Vec<GenreWithCount>>, AppError> {
    let conn = ctx.conn()?;
    Ok(Json(genres::list_with_counts(&conn, user_id)?))
}

/// PUT /api/genres/{id}
pub async fn rename_genre(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
    Json(payload): Json<RenameRequest>,
) -> Result<Json<Genre>, AppError> {
    let id = GenreId::parse_param(&id)?;
    let name = folio_core::require_name("name", &payload.name, 120)?;
    let conn = ctx.conn()?;
    if !genres::rename(&conn, user_id, id, &name)? {
        return Err(Error::not_found(GenreId::ENTITY, id).into());
    }
    let genre = genres::get_genre(&conn, user_id, id)?.ok_or_else(|| Error::not_found(GenreId::ENTITY, id))?;
    Ok(Json(genre))
}

/// DELETE /api/genres/{id}
pub async fn delete_genre(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = GenreId::parse_param(&id)?;
    let conn = ctx.conn()?;
    if !genres::delete_genre(&conn, user_id, id)? {
        return Err(Error::not_found(GenreId::ENTITY, id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}
