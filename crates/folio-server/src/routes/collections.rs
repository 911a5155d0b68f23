//! Collections: named shelves a book can belong to any number of.

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use folio_core::{BookId, CollectionId, Error, UserId};
use folio_db::models::{Book, Collection};
use folio_db::queries::{books, collections};
use serde::{Deserialize, Serialize};

use super::{clean, nullable};
use crate::context::AppContext;
use crate::error::AppError;

const MAX_NAME: usize = 100;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateCollectionRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateCollectionRequest {
    pub name: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
pub struct CollectionDetail {
    #[serde(flatten)]
    pub collection: Collection,
    pub books: Vec<Book>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MembershipResponse {
    /// False when the book was already (or was not) in the collection.
    pub changed: bool,
}

/// GET /api/collections
pub async fn list_collections(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<Vec<Collection>>, AppError> {
    let conn = ctx.conn()?;
    Ok(Json(collections::list_collections(&conn, user_id)?))
}

/// POST /api/collections
pub async fn create_collection(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Json(payload): Json<CreateCollectionRequest>,
) -> Result<(StatusCode, Json<Collection>), AppError> {
    let name = folio_core::require_name("name", &payload.name, MAX_NAME)?;
    let description = clean(payload.description);
    let conn = ctx.conn()?;
    let collection = collections::create_collection(&conn, user_id, &name, description.as_deref())?;
    Ok((StatusCode::CREATED, Json(collection)))
}

/// GET /api/collections/{id}
pub async fn get_collection(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<Json<CollectionDetail>, AppError> {
    let id = CollectionId::parse_param(&id)?;
    let conn = ctx.conn()?;
    let collection = collections::require_collection(&conn, user_id, id)?;
    Ok(Json(CollectionDetail {
        books: collections::books_in(&conn, id)?,
        collection,
    }))
}

/// PUT /api/collections/{id}
pub async fn update_collection(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCollectionRequest>,
) -> Result<Json<Collection>, AppError> {
    let id = CollectionId::parse_param(&id)?;
    let conn = ctx.conn()?;
    let current = collections::require_collection(&conn, user_id, id)?;

    let name = match payload.name {
        Some(name) => folio_core::require_name("name", &name, MAX_NAME)?,
        None => current.name,
    };
    let description = match payload.description {
        Some(d) => clean(d),
        None => current.description,
    };
    collections::update_collection(&conn, user_id, id, &name, description.as_deref())?;
    Ok(Json(collections::require_collection(&conn, user_id, id)?))
}

/// DELETE /api/collections/{id}
pub async fn delete_collection(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = CollectionId::parse_param(&id)?;
    let conn = ctx.conn()?;
    if !collections::delete_collection(&conn, user_id, id)? {
        return Err(Error::not_found(CollectionId::ENTITY, id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

fn parse_pair(id: &str, book_id: &str) -> folio_core::Result<(CollectionId, BookId)> {
    Ok((CollectionId::parse_param(id)?, BookId::parse_param(book_id)?))
}

/// PUT /api/collections/{id}/books/{book_id}
pub async fn add_book(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path((id, book_id)): Path<(String, String)>,
) -> Result<Json<MembershipResponse>, AppError> {
    let (id, book_id) = parse_pair(&id, &book_id)?;
    let conn = ctx.conn()?;
    collections::require_collection(&conn, user_id, id)?;
    books::require_book(&conn, user_id, book_id)?;
    let changed = collections::add_book(&conn, id, book_id)?;
    Ok(Json(MembershipResponse { changed }))
}

/// DELETE /api/collections/{id}/books/{book_id}
pub async fn remove_book(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path((id, book_id)): Path<(String, String)>,
) -> Result<Json<MembershipResponse>, AppError> {
    let (id, book_id) = parse_pair(&id, &book_id)?;
    let conn = ctx.conn()?;
    collections::require_collection(&conn, user_id, id)?;
    let changed = collections::remove_book(&conn, id, book_id)?;
    Ok(Json(MembershipResponse { changed }))
}
