//! "What should I read next?" picks a random book from the shelf.

use axum::extract::{Extension, Query, State};
use axum::Json;
use folio_core::{BookId, BookStatus, CollectionId, Error, UserId};
use folio_db::models::Book;
use folio_db::queries::books::{self, BookFilter};
use serde::Deserialize;

use super::clean;
use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
pub struct RouletteQuery {
    /// Defaults to `to_read`; `any` disables the status filter.
    pub status: Option<String>,
    pub genre: Option<String>,
    pub collection: Option<String>,
}

impl RouletteQuery {
    fn into_filter(self) -> folio_core::Result<BookFilter> {
        let status = match clean(self.status).as_deref() {
            None => Some(BookStatus::ToRead),
            Some("any") => None,
            Some(s) => Some(s.parse()?),
        };
        Ok(BookFilter {
            status,
            genre: clean(self.genre),
            collection: clean(self.collection)
                .map(|c| CollectionId::parse_param(&c))
                .transpose()?,
            ..Default::default()
        })
    }
}

/// GET /api/roulette
#[utoipa::path(
    get,
    path = "/api/roulette",
    params(
        ("status" = Option<String>, Query, description = "Defaults to to_read; 'any' for every status"),
        ("genre" = Option<String>, Query, description = "Genre name"),
        ("collection" = Option<String>, Query, description = "Collection ID")
    ),
    responses(
        (status = 200, description = "A random matching book"),
        (status = 404, description = "No book matches")
    )
)]
pub async fn spin(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<RouletteQuery>,
) -> Result<Json<Book>, AppError> {
    let filter = query.into_filter()?;
    let conn = ctx.conn()?;
    let book = books::random_book(&conn, user_id, &filter)?
        .ok_or_else(|| Error::not_found(BookId::ENTITY, "matching the roulette filter"))?;
    Ok(Json(book))
}
