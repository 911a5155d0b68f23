//! Quotes saved from books.

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use folio_core::{BookId, Error, QuoteId, UserId};
use folio_db::models::Quote;
use folio_db::queries::{books, quotes};
use serde::Deserialize;

use super::nullable;
use crate::context::AppContext;
use crate::error::AppError;

const MAX_QUOTE: usize = 5000;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct QuoteRequest {
    pub text: String,
    #[serde(default)]
    pub page: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateQuoteRequest {
    pub text: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub page: Option<Option<i64>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuotesQuery {
    pub limit: Option<u32>,
}

fn check_text(text: &str) -> folio_core::Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::Validation("Quote text cannot be empty".into()));
    }
    if text.chars().count() > MAX_QUOTE {
        return Err(Error::Validation(format!(
            "Quote text must be at most {MAX_QUOTE} characters"
        )));
    }
    Ok(text.to_string())
}

fn check_page(page: Option<i64>) -> folio_core::Result<Option<i64>> {
    match page {
        Some(p) if p < 0 => Err(Error::Validation("page cannot be negative".into())),
        other => Ok(other),
    }
}

fn require_quote(conn: &rusqlite::Connection, user_id: UserId, id: QuoteId) -> folio_core::Result<Quote> {
    quotes::get_quote(conn, user_id, id)?.ok_or_else(|| Error::not_found(QuoteId::ENTITY, id))
}

/// GET /api/quotes
pub async fn list_quotes(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<ListQuotesQuery>,
) -> Result<Json<Vec<Quote>>, AppError> {
    let conn = ctx.conn()?;
    Ok(Json(quotes::list_quotes(&conn, user_id, query.limit)?))
}

/// GET /api/quotes/random
pub async fn random_quote(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<Quote>, AppError> {
    let conn = ctx.conn()?;
    let quote = quotes::random_quote(&conn, user_id)?
        .ok_or_else(|| Error::not_found(QuoteId::ENTITY, "random"))?;
    Ok(Json(quote))
}

/// GET /api/books/{id}/quotes
pub async fn book_quotes(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(book_id): Path<String>,
) -> Result<Json<Vec<Quote>>, AppError> {
    let book_id = BookId::parse_param(&book_id)?;
    let conn = ctx.conn()?;
    books::require_book(&conn, user_id, book_id)?;
    Ok(Json(quotes::for_book(&conn, user_id, book_id)?))
}

/// POST /api/books/{id}/quotes
pub async fn create_quote(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(book_id): Path<String>,
    Json(payload): Json<QuoteRequest>,
) -> Result<(StatusCode, Json<Quote>), AppError> {
    let book_id = BookId::parse_param(&book_id)?;
    let text = check_text(&payload.text)?;
    let page = check_page(payload.page)?;
    let conn = ctx.conn()?;
    books::require_book(&conn, user_id, book_id)?;
    let id = quotes::create_quote(&conn, user_id, book_id, &text, page)?;
    Ok((StatusCode::CREATED, Json(require_quote(&conn, user_id, id)?)))
}

/// PUT /api/quotes/{id}
pub async fn update_quote(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateQuoteRequest>,
) -> Result<Json<Quote>, AppError> {
    let id = QuoteId::parse_param(&id)?;
    let conn = ctx.conn()?;
    let current = require_quote(&conn, user_id, id)?;
    let text = match payload.text {
        Some(t) => check_text(&t)?,
        None => current.text,
    };
    let page = match payload.page {
        Some(p) => check_page(p)?,
        None => current.page,
    };
    quotes::update_quote(&conn, user_id, id, &text, page)?;
    Ok(Json(require_quote(&conn, user_id, id)?))
}

/// DELETE /api/quotes/{id}
pub async fn delete_quote(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = QuoteId::parse_param(&id)?;
    let conn = ctx.conn()?;
    if !quotes::delete_quote(&conn, user_id, id)? {
        return Err(Error::not_found(QuoteId::ENTITY, id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}
