//! Top-10 lists, all-time or per year.

use axum::extract::{Extension, Query, State};
use axum::Json;
use folio_core::{BookId, UserId};
use folio_db::models::TopBook;
use folio_db::queries::top_books::{self, ALL_TIME};
use serde::{Deserialize, Serialize};

use super::check_year;
use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
pub struct TopQuery {
    /// Absent for the all-time list.
    pub year: Option<i32>,
}

impl TopQuery {
    fn key(&self) -> folio_core::Result<i32> {
        self.year.map(check_year).transpose().map(|y| y.unwrap_or(ALL_TIME))
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct TopEntry {
    pub position: u8,
    pub book_id: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ReplaceTopRequest {
    pub entries: Vec<TopEntry>,
}

#[derive(Debug, Serialize)]
pub struct TopList {
    pub year: Option<i32>,
    pub entries: Vec<TopBook>,
    /// Years that have their own list.
    pub years: Vec<i32>,
}

fn list(conn: &rusqlite::Connection, user_id: UserId, key: i32) -> folio_core::Result<TopList> {
    Ok(TopList {
        year: (key != ALL_TIME).then_some(key),
        entries: top_books::get_top(conn, user_id, key)?,
        years: top_books::years(conn, user_id)?,
    })
}

/// GET /api/top?year=
pub async fn get_top(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<TopQuery>,
) -> Result<Json<TopList>, AppError> {
    let key = query.key()?;
    let conn = ctx.conn()?;
    Ok(Json(list(&conn, user_id, key)?))
}

/// PUT /api/top?year=
///
/// Replaces the whole list; on any invalid entry nothing changes.
pub async fn replace_top(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<TopQuery>,
    Json(payload): Json<ReplaceTopRequest>,
) -> Result<Json<TopList>, AppError> {
    let key = query.key()?;
    let entries = payload
        .entries
        .iter()
        .map(|e| Ok((e.position, BookId::parse_param(&e.book_id)?)))
        .collect::<folio_core::Result<Vec<_>>>()?;
    let conn = ctx.conn()?;
    top_books::replace_top(&conn, user_id, key, &entries)?;
    Ok(Json(list(&conn, user_id, key)?))
}
