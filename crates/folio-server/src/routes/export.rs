//! Whole-library JSON export.

use axum::extract::{Extension, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use folio_core::{BookId, UserId};
use folio_db::models::{Collection, Quote, ReadingGoal, ReadingLog, Series, TopBook, Word};
use folio_db::queries::{books, collections, goals, quotes, reading_logs, series, top_books, words};
use rusqlite::Connection;
use serde::Serialize;

use super::books::{detail, BookDetail};
use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct ExportedCollection {
    #[serde(flatten)]
    pub collection: Collection,
    pub book_ids: Vec<BookId>,
}

#[derive(Debug, Serialize)]
pub struct ExportedTopList {
    /// `None` for the all-time list.
    pub year: Option<i32>,
    pub entries: Vec<TopBook>,
}

#[derive(Debug, Serialize)]
pub struct LibraryExport {
    pub exported_at: String,
    pub username: String,
    pub books: Vec<BookDetail>,
    pub collections: Vec<ExportedCollection>,
    pub series: Vec<Series>,
    pub quotes: Vec<Quote>,
    pub words: Vec<Word>,
    pub reading_logs: Vec<ReadingLog>,
    pub goals: Vec<ReadingGoal>,
    pub top_books: Vec<ExportedTopList>,
}

pub(crate) fn build_export(conn: &Connection, user_id: UserId, username: &str) -> folio_core::Result<LibraryExport> {
    let books = books::all_books(conn, user_id)?
        .into_iter()
        .map(|b| detail(conn, user_id, b))
        .collect::<folio_core::Result<Vec<_>>>()?;

    let mut exported_collections = Vec::new();
    for collection in collections::list_collections(conn, user_id)? {
        let book_ids = collections::books_in(conn, collection.id)?
            .into_iter()
            .map(|b| b.id)
            .collect();
        exported_collections.push(ExportedCollection {
            collection,
            book_ids,
        });
    }

    let mut top = vec![ExportedTopList {
        year: None,
        entries: top_books::get_top(conn, user_id, top_books::ALL_TIME)?,
    }];
    for year in top_books::years(conn, user_id)? {
        top.push(ExportedTopList {
            year: Some(year),
            entries: top_books::get_top(conn, user_id, year)?,
        });
    }

    Ok(LibraryExport {
        exported_at: Utc::now().to_rfc3339(),
        username: username.to_string(),
        books,
        collections: exported_collections,
        series: series::list_series(conn, user_id)?,
        quotes: quotes::list_quotes(conn, user_id, None)?,
        words: words::list_words(conn, user_id, None)?,
        reading_logs: reading_logs::list_logs(conn, user_id, None, None, None)?,
        goals: goals::list_goals(conn, user_id)?,
        top_books: top,
    })
}

/// GET /api/export
pub async fn export_library(
    State(ctx): State<AppContext>,
    Extension(current): Extension<crate::middleware::auth::CurrentUser>,
) -> Result<Response, AppError> {
    let conn = ctx.conn()?;
    let export = build_export(&conn, current.id, &current.username)?;
    let filename = format!(
        "attachment; filename=\"folio-{}-{}.json\"",
        current.username,
        Utc::now().format("%Y%m%d")
    );
    Ok(([(header::CONTENT_DISPOSITION, filename)], Json(export)).into_response())
}
