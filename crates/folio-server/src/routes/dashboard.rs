//! Home page aggregate.

use axum::extract::{Extension, State};
use axum::Json;
use chrono::Datelike;
use folio_core::calendar;
use folio_core::goals::GoalProgress;
use folio_core::stats::StatusCounts;
use folio_core::theme::Theme;
use folio_core::{BookStatus, UserId};
use folio_db::models::{Book, Quote};
use folio_db::queries::books::{self, BookFilter, BookSort};
use folio_db::queries::{quotes, reading_logs};
use serde::Serialize;

use crate::context::AppContext;
use crate::error::AppError;

const LATEST: u32 = 5;

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub counts: StatusCounts,
    pub currently_reading: Vec<Book>,
    pub goal: Option<GoalProgress>,
    pub current_streak: u32,
    pub latest_quotes: Vec<Quote>,
    pub recently_finished: Vec<Book>,
    pub theme: Theme,
}

/// GET /api/dashboard
pub async fn dashboard(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<Dashboard>, AppError> {
    let today = ctx.today();
    let conn = ctx.conn()?;

    let facts = folio_db::facts::book_facts(&conn, user_id)?;
    let currently_reading = books::list_books(
        &conn,
        user_id,
        &BookFilter {
            status: Some(BookStatus::Reading),
            sort: BookSort::Updated,
            descending: true,
            limit: Some(books::MAX_LIMIT),
            ..Default::default()
        },
    )?
    .items;
    let recently_finished = books::list_books(
        &conn,
        user_id,
        &BookFilter {
            status: Some(BookStatus::Read),
            sort: BookSort::Finished,
            descending: true,
            limit: Some(LATEST),
            ..Default::default()
        },
    )?
    .items;
    let dates = reading_logs::active_dates(&conn, user_id)?;

    Ok(Json(Dashboard {
        counts: StatusCounts::from_statuses(facts.iter().map(|b| b.status)),
        currently_reading,
        goal: folio_db::facts::goal_progress(&conn, user_id, today.year(), today)?,
        current_streak: calendar::compute_streaks(&dates, today).current,
        latest_quotes: quotes::list_quotes(&conn, user_id, Some(LATEST))?,
        recently_finished,
        theme: Theme::for_date(today, ctx.config.ui.seasonal_effects),
    }))
}
