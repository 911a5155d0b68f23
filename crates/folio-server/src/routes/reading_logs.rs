//! Reading sessions, the yearly activity calendar, and streaks.

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Datelike;
use folio_core::calendar::{self, CalendarDay, Streaks};
use folio_core::{BookId, Error, ReadingLogId, UserId};
use folio_db::models::ReadingLog;
use folio_db::queries::reading_logs::{self, NewLog};
use folio_db::queries::books;
use serde::{Deserialize, Serialize};

use super::{check_year, clean, nullable, opt_date};
use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateLogRequest {
    pub book_id: String,
    /// Defaults to today.
    #[serde(default)]
    pub date: Option<String>,
    pub pages_read: i64,
    #[serde(default)]
    pub minutes: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateLogRequest {
    pub date: Option<String>,
    pub pages_read: Option<i64>,
    #[serde(deserialize_with = "nullable")]
    pub minutes: Option<Option<i64>>,
    #[serde(deserialize_with = "nullable")]
    pub note: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListLogsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub book_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CalendarResponse {
    pub year: i32,
    pub days: Vec<CalendarDay>,
    pub streaks: Streaks,
}

fn check_amounts(pages: i64, minutes: Option<i64>) -> folio_core::Result<()> {
    if pages < 0 {
        return Err(Error::Validation("pages_read cannot be negative".into()));
    }
    if minutes.is_some_and(|m| m < 0) {
        return Err(Error::Validation("minutes cannot be negative".into()));
    }
    Ok(())
}

fn require_log(
    conn: &rusqlite::Connection,
    user_id: UserId,
    id: ReadingLogId,
) -> folio_core::Result<ReadingLog> {
    reading_logs::get_log(conn, user_id, id)?.ok_or_else(|| Error::not_found(ReadingLogId::ENTITY, id))
}

/// GET /api/logs
pub async fn list_logs(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<ListLogsQuery>,
) -> Result<Json<Vec<ReadingLog>>, AppError> {
    let from = opt_date("from", query.from.as_deref())?;
    let to = opt_date("to", query.to.as_deref())?;
    let book_id = clean(query.book_id)
        .map(|b| BookId::parse_param(&b))
        .transpose()?;
    let conn = ctx.conn()?;
    Ok(Json(reading_logs::list_logs(&conn, user_id, from, to, book_id)?))
}

/// POST /api/logs
pub async fn create_log(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Json(payload): Json<CreateLogRequest>,
) -> Result<(StatusCode, Json<ReadingLog>), AppError> {
    let book_id = BookId::parse_param(&payload.book_id)?;
    let date = opt_date("date", payload.date.as_deref())?.unwrap_or_else(|| ctx.today());
    check_amounts(payload.pages_read, payload.minutes)?;

    let conn = ctx.conn()?;
    books::require_book(&conn, user_id, book_id)?;
    let log = reading_logs::create_log(
        &conn,
        user_id,
        &NewLog {
            book_id,
            date,
            pages_read: payload.pages_read,
            minutes: payload.minutes,
            note: clean(payload.note),
        },
    )?;
    Ok((StatusCode::CREATED, Json(log)))
}

/// GET /api/logs/{id}
pub async fn get_log(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<Json<ReadingLog>, AppError> {
    let id = ReadingLogId::parse_param(&id)?;
    let conn = ctx.conn()?;
    Ok(Json(require_log(&conn, user_id, id)?))
}

/// PUT /api/logs/{id}
pub async fn update_log(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateLogRequest>,
) -> Result<Json<ReadingLog>, AppError> {
    let id = ReadingLogId::parse_param(&id)?;
    let conn = ctx.conn()?;
    let mut log = require_log(&conn, user_id, id)?;
    if let Some(date) = opt_date("date", payload.date.as_deref())? {
        log.date = date;
    }
    if let Some(pages) = payload.pages_read {
        log.pages_read = pages;
    }
    if let Some(minutes) = payload.minutes {
        log.minutes = minutes;
    }
    if let Some(note) = payload.note {
        log.note = clean(note);
    }
    check_amounts(log.pages_read, log.minutes)?;
    reading_logs::update_log(&conn, user_id, &log)?;
    Ok(Json(log))
}

/// DELETE /api/logs/{id}
pub async fn delete_log(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = ReadingLogId::parse_param(&id)?;
    let conn = ctx.conn()?;
    if !reading_logs::delete_log(&conn, user_id, id)? {
        return Err(Error::not_found(ReadingLogId::ENTITY, id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/calendar?year=
///
/// Defaults to the current year.
#[utoipa::path(
    get,
    path = "/api/calendar",
    params(("year" = Option<i32>, Query, description = "Defaults to the current year")),
    responses(
        (status = 200, description = "Days with reading activity", body = CalendarResponse)
    )
)]
pub async fn calendar(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarResponse>, AppError> {
    let today = ctx.today();
    let year = check_year(query.year.unwrap_or_else(|| today.year()))?;
    let conn = ctx.conn()?;
    let logs = folio_db::facts::log_facts(&conn, user_id)?;
    let finished = folio_db::facts::finished_dates(&conn, user_id)?;
    let dates: Vec<_> = logs.iter().map(|l| l.date).collect();
    Ok(Json(CalendarResponse {
        year,
        days: calendar::build_calendar(year, &logs, &finished),
        streaks: calendar::compute_streaks(&dates, today),
    }))
}

/// GET /api/streaks
#[utoipa::path(
    get,
    path = "/api/streaks",
    responses(
        (status = 200, description = "Current and longest streak", body = Streaks)
    )
)]
pub async fn streaks(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<Streaks>, AppError> {
    let conn = ctx.conn()?;
    let dates = reading_logs::active_dates(&conn, user_id)?;
    Ok(Json(calendar::compute_streaks(&dates, ctx.today())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_must_be_non_negative() {
        assert!(check_amounts(0, None).is_ok());
        assert!(check_amounts(-1, None).is_err());
        assert!(check_amounts(10, Some(-5)).is_err());
    }
}
