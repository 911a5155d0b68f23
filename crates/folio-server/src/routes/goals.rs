//! Yearly reading goals.

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use folio_core::goals::GoalProgress;
use folio_core::{Error, UserId};
use folio_db::models::ReadingGoal;
use folio_db::queries::goals;
use serde::{Deserialize, Serialize};

use super::check_year;
use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct GoalRequest {
    pub target_books: u32,
    #[serde(default)]
    pub target_pages: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct GoalWithProgress {
    #[serde(flatten)]
    pub goal: ReadingGoal,
    pub progress: Option<GoalProgress>,
}

fn parse_year(raw: &str) -> folio_core::Result<i32> {
    let year = raw
        .trim()
        .parse::<i32>()
        .map_err(|_| Error::Validation(format!("Invalid year '{raw}'")))?;
    check_year(year)
}

fn with_progress(
    conn: &rusqlite::Connection,
    user_id: UserId,
    goal: ReadingGoal,
    today: chrono::NaiveDate,
) -> folio_core::Result<GoalWithProgress> {
    Ok(GoalWithProgress {
        progress: folio_db::facts::goal_progress(conn, user_id, goal.year, today)?,
        goal,
    })
}

/// GET /api/goals
pub async fn list_goals(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<Vec<GoalWithProgress>>, AppError> {
    let conn = ctx.conn()?;
    let today = ctx.today();
    let goals = goals::list_goals(&conn, user_id)?
        .into_iter()
        .map(|g| with_progress(&conn, user_id, g, today))
        .collect::<folio_core::Result<Vec<_>>>()?;
    Ok(Json(goals))
}

/// GET /api/goals/{year}
pub async fn get_goal(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(year): Path<String>,
) -> Result<Json<GoalWithProgress>, AppError> {
    let year = parse_year(&year)?;
    let conn = ctx.conn()?;
    let goal = goals::get_goal(&conn, user_id, year)?.ok_or_else(|| Error::not_found("goal", year))?;
    Ok(Json(with_progress(&conn, user_id, goal, ctx.today())?))
}

/// PUT /api/goals/{year}
///
/// Sets or replaces the goal for the year.
#[utoipa::path(
    put,
    path = "/api/goals/{year}",
    params(("year" = i32, Path, description = "Goal year")),
    request_body = GoalRequest,
    responses(
        (status = 200, description = "Goal saved with progress"),
        (status = 400, description = "Invalid target")
    )
)]
pub async fn set_goal(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(year): Path<String>,
    Json(payload): Json<GoalRequest>,
) -> Result<Json<GoalWithProgress>, AppError> {
    let year = parse_year(&year)?;
    if payload.target_books == 0 {
        return Err(Error::Validation("target_books must be at least 1".into()).into());
    }
    if payload.target_pages == Some(0) {
        return Err(Error::Validation("target_pages must be at least 1".into()).into());
    }
    let conn = ctx.conn()?;
    let goal = goals::upsert_goal(&conn, user_id, year, payload.target_books, payload.target_pages)?;
    Ok(Json(with_progress(&conn, user_id, goal, ctx.today())?))
}

/// DELETE /api/goals/{year}
pub async fn delete_goal(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(year): Path<String>,
) -> Result<StatusCode, AppError> {
    let year = parse_year(&year)?;
    let conn = ctx.conn()?;
    if !goals::delete_goal(&conn, user_id, year)? {
        return Err(Error::not_found("goal", year).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_parameter() {
        assert_eq!(parse_year("2024").unwrap(), 2024);
        assert!(parse_year("twenty").is_err());
        assert!(parse_year("12").is_err());
    }
}
