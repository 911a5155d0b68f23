//! Statistics page and badge progress.

use axum::extract::{Extension, Query, State};
use axum::Json;
use folio_core::badges::{self, BadgeProgress};
use folio_core::stats::{self, ReadingStats};
use folio_core::UserId;
use serde::Deserialize;

use super::check_year;
use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    /// Absent for all-time statistics.
    pub year: Option<i32>,
}

/// GET /api/stats?year=
#[utoipa::path(
    get,
    path = "/api/stats",
    params(("year" = Option<i32>, Query, description = "Year; all time when absent")),
    responses(
        (status = 200, description = "Reading statistics", body = ReadingStats)
    )
)]
pub async fn get_stats(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ReadingStats>, AppError> {
    let year = query.year.map(check_year).transpose()?;
    let conn = ctx.conn()?;
    let facts = folio_db::facts::book_facts(&conn, user_id)?;
    Ok(Json(stats::compute(&facts, year)))
}

/// GET /api/badges
#[utoipa::path(
    get,
    path = "/api/badges",
    responses(
        (status = 200, description = "Every badge with progress", body = Vec<BadgeProgress>)
    )
)]
pub async fn get_badges(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<Vec<BadgeProgress>>, AppError> {
    let conn = ctx.conn()?;
    let inputs = folio_db::facts::badge_inputs(&conn, user_id, ctx.today())?;
    Ok(Json(badges::evaluate(&inputs)))
}
