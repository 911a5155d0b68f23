//! Public seasonal theme for the front end.

use axum::extract::{Query, State};
use axum::Json;
use folio_core::theme::Theme;
use serde::Deserialize;

use super::opt_date;
use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
pub struct ThemeQuery {
    pub date: Option<String>,
}

/// GET /api/theme?date=
///
/// Public: the login page is decorated too.
#[utoipa::path(
    get,
    path = "/api/theme",
    params(("date" = Option<String>, Query, description = "YYYY-MM-DD, defaults to today")),
    responses(
        (status = 200, description = "Seasonal theme", body = Theme),
        (status = 400, description = "Invalid date")
    )
)]
pub async fn get_theme(
    State(ctx): State<AppContext>,
    Query(query): Query<ThemeQuery>,
) -> Result<Json<Theme>, AppError> {
    let date = opt_date("date", query.date.as_deref())?.unwrap_or_else(|| ctx.today());
    Ok(Json(Theme::for_date(date, ctx.config.ui.seasonal_effects)))
}
