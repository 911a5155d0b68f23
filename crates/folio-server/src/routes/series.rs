//! Series CRUD and reading progress.

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use folio_core::{Error, SeriesId, UserId};
use folio_db::models::{Book, Series};
use folio_db::queries::series::{self, SeriesProgress};
use serde::{Deserialize, Serialize};

use super::{clean, nullable};
use crate::context::AppContext;
use crate::error::AppError;

const MAX_NAME: usize = 200;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateSeriesRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub total_volumes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateSeriesRequest {
    pub name: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub total_volumes: Option<Option<i64>>,
}

#[derive(Debug, Serialize)]
pub struct SeriesSummary {
    #[serde(flatten)]
    pub series: Series,
    pub progress: SeriesProgress,
}

#[derive(Debug, Serialize)]
pub struct SeriesDetail {
    #[serde(flatten)]
    pub series: Series,
    pub progress: SeriesProgress,
    /// Ordered by series index, then title.
    pub books: Vec<Book>,
}

fn check_volumes(total: Option<i64>) -> folio_core::Result<Option<i64>> {
    match total {
        Some(n) if n < 1 => Err(Error::Validation("total_volumes must be at least 1".into())),
        other => Ok(other),
    }
}

/// GET /api/series
pub async fn list_series(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<Vec<SeriesSummary>>, AppError> {
    let conn = ctx.conn()?;
    let mut out = Vec::new();
    for s in series::list_series(&conn, user_id)? {
        let books = series::books_in(&conn, s.id)?;
        out.push(SeriesSummary {
            progress: SeriesProgress::compute(&books, s.total_volumes),
            series: s,
        });
    }
    Ok(Json(out))
}

/// POST /api/series
pub async fn create_series(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Json(payload): Json<CreateSeriesRequest>,
) -> Result<(StatusCode, Json<Series>), AppError> {
    let name = folio_core::require_name("name", &payload.name, MAX_NAME)?;
    let total = check_volumes(payload.total_volumes)?;
    let description = clean(payload.description);
    let conn = ctx.conn()?;
    let created = series::create_series(&conn, user_id, &name, description.as_deref(), total)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/series/{id}
pub async fn get_series(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<Json<SeriesDetail>, AppError> {
    let id = SeriesId::parse_param(&id)?;
    let conn = ctx.conn()?;
    let found = series::require_series(&conn, user_id, id)?;
    let books = series::books_in(&conn, id)?;
    Ok(Json(SeriesDetail {
        progress: SeriesProgress::compute(&books, found.total_volumes),
        series: found,
        books,
    }))
}

/// PUT /api/series/{id}
pub async fn update_series(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateSeriesRequest>,
) -> Result<Json<Series>, AppError> {
    let id = SeriesId::parse_param(&id)?;
    let conn = ctx.conn()?;
    let mut current = series::require_series(&conn, user_id, id)?;
    if let Some(name) = payload.name {
        current.name = folio_core::require_name("name", &name, MAX_NAME)?;
    }
    if let Some(d) = payload.description {
        current.description = clean(d);
    }
    if let Some(total) = payload.total_volumes {
        current.total_volumes = check_volumes(total)?;
    }
    series::update_series(&conn, user_id, &current)?;
    Ok(Json(current))
}

/// DELETE /api/series/{id}
pub async fn delete_series(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = SeriesId::parse_param(&id)?;
    let conn = ctx.conn()?;
    if !series::delete_series(&conn, user_id, id)? {
        return Err(Error::not_found(SeriesId::ENTITY, id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}
