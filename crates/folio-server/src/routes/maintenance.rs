//! Admin tooling for ratings stored in an invalid form.

use axum::extract::{Extension, State};
use axum::Json;
use folio_db::queries::maintenance::{self, RatingRepair, RatingReport};
use serde::Serialize;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::auth::CurrentUser;

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub corrupted: usize,
    pub books: Vec<RatingReport>,
}

#[derive(Debug, Serialize)]
pub struct RepairResponse {
    pub repaired: usize,
    pub changes: Vec<RatingRepair>,
}

/// GET /api/maintenance/ratings
pub async fn scan_ratings(
    State(ctx): State<AppContext>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ScanResponse>, AppError> {
    current.require_admin()?;
    let conn = ctx.conn()?;
    let books = maintenance::scan_ratings(&conn)?;
    Ok(Json(ScanResponse {
        corrupted: books.len(),
        books,
    }))
}

/// POST /api/maintenance/ratings/repair
pub async fn repair_ratings(
    State(ctx): State<AppContext>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<RepairResponse>, AppError> {
    current.require_admin()?;
    let conn = ctx.conn()?;
    let changes = maintenance::repair_ratings(&conn)?;
    tracing::info!(repaired = changes.len(), by = %current.username, "Ratings repaired");
    Ok(Json(RepairResponse {
        repaired: changes.len(),
        changes,
    }))
}
