//! User management routes (admin only).

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use folio_core::{Error, Role, UserId};
use folio_db::models::User;
use folio_db::queries::users;
use serde::Deserialize;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::auth::CurrentUser;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

/// GET /api/users
pub async fn list_users(
    State(ctx): State<AppContext>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<User>>, AppError> {
    current.require_admin()?;
    let conn = ctx.conn()?;
    Ok(Json(users::list_users(&conn)?))
}

/// PUT /api/users/{id}/role
///
/// The last admin cannot be demoted.
pub async fn update_role(
    State(ctx): State<AppContext>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<User>, AppError> {
    current.require_admin()?;
    let id = UserId::parse_param(&id)?;

    let conn = ctx.conn()?;
    let user = users::get_user_by_id(&conn, id)?.ok_or_else(|| Error::not_found(UserId::ENTITY, id))?;
    if user.is_admin() && payload.role != Role::Admin && users::count_admins(&conn)? <= 1 {
        return Err(Error::Conflict("Cannot demote the last admin".into()).into());
    }
    users::update_user_role(&conn, id, payload.role)?;
    tracing::info!(username = %user.username, role = %payload.role, "Role changed");

    let user = users::get_user_by_id(&conn, id)?.ok_or_else(|| Error::not_found(UserId::ENTITY, id))?;
    Ok(Json(user))
}

/// DELETE /api/users/{id}
///
/// Removes the account and, by cascade, all of its data. Admins cannot
/// delete themselves.
pub async fn delete_user(
    State(ctx): State<AppContext>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    current.require_admin()?;
    let id = UserId::parse_param(&id)?;
    if id == current.id {
        return Err(Error::Conflict("Admins cannot delete their own account".into()).into());
    }

    let conn = ctx.conn()?;
    let user = users::get_user_by_id(&conn, id)?.ok_or_else(|| Error::not_found(UserId::ENTITY, id))?;
    let mut book_files = Vec::new();
    for book in folio_db::queries::books::all_books(&conn, id)? {
        book_files.extend(
            folio_db::queries::images::list_for_book(&conn, book.id)?
                .into_iter()
                .map(|img| img.path),
        );
    }
    users::delete_user(&conn, id)?;

    for path in book_files {
        if let Err(e) = ctx.images.remove(&path) {
            tracing::warn!(%path, "Failed to remove image file: {e}");
        }
    }
    tracing::info!(username = %user.username, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}
