//! Rating corruption scan and repair across all users.

use folio_core::rating::{self, RatingIssue, StoredRating};
use folio_core::{BookId, BookStatus, Error, Result};
use rusqlite::Connection;
use serde::Serialize;

use crate::models::{parse_id, stored_rating};

/// A book whose stored rating is not a valid value.
#[derive(Debug, Clone, Serialize)]
pub struct RatingReport {
    pub book_id: BookId,
    pub title: String,
    pub owner: String,
    pub status: BookStatus,
    /// The stored value rendered as text; `None` for SQL NULL.
    pub stored: Option<String>,
    pub issues: Vec<RatingIssue>,
}

/// One change made by [`repair_ratings`].
#[derive(Debug, Clone, Serialize)]
pub struct RatingRepair {
    pub book_id: BookId,
    pub title: String,
    pub before: Option<String>,
    pub after: Option<f64>,
}

struct RawRating {
    book_id: BookId,
    title: String,
    owner: String,
    status: BookStatus,
    stored: StoredRating,
}

fn raw_ratings(conn: &Connection) -> Result<Vec<RawRating>> {
    let mut stmt = conn
        .prepare(
            "SELECT b.id, b.title, u.username, b.status, b.rating
             FROM books b JOIN users u ON u.id = b.user_id
             WHERE b.rating IS NOT NULL
             ORDER BY u.username, b.title COLLATE NOCASE",
        )
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            let status: String = row.get(3)?;
            Ok(RawRating {
                book_id: parse_id(row, 0)?,
                title: row.get(1)?,
                owner: row.get(2)?,
                // An unreadable status is treated as unread so its rating is cleared.
                status: status.parse().unwrap_or_default(),
                stored: stored_rating(row, 4)?,
            })
        })
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Report every book with a corrupted rating.
pub fn scan_ratings(conn: &Connection) -> Result<Vec<RatingReport>> {
    Ok(raw_ratings(conn)?
        .into_iter()
        .filter_map(|raw| {
            let issues = rating::diagnose(&raw.stored, raw.status);
            (!issues.is_empty()).then(|| RatingReport {
                book_id: raw.book_id,
                title: raw.title,
                owner: raw.owner,
                status: raw.status,
                stored: raw.stored.display(),
                issues,
            })
        })
        .collect())
}

/// Rewrite every corrupted rating with its repaired value in one
/// transaction. Running it again finds nothing to change.
pub fn repair_ratings(conn: &Connection) -> Result<Vec<RatingRepair>> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    let mut repairs = Vec::new();
    for raw in raw_ratings(&tx)? {
        let Some(after) = rating::repair(&raw.stored, raw.status) else {
            continue;
        };
        tx.execute(
            "UPDATE books SET rating = ?1 WHERE id = ?2",
            rusqlite::params![after, raw.book_id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
        repairs.push(RatingRepair {
            book_id: raw.book_id,
            title: raw.title,
            before: raw.stored.display(),
            after,
        });
    }

    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    if !repairs.is_empty() {
        tracing::info!(count = repairs.len(), "Repaired stored ratings");
    }
    Ok(repairs)
}
