//! Diagnosis and repair of corrupted stored ratings.
//!
//! Older imports wrote ratings through a lossy serializer: some rows hold
//! text ("4,5", "3 stars"), some hold values scaled by ten (45 for 4.5),
//! some are off the half-star grid, and some unread books carry a rating at
//! all. [`diagnose`] reports what is wrong with a stored value and
//! [`repair`] computes the value it should be replaced with.

use serde::Serialize;

use crate::domain::{BookStatus, MAX_RATING, MIN_RATING, RATING_STEP};

/// A rating as SQLite actually stored it, before any coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredRating {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

/// One problem found with a stored rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RatingIssue {
    StoredAsText,
    Unparseable,
    OutOfRange,
    OffGrid,
    OnUnreadBook,
}

impl StoredRating {
    /// Numeric view of the stored value; text is parsed leniently.
    pub fn numeric(&self) -> Option<f64> {
        match self {
            Self::Null => None,
            Self::Integer(i) => Some(*i as f64),
            Self::Real(r) => Some(*r),
            Self::Text(s) => parse_lenient(s),
        }
    }

    /// Render the stored value for reports.
    pub fn display(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Integer(i) => Some(i.to_string()),
            Self::Real(r) => Some(r.to_string()),
            Self::Text(s) => Some(format!("{s:?}")),
        }
    }
}

/// Parse "4,5", " 4.5 ", "4.5/5" or "4 stars" into a number.
fn parse_lenient(s: &str) -> Option<f64> {
    let cleaned = s.trim().replace(',', ".");
    let numeric: String = cleaned
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    numeric.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn on_grid(v: f64) -> bool {
    (v / RATING_STEP).fract() == 0.0
}

/// List every issue with `stored` for a book in `status`. Empty means valid.
pub fn diagnose(stored: &StoredRating, status: BookStatus) -> Vec<RatingIssue> {
    let mut issues = Vec::new();
    if *stored == StoredRating::Null {
        return issues;
    }

    if matches!(stored, StoredRating::Text(_)) {
        issues.push(RatingIssue::StoredAsText);
    }

    match stored.numeric() {
        None => issues.push(RatingIssue::Unparseable),
        Some(v) => {
            if !(MIN_RATING..=MAX_RATING).contains(&v) {
                issues.push(RatingIssue::OutOfRange);
            } else if !on_grid(v) {
                issues.push(RatingIssue::OffGrid);
            }
        }
    }

    if !status.accepts_rating() {
        issues.push(RatingIssue::OnUnreadBook);
    }

    issues
}

/// Compute the corrected rating for a stored value.
///
/// Returns `None` when the stored value is already valid, otherwise
/// `Some(new_value)` where `new_value` may itself be `None` (clear).
pub fn repair(stored: &StoredRating, status: BookStatus) -> Option<Option<f64>> {
    if diagnose(stored, status).is_empty() {
        return None;
    }

    if !status.accepts_rating() {
        return Some(None);
    }

    Some(stored.numeric().map(normalize))
}

/// Bring a numeric value back onto the 0.5..=5.0 half-star grid.
fn normalize(v: f64) -> f64 {
    let scaled = if v > MAX_RATING && v <= MAX_RATING * 10.0 && v % 5.0 == 0.0 {
        v / 10.0
    } else {
        v.min(MAX_RATING)
    };
    let rounded = (scaled / RATING_STEP).round() * RATING_STEP;
    rounded.clamp(MIN_RATING, MAX_RATING)
}
