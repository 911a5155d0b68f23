//! Yearly reading goal progress.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Progress towards a yearly goal as of `today`.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct GoalProgress {
    pub year: i32,
    pub target_books: u32,
    pub target_pages: Option<u32>,
    pub books_read: u32,
    pub pages_read: i64,
    /// Share of the book target reached, capped at 100.
    pub percent: f64,
    pub books_remaining: u32,
    /// Books that should have been read by now at an even pace.
    pub expected_by_now: f64,
    pub on_track: bool,
    pub achieved: bool,
}

/// Fraction of `year` elapsed at the end of `today` (0 before, 1 after).
fn elapsed_fraction(year: i32, today: NaiveDate) -> f64 {
    if today.year() < year {
        return 0.0;
    }
    if today.year() > year {
        return 1.0;
    }
    let days_in_year = if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366.0
    } else {
        365.0
    };
    today.ordinal() as f64 / days_in_year
}

impl GoalProgress {
    pub fn compute(
        year: i32,
        target_books: u32,
        target_pages: Option<u32>,
        books_read: u32,
        pages_read: i64,
        today: NaiveDate,
    ) -> Self {
        let percent = if target_books == 0 {
            100.0
        } else {
            ((books_read as f64 / target_books as f64) * 100.0).min(100.0)
        };
        let expected_by_now = target_books as f64 * elapsed_fraction(year, today);
        let pages_ok = target_pages.map_or(true, |p| pages_read >= p as i64);
        let achieved = books_read >= target_books && pages_ok;

        Self {
            year,
            target_books,
            target_pages,
            books_read,
            pages_read,
            percent: (percent * 10.0).round() / 10.0,
            books_remaining: target_books.saturating_sub(books_read),
            expected_by_now: (expected_by_now * 10.0).round() / 10.0,
            on_track: achieved || books_read as f64 >= expected_by_now,
            achieved,
        }
    }
}
