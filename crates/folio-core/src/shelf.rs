//! Status transitions for a book on the shelf.
//!
//! Moving a book between statuses touches its dates and rating: starting a
//! book stamps `started_at`, finishing stamps `finished_at`, and putting it
//! back on the to-read pile forgets both along with the rating.

use chrono::NaiveDate;

use crate::domain::{validate_rating, BookStatus};
use crate::error::{Error, Result};

/// The mutable reading state of a book.
#[derive(Debug, Clone, PartialEq)]
pub struct ShelfState {
    pub status: BookStatus,
    pub rating: Option<f64>,
    pub started_at: Option<NaiveDate>,
    pub finished_at: Option<NaiveDate>,
}

impl ShelfState {
    /// A freshly added book.
    pub fn new(status: BookStatus, today: NaiveDate) -> Self {
        Self {
            status: BookStatus::ToRead,
            rating: None,
            started_at: None,
            finished_at: None,
        }
        .transition(status, today)
    }

    /// Move to `to`, filling or clearing dates and rating as needed.
    pub fn transition(mut self, to: BookStatus, today: NaiveDate) -> Self {
        match to {
            BookStatus::ToRead => {
                self.rating = None;
                self.started_at = None;
                self.finished_at = None;
            }
            BookStatus::Reading => {
                self.rating = None;
                self.finished_at = None;
                self.started_at.get_or_insert(today);
            }
            BookStatus::Read => {
                self.finished_at.get_or_insert(today);
            }
            BookStatus::Abandoned => {}
        }
        self.status = to;
        self
    }

    /// Check the invariants a persisted book must satisfy.
    pub fn validate(&self) -> Result<()> {
        if let Some(rating) = self.rating {
            if !self.status.accepts_rating() {
                return Err(Error::Validation(format!(
                    "A book with status '{}' cannot be rated",
                    self.status
                )));
            }
            validate_rating(rating)?;
        }
        if let (Some(start), Some(end)) = (self.started_at, self.finished_at) {
            if end < start {
                return Err(Error::Validation(
                    "finished_at cannot be before started_at".into(),
                ));
            }
        }
        Ok(())
    }
}
