//! Library-domain enums and value validation.
//!
//! Enums serialize in snake_case and round-trip through the same strings
//! that are stored in the database.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Lowest valid rating.
pub const MIN_RATING: f64 = 0.5;
/// Highest valid rating.
pub const MAX_RATING: f64 = 5.0;
/// Ratings are stored on a half-star grid.
pub const RATING_STEP: f64 = 0.5;

// ---------------------------------------------------------------------------
// BookStatus
// ---------------------------------------------------------------------------

/// Where a book stands on the user's shelf.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    #[default]
    ToRead,
    Reading,
    Read,
    Abandoned,
}

impl BookStatus {
    pub const ALL: [BookStatus; 4] = [
        BookStatus::ToRead,
        BookStatus::Reading,
        BookStatus::Read,
        BookStatus::Abandoned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToRead => "to_read",
            Self::Reading => "reading",
            Self::Read => "read",
            Self::Abandoned => "abandoned",
        }
    }

    /// Only finished (or given-up) books carry a rating.
    pub fn accepts_rating(&self) -> bool {
        matches!(self, Self::Read | Self::Abandoned)
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // Accept the legacy upper-case spellings too (TO_READ, READ, ...).
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "to_read" => Ok(Self::ToRead),
            "reading" => Ok(Self::Reading),
            "read" => Ok(Self::Read),
            "abandoned" => Ok(Self::Abandoned),
            other => Err(Error::Validation(format!("Unknown book status '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(Error::Validation(format!("Unknown role '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// ImageProvider
// ---------------------------------------------------------------------------

/// Where a stored book image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImageProvider {
    Upload,
    GoogleBooks,
    Url,
}

impl ImageProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::GoogleBooks => "google_books",
            Self::Url => "url",
        }
    }
}

impl fmt::Display for ImageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "upload" => Ok(Self::Upload),
            "google_books" => Ok(Self::GoogleBooks),
            "url" => Ok(Self::Url),
            other => Err(Error::Validation(format!("Unknown image provider '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Check that `rating` lies on the half-star grid between 0.5 and 5.0.
pub fn validate_rating(rating: f64) -> Result<f64> {
    if !rating.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(Error::Validation(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
        )));
    }
    if (rating / RATING_STEP).fract() != 0.0 {
        return Err(Error::Validation(format!(
            "Rating must be a multiple of {RATING_STEP}, got {rating}"
        )));
    }
    Ok(rating)
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("{field} must be a YYYY-MM-DD date, got '{value}'")))
}

/// Normalize a user-supplied name: trim and collapse inner whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Require a non-empty, normalized name of at most `max` characters.
pub fn require_name(field: &str, name: &str, max: usize) -> Result<String> {
    let name = normalize_name(name);
    if name.is_empty() {
        return Err(Error::Validation(format!("{field} is required")));
    }
    if name.chars().count() > max {
        return Err(Error::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for status in BookStatus::ALL {
            assert_eq!(status.as_str().parse::<BookStatus>().unwrap(), status);
        }
    }

    #[test]
    fn status_accepts_legacy_spelling() {
        assert_eq!("TO_READ".parse::<BookStatus>().unwrap(), BookStatus::ToRead);
        assert_eq!("to-read".parse::<BookStatus>().unwrap(), BookStatus::ToRead);
        assert!("shelved".parse::<BookStatus>().is_err());
    }

    #[test]
    fn status_serde_snake_case() {
        let json = serde_json::to_string(&BookStatus::ToRead).unwrap();
        assert_eq!(json, "\"to_read\"");
    }

    #[test]
    fn only_finished_books_take_ratings() {
        assert!(BookStatus::Read.accepts_rating());
        assert!(BookStatus::Abandoned.accepts_rating());
        assert!(!BookStatus::Reading.accepts_rating());
        assert!(!BookStatus::ToRead.accepts_rating());
    }

    #[test]
    fn rating_grid() {
        assert_eq!(validate_rating(4.5).unwrap(), 4.5);
        assert_eq!(validate_rating(0.5).unwrap(), 0.5);
        assert!(validate_rating(0.0).is_err());
        assert!(validate_rating(5.5).is_err());
        assert!(validate_rating(3.3).is_err());
        assert!(validate_rating(f64::NAN).is_err());
    }

    #[test]
    fn date_parsing() {
        assert!(parse_date("finished_at", "2024-02-29").is_ok());
        let err = parse_date("finished_at", "29/02/2024").unwrap_err();
        assert!(err.to_string().contains("finished_at"));
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(normalize_name("  Ursula   K.  Le Guin "), "Ursula K. Le Guin");
        assert!(require_name("name", "   ", 10).is_err());
        assert!(require_name("name", "abcdefghijk", 10).is_err());
    }

    #[test]
    fn role_and_provider_parse() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
        assert_eq!(
            "google_books".parse::<ImageProvider>().unwrap(),
            ImageProvider::GoogleBooks
        );
    }
}
