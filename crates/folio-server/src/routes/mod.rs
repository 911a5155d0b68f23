//! Route handlers for the HTTP API.

pub mod auth;
pub mod authors;
pub mod books;
pub mod collections;
pub mod dashboard;
pub mod export;
pub mod genres;
pub mod goals;
pub mod health;
pub mod images;
pub mod maintenance;
pub mod metadata;
pub mod quotes;
pub mod reading_logs;
pub mod roulette;
pub mod series;
pub mod stats;
pub mod theme;
pub mod top_books;
pub mod users;
pub mod words;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// Deserialize a field that distinguishes "absent" from "null".
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: absent is `None`, `null` is `Some(None)`.
pub(crate) fn nullable<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Trim free text; blank becomes `None`.
pub(crate) fn clean(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Parse an optional `YYYY-MM-DD` field.
pub(crate) fn opt_date(field: &str, value: Option<&str>) -> folio_core::Result<Option<NaiveDate>> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| folio_core::parse_date(field, v))
        .transpose()
}

/// Reject years outside what a reading log can plausibly cover.
pub(crate) fn check_year(year: i32) -> folio_core::Result<i32> {
    if (1000..=9999).contains(&year) {
        Ok(year)
    } else {
        Err(folio_core::Error::Validation(format!("Invalid year {year}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        note: Option<Option<String>>,
    }

    #[test]
    fn nullable_distinguishes_absent_from_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.note, None);
        let null: Patch = serde_json::from_str(r#"{"note": null}"#).unwrap();
        assert_eq!(null.note, Some(None));
        let set: Patch = serde_json::from_str(r#"{"note": "x"}"#).unwrap();
        assert_eq!(set.note, Some(Some("x".into())));
    }

    #[test]
    fn helpers() {
        assert_eq!(clean(Some("  ".into())), None);
        assert_eq!(clean(Some(" a ".into())).as_deref(), Some("a"));
        assert!(opt_date("d", Some("2024-13-01")).is_err());
        assert_eq!(opt_date("d", Some("")).unwrap(), None);
        assert!(check_year(99).is_err());
    }
}
