//! Typed ID wrappers for every persisted entity.
//!
//! Each ID is a newtype over `Uuid` so a `BookId` can never be passed where a
//! `QuoteId` is expected. Every ID also knows its entity label, which is used
//! to build uniform "invalid id" and "not found" errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// Generate a newtype ID wrapper over `Uuid`.
///
/// The macro produces a struct with:
/// - `new()` to create a random v4 UUID
/// - `parse_param()` turning a path segment into the ID or a validation error
/// - `ENTITY`, the lowercase label used in error messages
/// - `Display`, `FromStr`, and `Uuid` conversions
macro_rules! typed_id {
    ($($(#[doc = $doc:expr])* $name:ident => $entity:literal),+ $(,)?) => {
        $(
            $(#[doc = $doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(Uuid);

            impl $name {
                /// Entity label used in error messages.
                pub const ENTITY: &'static str = $entity;

                /// Create a new random ID.
                #[must_use]
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }

                /// Return the inner UUID value.
                #[must_use]
                pub fn as_uuid(&self) -> &Uuid {
                    &self.0
                }

                /// Parse a request parameter, mapping failure to a 400.
                pub fn parse_param(s: &str) -> crate::Result<Self> {
                    s.parse()
                        .map_err(|_| Error::Validation(format!("Invalid {} id: {s}", $entity)))
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl FromStr for $name {
                type Err = uuid::Error;

                fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                    Uuid::parse_str(s).map(Self)
                }
            }

            impl From<Uuid> for $name {
                fn from(uuid: Uuid) -> Self {
                    Self(uuid)
                }
            }

            impl From<$name> for Uuid {
                fn from(id: $name) -> Self {
                    id.0
                }
            }
        )+
    };
}

typed_id! {
    /// Unique identifier for a user account.
    UserId => "user",
    /// Unique identifier for a login session token row.
    SessionId => "session",
    /// Unique identifier for a book in a user's library.
    BookId => "book",
    /// Unique identifier for an author.
    AuthorId => "author",
    /// Unique identifier for a genre.
    GenreId => "genre",
    /// Unique identifier for a user-defined collection.
    CollectionId => "collection",
    /// Unique identifier for a book series.
    SeriesId => "series",
    /// Unique identifier for a saved quote.
    QuoteId => "quote",
    /// Unique identifier for a lexicon entry.
    WordId => "word",
    /// Unique identifier for a yearly reading goal.
    GoalId => "goal",
    /// Unique identifier for a reading session log.
    ReadingLogId => "reading log",
    /// Unique identifier for a stored book image.
    ImageId => "image",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(BookId::new(), BookId::new());
    }

    #[test]
    fn display_and_from_str() {
        let id = CollectionId::new();
        let parsed: CollectionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn serde_is_transparent() {
        let id = QuoteId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: QuoteId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn parse_param_rejects_garbage() {
        let err = BookId::parse_param("not-a-uuid").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("Invalid book id"));
    }

    #[test]
    fn parse_param_accepts_uuid() {
        let id = ReadingLogId::new();
        assert_eq!(ReadingLogId::parse_param(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn entity_labels() {
        assert_eq!(SeriesId::ENTITY, "series");
        assert_eq!(WordId::ENTITY, "word");
    }
}
