//! folio-core: shared types, IDs, errors, configuration and the in-memory
//! reductions behind statistics, streaks, goals, badges and themes.
//!
//! This crate is the foundational dependency of the other folio crates. It
//! never touches the database or the network: callers fetch rows, convert
//! them into the plain `*Facts` inputs defined here, and get typed results
//! back.

pub mod badges;
pub mod calendar;
pub mod config;
pub mod domain;
pub mod error;
pub mod goals;
pub mod ids;
pub mod rating;
pub mod shelf;
pub mod stats;
pub mod theme;

// Re-export the most commonly used items at the crate root.
pub use domain::*;
pub use error::{Error, Result};
pub use ids::*;
