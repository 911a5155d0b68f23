//! folio-db: database access and persistence layer.
//!
//! SQLite-backed storage with connection pooling, embedded migrations,
//! typed models, and one query module per entity. Every query that touches
//! user data takes the owning [`folio_core::UserId`] and filters on it, so a
//! row belonging to someone else is indistinguishable from a missing row.

pub mod facts;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
