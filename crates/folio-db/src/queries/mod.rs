//! Database query modules.

pub mod auth;
pub mod authors;
pub mod books;
pub mod collections;
pub mod genres;
pub mod goals;
pub mod images;
pub mod maintenance;
pub mod quotes;
pub mod reading_logs;
pub mod series;
pub mod top_books;
pub mod users;
pub mod words;
