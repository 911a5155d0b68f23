//! Application context.
//!
//! [`AppContext`] is the central struct shared across all route handlers via
//! Axum state. It wraps the database pool, the configuration snapshot and the
//! outbound clients in `Arc`s.

use std::sync::Arc;

use chrono::NaiveDate;
use folio_core::config::Config;
use folio_core::Result;
use folio_db::pool::{DbPool, PooledConnection};

use crate::clients::{GoogleBooksClient, WikipediaClient, WiktionaryClient};
use crate::images::ImageStore;
use crate::middleware::rate_limit::{create_limiter, SharedLimiter};

/// Application context shared by all request handlers (via Axum state).
///
/// This is cheaply cloneable because it only holds `Arc`s.
#[derive(Clone)]
pub struct AppContext {
    /// Database connection pool.
    pub db: DbPool,
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    pub google_books: Arc<GoogleBooksClient>,
    pub wikipedia: Arc<WikipediaClient>,
    pub wiktionary: Arc<WiktionaryClient>,
    /// Cover image files on disk.
    pub images: Arc<ImageStore>,
    /// Quota shared by login and registration.
    pub login_limiter: SharedLimiter,
}

impl AppContext {
    pub fn new(db: DbPool, config: Config) -> Result<Self> {
        Ok(Self {
            google_books: Arc::new(GoogleBooksClient::new(&config.metadata)?),
            wikipedia: Arc::new(WikipediaClient::new(&config.metadata)?),
            wiktionary: Arc::new(WiktionaryClient::new(&config.metadata)?),
            images: Arc::new(ImageStore::new(&config.images)),
            login_limiter: create_limiter(config.auth.login_rate_per_minute),
            config: Arc::new(config),
            db,
        })
    }

    /// Check out a pooled connection.
    pub fn conn(&self) -> Result<PooledConnection> {
        folio_db::pool::get_conn(&self.db)
    }

    /// Today's date in server local time.
    pub fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}
