//! Embedded SQL migrations and runner.
//!
//! Migrations are `&str` constants executed in order. A `schema_migrations`
//! table tracks which versions have been applied.

use folio_core::{Error, Result};
use rusqlite::Connection;

/// V1: accounts, the library, and everything hanging off a book.
const V1_INITIAL: &str = r#"
-- Accounts
CREATE TABLE users (
    id            TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL DEFAULT 'user',
    created_at    TEXT NOT NULL
);

CREATE TABLE auth_tokens (
    id         TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token      TEXT NOT NULL UNIQUE,
    expires_at TEXT NOT NULL
);

-- Series
CREATE TABLE series (
    id            TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name          TEXT NOT NULL COLLATE NOCASE,
    description   TEXT,
    total_volumes INTEGER,
    created_at    TEXT NOT NULL,
    UNIQUE (user_id, name)
);

-- Books
CREATE TABLE books (
    id              TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    title           TEXT NOT NULL,
    subtitle        TEXT,
    isbn            TEXT,
    publisher       TEXT,
    published_year  INTEGER,
    page_count      INTEGER,
    language        TEXT,
    description     TEXT,
    cover_url       TEXT,
    google_books_id TEXT,
    status          TEXT NOT NULL DEFAULT 'to_read',
    rating          REAL,
    comment         TEXT,
    started_at      TEXT,
    finished_at     TEXT,
    series_id       TEXT REFERENCES series(id) ON DELETE SET NULL,
    series_index    REAL,
    favorite        INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

-- Authors and genres (per user, linked many-to-many)
CREATE TABLE authors (
    id            TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name          TEXT NOT NULL COLLATE NOCASE,
    bio           TEXT,
    wikipedia_url TEXT,
    created_at    TEXT NOT NULL,
    UNIQUE (user_id, name)
);

CREATE TABLE book_authors (
    book_id   TEXT NOT NULL REFERENCES books(id) ON DELETE CASCADE,
    author_id TEXT NOT NULL REFERENCES authors(id) ON DELETE CASCADE,
    position  INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (book_id, author_id)
);

CREATE TABLE genres (
    id      TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name    TEXT NOT NULL COLLATE NOCASE,
    UNIQUE (user_id, name)
);

CREATE TABLE book_genres (
    book_id  TEXT NOT NULL REFERENCES books(id) ON DELETE CASCADE,
    genre_id TEXT NOT NULL REFERENCES genres(id) ON DELETE CASCADE,
    PRIMARY KEY (book_id, genre_id)
);

-- Collections
CREATE TABLE collections (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name        TEXT NOT NULL COLLATE NOCASE,
    description TEXT,
    created_at  TEXT NOT NULL,
    UNIQUE (user_id, name)
);

CREATE TABLE collection_books (
    collection_id TEXT NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
    book_id       TEXT NOT NULL REFERENCES books(id) ON DELETE CASCADE,
    added_at      TEXT NOT NULL,
    PRIMARY KEY (collection_id, book_id)
);

-- Quotes and lexicon
CREATE TABLE quotes (
    id         TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    book_id    TEXT NOT NULL REFERENCES books(id) ON DELETE CASCADE,
    text       TEXT NOT NULL,
    page       INTEGER,
    created_at TEXT NOT NULL
);

CREATE TABLE words (
    id         TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    book_id    TEXT REFERENCES books(id) ON DELETE SET NULL,
    word       TEXT NOT NULL COLLATE NOCASE,
    definition TEXT,
    note       TEXT,
    language   TEXT NOT NULL DEFAULT 'en',
    created_at TEXT NOT NULL,
    UNIQUE (user_id, word, language)
);

-- Goals and reading sessions
CREATE TABLE reading_goals (
    id           TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    year         INTEGER NOT NULL,
    target_books INTEGER NOT NULL,
    target_pages INTEGER,
    created_at   TEXT NOT NULL,
    UNIQUE (user_id, year)
);

CREATE TABLE reading_logs (
    id         TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    book_id    TEXT NOT NULL REFERENCES books(id) ON DELETE CASCADE,
    date       TEXT NOT NULL,
    pages_read INTEGER NOT NULL DEFAULT 0,
    minutes    INTEGER,
    note       TEXT,
    created_at TEXT NOT NULL
);

-- Top-10 lists; year 0 is the all-time list
CREATE TABLE top_books (
    user_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    year     INTEGER NOT NULL DEFAULT 0,
    position INTEGER NOT NULL CHECK (position BETWEEN 1 AND 10),
    book_id  TEXT NOT NULL REFERENCES books(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, year, position),
    UNIQUE (user_id, year, book_id)
);

-- Cover images
CREATE TABLE book_images (
    id         TEXT PRIMARY KEY,
    book_id    TEXT NOT NULL REFERENCES books(id) ON DELETE CASCADE,
    path       TEXT NOT NULL,
    provider   TEXT NOT NULL,
    width      INTEGER,
    height     INTEGER,
    hash       TEXT NOT NULL,
    is_cover   INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
"#;

/// V2: indexes for the per-user listing queries.
const V2_INDEXES: &str = r#"
CREATE INDEX idx_books_user_status   ON books(user_id, status);
CREATE INDEX idx_books_user_finished ON books(user_id, finished_at);
CREATE INDEX idx_books_series        ON books(series_id);
CREATE INDEX idx_book_authors_author ON book_authors(author_id);
CREATE INDEX idx_book_genres_genre   ON book_genres(genre_id);
CREATE INDEX idx_collection_books_book ON collection_books(book_id);
CREATE INDEX idx_quotes_book         ON quotes(book_id);
CREATE INDEX idx_quotes_user         ON quotes(user_id, created_at);
CREATE INDEX idx_words_user          ON words(user_id);
CREATE INDEX idx_reading_logs_user_date ON reading_logs(user_id, date);
CREATE INDEX idx_book_images_book    ON book_images(book_id);
CREATE INDEX idx_auth_tokens_expiry  ON auth_tokens(expires_at);
"#;

/// Ordered list of (version, sql) pairs.
const MIGRATIONS: &[(i64, &str)] = &[(1, V1_INITIAL), (2, V2_INDEXES)];

/// Run all pending migrations on `conn`.
///
/// Creates the `schema_migrations` tracking table if needed, then applies
/// each outstanding migration inside its own transaction.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| Error::database(e.to_string()))?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;

        tracing::debug!(version, "Applied migration");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }

    #[test]
    fn all_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();

        for t in [
            "users",
            "auth_tokens",
            "series",
            "books",
            "authors",
            "book_authors",
            "genres",
            "book_genres",
            "collections",
            "collection_books",
            "quotes",
            "words",
            "reading_goals",
            "reading_logs",
            "top_books",
            "book_images",
        ] {
            let exists: bool = conn
                .query_row(
                    "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name=?1",
                    [t],
                    |row| row.get(0),
                )
                .unwrap();
            assert!(exists, "table {t} should exist");
        }
    }
}
