//! Lexicon entries.

use chrono::Utc;
use folio_core::{BookId, Error, Result, UserId, WordId};
use rusqlite::{Connection, OptionalExtension};

use crate::models::Word;

const COLS: &str = "id, book_id, word, definition, note, language, created_at";

#[derive(Debug, Clone, Default)]
pub struct NewWord {
    pub word: String,
    pub definition: Option<String>,
    pub note: Option<String>,
    pub language: String,
    pub book_id: Option<BookId>,
}

fn map_unique(e: rusqlite::Error, word: &str) -> Error {
    if e.to_string().contains("UNIQUE constraint failed") {
        Error::Conflict(format!("'{word}' is already in the lexicon"))
    } else {
        Error::database(e.to_string())
    }
}

pub fn create_word(conn: &Connection, user_id: UserId, new: &NewWord) -> Result<Word> {
    let id = WordId::new();
    let created_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO words (id, user_id, book_id, word, definition, note, language, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            id.to_string(),
            user_id.to_string(),
            new.book_id.map(|b| b.to_string()),
            new.word,
            new.definition,
            new.note,
            new.language,
            created_at
        ],
    )
    .map_err(|e| map_unique(e, &new.word))?;

    Ok(Word {
        id,
        book_id: new.book_id,
        word: new.word.clone(),
        definition: new.definition.clone(),
        note: new.note.clone(),
        language: new.language.clone(),
        created_at,
    })
}

pub fn get_word(conn: &Connection, user_id: UserId, id: WordId) -> Result<Option<Word>> {
    conn.query_row(
        &format!("SELECT {COLS} FROM words WHERE id = ?1 AND user_id = ?2"),
        [id.to_string(), user_id.to_string()],
        Word::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Lexicon of a user in alphabetical order, optionally limited to one language.
pub fn list_words(conn: &Connection, user_id: UserId, language: Option<&str>) -> Result<Vec<Word>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLS} FROM words
             WHERE user_id = ?1 AND (?2 IS NULL OR language = ?2)
             ORDER BY word COLLATE NOCASE, language"
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params![user_id.to_string(), language], Word::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

pub fn update_word(conn: &Connection, user_id: UserId, word: &Word) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE words SET word = ?1, definition = ?2, note = ?3, language = ?4, book_id = ?5
             WHERE id = ?6 AND user_id = ?7",
            rusqlite::params![
                word.word,
                word.definition,
                word.note,
                word.language,
                word.book_id.map(|b| b.to_string()),
                word.id.to_string(),
                user_id.to_string()
            ],
        )
        .map_err(|e| map_unique(e, &word.word))?;
    Ok(n > 0)
}

pub fn delete_word(conn: &Connection, user_id: UserId, id: WordId) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM words WHERE id = ?1 AND user_id = ?2",
            [id.to_string(), user_id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

pub fn count_words(conn: &Connection, user_id: UserId) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM words WHERE user_id = ?1",
        [user_id.to_string()],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}
