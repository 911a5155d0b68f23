//! Vocabulary lexicon with Wiktionary lookups.

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use folio_core::{BookId, Error, UserId, WordId};
use folio_db::models::Word;
use folio_db::queries::words::{self, NewWord};
use folio_db::queries::books;
use serde::Deserialize;

use super::{clean, nullable};
use crate::clients::normalize_lang;
use crate::clients::wiktionary::Definition;
use crate::context::AppContext;
use crate::error::AppError;

const MAX_WORD: usize = 100;
/// Senses kept when a definition is filled in automatically.
const AUTO_SENSES: usize = 3;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateWordRequest {
    pub word: String,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    /// Defaults to the configured metadata language.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub book_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateWordRequest {
    pub word: Option<String>,
    pub language: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub definition: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub note: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub book_id: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListWordsQuery {
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub word: String,
    pub lang: Option<String>,
}

fn owned_book(ctx: &AppContext, user_id: UserId, raw: Option<&str>) -> folio_core::Result<Option<BookId>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let id = BookId::parse_param(raw)?;
    let conn = ctx.conn()?;
    books::require_book(&conn, user_id, id).map(|b| Some(b.id))
}

fn require_word(conn: &rusqlite::Connection, user_id: UserId, id: WordId) -> folio_core::Result<Word> {
    words::get_word(conn, user_id, id)?.ok_or_else(|| Error::not_found(WordId::ENTITY, id))
}

/// GET /api/words
pub async fn list_words(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<ListWordsQuery>,
) -> Result<Json<Vec<Word>>, AppError> {
    let language = clean(query.language).map(|l| normalize_lang(&l)).transpose()?;
    let conn = ctx.conn()?;
    Ok(Json(words::list_words(&conn, user_id, language.as_deref())?))
}

/// GET /api/words/lookup?word=..&lang=..
pub async fn lookup_word(
    State(ctx): State<AppContext>,
    Extension(_user_id): Extension<UserId>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<Definition>, AppError> {
    let definition = ctx
        .wiktionary
        .define(&query.word, query.lang.as_deref())
        .await?
        .ok_or_else(|| Error::not_found("definition", query.word.trim()))?;
    Ok(Json(definition))
}

/// POST /api/words
///
/// A word saved without a definition gets one from Wiktionary when the
/// lookup succeeds. Lookup failures never block the save.
pub async fn create_word(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Json(payload): Json<CreateWordRequest>,
) -> Result<(StatusCode, Json<Word>), AppError> {
    let word = folio_core::require_name("word", &payload.word, MAX_WORD)?;
    let language = match clean(payload.language) {
        Some(lang) => normalize_lang(&lang)?,
        None => ctx.wiktionary.default_language().to_string(),
    };
    let book_id = owned_book(&ctx, user_id, payload.book_id.as_deref())?;

    let mut definition = clean(payload.definition);
    if definition.is_none() {
        match ctx.wiktionary.define(&word, Some(&language)).await {
            Ok(Some(found)) => definition = Some(found.summary(AUTO_SENSES)),
            Ok(None) => tracing::debug!(%word, %language, "No Wiktionary definition"),
            Err(e) => tracing::warn!(%word, %language, "Wiktionary lookup failed: {e}"),
        }
    }

    let conn = ctx.conn()?;
    let created = words::create_word(
        &conn,
        user_id,
        &NewWord {
            word,
            definition,
            note: clean(payload.note),
            language,
            book_id,
        },
    )?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/words/{id}
pub async fn get_word(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<Json<Word>, AppError> {
    let id = WordId::parse_param(&id)?;
    let conn = ctx.conn()?;
    Ok(Json(require_word(&conn, user_id, id)?))
}

/// PUT /api/words/{id}
pub async fn update_word(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateWordRequest>,
) -> Result<Json<Word>, AppError> {
    let id = WordId::parse_param(&id)?;
    let mut word = {
        let conn = ctx.conn()?;
        require_word(&conn, user_id, id)?
    };
    if let Some(w) = payload.word {
        word.word = folio_core::require_name("word", &w, MAX_WORD)?;
    }
    if let Some(lang) = payload.language {
        word.language = normalize_lang(&lang)?;
    }
    if let Some(d) = payload.definition {
        word.definition = clean(d);
    }
    if let Some(n) = payload.note {
        word.note = clean(n);
    }
    if let Some(b) = payload.book_id {
        word.book_id = owned_book(&ctx, user_id, b.as_deref())?;
    }

    let conn = ctx.conn()?;
    words::update_word(&conn, user_id, &word)?;
    Ok(Json(word))
}

/// DELETE /api/words/{id}
pub async fn delete_word(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = WordId::parse_param(&id)?;
    let conn = ctx.conn()?;
    if !words::delete_word(&conn, user_id, id)? {
        return Err(Error::not_found(WordId::ENTITY, id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}
