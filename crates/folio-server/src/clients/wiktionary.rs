//! Wiktionary REST client for lexicon definitions.
//!
//! The definition endpoint groups senses by language code and returns HTML
//! fragments; those are reduced to plain text here.

use folio_core::config::MetadataConfig;
use folio_core::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{base_url, join_segments, normalize_lang, HttpClient};

const SERVICE: &str = "wiktionary";

pub struct WiktionaryClient {
    http: HttpClient,
    url_template: String,
    default_lang: String,
    tags: Regex,
}

/// One meaning of a word.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct Sense {
    pub part_of_speech: String,
    pub definition: String,
    pub examples: Vec<String>,
}

/// Every sense Wiktionary lists for a word in one language.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct Definition {
    pub word: String,
    pub language: String,
    pub senses: Vec<Sense>,
}

impl Definition {
    /// The first `n` senses as one line, e.g. `"(noun) a book; (verb) to reserve"`.
    pub fn summary(&self, n: usize) -> String {
        self.senses
            .iter()
            .take(n)
            .map(|s| format!("({}) {}", s.part_of_speech.to_lowercase(), s.definition))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    #[serde(default)]
    part_of_speech: String,
    #[serde(default)]
    definitions: Vec<RawSense>,
}

#[derive(Debug, Deserialize)]
struct RawSense {
    #[serde(default)]
    definition: String,
    #[serde(default)]
    examples: Vec<String>,
}

impl WiktionaryClient {
    pub fn new(config: &MetadataConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(SERVICE, config)?,
            url_template: config.wiktionary_url.clone(),
            default_lang: config.language.clone(),
            tags: Regex::new(r"<[^>]*>")
                .map_err(|e| Error::Internal(format!("tag pattern: {e}")))?,
        })
    }

    pub fn default_language(&self) -> &str {
        &self.default_lang
    }

    /// Definitions of `word` in `lang`, or `None` if Wiktionary has none.
    ///
    /// The edition of the configured default language is queried for every
    /// language; it keys its answer by language code.
    pub async fn define(&self, word: &str, lang: Option<&str>) -> Result<Option<Definition>> {
        let word = word.trim();
        if word.is_empty() {
            return Err(Error::Validation("Word is required".into()));
        }
        let lang = normalize_lang(lang.unwrap_or(&self.default_lang))?;
        let base = base_url(&self.url_template, &self.default_lang)?;
        let url = join_segments(base, &["api", "rest_v1", "page", "definition", word])?;

        let raw: Option<HashMap<String, Vec<RawEntry>>> = self.http.get_json_opt(url, &[]).await?;
        let Some(entries) = raw.and_then(|mut by_lang| by_lang.remove(&lang)) else {
            return Ok(None);
        };

        let senses: Vec<Sense> = entries
            .into_iter()
            .flat_map(|entry| {
                let pos = entry.part_of_speech;
                entry.definitions.into_iter().map(move |d| (pos.clone(), d))
            })
            .filter_map(|(pos, d)| {
                let definition = self.plain_text(&d.definition);
                (!definition.is_empty()).then(|| Sense {
                    part_of_speech: pos,
                    definition,
                    examples: d
                        .examples
                        .iter()
                        .map(|e| self.plain_text(e))
                        .filter(|e| !e.is_empty())
                        .collect(),
                })
            })
            .collect();

        if senses.is_empty() {
            return Ok(None);
        }
        Ok(Some(Definition {
            word: word.to_string(),
            language: lang,
            senses,
        }))
    }

    /// Strip tags, decode the common entities, and collapse whitespace.
    pub fn plain_text(&self, html: &str) -> String {
        let text = self.tags.replace_all(html, "");
        let decoded = text
            .replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&");
        folio_core::normalize_name(&decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: &str) -> WiktionaryClient {
        WiktionaryClient::new(&MetadataConfig {
            wiktionary_url: base.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn html_is_flattened() {
        let c = client("https://{lang}.wiktionary.org");
        assert_eq!(
            c.plain_text("<span class=\"x\">Fond of <a href=\"/wiki/book\">books</a></span> &amp;  reading"),
            "Fond of books & reading"
        );
    }

    #[tokio::test]
    async fn definition_for_requested_language() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/definition/livre"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fr": [{
                    "partOfSpeech": "Noun",
                    "language": "French",
                    "definitions": [
                        {"definition": "<b>book</b>", "examples": ["un <i>livre</i> ouvert"]},
                        {"definition": ""}
                    ]
                }],
                "en": [{
                    "partOfSpeech": "Noun",
                    "definitions": [{"definition": "A French pound"}]
                }]
            })))
            .mount(&server)
            .await;

        let def = client(&server.uri())
            .define("livre", Some("fr"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(def.language, "fr");
        assert_eq!(def.senses.len(), 1);
        assert_eq!(def.senses[0].definition, "book");
        assert_eq!(def.senses[0].examples, ["un livre ouvert"]);
        assert_eq!(def.summary(3), "(noun) book");
    }

    #[tokio::test]
    async fn unknown_word_or_language_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/definition/zzzx"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/definition/book"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "en": [{"partOfSpeech": "Noun", "definitions": [{"definition": "A volume"}]}]
            })))
            .mount(&server)
            .await;

        let c = client(&server.uri());
        assert!(c.define("zzzx", None).await.unwrap().is_none());
        assert!(c.define("book", Some("de")).await.unwrap().is_none());
        assert!(c.define("book", None).await.unwrap().is_some());
    }
}
