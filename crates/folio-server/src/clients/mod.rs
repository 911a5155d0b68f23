//! Outbound HTTP clients for the metadata providers.
//!
//! Every provider shares [`HttpClient`]: one `reqwest` client with the
//! configured timeout, a governor limiter that callers wait on before each
//! request, and uniform mapping of transport failures and non-2xx answers to
//! [`Error::Upstream`].

pub mod google_books;
pub mod wikipedia;
pub mod wiktionary;

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use folio_core::config::MetadataConfig;
use folio_core::{Error, Result};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

pub use google_books::GoogleBooksClient;
pub use wikipedia::WikipediaClient;
pub use wiktionary::WiktionaryClient;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

const USER_AGENT: &str = concat!("folio/", env!("CARGO_PKG_VERSION"));

const DEFAULT_PER_SECOND: NonZeroU32 = match NonZeroU32::new(5) {
    Some(n) => n,
    None => unreachable!(),
};

/// Rate-limited JSON/bytes fetcher shared by the provider clients.
#[derive(Clone)]
pub struct HttpClient {
    service: &'static str,
    http: reqwest::Client,
    limiter: Arc<Limiter>,
}

impl HttpClient {
    pub fn new(service: &'static str, config: &MetadataConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build {service} client: {e}")))?;
        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(DEFAULT_PER_SECOND);
        Ok(Self {
            service,
            http,
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    async fn send(&self, url: Url, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        self.limiter.until_ready().await;
        tracing::debug!(service = self.service, %url, "Outbound request");
        self.http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::upstream(self.service, format!("request failed: {e}")))
    }

    async fn check(&self, resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        tracing::warn!(service = self.service, %status, "Upstream returned an error");
        Err(Error::upstream(self.service, format!("{status}: {snippet}")))
    }

    /// GET `url` and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url, query: &[(&str, &str)]) -> Result<T> {
        let resp = self.send(url, query).await?;
        let resp = self.check(resp).await?;
        resp.json::<T>()
            .await
            .map_err(|e| Error::upstream(self.service, format!("invalid response: {e}")))
    }

    /// Like [`get_json`](Self::get_json) but a 404 is `Ok(None)`.
    pub async fn get_json_opt<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let resp = self.send(url, query).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = self.check(resp).await?;
        resp.json::<T>()
            .await
            .map(Some)
            .map_err(|e| Error::upstream(self.service, format!("invalid response: {e}")))
    }

    /// GET `url` and return the raw body, refusing bodies over `max_bytes`.
    pub async fn get_bytes(&self, url: Url, max_bytes: usize) -> Result<Vec<u8>> {
        let resp = self.send(url, &[]).await?;
        let resp = self.check(resp).await?;
        if resp.content_length().is_some_and(|len| len > max_bytes as u64) {
            return Err(Error::Validation(format!(
                "Remote image exceeds the {max_bytes} byte limit"
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::upstream(self.service, format!("read failed: {e}")))?;
        if bytes.len() > max_bytes {
            return Err(Error::Validation(format!(
                "Remote image exceeds the {max_bytes} byte limit"
            )));
        }
        Ok(bytes.to_vec())
    }
}

/// Expand a `{lang}` placeholder in a configured base URL and parse it.
pub fn base_url(template: &str, lang: &str) -> Result<Url> {
    let lang = normalize_lang(lang)?;
    Url::parse(&template.replace("{lang}", &lang))
        .map_err(|e| Error::Internal(format!("Invalid base URL '{template}': {e}")))
}

/// Append path segments to `base`, percent-encoding each one.
pub fn join_segments(mut base: Url, segments: &[&str]) -> Result<Url> {
    let rendered = base.to_string();
    base.path_segments_mut()
        .map_err(|_| Error::Internal(format!("Base URL '{rendered}' cannot take a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(base)
}

/// Language codes are short lowercase ASCII tags like `en` or `pt-br`.
pub fn normalize_lang(lang: &str) -> Result<String> {
    let lang = lang.trim().to_ascii_lowercase();
    let valid = (2..=12).contains(&lang.len())
        && lang.chars().all(|c| c.is_ascii_lowercase() || c == '-');
    if valid {
        Ok(lang)
    } else {
        Err(Error::Validation(format!("Invalid language code '{lang}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_substitutes_language() {
        let url = base_url("https://{lang}.wikipedia.org", "FR").unwrap();
        assert_eq!(url.as_str(), "https://fr.wikipedia.org/");
    }

    #[test]
    fn base_url_without_placeholder_is_kept() {
        let url = base_url("http://127.0.0.1:9999/wiki", "en").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9999/wiki");
    }

    #[test]
    fn segments_are_encoded() {
        let base = Url::parse("https://en.wikipedia.org/").unwrap();
        let url = join_segments(base, &["api", "rest_v1", "page", "summary", "Ursula K. Le Guin"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/Ursula%20K.%20Le%20Guin"
        );
    }

    #[test]
    fn language_codes_are_checked() {
        assert_eq!(normalize_lang(" pt-BR ").unwrap(), "pt-br");
        assert!(normalize_lang("e").is_err());
        assert!(normalize_lang("en/../x").is_err());
    }
}
