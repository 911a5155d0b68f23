//! Wikipedia REST client used to enrich authors with a short biography.

use folio_core::config::MetadataConfig;
use folio_core::{Error, Result};
use serde::{Deserialize, Serialize};

use super::{base_url, join_segments, HttpClient};

const SERVICE: &str = "wikipedia";

pub struct WikipediaClient {
    http: HttpClient,
    url_template: String,
    default_lang: String,
}

/// The lead section of a page.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct PageSummary {
    pub title: String,
    pub extract: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSummary {
    title: String,
    #[serde(default)]
    extract: String,
    #[serde(rename = "type", default)]
    kind: String,
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: String,
}

impl WikipediaClient {
    pub fn new(config: &MetadataConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(SERVICE, config)?,
            url_template: config.wikipedia_url.clone(),
            default_lang: config.language.clone(),
        })
    }

    /// Summary of the page titled `title`, or `None` when no such page
    /// exists. Disambiguation pages count as missing.
    pub async fn summary(&self, title: &str, lang: Option<&str>) -> Result<Option<PageSummary>> {
        let title = folio_core::normalize_name(title);
        if title.is_empty() {
            return Err(Error::Validation("Page title is required".into()));
        }
        let base = base_url(&self.url_template, lang.unwrap_or(&self.default_lang))?;
        let page = title.replace(' ', "_");
        let url = join_segments(base, &["api", "rest_v1", "page", "summary", &page])?;

        let raw: Option<RawSummary> = self.http.get_json_opt(url, &[]).await?;
        Ok(raw
            .filter(|r| r.kind != "disambiguation" && !r.extract.trim().is_empty())
            .map(|r| PageSummary {
                title: r.title,
                extract: r.extract.trim().to_string(),
                url: r.content_urls.and_then(|c| c.desktop).map(|d| d.page),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: &str) -> WikipediaClient {
        WikipediaClient::new(&MetadataConfig {
            wikipedia_url: base.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn summary_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/summary/Octavia_E._Butler"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "standard",
                "title": "Octavia E. Butler",
                "extract": "Octavia Estelle Butler was an American science fiction author. ",
                "content_urls": {"desktop": {"page": "https://en.wikipedia.org/wiki/Octavia_E._Butler"}}
            })))
            .mount(&server)
            .await;

        let summary = client(&server.uri())
            .summary("Octavia E.  Butler", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.title, "Octavia E. Butler");
        assert!(summary.extract.ends_with("author."));
        assert_eq!(
            summary.url.as_deref(),
            Some("https://en.wikipedia.org/wiki/Octavia_E._Butler")
        );
    }

    #[tokio::test]
    async fn missing_and_disambiguation_pages_are_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/summary/Nobody"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/summary/John_Smith"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "disambiguation",
                "title": "John Smith",
                "extract": "John Smith may refer to:"
            })))
            .mount(&server)
            .await;

        let c = client(&server.uri());
        assert!(c.summary("Nobody", None).await.unwrap().is_none());
        assert!(c.summary("John Smith", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn server_error_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let err = client(&server.uri()).summary("Anyone", None).await.unwrap_err();
        assert_eq!(err.http_status(), 502);
    }
}
