//! Google Books API client.
//!
//! Search by free text or ISBN, fetch a single volume, and download cover
//! thumbnails. Volumes are flattened into [`BookMetadata`], the shape the
//! import route turns into a book.

use folio_core::config::MetadataConfig;
use folio_core::{Error, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::{join_segments, HttpClient};

const SERVICE: &str = "google_books";
const MAX_RESULTS: u32 = 40;

pub struct GoogleBooksClient {
    http: HttpClient,
    base: Url,
    api_key: Option<String>,
}

impl GoogleBooksClient {
    pub fn new(config: &MetadataConfig) -> Result<Self> {
        let base = Url::parse(&config.google_books_url).map_err(|e| {
            Error::Internal(format!("Invalid google_books_url '{}': {e}", config.google_books_url))
        })?;
        Ok(Self {
            http: HttpClient::new(SERVICE, config)?,
            base,
            api_key: config.google_books_api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    async fn volumes(&self, q: &str, max_results: u32) -> Result<Vec<BookMetadata>> {
        let url = join_segments(self.base.clone(), &["volumes"])?;
        let max = max_results.clamp(1, MAX_RESULTS).to_string();
        let mut query = vec![("q", q), ("maxResults", max.as_str())];
        if let Some(key) = &self.api_key {
            query.push(("key", key.as_str()));
        }
        let resp: VolumeList = self.http.get_json(url, &query).await?;
        Ok(resp.items.into_iter().map(BookMetadata::from).collect())
    }

    /// Free-text search.
    pub async fn search(&self, q: &str, max_results: u32) -> Result<Vec<BookMetadata>> {
        let q = q.trim();
        if q.is_empty() {
            return Err(Error::Validation("Search query is required".into()));
        }
        self.volumes(q, max_results).await
    }

    /// Volumes carrying `isbn` (hyphens and spaces ignored).
    pub async fn by_isbn(&self, isbn: &str) -> Result<Vec<BookMetadata>> {
        let isbn = normalize_isbn(isbn)?;
        self.volumes(&format!("isbn:{isbn}"), 10).await
    }

    /// A single volume by its Google Books id.
    pub async fn volume(&self, id: &str) -> Result<BookMetadata> {
        let id = id.trim();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(Error::Validation(format!("Invalid volume id '{id}'")));
        }
        let url = join_segments(self.base.clone(), &["volumes", id])?;
        let query: Vec<(&str, &str)> = self
            .api_key
            .as_deref()
            .map(|k| vec![("key", k)])
            .unwrap_or_default();
        let volume: Option<Volume> = self.http.get_json_opt(url, &query).await?;
        volume
            .map(BookMetadata::from)
            .ok_or_else(|| Error::not_found("volume", id))
    }

    /// Download a cover image.
    pub async fn download_cover(&self, url: &str, max_bytes: usize) -> Result<Vec<u8>> {
        let url = Url::parse(url)
            .map_err(|e| Error::Validation(format!("Invalid cover URL '{url}': {e}")))?;
        self.http.get_bytes(url, max_bytes).await
    }
}

/// Strip separators from an ISBN and check it is 10 or 13 characters.
pub fn normalize_isbn(isbn: &str) -> Result<String> {
    let cleaned: String = isbn
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let valid = match cleaned.len() {
        13 => cleaned.chars().all(|c| c.is_ascii_digit()),
        10 => cleaned
            .char_indices()
            .all(|(i, c)| c.is_ascii_digit() || (i == 9 && c == 'X')),
        _ => false,
    };
    if valid {
        Ok(cleaned)
    } else {
        Err(Error::Validation(format!("Invalid ISBN '{isbn}'")))
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct VolumeList {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    id: String,
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VolumeInfo {
    title: Option<String>,
    subtitle: Option<String>,
    authors: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    description: Option<String>,
    industry_identifiers: Vec<IndustryIdentifier>,
    page_count: Option<i64>,
    categories: Vec<String>,
    image_links: Option<ImageLinks>,
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ImageLinks {
    small_thumbnail: Option<String>,
    thumbnail: Option<String>,
}

/// A volume flattened to the fields a book is created from.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct BookMetadata {
    pub google_books_id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub page_count: Option<i64>,
    /// ISBN-13 when the volume has one, otherwise ISBN-10.
    pub isbn: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    /// Category paths split into individual genre names.
    pub genres: Vec<String>,
    pub thumbnail_url: Option<String>,
}

impl From<Volume> for BookMetadata {
    fn from(v: Volume) -> Self {
        let info = v.volume_info;
        let isbn = ["ISBN_13", "ISBN_10"].iter().find_map(|kind| {
            info.industry_identifiers
                .iter()
                .find(|i| i.kind == *kind)
                .map(|i| i.identifier.clone())
        });
        let thumbnail_url = info
            .image_links
            .and_then(|l| l.thumbnail.or(l.small_thumbnail))
            .map(|u| secure(&u));

        Self {
            google_books_id: v.id,
            title: info.title.unwrap_or_else(|| "Untitled".into()),
            subtitle: info.subtitle,
            authors: info.authors,
            publisher: info.publisher,
            published_year: info.published_date.as_deref().and_then(published_year),
            page_count: info.page_count.filter(|p| *p > 0),
            isbn,
            language: info.language,
            description: info.description,
            genres: split_categories(&info.categories),
            thumbnail_url,
        }
    }
}

/// `publishedDate` is `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
fn published_year(date: &str) -> Option<i32> {
    date.get(..4)?.parse().ok()
}

/// Google serves thumbnails over plain http; ask for https instead.
fn secure(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

/// "Fiction / Science Fiction / General" becomes "Fiction", "Science Fiction".
fn split_categories(categories: &[String]) -> Vec<String> {
    let mut genres: Vec<String> = Vec::new();
    for part in categories.iter().flat_map(|c| c.split('/')) {
        let name = folio_core::normalize_name(part);
        if name.is_empty() || name.eq_ignore_ascii_case("general") {
            continue;
        }
        if !genres.iter().any(|g| g.eq_ignore_ascii_case(&name)) {
            genres.push(name);
        }
    }
    genres
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: &str) -> MetadataConfig {
        MetadataConfig {
            google_books_url: base.to_string(),
            ..Default::default()
        }
    }

    fn dune() -> serde_json::Value {
        json!({
            "id": "B1hSG45JCX4C",
            "volumeInfo": {
                "title": "Dune",
                "authors": ["Frank Herbert"],
                "publisher": "Penguin",
                "publishedDate": "2005-07-07",
                "pageCount": 604,
                "language": "en",
                "categories": ["Fiction / Science Fiction / General"],
                "industryIdentifiers": [
                    {"type": "ISBN_10", "identifier": "0441013597"},
                    {"type": "ISBN_13", "identifier": "9780441013593"}
                ],
                "imageLinks": {"thumbnail": "http://books.google.com/books/content?id=B1hSG45JCX4C"}
            }
        })
    }

    #[test]
    fn volume_is_flattened() {
        let volume: Volume = serde_json::from_value(dune()).unwrap();
        let meta = BookMetadata::from(volume);
        assert_eq!(meta.title, "Dune");
        assert_eq!(meta.isbn.as_deref(), Some("9780441013593"));
        assert_eq!(meta.published_year, Some(2005));
        assert_eq!(meta.genres, ["Fiction", "Science Fiction"]);
        assert!(meta.thumbnail_url.unwrap().starts_with("https://"));
    }

    #[test]
    fn isbn_normalization() {
        assert_eq!(normalize_isbn("978-0-441-01359-3").unwrap(), "9780441013593");
        assert_eq!(normalize_isbn("0 8044 2957 x").unwrap(), "080442957X");
        assert!(normalize_isbn("12345").is_err());
        assert!(normalize_isbn("97804410135X3").is_err());
    }

    #[tokio::test]
    async fn search_queries_volumes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/volumes"))
            .and(query_param("q", "dune"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalItems": 1,
                "items": [dune()]
            })))
            .mount(&server)
            .await;

        let client = GoogleBooksClient::new(&config(&server.uri())).unwrap();
        let results = client.search("dune", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].authors, ["Frank Herbert"]);
    }

    #[tokio::test]
    async fn isbn_search_without_items_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/volumes"))
            .and(query_param("q", "isbn:9780000000000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalItems": 0})))
            .mount(&server)
            .await;

        let client = GoogleBooksClient::new(&config(&server.uri())).unwrap();
        assert!(client.by_isbn("978-0000000000").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_volume_is_not_found_and_errors_are_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/volumes/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/volumes/broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = GoogleBooksClient::new(&config(&server.uri())).unwrap();
        assert!(matches!(
            client.volume("nope").await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            client.volume("broken").await,
            Err(Error::Upstream { .. })
        ));
    }
}
