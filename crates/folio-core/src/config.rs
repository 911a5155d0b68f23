//! Application configuration types.
//!
//! The top-level [`Config`] is deserialized from JSON. Every section has
//! defaults, so an empty `{}` file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub metadata: MetadataConfig,
    pub images: ImageConfig,
    pub ui: UiConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Load configuration strictly: a missing or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.auth.session_timeout_hours == 0 {
            warnings.push("auth.session_timeout_hours is 0; sessions expire immediately".into());
        }

        if self.auth.login_rate_per_minute == 0 {
            warnings.push("auth.login_rate_per_minute is 0; the default of 30 is used".into());
        }

        if self.metadata.timeout_secs == 0 {
            warnings.push("metadata.timeout_secs is 0; external lookups will fail".into());
        }

        for (name, url) in [
            ("google_books_url", &self.metadata.google_books_url),
            ("wikipedia_url", &self.metadata.wikipedia_url),
            ("wiktionary_url", &self.metadata.wiktionary_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                warnings.push(format!("metadata.{name} '{url}' is not an http(s) URL"));
            }
        }

        if self.images.thumbnail_width == 0 {
            warnings.push("images.thumbnail_width is 0; thumbnails are disabled".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding a prebuilt front end, served as the fallback route.
    pub static_dir: Option<PathBuf>,
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            static_dir: None,
            db_path: PathBuf::from("./data/folio.db"),
        }
    }
}

/// Account and session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub allow_registration: bool,
    pub session_timeout_hours: u64,
    pub sweep_interval_secs: u64,
    pub login_rate_per_minute: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allow_registration: true,
            session_timeout_hours: 24 * 30,
            sweep_interval_secs: 3600,
            login_rate_per_minute: 30,
        }
    }
}

/// External metadata providers.
///
/// `wikipedia_url` and `wiktionary_url` may contain a `{lang}` placeholder
/// that is replaced with the requested language code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub google_books_url: String,
    pub google_books_api_key: Option<String>,
    pub wikipedia_url: String,
    pub wiktionary_url: String,
    pub language: String,
    pub timeout_secs: u64,
    pub requests_per_second: u32,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            google_books_url: "https://www.googleapis.com/books/v1".into(),
            google_books_api_key: None,
            wikipedia_url: "https://{lang}.wikipedia.org".into(),
            wiktionary_url: "https://{lang}.wiktionary.org".into(),
            language: "en".into(),
            timeout_secs: 10,
            requests_per_second: 5,
        }
    }
}

/// Cover image storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub storage_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub thumbnail_width: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("./data/images"),
            max_upload_bytes: 5 * 1024 * 1024,
            thumbnail_width: 200,
        }
    }
}

/// Presentation toggles surfaced to the front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub seasonal_effects: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            seasonal_effects: true,
        }
    }
}
