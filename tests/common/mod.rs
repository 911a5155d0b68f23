//! Shared test harness for integration tests.
//!
//! [`TestHarness`] builds a full [`AppContext`] on an in-memory database,
//! stores images in a temporary directory and serves the router on a random
//! port. Outbound metadata URLs point at a closed local port unless a test
//! supplies a wiremock server.

#![allow(dead_code)]

use std::net::SocketAddr;

use folio_core::config::Config;
use folio_db::pool::{init_memory_pool, DbPool};
use folio_server::context::AppContext;
use folio_server::router::build_router;
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Nothing listens here; requests fail fast instead of reaching the internet.
const OFFLINE: &str = "http://127.0.0.1:9";

pub const PASSWORD: &str = "correct horse battery";

pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub addr: SocketAddr,
    pub http: reqwest::Client,
    _images: TempDir,
}

impl TestHarness {
    /// Start a server with default configuration.
    pub async fn start() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Start a server with every metadata provider pointed at `upstream`.
    pub async fn with_upstream(upstream: &str) -> Self {
        let upstream = upstream.to_string();
        Self::with_config(move |config| {
            config.metadata.google_books_url = upstream.clone();
            config.metadata.wikipedia_url = upstream.clone();
            config.metadata.wiktionary_url = upstream;
        })
        .await
    }

    /// Start a server after letting the caller adjust the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let images = tempfile::tempdir().expect("failed to create image dir");
        let mut config = Config::default();
        config.images.storage_dir = images.path().to_path_buf();
        config.metadata.google_books_url = OFFLINE.into();
        config.metadata.wikipedia_url = OFFLINE.into();
        config.metadata.wiktionary_url = OFFLINE.into();
        config.metadata.timeout_secs = 2;
        adjust(&mut config);

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let ctx = AppContext::new(db.clone(), config).expect("failed to build context");
        let app = build_router(ctx.clone(), None);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            ctx,
            db,
            addr,
            http: reqwest::Client::new(),
            _images: images,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Register `username` and return a client session holding its token.
    pub async fn register(&self, username: &str) -> Session {
        let resp = self
            .http
            .post(self.url("/api/auth/register"))
            .json(&json!({"username": username, "password": PASSWORD}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED, "register {username}");
        let body: Value = resp.json().await.unwrap();
        Session {
            http: self.http.clone(),
            base: format!("http://{}", self.addr),
            token: body["token"].as_str().expect("token in response").to_string(),
        }
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> folio_db::pool::PooledConnection {
        folio_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }
}

/// An authenticated API client using a bearer token.
#[derive(Clone)]
pub struct Session {
    pub http: reqwest::Client,
    pub base: String,
    pub token: String,
}

impl Session {
    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base, path)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .unwrap()
    }

    pub async fn post(&self, path: &str, body: Value) -> Response {
        self.http
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn put(&self, path: &str, body: Value) -> Response {
        self.http
            .put(self.url(path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.http
            .delete(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .unwrap()
    }

    /// GET and decode, asserting 200.
    pub async fn get_json(&self, path: &str) -> Value {
        let resp = self.get(path).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
        resp.json().await.unwrap()
    }

    /// Create a book and return its JSON detail.
    pub async fn create_book(&self, body: Value) -> Value {
        let resp = self.post("/books", body).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        resp.json().await.unwrap()
    }
}

/// The `id` field of a JSON object.
pub fn id(value: &Value) -> String {
    value["id"].as_str().expect("id field").to_string()
}
