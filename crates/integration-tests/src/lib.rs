//! Integration tests for Shopdesk.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process server over the memory store
//! cargo test -p shopdesk-integration-tests
//!
//! # Also run the PostgreSQL store tests
//! SHOPDESK_TEST_DATABASE_URL=postgres://... \
//!     cargo test -p shopdesk-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `api_*` - JSON API tests
//! - `pages` - Server-rendered page tests
//! - `postgres_store` - `PostgreSQL` store tests (ignored without a database)

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, Response, redirect::Policy};
use serde_json::Value;
use tokio::task::JoinHandle;

use shopdesk_admin::config::AdminConfig;
use shopdesk_admin::db::{MemoryStore, Store};
use shopdesk_admin::routes;
use shopdesk_admin::state::AppState;

/// An admin server on an ephemeral port, stopped on drop.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Serve a fresh in-memory store.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot bind.
    pub async fn start() -> Self {
        Self::with_store(Arc::new(MemoryStore::new())).await
    }

    /// Serve the given store.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot bind.
    #[allow(clippy::expect_used)]
    pub async fn with_store(store: Arc<dyn Store>) -> Self {
        let state = AppState::new(AdminConfig::default(), store);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");
        let app = routes::app(state);
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        // Redirects are asserted, not followed.
        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .expect("Failed to create HTTP client");
        Self {
            addr,
            client,
            handle,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// `GET` a path.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    #[allow(clippy::expect_used)]
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    /// Send JSON with `method` and return the status and parsed body
    /// (`Value::Null` for empty bodies).
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    #[allow(clippy::expect_used)]
    pub async fn json(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Value>,
    ) -> (reqwest::StatusCode, Value) {
        let mut request = self.client.request(method, self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.expect("request failed");
        let status = response.status();
        let text = response.text().await.expect("Failed to read body");
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        (status, body)
    }

    /// `POST` JSON and return the status and body.
    pub async fn post(&self, path: &str, body: &Value) -> (reqwest::StatusCode, Value) {
        self.json(reqwest::Method::POST, path, Some(body)).await
    }

    /// `PUT` JSON and return the status and body.
    pub async fn put(&self, path: &str, body: &Value) -> (reqwest::StatusCode, Value) {
        self.json(reqwest::Method::PUT, path, Some(body)).await
    }

    /// `DELETE` and return the status and body.
    pub async fn delete(&self, path: &str) -> (reqwest::StatusCode, Value) {
        self.json(reqwest::Method::DELETE, path, None).await
    }

    /// `GET` JSON and return the status and body.
    pub async fn get_json(&self, path: &str) -> (reqwest::StatusCode, Value) {
        self.json(reqwest::Method::GET, path, None).await
    }

    /// Submit a urlencoded form.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    #[allow(clippy::expect_used)]
    pub async fn submit(&self, path: &str, pairs: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(pairs)
            .send()
            .await
            .expect("form POST failed")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Id of a created record in a JSON body.
///
/// # Panics
///
/// Panics if `body.id` is not an integer.
#[must_use]
#[allow(clippy::expect_used)]
pub fn id_of(body: &Value) -> i64 {
    body["id"].as_i64().expect("response has no id")
}
