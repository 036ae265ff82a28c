//! HTTP client for end-to-end tests
//!
//! This module wraps reqwest and provides methods for all swipe-server
//! endpoints. When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;
use swipe_server::server::HEADER_USER_ID_KEY;

/// HTTP test client acting on behalf of a single caller
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Sent as the caller header, `None` for anonymous requests
    pub user_id: Option<String>,
}

impl TestClient {
    pub fn new(base_url: String, user_id: &str) -> Self {
        let mut client = Self::anonymous(base_url);
        client.user_id = Some(user_id.to_string());
        client
    }

    /// Creates a client that never identifies itself
    pub fn anonymous(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            user_id: None,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.user_id {
            Some(user_id) => builder.header(HEADER_USER_ID_KEY, user_id),
            None => builder,
        }
    }

    async fn send(builder: reqwest::RequestBuilder) -> Response {
        builder.send().await.expect("Request failed")
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    pub async fn create_session(&self, seed_ids: &[&str]) -> Response {
        Self::send(
            self.request(reqwest::Method::POST, "/v1/session")
                .json(&json!({ "seed_ids": seed_ids })),
        )
        .await
    }

    pub async fn get_active_session(&self) -> Response {
        Self::send(self.request(reqwest::Method::GET, "/v1/session/active")).await
    }

    pub async fn get_session(&self, id: &str) -> Response {
        Self::send(self.request(reqwest::Method::GET, &format!("/v1/session/{}", id))).await
    }

    pub async fn list_sessions(&self) -> Response {
        Self::send(self.request(reqwest::Method::GET, "/v1/sessions")).await
    }

    pub async fn swipe(&self, id: &str, action: &str, track_key: &str) -> Response {
        Self::send(
            self.request(reqwest::Method::PATCH, &format!("/v1/session/{}", id))
                .json(&json!({ "action": action, "track_key": track_key })),
        )
        .await
    }

    pub async fn swipe_track(&self, id: &str, action: &str, artist: &str, title: &str) -> Response {
        Self::send(
            self.request(reqwest::Method::PATCH, &format!("/v1/session/{}", id))
                .json(&json!({ "action": action, "artist": artist, "title": title })),
        )
        .await
    }

    pub async fn complete_session(&self, id: &str) -> Response {
        Self::send(self.request(
            reqwest::Method::POST,
            &format!("/v1/session/{}/complete", id),
        ))
        .await
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    /// `query` is appended verbatim, e.g. `seeds=genre:pop&limit=5`
    pub async fn discovery(&self, query: &str) -> Response {
        Self::send(self.request(reqwest::Method::GET, &format!("/v1/discovery?{}", query))).await
    }

    pub async fn discovery_feed(&self, query: &str) -> Response {
        Self::send(self.request(
            reqwest::Method::GET,
            &format!("/v1/discovery/feed?{}", query),
        ))
        .await
    }
}
