//! HTTP client for end-to-end tests
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    // ========================================================================
    // Health
    // ========================================================================

    pub async fn health(&self) -> Response {
        self.client
            .get(format!("{}/v1/health", self.base_url))
            .send()
            .await
            .expect("Health request failed")
    }

    // ========================================================================
    // Recommendations
    // ========================================================================

    /// POST /v1/recommendations/prompt
    pub async fn recommend_from_prompt(&self, body: Value) -> Response {
        self.post_json("/v1/recommendations/prompt", body).await
    }

    /// POST /v1/recommendations/similar
    pub async fn recommend_similar(&self, body: Value) -> Response {
        self.post_json("/v1/recommendations/similar", body).await
    }

    /// POST a raw body with a JSON content type
    pub async fn post_raw(&self, path: &str, body: &str) -> Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("Request failed")
    }

    async fn post_json(&self, path: &str, body: Value) -> Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .expect("Request failed")
    }
}
