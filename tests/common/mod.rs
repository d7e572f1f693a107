//! Common test infrastructure
//!
//! Scriptable in-memory providers plus an HTTP server/client pair for
//! end-to-end tests. Tests should only import from this module, not from
//! internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{FakeCatalog, TestServer, TestClient};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_health() {
//!     let catalog = std::sync::Arc::new(FakeCatalog::new());
//!     let server = TestServer::spawn(common::orchestrator(catalog)).await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.health().await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

mod client;
mod constants;
mod fakes;
mod server;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use fakes::*;
#[allow(unused_imports)]
pub use server::TestServer;
