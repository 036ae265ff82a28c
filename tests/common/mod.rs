//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, ALICE};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_create_session() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone(), ALICE);
//!
//!     let response = client.create_session(&[]).await;
//!     assert_eq!(response.status(), StatusCode::CREATED);
//! }
//! ```

mod catalog;
mod client;
mod constants;
mod server;

// Public API - this is what tests import
pub use client::TestClient;
pub use constants::*;
pub use server::TestServer;

// Keep the fake catalog internal - only accessed via TestServer::spawn()
#[allow(unused_imports)]
pub(crate) use catalog::FakeCatalogClient;
