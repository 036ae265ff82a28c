//! Swipe Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod catalog_client;
pub mod config;
pub mod pipeline;
pub mod server;
pub mod sqlite_persistence;
pub mod swipe_session;

// Re-export commonly used types for convenience
pub use catalog_client::{CatalogClient, HttpCatalogClient, NullCatalogClient};
pub use pipeline::{CandidatePipeline, PipelineSettings};
pub use server::{run_server, RequestsLoggingLevel};
pub use swipe_session::{SessionService, SqliteSwipeSessionStore};
