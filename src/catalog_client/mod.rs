//! External music catalog access.
//!
//! The catalog is consumed through the `CatalogClient` trait:
//! - `HttpCatalogClient`: adapter for the catalog gateway's JSON API
//! - `NullCatalogClient`: used when no gateway is configured

mod http_client;
mod models;
mod null_client;
mod trait_def;

pub use http_client::HttpCatalogClient;
pub use models::{ArtistRef, CandidateTrack};
pub use null_client::NullCatalogClient;
pub use trait_def::{CatalogClient, CatalogError};
