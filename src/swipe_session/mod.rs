//! Swipe sessions: like/dislike bookkeeping and the per-user exclusion set
//! derived from it.

mod memory_store;
mod models;
mod schema;
mod service;
mod sqlite_store;
mod store;

pub use memory_store::InMemorySwipeSessionStore;
pub use models::{SwipeAction, SwipeSession};
pub use service::{SessionError, SessionService, DEFAULT_MAX_WRITE_ATTEMPTS};
pub use sqlite_store::SqliteSwipeSessionStore;
pub use store::{SwipeSessionStore, VersionedWrite};
