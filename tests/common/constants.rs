//! Shared constants for end-to-end tests
//!
//! When the fake catalog's data changes, update only this file.

// ============================================================================
// Test Callers
// ============================================================================

/// Caller owning the sessions under test
pub const ALICE: &str = "alice";

/// A second caller, used for ownership checks
pub const BOB: &str = "bob";

/// Caller the fake catalog knows no listening history for
pub const NEWCOMER: &str = "newcomer";

// ============================================================================
// Fake Catalog Data
// ============================================================================

/// Artist ID the fake catalog resolves to `KNOWN_ARTIST_NAME`
pub const KNOWN_ARTIST_ID: &str = "artist-1";

pub const KNOWN_ARTIST_NAME: &str = "The Test Band";

/// Tracks returned per query never exceed this, whatever the requested limit
pub const FAKE_TRACKS_PER_QUERY: usize = 100;

/// Every track at a position divisible by this has no preview
pub const FAKE_NO_PREVIEW_EVERY: usize = 10;

/// Popularity of every track the fake catalog serves
pub const FAKE_POPULARITY: u8 = 80;

/// Artists the fake catalog reports as most listened by every known caller
pub const FAKE_TOP_ARTISTS: [&str; 2] = ["Feed Artist A", "Feed Artist B"];

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to become ready
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness checks
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Timeout for individual HTTP requests
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
