//! Shared constants for end-to-end tests

// ============================================================================
// Server Timing
// ============================================================================

/// Maximum time to wait for a spawned server to answer
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Delay between readiness probes
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Timeout of every request made by the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Catalog Data
// ============================================================================

pub const SEED_ARTIST: &str = "Portishead";

/// Listener count comfortably above the track-search threshold
pub const POPULAR_LISTENERS: u64 = 500_000;
