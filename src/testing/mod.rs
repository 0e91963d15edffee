//! Unified testing utilities for Passbridge
//!
//! This module consolidates test helpers, fixtures, and fakes into a
//! single location so individual test files don't recreate them.
//!
//! ## Organization
//!
//! - [`fixtures`] - Pre-built test data (sessions, tokens, settings)
//! - [`requests`] - HTTP request builders for testing handlers
//! - [`mock`] - Fake backend, navigator, and event feed implementations

pub mod fixtures;
pub mod mock;
pub mod requests;

// Re-export commonly used items for convenience
pub use requests::RequestBuilder;

/// Common test constants
pub mod constants {
    /// Default test email address
    pub const TEST_EMAIL: &str = "a@b.com";

    /// Access token carried by the standard resolved-session fixture
    pub const TEST_ACCESS_TOKEN: &str = "t1";

    /// Refresh token carried by the standard resolved-session fixture
    pub const TEST_REFRESH_TOKEN: &str = "r1";

    /// Default desktop user agent string
    pub const TEST_USER_AGENT: &str =
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

    /// Default mobile user agent string
    pub const TEST_MOBILE_USER_AGENT: &str =
        "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X)";

    /// API key used by backend fixtures
    pub const TEST_API_KEY: &str = "test-key";
}
