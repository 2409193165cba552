//! Feed ingestion layer
//!
//! Everything that talks to a vendor feed lives here: the [`FeedClient`]
//! trait, the GBFS wire types, the standard HTTPS client, the proprietary
//! availability-API client, and the in-memory fixture client for tests.

pub mod fake;
pub mod gbfs;
pub mod gts;
pub mod http;
pub mod traits;

// Re-export main types for convenience
pub use fake::FakeFeedClient;
pub use gts::{GtsAccessConfig, GtsFeedClient};
pub use http::{GbfsClientConfig, GbfsFeedClient};
pub use traits::FeedClient;

#[cfg(test)]
pub use traits::MockFeedClient;
