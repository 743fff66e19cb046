//! Page source abstraction and implementations
//!
//! A page source answers one question: what are the results on page `n`?
//! The result store fans out over pages and merges whatever comes back, so a
//! source only ever deals with a single page at a time.
//!
//! # Examples
//!
//! ```no_run
//! use libcinesearch::sources::{omdb::OmdbClient, PageSource};
//! use libcinesearch::config::ApiConfig;
//!
//! # async fn example() -> libcinesearch::Result<()> {
//! let mut api = ApiConfig::default();
//! api.api_key = Some("your-api-key".to_string());
//!
//! let source = OmdbClient::from_config(&api)?;
//! let movies = source.fetch_page(1).await?;
//! println!("{} results on page 1", movies.len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::FetchError;
use crate::types::Movie;

pub mod omdb;

// Mock source is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Source of paged search results
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch and decode a single page (1-based)
    ///
    /// # Errors
    ///
    /// Returns a page-scoped `FetchError`:
    /// - `Transport` when the request could not be completed
    /// - `Decode` when the body is not a valid page
    /// - `Upstream` when the API answered with an explicit failure
    async fn fetch_page(&self, page: u32) -> Result<Vec<Movie>, FetchError>;

    /// Short identifier used in logs (e.g., "omdb")
    fn name(&self) -> &str;
}
