//! Core types for Cinesearch

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single search result
///
/// Decoded from the upstream API's capitalised field names; serialized back
/// out with snake_case names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(rename(deserialize = "Title"))]
    pub title: String,

    #[serde(rename(deserialize = "Poster"))]
    pub poster_url: String,

    #[serde(rename(deserialize = "Year"), default)]
    pub year: Option<String>,

    #[serde(rename(deserialize = "imdbID"), default)]
    pub imdb_id: Option<String>,

    #[serde(rename(deserialize = "Type"), default)]
    pub kind: Option<String>,
}

impl Movie {
    pub fn new(title: impl Into<String>, poster_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            poster_url: poster_url.into(),
            year: None,
            imdb_id: None,
            kind: None,
        }
    }
}

/// The full merged result set, replaced as a whole and never mutated in place
pub type ResultCollection = Arc<Vec<Movie>>;

/// Current filter text; `None` means no filter is active
pub type FilterText = Option<String>;

/// The list to render, always derived from a collection and a filter text
pub type ViewState = Arc<Vec<Movie>>;

/// One decoded page of search results
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    #[serde(rename = "Search", default)]
    pub results: Vec<Movie>,

    #[serde(rename = "totalResults", default)]
    pub total_results: Option<String>,

    #[serde(rename = "Response")]
    pub response: String,

    #[serde(rename = "Error", default)]
    pub error: Option<String>,
}

impl SearchPage {
    /// Whether the API reported success for this page
    pub fn is_success(&self) -> bool {
        self.response.eq_ignore_ascii_case("true")
    }

    /// Total number of results across all pages, as reported upstream
    pub fn total_results(&self) -> Option<u64> {
        self.total_results.as_deref().and_then(|s| s.parse().ok())
    }
}
