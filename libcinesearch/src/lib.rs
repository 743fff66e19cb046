//! Cinesearch - reactive search over a remotely fetched movie catalogue
//!
//! This library provides the core of a search screen: a result store that
//! bulk-fetches paged results concurrently, replay-latest observable values,
//! and a pipeline that keeps a filtered view in sync with live filter text.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod observable;
pub mod pipeline;
pub mod screen;
pub mod sources;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{FetchError, Result, SearchError};
pub use observable::{Observable, Publisher, Subscription, Watcher};
pub use pipeline::{filter, SearchPipeline};
pub use screen::SearchScreen;
pub use sources::PageSource;
pub use store::{FetchOptions, FetchReport, ResultStore};
pub use types::{FilterText, Movie, ResultCollection, ViewState};
