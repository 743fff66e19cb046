//! Search screen facade
//!
//! `SearchScreen` is the entry point for a UI layer. It owns everything one
//! search screen needs for its lifetime and exposes the two input signals
//! (ready, filter text) and the one output (the view state).
//!
//! # Example
//!
//! ```no_run
//! use libcinesearch::{Config, SearchScreen};
//!
//! # async fn example() -> libcinesearch::Result<()> {
//! let config = Config::load()?;
//! let screen = SearchScreen::from_config(&config)?;
//!
//! let _subscription = screen.subscribe_view(|movies| {
//!     println!("{} results found", movies.len());
//! })?;
//!
//! screen.ready()?;
//! screen.set_filter_text(Some("iron".to_string()));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::events::{EventBus, EventReceiver};
use crate::observable::{Observable, Publisher, Subscription};
use crate::pipeline::{self, SearchPipeline};
use crate::sources::omdb::OmdbClient;
use crate::sources::PageSource;
use crate::store::{FetchOptions, ResultStore};
use crate::types::{FilterText, ResultCollection, ViewState};

/// Core of one search screen
pub struct SearchScreen {
    store: ResultStore,
    filter_text: Publisher<FilterText>,
    pipeline: SearchPipeline,
    event_bus: EventBus,
}

impl SearchScreen {
    /// Build a screen backed by the OMDb API
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid (including a missing
    /// API key) or when called outside a tokio runtime.
    pub fn from_config(config: &Config) -> Result<Self> {
        let options = FetchOptions::from_config(config)?;
        let source = OmdbClient::from_config(&config.api)?;
        Self::with_source(Arc::new(source), options)
    }

    /// Build a screen over any page source
    ///
    /// # Errors
    ///
    /// Returns `SearchError::NoRuntime` when called outside a tokio runtime.
    pub fn with_source(source: Arc<dyn PageSource>, options: FetchOptions) -> Result<Self> {
        let event_bus = EventBus::new(100);
        let store = ResultStore::new(source, options, event_bus.clone());
        let filter_text = Publisher::new(None);
        let pipeline = SearchPipeline::spawn(store.collection(), filter_text.observable())?;

        Ok(Self {
            store,
            filter_text,
            pipeline,
            event_bus,
        })
    }

    /// Signal that the screen is ready; starts the fetch once
    pub fn ready(&self) -> Result<bool> {
        let started = self.store.trigger_fetch()?;
        if started {
            info!("Screen ready, fetching results");
        }
        Ok(started)
    }

    /// Signal new filter text; `None` or `""` clears the filter
    pub fn set_filter_text(&self, text: Option<String>) {
        debug!(filter = ?text, "Filter text set");
        self.filter_text.publish(text);
    }

    pub fn filter_text(&self) -> FilterText {
        self.filter_text.get()
    }

    /// The filtered list to render
    pub fn view_state(&self) -> Observable<ViewState> {
        self.pipeline.view_state()
    }

    /// Render callback registration
    ///
    /// The callback receives the current view immediately and every update
    /// after that, one at a time.
    pub fn subscribe_view<F>(&self, callback: F) -> Result<Subscription>
    where
        F: FnMut(ViewState) + Send + 'static,
    {
        self.pipeline.view_state().subscribe(callback)
    }

    /// Fetch progress and page failures
    pub fn subscribe_events(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }

    pub fn collection(&self) -> Observable<ResultCollection> {
        self.store.collection()
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Filtered view computed directly from the current inputs
    ///
    /// Equal to what the view state settles on once the pipeline has caught
    /// up with the latest input.
    pub fn current_view(&self) -> ViewState {
        let items = self.store.collection().get();
        let text = self.filter_text.get();
        Arc::new(pipeline::filter(&items, text.as_deref()))
    }

    /// Cancel any running fetch and stop the pipeline
    ///
    /// View-state watchers complete once the pipeline has stopped.
    pub fn teardown(&self) {
        if self.store.cancel() {
            debug!("Teardown cancelled an in-flight fetch");
        }
        self.pipeline.shutdown();
        info!("Screen torn down");
    }
}
