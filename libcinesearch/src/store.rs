//! Result store: bulk paged fetch and the authoritative result collection
//!
//! A fetch requests every page concurrently, waits for all of them, and
//! publishes the concatenation of the pages that succeeded as one new
//! collection. Failed pages are logged, reported on the event bus and left
//! out of the merge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{Config, DEFAULT_PAGES};
use crate::error::{FetchError, Result, SearchError};
use crate::events::{Event, EventBus};
use crate::observable::{Observable, Publisher};
use crate::sources::PageSource;
use crate::types::{Movie, ResultCollection};

/// Fetch tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Pages requested per fetch, numbered from 1
    pub pages: u32,
    /// Attempts per page for transient failures
    pub max_attempts: u32,
    /// Delay before the first retry, doubled for every further one
    pub backoff: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            pages: DEFAULT_PAGES,
            max_attempts: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

impl FetchOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pages: config.fetch.pages,
            max_attempts: config.fetch.max_attempts,
            backoff: config.fetch.backoff()?,
        })
    }
}

/// Outcome of one bulk fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchReport {
    pub fetch_id: String,
    /// Pages that were merged, ascending
    pub loaded_pages: Vec<u32>,
    /// Pages that failed, ascending
    pub failed_pages: Vec<u32>,
    /// Items in the published collection (0 if nothing was published)
    pub item_count: usize,
}

impl FetchReport {
    /// Whether a new collection was published
    pub fn published(&self) -> bool {
        !self.loaded_pages.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchState {
    Running,
    /// Results published (or all pages failed); cancel no longer applies
    Committed,
    Cancelled,
}

/// Decides, under one lock, whether a fetch publishes or is cancelled
#[derive(Clone)]
struct FetchGate(Arc<Mutex<FetchState>>);

impl FetchGate {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(FetchState::Running)))
    }

    fn lock(&self) -> MutexGuard<'_, FetchState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Running -> Cancelled; false once the fetch has committed
    fn cancel(&self) -> bool {
        let mut state = self.lock();
        if *state == FetchState::Running {
            *state = FetchState::Cancelled;
            true
        } else {
            false
        }
    }
}

struct InFlight {
    fetch_id: String,
    gate: FetchGate,
    task: JoinHandle<FetchReport>,
}

/// Owner of the result collection
pub struct ResultStore {
    source: Arc<dyn PageSource>,
    options: FetchOptions,
    collection: Arc<Publisher<ResultCollection>>,
    event_bus: EventBus,
    triggered: AtomicBool,
    in_flight: Mutex<Option<InFlight>>,
}

impl ResultStore {
    /// Create a store with an empty collection
    pub fn new(source: Arc<dyn PageSource>, options: FetchOptions, event_bus: EventBus) -> Self {
        Self {
            source,
            options,
            collection: Arc::new(Publisher::new(Arc::new(Vec::new()))),
            event_bus,
            triggered: AtomicBool::new(false),
            in_flight: Mutex::new(None),
        }
    }

    /// The current collection, replayed to every new watcher
    pub fn collection(&self) -> Observable<ResultCollection> {
        self.collection.observable()
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Start the bulk fetch in the background
    ///
    /// Only the first call starts a fetch and returns `Ok(true)`; later calls
    /// do nothing and return `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::NoRuntime` when called outside a tokio runtime.
    pub fn trigger_fetch(&self) -> Result<bool> {
        if self.triggered.swap(true, Ordering::SeqCst) {
            debug!("Fetch already triggered, ignoring");
            return Ok(false);
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                self.triggered.store(false, Ordering::SeqCst);
                return Err(SearchError::NoRuntime);
            }
        };

        let fetch_id = uuid::Uuid::new_v4().to_string();
        let gate = FetchGate::new();
        let task = handle.spawn(run_fetch(
            Arc::clone(&self.source),
            self.options.clone(),
            Arc::clone(&self.collection),
            self.event_bus.clone(),
            fetch_id.clone(),
            gate.clone(),
        ));

        *self.lock_in_flight() = Some(InFlight {
            fetch_id,
            gate,
            task,
        });
        Ok(true)
    }

    /// Fetch all pages and publish the merge, waiting for the result
    ///
    /// Unlike [`trigger_fetch`](Self::trigger_fetch) this always runs and is
    /// not cancellable through [`cancel`](Self::cancel); drop the future
    /// instead.
    pub async fn fetch_all(&self) -> FetchReport {
        run_fetch(
            Arc::clone(&self.source),
            self.options.clone(),
            Arc::clone(&self.collection),
            self.event_bus.clone(),
            uuid::Uuid::new_v4().to_string(),
            FetchGate::new(),
        )
        .await
    }

    /// Wait for the triggered fetch to finish
    ///
    /// Returns `None` if no fetch was triggered, if it was cancelled, or if
    /// another caller already joined it.
    pub async fn join(&self) -> Option<FetchReport> {
        let in_flight = self.lock_in_flight().take()?;
        match in_flight.task.await {
            Ok(report) => Some(report),
            Err(e) => {
                debug!(fetch_id = %in_flight.fetch_id, "Fetch task did not complete: {}", e);
                None
            }
        }
    }

    /// Cancel the triggered fetch if it has not published yet
    ///
    /// In-flight page requests are dropped and nothing is published. Returns
    /// whether the fetch was cancelled; a fetch that already committed its
    /// result is left alone and can still be joined.
    pub fn cancel(&self) -> bool {
        let mut slot = self.lock_in_flight();
        let cancelled = slot.as_ref().is_some_and(|in_flight| in_flight.gate.cancel());
        if !cancelled {
            return false;
        }
        let Some(in_flight) = slot.take() else {
            return false;
        };
        drop(slot);

        in_flight.task.abort();
        info!(fetch_id = %in_flight.fetch_id, "Fetch cancelled");
        self.event_bus.emit(Event::FetchCancelled {
            fetch_id: in_flight.fetch_id,
        });
        true
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ResultStore {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Fetch a page, retrying transient failures with exponential backoff
async fn fetch_with_retry(
    source: &dyn PageSource,
    page: u32,
    options: &FetchOptions,
) -> std::result::Result<Vec<Movie>, FetchError> {
    let max_attempts = options.max_attempts.max(1);

    let mut attempt = 1;
    loop {
        match source.fetch_page(page).await {
            Ok(movies) => {
                if attempt > 1 {
                    info!(
                        "Fetched page {} from {} on attempt {}",
                        page,
                        source.name(),
                        attempt
                    );
                }
                return Ok(movies);
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = options.backoff.saturating_mul(2_u32.saturating_pow(attempt - 1));
                warn!(
                    "Transient error fetching page {} (attempt {}/{}): {}. Retrying in {:?}...",
                    page, attempt, max_attempts, e, delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn run_fetch(
    source: Arc<dyn PageSource>,
    options: FetchOptions,
    collection: Arc<Publisher<ResultCollection>>,
    event_bus: EventBus,
    fetch_id: String,
    gate: FetchGate,
) -> FetchReport {
    info!(
        fetch_id = %fetch_id,
        source = source.name(),
        pages = options.pages,
        "Fetching pages"
    );
    event_bus.emit(Event::FetchStarted {
        fetch_id: fetch_id.clone(),
        pages: options.pages,
    });

    let futures: Vec<_> = (1..=options.pages)
        .map(|page| {
            let source = source.as_ref();
            let options = &options;
            let event_bus = &event_bus;
            let fetch_id = &fetch_id;
            async move {
                let outcome = fetch_with_retry(source, page, options).await;
                match &outcome {
                    Ok(movies) => {
                        debug!(fetch_id = %fetch_id, page, items = movies.len(), "Page loaded");
                        event_bus.emit(Event::PageLoaded {
                            fetch_id: fetch_id.clone(),
                            page,
                            items: movies.len(),
                        });
                    }
                    Err(e) => {
                        warn!(fetch_id = %fetch_id, "Dropping page {}: {}", page, e);
                        event_bus.emit(Event::PageFailed {
                            fetch_id: fetch_id.clone(),
                            page,
                            error: e.to_string(),
                        });
                    }
                }
                (page, outcome)
            }
        })
        .collect();

    // Barrier: nothing is published until every page has settled
    let outcomes = join_all(futures).await;

    let mut merged = Vec::new();
    let mut loaded_pages = Vec::new();
    let mut failed_pages = Vec::new();
    for (page, outcome) in outcomes {
        match outcome {
            Ok(movies) => {
                loaded_pages.push(page);
                merged.extend(movies);
            }
            Err(_) => failed_pages.push(page),
        }
    }

    let mut state = gate.lock();
    if *state == FetchState::Cancelled {
        debug!(fetch_id = %fetch_id, "Fetch cancelled before publishing");
        return FetchReport {
            fetch_id,
            loaded_pages,
            failed_pages,
            item_count: 0,
        };
    }
    *state = FetchState::Committed;

    let item_count = if loaded_pages.is_empty() {
        warn!(fetch_id = %fetch_id, "All {} pages failed, keeping current results", options.pages);
        0
    } else {
        let count = merged.len();
        collection.publish(Arc::new(merged));
        count
    };

    info!(
        fetch_id = %fetch_id,
        loaded = loaded_pages.len(),
        failed = failed_pages.len(),
        items = item_count,
        "Fetch completed"
    );
    event_bus.emit(Event::FetchCompleted {
        fetch_id: fetch_id.clone(),
        loaded_pages: loaded_pages.len(),
        failed_pages: failed_pages.len(),
        items: item_count,
    });
    drop(state);

    FetchReport {
        fetch_id,
        loaded_pages,
        failed_pages,
        item_count,
    }
}
