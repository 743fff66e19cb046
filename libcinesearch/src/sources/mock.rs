//! Mock page source for testing
//!
//! A configurable source that can serve fixed pages, fail chosen pages with a
//! chosen error kind, fail a page a number of times before succeeding, and
//! delay responses. Used by integration tests to exercise the fan-out and
//! merge without network access.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::FetchError;
use crate::sources::PageSource;
use crate::types::Movie;

/// Kind of failure a mock page produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Transport,
    Decode,
    Upstream,
}

impl MockFailure {
    fn to_error(self, page: u32) -> FetchError {
        match self {
            MockFailure::Transport => FetchError::Transport {
                page,
                message: "Mock connection reset".to_string(),
            },
            MockFailure::Decode => FetchError::Decode {
                page,
                message: "Mock malformed body".to_string(),
            },
            MockFailure::Upstream => FetchError::Upstream {
                page,
                message: "Mock upstream error".to_string(),
            },
        }
    }
}

/// Configuration for mock source behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Source name
    pub name: String,

    /// Results per page; pages not listed return an empty list
    pub pages: HashMap<u32, Vec<Movie>>,

    /// Pages that always fail
    pub failures: HashMap<u32, MockFailure>,

    /// Pages that fail with a transport error this many times, then succeed
    pub flaky: HashMap<u32, usize>,

    /// Delay applied to every request
    pub delay: Duration,

    /// Per-page delay, overriding `delay`
    pub page_delays: HashMap<u32, Duration>,

    /// Pages requested, in call order
    pub calls: Arc<Mutex<Vec<u32>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            pages: HashMap::new(),
            failures: HashMap::new(),
            flaky: HashMap::new(),
            delay: Duration::from_millis(0),
            page_delays: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock page source
pub struct MockSource {
    config: MockConfig,
}

impl MockSource {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// Source that serves `per_page` generated movies on every page
    ///
    /// Titles are `"<prefix> p<page> #<index>"`.
    pub fn uniform(prefix: &str, pages: u32, per_page: usize) -> Self {
        let pages = (1..=pages)
            .map(|page| {
                let movies = (0..per_page)
                    .map(|i| {
                        Movie::new(
                            format!("{} p{} #{}", prefix, page, i),
                            format!("https://img.example/{}/{}.jpg", page, i),
                        )
                    })
                    .collect();
                (page, movies)
            })
            .collect();

        Self::new(MockConfig {
            pages,
            ..Default::default()
        })
    }

    /// Serve `movies` on `page`
    pub fn with_page(mut self, page: u32, movies: Vec<Movie>) -> Self {
        self.config.pages.insert(page, movies);
        self
    }

    /// Make `page` always fail
    pub fn with_failure(mut self, page: u32, failure: MockFailure) -> Self {
        self.config.failures.insert(page, failure);
        self
    }

    /// Make `page` fail with a transport error `times` times before succeeding
    pub fn with_flaky_page(mut self, page: u32, times: usize) -> Self {
        self.config.flaky.insert(page, times);
        self
    }

    /// Delay every response
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.config.delay = delay;
        self
    }

    /// Delay responses for one page
    pub fn with_page_delay(mut self, page: u32, delay: Duration) -> Self {
        self.config.page_delays.insert(page, delay);
        self
    }

    /// Total number of page requests
    pub fn call_count(&self) -> usize {
        self.lock_calls().len()
    }

    /// Number of requests for one page
    pub fn calls_for(&self, page: u32) -> usize {
        self.lock_calls().iter().filter(|&&p| p == page).count()
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<u32>> {
        self.config
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PageSource for MockSource {
    async fn fetch_page(&self, page: u32) -> Result<Vec<Movie>, FetchError> {
        let attempt = {
            let mut calls = self.lock_calls();
            calls.push(page);
            calls.iter().filter(|&&p| p == page).count()
        };

        let delay = self
            .config
            .page_delays
            .get(&page)
            .copied()
            .unwrap_or(self.config.delay);
        if !delay.is_zero() {
            sleep(delay).await;
        }

        if let Some(failure) = self.config.failures.get(&page) {
            return Err(failure.to_error(page));
        }

        if let Some(&times) = self.config.flaky.get(&page) {
            if attempt <= times {
                return Err(MockFailure::Transport.to_error(page));
            }
        }

        Ok(self.config.pages.get(&page).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}
