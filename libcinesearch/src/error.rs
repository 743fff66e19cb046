//! Error types for Cinesearch

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("No async runtime available; call from within a tokio runtime")]
    NoRuntime,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SearchError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SearchError::InvalidInput(_) => 3,
            SearchError::Config(_)
            | SearchError::Fetch(_)
            | SearchError::Client(_)
            | SearchError::NoRuntime => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Failure of a single page request
///
/// Page errors are scoped to the page that produced them. The result store
/// logs them and drops that page's contribution; they never reach the view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("page {page}: transport failed: {message}")]
    Transport { page: u32, message: String },

    #[error("page {page}: malformed response: {message}")]
    Decode { page: u32, message: String },

    #[error("page {page}: upstream reported failure: {message}")]
    Upstream { page: u32, message: String },
}

impl FetchError {
    /// Page number the error belongs to
    pub fn page(&self) -> u32 {
        match self {
            FetchError::Transport { page, .. }
            | FetchError::Decode { page, .. }
            | FetchError::Upstream { page, .. } => *page,
        }
    }

    /// Whether retrying the same request may succeed
    ///
    /// Only transport failures are transient. A body that does not decode, or
    /// an explicit failure reported by the API, will not change on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transport { .. })
    }
}
