//! OMDb search API client
//!
//! Requests `GET <base_url>?s=<term>&apikey=<key>&page=<n>` and decodes the
//! `Search` array of the response.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{ConfigError, FetchError, Result, SearchError};
use crate::sources::PageSource;
use crate::types::{Movie, SearchPage};

/// User agent string for API requests.
const USER_AGENT_VALUE: &str = concat!("cinesearch/", env!("CARGO_PKG_VERSION"));

/// OMDb page source
pub struct OmdbClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    search_term: String,
}

impl OmdbClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(
        base_url: &str,
        api_key: SecretString,
        search_term: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
            field: "api.base_url".to_string(),
            message: e.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT_VALUE)
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Client(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key,
            search_term: search_term.into(),
        })
    }

    /// Create a client from the `[api]` config section
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing, the timeout does not parse,
    /// or the base URL is invalid.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let api_key = SecretString::from(config.require_api_key()?.to_string());
        Self::new(
            &config.base_url,
            api_key,
            config.search_term.clone(),
            config.timeout()?,
        )
    }

    /// Request URL for a page
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("s", &self.search_term)
            .append_pair("apikey", self.api_key.expose_secret())
            .append_pair("page", &page.to_string());
        url
    }
}

#[async_trait]
impl PageSource for OmdbClient {
    async fn fetch_page(&self, page: u32) -> std::result::Result<Vec<Movie>, FetchError> {
        // Errors are stripped of their URL so the API key never reaches the logs
        let transport = |e: reqwest::Error| FetchError::Transport {
            page,
            message: e.without_url().to_string(),
        };

        let response = self
            .client
            .get(self.page_url(page))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transport {
                page,
                message: format!("HTTP {}", status),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        decode_page(page, &body)
    }

    fn name(&self) -> &str {
        "omdb"
    }
}

/// Decode one page body
pub fn decode_page(page: u32, body: &[u8]) -> std::result::Result<Vec<Movie>, FetchError> {
    let decoded: SearchPage = serde_json::from_slice(body).map_err(|e| FetchError::Decode {
        page,
        message: e.to_string(),
    })?;

    if !decoded.is_success() {
        return Err(FetchError::Upstream {
            page,
            message: decoded
                .error
                .unwrap_or_else(|| "no error message".to_string()),
        });
    }

    debug!(
        page,
        items = decoded.results.len(),
        total = ?decoded.total_results(),
        "Decoded page"
    );
    Ok(decoded.results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> OmdbClient {
        OmdbClient::new(
            base_url,
            SecretString::from("test-omdb-key".to_string()),
            "marvel",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_page_url() {
        let url = client("https://www.omdbapi.com/").page_url(3);
        assert_eq!(
            url.as_str(),
            "https://www.omdbapi.com/?s=marvel&apikey=test-omdb-key&page=3"
        );
    }

    #[test]
    fn test_page_url_encodes_term() {
        let source = OmdbClient::new(
            "http://localhost:8080/search",
            SecretString::from("k".to_string()),
            "iron man & co",
            Duration::from_secs(5),
        )
        .unwrap();

        let url = source.page_url(1);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("s".to_string(), "iron man & co".to_string()),
                ("apikey".to_string(), "k".to_string()),
                ("page".to_string(), "1".to_string()),
            ]
        );
        assert_eq!(url.path(), "/search");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = OmdbClient::new(
            "not a url",
            SecretString::from("k".to_string()),
            "marvel",
            Duration::from_secs(5),
        );
        match result {
            Err(SearchError::Config(ConfigError::InvalidValue { field, .. })) => {
                assert_eq!(field, "api.base_url");
            }
            _ => panic!("Expected invalid base_url error"),
        }
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let config = ApiConfig::default();
        let result = OmdbClient::from_config(&config);
        assert!(matches!(
            result,
            Err(SearchError::Config(ConfigError::MissingField(_)))
        ));
    }

    #[test]
    fn test_from_config() {
        let config = ApiConfig {
            api_key: Some("abc".to_string()),
            search_term: "thor".to_string(),
            ..ApiConfig::default()
        };
        let source = OmdbClient::from_config(&config).unwrap();
        assert_eq!(source.name(), "omdb");
        assert!(source.page_url(2).as_str().ends_with("?s=thor&apikey=abc&page=2"));
    }

    #[test]
    fn test_decode_page_success() {
        let body = br#"{"Search":[{"Title":"Thor","Poster":"N/A"}],"totalResults":"1","Response":"True"}"#;
        let movies = decode_page(1, body).unwrap();
        assert_eq!(movies, vec![Movie::new("Thor", "N/A")]);
    }

    #[test]
    fn test_decode_page_malformed() {
        let result = decode_page(5, b"<html>Bad Gateway</html>");
        match result {
            Err(FetchError::Decode { page, .. }) => assert_eq!(page, 5),
            other => panic!("Expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_page_upstream_failure() {
        let result = decode_page(9, br#"{"Response":"False","Error":"Movie not found!"}"#);
        assert_eq!(
            result,
            Err(FetchError::Upstream {
                page: 9,
                message: "Movie not found!".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let source = client("http://127.0.0.1:9/");
        let result = source.fetch_page(1).await;
        match result {
            Err(FetchError::Transport { page, message }) => {
                assert_eq!(page, 1);
                assert!(!message.contains("test-omdb-key"));
            }
            other => panic!("Expected transport error, got {:?}", other),
        }
    }
}
