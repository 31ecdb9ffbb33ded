use std::env;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::repository::{AnswerStore, Storage, StorageError};

mod mapping;
mod store;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where the quiz API lives and how long to wait for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpStoreConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl HttpStoreConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Read `QUIZ_API_BASE_URL` and `QUIZ_API_TIMEOUT_SECS`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("QUIZ_API_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let timeout = env::var("QUIZ_API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS), Duration::from_secs);
        Self { base_url, timeout }
    }
}

/// `AnswerStore` backed by the quiz HTTP API.
#[derive(Clone, Debug)]
pub struct HttpAnswerStore {
    client: Client,
    base_url: Url,
}

impl HttpAnswerStore {
    /// Build a client for the configured API.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidConfig` if the base URL cannot be parsed or
    /// cannot carry path segments, or the HTTP client cannot be built.
    pub fn connect(config: &HttpStoreConfig) -> Result<Self, StorageError> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| StorageError::InvalidConfig(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(StorageError::InvalidConfig(format!(
                "{} cannot be used as a base url",
                config.base_url
            )));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorageError::InvalidConfig(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// Append percent-encoded path segments to the base URL.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, StorageError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                StorageError::InvalidConfig(format!("{} cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl Storage {
    /// Build a `Storage` backed by the quiz HTTP API.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidConfig` for an unusable configuration.
    pub fn http(config: &HttpStoreConfig) -> Result<Self, StorageError> {
        let store = HttpAnswerStore::connect(config)?;
        let answers: Arc<dyn AnswerStore> = Arc::new(store);
        Ok(Self { answers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpAnswerStore>();
    }

    #[test]
    fn endpoints_encode_location_segments() {
        let store = HttpAnswerStore::connect(&HttpStoreConfig::new("http://quiz.local/api/")).unwrap();
        let url = store.endpoint(&["quiz-status", "New Delhi"]).unwrap();
        assert_eq!(url.as_str(), "http://quiz.local/api/quiz-status/New%20Delhi");

        let store = HttpAnswerStore::connect(&HttpStoreConfig::new("http://quiz.local/api")).unwrap();
        let url = store.endpoint(&["submit"]).unwrap();
        assert_eq!(url.as_str(), "http://quiz.local/api/submit");
    }

    #[test]
    fn rejects_unusable_base_url() {
        let err = HttpAnswerStore::connect(&HttpStoreConfig::new("mailto:quiz@example.com")).unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));
        let err = HttpAnswerStore::connect(&HttpStoreConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));
    }
}
