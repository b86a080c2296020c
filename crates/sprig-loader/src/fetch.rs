//! Fetching external definitions.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use sprig_core::LoadError;
use url::Url;

/// Retrieves the markup text of an external definition.
///
/// Each discovered definition is fetched at most once; implementations should
/// not retry.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, LoadError>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, url: &Url) -> Result<String, LoadError> {
        (**self).fetch(url).await
    }
}

/// In-memory fetcher serving fixed responses.
///
/// Unknown URLs fail with [`LoadError::FetchFailed`]. Stalled URLs never
/// resolve. Every request is logged so callers can check how often a URL was
/// hit.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    responses: HashMap<String, String>,
    stalled: HashSet<String>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.insert(url, body);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<String>) {
        self.responses.insert(url.into(), body.into());
    }

    /// Make requests for `url` hang forever.
    pub fn with_stalled(mut self, url: impl Into<String>) -> Self {
        self.stalled.insert(url.into());
        self
    }

    /// URLs requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, LoadError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        if self.stalled.contains(url.as_str()) {
            futures::future::pending::<()>().await;
        }
        self.responses
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| LoadError::FetchFailed {
                url: url.to_string(),
                reason: "not found".to_string(),
            })
    }
}

#[cfg(feature = "http")]
pub use self::http::ReqwestFetcher;

#[cfg(feature = "http")]
mod http {
    use super::*;

    /// Fetches definitions over HTTP. Non-success statuses are failures.
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestFetcher {
        client: reqwest::Client,
    }

    impl ReqwestFetcher {
        pub fn new(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl Fetcher for ReqwestFetcher {
        async fn fetch(&self, url: &Url) -> Result<String, LoadError> {
            let failed = |err: reqwest::Error| LoadError::FetchFailed {
                url: url.to_string(),
                reason: err.to_string(),
            };
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(failed)?
                .error_for_status()
                .map_err(failed)?;
            response.text().await.map_err(failed)
        }
    }
}
