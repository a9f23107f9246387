//! Plain and session HTTP fetchers over reqwest.

use super::{FetchResult, Fetcher, PageContent};
use crate::config::FetchStrategy;
use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::time::Duration;
use tracing::debug;

/// Desktop Chrome user agent sent by every HTTP strategy.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                              AppleWebKit/537.36 (KHTML, like Gecko) \
                              Chrome/131.0.0.0 Safari/537.36";

const MAX_REDIRECTS: usize = 5;

pub(crate) fn client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder().redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
}

/// Single GET; non-2xx is a failure.
pub(crate) async fn get_text(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    user_agent: &str,
    headers: HeaderMap,
) -> FetchResult {
    let resp = client
        .get(url)
        .timeout(timeout)
        .header(reqwest::header::USER_AGENT, user_agent)
        .headers(headers)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(e, timeout))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let final_url = resp.url().to_string();
    let body = resp
        .text()
        .await
        .map_err(|e| FetchError::from_reqwest(e, timeout))?;

    debug!(status = status.as_u16(), bytes = body.len(), "fetched {final_url}");
    Ok(PageContent { final_url, body })
}

/// Fresh client and single GET per check; nothing is shared between checks.
#[derive(Debug, Default)]
pub struct PlainHttpFetcher;

impl PlainHttpFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Fetcher for PlainHttpFetcher {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Plain
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> FetchResult {
        let client = client_builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        get_text(&client, url, timeout, USER_AGENT, HeaderMap::new()).await
    }
}

/// One client, with its connection pool and cookie jar, shared by every
/// check of every target.
#[derive(Debug, Clone)]
pub struct SessionHttpFetcher {
    client: reqwest::Client,
}

impl SessionHttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = client_builder()
            .cookie_store(true)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for SessionHttpFetcher {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Session
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> FetchResult {
        get_text(&self.client, url, timeout, USER_AGENT, HeaderMap::new()).await
    }
}
