//! Page retrieval strategies.
//!
//! Every strategy implements [`Fetcher`]. Failures are returned as
//! [`FetchError`] values; nothing below this boundary panics or leaks
//! transport internals to the caller.
//!
//! | strategy       | client lifetime        | anti-cache measures                         |
//! |----------------|------------------------|---------------------------------------------|
//! | `plain`        | new client per fetch   | none                                        |
//! | `session`      | one client, cookie jar | none                                        |
//! | `cache_busted` | one client, no cookies | random query params, random UA, no-cache    |
//! | `browser`      | one Chromium, page/check | no-cache headers, rendered DOM            |

pub mod browser;
pub mod cache_bust;
pub mod http;

use crate::config::FetchStrategy;
use crate::error::FetchError;
use crate::renderer::chromium::ChromiumLauncher;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use browser::BrowserFetcher;
pub use cache_bust::CacheBustedFetcher;
pub use http::{PlainHttpFetcher, SessionHttpFetcher};

/// Raw page content from a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    /// URL the content was finally served from.
    pub final_url: String,
    /// Decoded body or rendered HTML.
    pub body: String,
}

/// Outcome of one fetch.
pub type FetchResult = Result<PageContent, FetchError>;

/// Retrieves page content for a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Which strategy this is.
    fn strategy(&self) -> FetchStrategy;

    /// Fetch `url`, giving up after `timeout`.
    async fn fetch(&self, url: &str, timeout: Duration) -> FetchResult;

    /// Prepare long-lived resources. Idempotent.
    async fn acquire(&self) -> Result<(), FetchError> {
        Ok(())
    }

    /// Release long-lived resources. Safe to call more than once.
    async fn release(&self) {}
}

/// Build the fetcher for a deployment's strategy.
pub fn build_fetcher(strategy: FetchStrategy) -> Result<Arc<dyn Fetcher>, FetchError> {
    let fetcher: Arc<dyn Fetcher> = match strategy {
        FetchStrategy::Plain => Arc::new(PlainHttpFetcher::new()),
        FetchStrategy::Session => Arc::new(SessionHttpFetcher::new()?),
        FetchStrategy::CacheBusted => Arc::new(CacheBustedFetcher::new()?),
        FetchStrategy::Browser => Arc::new(BrowserFetcher::new(Arc::new(ChromiumLauncher::default()))),
    };
    Ok(fetcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_each_strategy() {
        for strategy in [
            FetchStrategy::Plain,
            FetchStrategy::Session,
            FetchStrategy::CacheBusted,
            FetchStrategy::Browser,
        ] {
            let fetcher = build_fetcher(strategy).unwrap();
            assert_eq!(fetcher.strategy(), strategy);
        }
    }
}
