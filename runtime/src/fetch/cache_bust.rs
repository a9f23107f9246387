//! Cache-busted HTTP fetcher.
//!
//! Edge caches happily serve a stale copy to a GET that looks like the last
//! one. Each request here carries a unique query string, a slightly different
//! user agent and explicit no-cache headers so it always reaches the origin.

use super::http::{client_builder, get_text};
use super::{FetchResult, Fetcher};
use crate::config::FetchStrategy;
use crate::error::FetchError;
use async_trait::async_trait;
use fnv::FnvHasher;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, EXPIRES, PRAGMA};
use std::hash::Hasher;
use std::time::Duration;

/// `Cache-Control` sent with every cache-busted fetch.
pub const CACHE_CONTROL_VALUE: &str = "no-cache, no-store, must-revalidate, max-age=0";

/// User agent with the final version digit left open.
const USER_AGENT_PREFIX: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                                 AppleWebKit/537.36 (KHTML, like Gecko) \
                                 Chrome/131.0.0.";
const USER_AGENT_SUFFIX: &str = " Safari/537.36";

/// Randomised query string and headers per request; no cookie jar.
#[derive(Debug, Clone)]
pub struct CacheBustedFetcher {
    client: reqwest::Client,
}

impl CacheBustedFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = client_builder()
            .http1_title_case_headers()
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for CacheBustedFetcher {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::CacheBusted
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> FetchResult {
        let (nonce, digit) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(1..=999_999u32), rng.gen_range(0..=9u8))
        };
        let now_ms = chrono::Utc::now().timestamp_millis();
        let busted = bust_url(url, now_ms, nonce)?;
        get_text(
            &self.client,
            &busted,
            timeout,
            &user_agent(digit),
            no_cache_headers(),
        )
        .await
    }
}

/// Append `_t`, `_r` and `_cb` query parameters, keeping any existing query.
pub fn bust_url(url: &str, now_ms: i64, nonce: u32) -> Result<String, FetchError> {
    let mut parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
    parsed
        .query_pairs_mut()
        .append_pair("_t", &now_ms.to_string())
        .append_pair("_r", &nonce.to_string())
        .append_pair("_cb", &cache_token(now_ms, nonce));
    Ok(parsed.into())
}

/// Hex token derived from the timestamp and nonce.
pub fn cache_token(now_ms: i64, nonce: u32) -> String {
    let mut hasher = FnvHasher::default();
    hasher.write_i64(now_ms);
    hasher.write_u32(nonce);
    format!("{:016x}", hasher.finish())
}

/// Desktop Chrome user agent whose trailing version digit is `digit`.
pub fn user_agent(digit: u8) -> String {
    format!("{USER_AGENT_PREFIX}{}{USER_AGENT_SUFFIX}", digit % 10)
}

fn no_cache_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bust_url_appends_params() {
        let busted = bust_url("https://shop.example/item", 1_700_000_000_000, 42).unwrap();
        let parsed = url::Url::parse(&busted).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("_t".into(), "1700000000000".into()));
        assert_eq!(pairs[1], ("_r".into(), "42".into()));
        assert_eq!(pairs[2].0, "_cb");
        assert_eq!(pairs[2].1, cache_token(1_700_000_000_000, 42));
    }

    #[test]
    fn test_bust_url_keeps_existing_query() {
        let busted = bust_url("https://shop.example/item?id=7&lang=en", 1, 2).unwrap();
        assert!(busted.starts_with("https://shop.example/item?id=7&lang=en&_t=1&_r=2&_cb="));
    }

    #[test]
    fn test_bust_url_rejects_garbage() {
        assert!(matches!(bust_url("::nope", 1, 2), Err(FetchError::InvalidUrl(_))));
    }

    #[test]
    fn test_cache_token_varies() {
        assert_ne!(cache_token(1, 1), cache_token(1, 2));
        assert_ne!(cache_token(1, 1), cache_token(2, 1));
        assert_eq!(cache_token(5, 5).len(), 16);
    }

    #[test]
    fn test_user_agent_digit() {
        assert!(user_agent(7).ends_with("Chrome/131.0.0.7 Safari/537.36"));
        assert!(user_agent(13).contains("Chrome/131.0.0.3 "));
    }

    #[test]
    fn test_no_cache_headers_exact() {
        let headers = no_cache_headers();
        assert_eq!(headers.len(), 3);
        assert_eq!(
            headers["cache-control"],
            "no-cache, no-store, must-revalidate, max-age=0"
        );
        assert_eq!(headers["pragma"], "no-cache");
        assert_eq!(headers["expires"], "0");
    }
}
