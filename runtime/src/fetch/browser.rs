//! Headless-browser fetcher.
//!
//! Marker text is often injected by client-side script after the initial
//! HTML arrives, so a plain GET sees the pre-render document and reports
//! false changes. This fetcher renders the page in Chromium instead.
//!
//! The engine is launched once, on first need, and reused for the whole
//! process. Each check gets its own page which is closed afterwards; the
//! engine itself is only stopped by [`Fetcher::release`].

use super::{FetchResult, Fetcher, PageContent};
use crate::config::FetchStrategy;
use crate::error::FetchError;
use crate::renderer::{NavigationTimeout, RenderContext, Renderer, RendererLauncher};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Extra headers set on every rendered page.
pub const BROWSER_NO_CACHE_HEADERS: [(&str, &str); 2] =
    [("Cache-Control", "no-cache"), ("Pragma", "no-cache")];

/// Delay after navigation for deferred content to render.
pub const SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Renders pages in a lazily launched, shared browser.
pub struct BrowserFetcher {
    launcher: Arc<dyn RendererLauncher>,
    renderer: Mutex<Option<Arc<dyn Renderer>>>,
    settle: Duration,
}

impl BrowserFetcher {
    pub fn new(launcher: Arc<dyn RendererLauncher>) -> Self {
        Self {
            launcher,
            renderer: Mutex::new(None),
            settle: SETTLE_DELAY,
        }
    }

    /// Override the post-navigation settle delay.
    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Whether the engine is currently running.
    pub async fn is_running(&self) -> bool {
        self.renderer.lock().await.is_some()
    }

    async fn engine(&self) -> Result<Arc<dyn Renderer>, FetchError> {
        let mut slot = self.renderer.lock().await;
        if let Some(renderer) = slot.as_ref() {
            return Ok(Arc::clone(renderer));
        }
        info!("starting browser engine");
        let renderer = self
            .launcher
            .launch()
            .await
            .map_err(|e| FetchError::BrowserUnavailable(format!("{e:#}")))?;
        *slot = Some(Arc::clone(&renderer));
        Ok(renderer)
    }

    /// Drop a broken engine so the next check relaunches it.
    async fn discard_engine(&self) {
        if let Some(renderer) = self.renderer.lock().await.take() {
            if let Err(e) = renderer.shutdown().await {
                debug!("shutdown of broken browser failed: {e:#}");
            }
        }
    }

    async fn render(
        &self,
        ctx: &mut dyn RenderContext,
        url: &str,
        timeout: Duration,
    ) -> FetchResult {
        let timeout_ms: u64 = timeout.as_millis().try_into().unwrap_or(u64::MAX);

        ctx.set_extra_headers(&BROWSER_NO_CACHE_HEADERS)
            .await
            .map_err(|e| FetchError::Render(format!("{e:#}")))?;

        debug!("navigating to {url} (timeout {timeout_ms}ms)");
        let nav = ctx.navigate(url, timeout_ms).await.map_err(|e| {
            if e.downcast_ref::<NavigationTimeout>().is_some() {
                FetchError::Timeout(timeout)
            } else {
                FetchError::Render(format!("{e:#}"))
            }
        })?;

        tokio::time::sleep(self.settle).await;

        let body = ctx
            .get_html()
            .await
            .map_err(|e| FetchError::Render(format!("{e:#}")))?;

        debug!(load_time_ms = nav.load_time_ms, bytes = body.len(), "rendered {url}");
        Ok(PageContent {
            final_url: nav.final_url,
            body,
        })
    }
}

#[async_trait]
impl Fetcher for BrowserFetcher {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Browser
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> FetchResult {
        let renderer = self.engine().await?;

        let mut ctx = match renderer.new_context().await {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!("browser could not open a page, restarting it on next check: {e:#}");
                self.discard_engine().await;
                return Err(FetchError::Render(format!("{e:#}")));
            }
        };

        let result = self.render(ctx.as_mut(), url, timeout).await;

        if let Err(e) = ctx.close().await {
            warn!("failed to close page: {e:#}");
        }
        result
    }

    async fn acquire(&self) -> Result<(), FetchError> {
        self.engine().await.map(|_| ())
    }

    async fn release(&self) {
        if let Some(renderer) = self.renderer.lock().await.take() {
            info!("stopping browser engine");
            if let Err(e) = renderer.shutdown().await {
                warn!("browser shutdown failed: {e:#}");
            }
        }
    }
}
