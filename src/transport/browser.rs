use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::{PageSnapshot, Transport};
use crate::error::TransportError;
use crate::parser::READY_MARKER_CSS;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

const HAS_NEXT_JS: &str = r#"(() => {
    const b = document.querySelector('[name="fwListNaviBtnNext"]');
    return !!b && !b.disabled && !b.classList.contains('disabled');
})()"#;
const CLICK_NEXT_JS: &str = r#"(() => {
    const b = document.querySelector('[name="fwListNaviBtnNext"]');
    if (!b || b.disabled) return false;
    b.click();
    return true;
})()"#;

fn automation(e: impl std::fmt::Display) -> TransportError {
    TransportError::Automation(e.to_string())
}

/// A headed Chromium session. The operator fills in the search form by hand
/// and presses Enter; from then on the driver pages through the results.
#[derive(Default)]
pub struct BrowserTransport {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
}

impl BrowserTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn page(&self) -> Result<&Page, TransportError> {
        self.page.as_ref().ok_or(TransportError::Closed)
    }

    async fn snapshot(&self) -> Result<PageSnapshot, TransportError> {
        let page = self.page()?;
        let markup = page.content().await.map_err(automation)?;
        let url = page.url().await.map_err(automation)?.unwrap_or_default();
        Ok(PageSnapshot { markup, url })
    }
}

impl Transport for BrowserTransport {
    async fn fetch_initial(&mut self, url: &str) -> Result<PageSnapshot, TransportError> {
        let config = BrowserConfig::builder()
            .with_head()
            .window_size(1200, 900)
            .arg("--lang=ja-JP")
            .build()
            .map_err(automation)?;
        let (browser, mut handler) = Browser::launch(config).await.map_err(automation)?;
        self.handler = Some(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        }));

        let page = browser.new_page(url).await.map_err(automation)?;
        self.browser = Some(browser);
        self.page = Some(page);

        info!("Set the search conditions in the browser, run the search, then press Enter here");
        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;

        self.snapshot().await
    }

    async fn page_ready(&mut self, timeout: Duration) -> bool {
        let Ok(page) = self.page() else { return false };
        let deadline = Instant::now() + timeout;
        loop {
            match page.find_elements(READY_MARKER_CSS).await {
                Ok(found) if !found.is_empty() => return true,
                Ok(_) => {}
                Err(e) => debug!("Ready check failed: {}", e),
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn has_next_page(&mut self) -> bool {
        let Ok(page) = self.page() else { return false };
        match page.evaluate(HAS_NEXT_JS).await {
            Ok(v) => v.into_value::<bool>().unwrap_or(false),
            Err(e) => {
                warn!("Next control check failed: {}", e);
                false
            }
        }
    }

    async fn advance(&mut self) -> Result<PageSnapshot, TransportError> {
        let page = self.page()?;
        let clicked = page
            .evaluate(CLICK_NEXT_JS)
            .await
            .map_err(automation)?
            .into_value::<bool>()
            .map_err(automation)?;
        if !clicked {
            let url = page.url().await.ok().flatten().unwrap_or_default();
            return Err(TransportError::NoNextPage { url });
        }
        page.wait_for_navigation().await.map_err(automation)?;
        self.snapshot().await
    }

    async fn close(&mut self) {
        self.page = None;
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("Browser process wait failed: {}", e);
            }
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}
