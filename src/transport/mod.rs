//! Transports own the session with the job-search site. The pagination driver
//! only sees this contract; how a page is obtained (form replay over HTTP, a
//! driven browser, or pages saved on disk) is up to the implementation.

#[cfg(feature = "browser")]
pub mod browser;
pub mod http;
pub mod replay;

use std::time::Duration;

use crate::error::TransportError;

/// One result page as served.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub markup: String,
    pub url: String,
}

#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Open the session and return the first result page.
    async fn fetch_initial(&mut self, url: &str) -> Result<PageSnapshot, TransportError>;

    /// Whether the listing table or the empty-result message is observable
    /// on the current page within `timeout`.
    async fn page_ready(&mut self, timeout: Duration) -> bool;

    /// Whether an enabled "next page" control exists on the current page.
    async fn has_next_page(&mut self) -> bool;

    /// Follow the "next page" control and return the new page.
    async fn advance(&mut self) -> Result<PageSnapshot, TransportError>;

    /// Release the session. Safe to call more than once.
    async fn close(&mut self);
}
