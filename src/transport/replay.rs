use std::io;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use super::{PageSnapshot, Transport};
use crate::error::TransportError;
use crate::parser;

/// Serves a fixed sequence of saved result pages. "Next" exists while pages
/// remain; used by the `extract` subcommand and in tests.
pub struct ReplayTransport {
    pages: Vec<PageSnapshot>,
    cursor: Option<usize>,
    closed: bool,
}

impl ReplayTransport {
    pub fn new(pages: Vec<PageSnapshot>) -> Self {
        Self {
            pages,
            cursor: None,
            closed: false,
        }
    }

    /// Read saved pages from disk, in the given order. Every page resolves
    /// its links against `base_url`.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P], base_url: &str) -> io::Result<Self> {
        let pages = paths
            .iter()
            .map(|p| {
                Ok(PageSnapshot {
                    markup: std::fs::read_to_string(p.as_ref())?,
                    url: base_url.to_string(),
                })
            })
            .collect::<io::Result<Vec<_>>>()?;
        Ok(Self::new(pages))
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn current(&self) -> Option<&PageSnapshot> {
        self.cursor.and_then(|i| self.pages.get(i))
    }

    fn serve(&mut self, i: usize) -> Result<PageSnapshot, TransportError> {
        let page = self.pages.get(i).cloned().ok_or_else(|| TransportError::NoNextPage {
            url: self.current().map(|p| p.url.clone()).unwrap_or_default(),
        })?;
        self.cursor = Some(i);
        debug!(page = i + 1, of = self.pages.len(), "Replaying saved page");
        Ok(page)
    }
}

impl Transport for ReplayTransport {
    async fn fetch_initial(&mut self, _url: &str) -> Result<PageSnapshot, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if self.pages.is_empty() {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "no saved pages to replay",
            )));
        }
        self.serve(0)
    }

    async fn page_ready(&mut self, _timeout: Duration) -> bool {
        self.current().is_some_and(|p| parser::is_ready(&p.markup))
    }

    async fn has_next_page(&mut self) -> bool {
        !self.closed && self.cursor.is_some_and(|i| i + 1 < self.pages.len())
    }

    async fn advance(&mut self) -> Result<PageSnapshot, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let next = self.cursor.map_or(0, |i| i + 1);
        self.serve(next)
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.hellowork.mhlw.go.jp/kensaku/GECA110010.do";

    fn paths() -> Vec<String> {
        vec![
            "tests/fixtures/result_page.html".to_string(),
            "tests/fixtures/last_page.html".to_string(),
        ]
    }

    #[tokio::test]
    async fn walks_pages_in_order() {
        let mut t = ReplayTransport::from_paths(&paths(), URL).unwrap();
        assert!(!t.page_ready(Duration::ZERO).await);

        let first = t.fetch_initial(URL).await.unwrap();
        assert!(first.markup.contains("13010-12345651"));
        assert_eq!(first.url, URL);
        assert!(t.page_ready(Duration::ZERO).await);
        assert!(t.has_next_page().await);

        let second = t.advance().await.unwrap();
        assert!(second.markup.contains("40010-11112221"));
        assert!(!t.has_next_page().await);
        assert!(matches!(
            t.advance().await,
            Err(TransportError::NoNextPage { .. })
        ));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let mut t = ReplayTransport::from_paths(&paths(), URL).unwrap();
        t.fetch_initial(URL).await.unwrap();
        t.close().await;
        t.close().await;
        assert!(t.is_closed());
        assert!(!t.has_next_page().await);
        assert!(matches!(t.advance().await, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn empty_replay_fails_to_open() {
        let mut t = ReplayTransport::new(Vec::new());
        assert!(matches!(
            t.fetch_initial(URL).await,
            Err(TransportError::Io(_))
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(ReplayTransport::from_paths(&["tests/fixtures/nope.html"], URL).is_err());
    }
}
