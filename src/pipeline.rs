use std::cell::Cell;
use std::fmt;
use std::panic;
use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::{ConfigurationError, ExtractionFailure, PipelineError};
use crate::parser::normalize::normalize;
use crate::parser::{self, ParsedPage};
use crate::record::{Field, RawRecord, Row, Schema};
use crate::store::{reset_store, PageSink};
use crate::transport::Transport;

/// Everything the driver needs for one run, fixed at construction.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub initial_url: String,
    pub store_path: PathBuf,
    pub normalize: bool,
    pub schema: Schema,
    pub max_pages: Option<usize>,
    pub page_load_timeout: Duration,
    pub request_wait: Duration,
    pub write_wait: Duration,
}

/// Why a run reached DONE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The first page carried the empty-result message.
    NoResults,
    /// Neither listings nor the empty-result message showed up in time.
    NotReady,
    /// A page had no listing fragments.
    NoListings,
    /// No enabled next control.
    LastPage,
    /// The configured page limit was reached.
    PageLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopReason::NoResults => "no listings matched the search",
            StopReason::NotReady => "page did not finish loading",
            StopReason::NoListings => "page had no listings",
            StopReason::LastPage => "reached the last page",
            StopReason::PageLimit => "page limit reached",
        })
    }
}

/// Result of one run. Records already written stay on disk when `outcome`
/// is a failure.
#[derive(Debug)]
pub struct RunSummary {
    pub pages: usize,
    pub records: usize,
    pub skipped: usize,
    pub store_path: PathBuf,
    pub outcome: Result<StopReason, PipelineError>,
}

impl RunSummary {
    /// A run counts as productive when at least one record was persisted.
    pub fn produced_records(&self) -> bool {
        self.records > 0
    }
}

#[derive(Default)]
struct Tally {
    pages: usize,
    records: usize,
    skipped: usize,
}

/// Fetch, extract, normalize and sink one result page at a time until the
/// transport runs out of pages.
pub struct Pipeline<T: Transport> {
    transport: T,
    config: RunConfig,
}

impl<T: Transport> Pipeline<T> {
    pub fn new(transport: T, config: RunConfig) -> Self {
        Self { transport, config }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Drive the run to DONE or FAILED. The transport is closed on every path.
    pub async fn run(&mut self) -> RunSummary {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));

        let mut tally = Tally::default();
        let outcome = self.drive(&mut tally, &pb).await;
        pb.finish_and_clear();
        self.transport.close().await;

        match &outcome {
            Ok(reason) => info!(
                pages = tally.pages,
                records = tally.records,
                "Run finished: {}",
                reason
            ),
            Err(e) => error!(
                pages = tally.pages,
                records = tally.records,
                "Run failed: {}",
                e
            ),
        }

        RunSummary {
            pages: tally.pages,
            records: tally.records,
            skipped: tally.skipped,
            store_path: self.config.store_path.clone(),
            outcome,
        }
    }

    async fn drive(&mut self, tally: &mut Tally, pb: &ProgressBar) -> Result<StopReason, PipelineError> {
        let Self { transport, config } = self;

        reset_store(&config.store_path).map_err(|source| ConfigurationError::Store {
            path: config.store_path.clone(),
            source,
        })?;
        let mut sink = PageSink::new(&config.store_path, config.schema.columns());

        pb.set_message("opening search");
        let mut page = transport.fetch_initial(&config.initial_url).await?;
        let mut page_no = 1usize;

        loop {
            if page_limit_reached(config.max_pages, tally.pages) {
                return Ok(StopReason::PageLimit);
            }

            if !transport.page_ready(config.page_load_timeout).await {
                warn!(page = page_no, url = %page.url, "No listings or result message observed");
                return Ok(StopReason::NotReady);
            }

            let ParsedPage {
                no_results,
                listings,
            } = parser::parse_page(&page.markup, &page.url);
            if no_results && page_no == 1 {
                info!("Search returned no listings");
                return Ok(StopReason::NoResults);
            }
            if listings.is_empty() {
                info!(page = page_no, "No listing fragments, treating as the end");
                return Ok(StopReason::NoListings);
            }

            let (rows, skipped) = page_rows(listings, config.normalize, page_no);
            tally.skipped += skipped;
            match sink.append(&rows) {
                Ok(n) => tally.records += n,
                Err(e) => error!(page = page_no, path = %sink.path().display(), "Page lost: {}", e),
            }
            if page_no == 1 {
                if let Some(header) = sink.header() {
                    debug!(columns = header.len(), "Store header fixed");
                }
            }
            tally.pages += 1;
            pb.set_message(format!("page {} | {} records", page_no, tally.records));
            debug!(page = page_no, rows = rows.len(), skipped, "Page done");

            if !config.write_wait.is_zero() {
                sleep(config.write_wait).await;
            }

            if page_limit_reached(config.max_pages, tally.pages) {
                return Ok(StopReason::PageLimit);
            }
            if !transport.has_next_page().await {
                return Ok(StopReason::LastPage);
            }
            page = transport.advance().await?;
            page_no += 1;
            info!(page = page_no, "Advanced to next page");
            sleep(config.request_wait).await;
        }
    }
}

fn page_limit_reached(max_pages: Option<usize>, done: usize) -> bool {
    max_pages.is_some_and(|max| done >= max)
}

/// Turn a page's extraction results into rows, in fragment order. Failed
/// fragments are logged and skipped; returns the rows and the skip count.
fn page_rows(
    listings: Vec<Result<RawRecord, ExtractionFailure>>,
    normalize_enabled: bool,
    page_no: usize,
) -> (Vec<Row>, usize) {
    let mut rows = Vec::with_capacity(listings.len());
    let mut skipped = 0;
    for listing in listings {
        match listing {
            Ok(raw) if normalize_enabled => {
                rows.push(normalized_row(&raw, page_no, |r| normalize(r).to_row()))
            }
            Ok(raw) => rows.push(raw.to_row()),
            Err(failure) => {
                warn!(page = page_no, "Skipped {}", failure);
                skipped += 1;
            }
        }
    }
    (rows, skipped)
}

thread_local! {
    static QUIET_PANICS: Cell<bool> = const { Cell::new(false) };
}

/// Panics caught while normalizing a record go to the debug log. Any other
/// panic keeps the default report.
pub fn install_panic_hook() {
    let default = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if QUIET_PANICS.get() {
            debug!("Normalization panicked: {}", info);
        } else {
            default(info);
        }
    }));
}

/// Derived row, or the raw fields alone if deriving blows up.
fn normalized_row<F>(raw: &RawRecord, page_no: usize, derive: F) -> Row
where
    F: Fn(&RawRecord) -> Row + panic::RefUnwindSafe,
{
    QUIET_PANICS.set(true);
    let derived = panic::catch_unwind(|| derive(raw));
    QUIET_PANICS.set(false);
    match derived {
        Ok(row) => row,
        Err(_) => {
            warn!(
                page = page_no,
                job = raw.get(Field::JobNumber).unwrap_or("?"),
                "Normalization failed, keeping raw fields"
            );
            raw.to_row()
        }
    }
}

// ── Tests ──
