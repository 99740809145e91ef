use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::SinkError;
use crate::record::Row;

const BOM: &str = "\u{FEFF}";

/// Remove any store left by a previous run and make sure its directory exists.
pub fn reset_store(path: &Path) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    match fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "Removed previous store");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Append-only CSV store. The header is fixed by the first page written:
/// the configured column order, then any extra columns that page carried.
pub struct PageSink {
    path: PathBuf,
    column_order: Vec<String>,
    header: Option<Vec<String>>,
}

impl PageSink {
    pub fn new(path: impl Into<PathBuf>, column_order: Vec<String>) -> Self {
        Self {
            path: path.into(),
            column_order,
            header: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Write one page of rows, reindexed to the store's columns. Returns the
    /// number of rows written.
    pub fn append(&mut self, batch: &[Row]) -> Result<usize, SinkError> {
        if batch.is_empty() {
            debug!(path = %self.path.display(), "No rows to write");
            return Ok(0);
        }

        let creating = self.header.is_none();
        let header = match &self.header {
            Some(h) => h.clone(),
            None => self.initial_header(batch),
        };

        let dropped: Vec<&str> = batch
            .iter()
            .flat_map(Row::columns)
            .filter(|c| !header.iter().any(|h| h == c))
            .fold(Vec::new(), |mut acc, c| {
                if !acc.contains(&c) {
                    acc.push(c);
                }
                acc
            });
        if !dropped.is_empty() {
            warn!(columns = ?dropped, "Columns not in the store header were dropped");
        }

        let file = self.open(creating)?;
        let mut w = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);
        if creating {
            self.write_csv(&mut w, header.iter().map(String::as_str))?;
        }
        for row in batch {
            self.write_csv(&mut w, header.iter().map(|c| row.get(c).unwrap_or("")))?;
        }
        w.flush().map_err(|source| self.io_err(source))?;

        info!(
            path = %self.path.display(),
            rows = batch.len(),
            "{}",
            if creating { "Created store" } else { "Appended to store" }
        );
        self.header = Some(header);
        Ok(batch.len())
    }

    fn initial_header(&self, batch: &[Row]) -> Vec<String> {
        let mut header = self.column_order.clone();
        for col in batch.iter().flat_map(Row::columns) {
            if !header.iter().any(|h| h == col) {
                header.push(col.to_string());
            }
        }
        header
    }

    fn open(&self, creating: bool) -> Result<File, SinkError> {
        let opened = if creating {
            File::create(&self.path).and_then(|mut f| {
                f.write_all(BOM.as_bytes())?;
                Ok(f)
            })
        } else {
            OpenOptions::new().append(true).open(&self.path)
        };
        opened.map_err(|source| self.io_err(source))
    }

    fn write_csv<'a>(
        &self,
        w: &mut csv::Writer<File>,
        cells: impl Iterator<Item = &'a str>,
    ) -> Result<(), SinkError> {
        w.write_record(cells).map_err(|source| SinkError::Csv {
            path: self.path.clone(),
            source,
        })
    }

    fn io_err(&self, source: io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

// ── Tests ──
