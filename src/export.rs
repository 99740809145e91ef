use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::record::NUMERIC_COLUMNS;

/// The store as read back: header plus rows, BOM stripped.
pub struct StoreTable {
    pub header: Vec<String>,
    pub rows: Vec<csv::StringRecord>,
}

pub fn read_store(path: &Path) -> Result<StoreTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read store {}", path.display()))?;
    let body = text.strip_prefix('\u{FEFF}').unwrap_or(&text);
    let mut reader = csv::ReaderBuilder::new().from_reader(body.as_bytes());
    let header = reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Malformed row in {}", path.display()))?;
    Ok(StoreTable { header, rows })
}

/// For each column of `order`, where it sits in `header`. Header columns not
/// in `order` are dropped.
pub fn project_columns(header: &[String], order: &[String]) -> Vec<Option<usize>> {
    order
        .iter()
        .map(|c| header.iter().position(|h| h == c))
        .collect()
}

/// For each column of `order`, whether its cells are written as numbers.
pub fn numeric_columns(order: &[String]) -> Vec<bool> {
    order
        .iter()
        .map(|c| NUMERIC_COLUMNS.contains(&c.as_str()))
        .collect()
}

/// Transcode the store into a workbook with the fixed column order. Returns
/// `Ok(false)` when this build has no spreadsheet support.
pub fn export_workbook(store: &Path, workbook: &Path, order: &[String]) -> Result<bool> {
    let table = read_store(store)?;
    let projection = project_columns(&table.header, order);
    let missing: Vec<&str> = order
        .iter()
        .zip(&projection)
        .filter(|(_, p)| p.is_none())
        .map(|(c, _)| c.as_str())
        .collect();
    if !missing.is_empty() {
        warn!(columns = ?missing, "Store lacks columns, leaving them blank");
    }
    let numeric = numeric_columns(order);
    write_workbook(&table, &projection, &numeric, order, workbook)
}

#[cfg(feature = "xlsx")]
fn write_workbook(
    table: &StoreTable,
    projection: &[Option<usize>],
    numeric: &[bool],
    order: &[String],
    path: &Path,
) -> Result<bool> {
    use rust_xlsxwriter::Workbook;

    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    for (col, name) in order.iter().enumerate() {
        ws.write_string(0, col as u16, name)?;
    }
    for (r, record) in table.rows.iter().enumerate() {
        for (col, src) in projection.iter().enumerate() {
            let Some(value) = src.and_then(|i| record.get(i)).filter(|v| !v.is_empty()) else {
                continue;
            };
            let (row, col_no) = (r as u32 + 1, col as u16);
            match value.parse::<f64>() {
                Ok(n) if numeric[col] && n.is_finite() => ws.write_number(row, col_no, n)?,
                _ => ws.write_string(row, col_no, value)?,
            };
        }
    }
    wb.save(path)
        .with_context(|| format!("Failed to save workbook {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = table.rows.len(), "Wrote workbook");
    Ok(true)
}

#[cfg(not(feature = "xlsx"))]
fn write_workbook(
    _table: &StoreTable,
    _projection: &[Option<usize>],
    _numeric: &[bool],
    _order: &[String],
    path: &Path,
) -> Result<bool> {
    warn!(
        path = %path.display(),
        "Built without the `xlsx` feature, skipping workbook export"
    );
    Ok(false)
}

// ── Tests ──
