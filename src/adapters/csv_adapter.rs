//! CSV file bar-feed adapter.
//!
//! One file per symbol, `<base>/<SYMBOL>.csv`, with a header row and the
//! columns `timestamp,open,high,low,close,volume`. Rows are returned in file
//! order so that ordering faults reach feed validation untouched.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::{Bar, parse_timestamp};
use crate::ports::data_port::DataPort;
use chrono::NaiveDateTime;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn parse_field(
    record: &csv::StringRecord,
    col: usize,
    name: &str,
    index: usize,
    line: u64,
) -> Result<f64, BacktestError> {
    let raw = record
        .get(col)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| BacktestError::feed(index, format!("line {}: missing {} column", line, name)))?;
    raw.parse().map_err(|e| {
        BacktestError::feed(
            index,
            format!("line {}: invalid {} value '{}': {}", line, name, raw, e),
        )
    })
}

impl DataPort for CsvAdapter {
    /// Error indices count bars kept after the range filter, matching the
    /// positions feed validation reports. The file line is in the reason.
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, BacktestError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| BacktestError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        // Short rows must reach the per-column checks below.
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| BacktestError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;
            let index = bars.len();
            let line = record.position().map_or(0, |p| p.line());

            let ts_str = record.get(0).map(str::trim).unwrap_or_default();
            let timestamp = parse_timestamp(ts_str).ok_or_else(|| {
                BacktestError::feed(index, format!("line {}: invalid timestamp '{}'", line, ts_str))
            })?;

            if start.is_some_and(|s| timestamp < s) || end.is_some_and(|e| timestamp > e) {
                continue;
            }

            bars.push(Bar {
                timestamp,
                open: parse_field(&record, 1, "open", index, line)?,
                high: parse_field(&record, 2, "high", index, line)?,
                low: parse_field(&record, 3, "low", index, line)?,
                close: parse_field(&record, 4, "close", index, line)?,
                volume: parse_field(&record, 5, "volume", index, line)?,
            });
        }

        debug!(symbol, bars = bars.len(), path = %path.display(), "loaded bars");
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, BacktestError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| BacktestError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| BacktestError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
