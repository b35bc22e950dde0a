#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rsitrader::domain::error::BacktestError;
pub use rsitrader::domain::ohlcv::Bar;
use rsitrader::ports::data_port::DataPort;
use std::collections::HashMap;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, BacktestError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(BacktestError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| start.is_none_or(|s| b.timestamp >= s))
                    .filter(|b| end.is_none_or(|e| b.timestamp <= e))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, BacktestError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// Minute `i` after 2025-01-01 00:00.
pub fn ts(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::minutes(i as i64)
}

pub fn make_bar(i: usize, close: f64) -> Bar {
    Bar {
        timestamp: ts(i),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1.0,
    }
}

/// One-minute bars with the given closes.
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c))
        .collect()
}

/// Bars 0..=20 alternate 100/99, then bars 21..29 rise 101, 102, ...
pub fn uptrend_after_chop() -> Vec<f64> {
    (0..30)
        .map(|i| {
            if i <= 20 {
                if i % 2 == 0 { 100.0 } else { 99.0 }
            } else {
                100.0 + (i - 20) as f64
            }
        })
        .collect()
}

/// Deterministic zig-zag walk with a slow drift, always positive.
pub fn generate_closes(n: usize, start: f64) -> Vec<f64> {
    let mut price = start;
    (0..n)
        .map(|i| {
            let wave = ((i as f64) * 0.7).sin() * 1.5 + ((i as f64) * 0.13).cos() * 0.8;
            price = (price + wave).max(1.0);
            price
        })
        .collect()
}

/// Walk from `start` applying each fractional return in turn.
pub fn walk_from_returns(start: f64, returns: &[f64]) -> Vec<f64> {
    let mut price = start;
    std::iter::once(start)
        .chain(returns.iter().map(|r| {
            price *= 1.0 + r;
            price
        }))
        .collect()
}

/// Write `<dir>/<symbol>.csv` in the feed format.
pub fn write_csv_feed(dir: &Path, symbol: &str, bars: &[Bar]) {
    let mut content = String::from("timestamp,open,high,low,close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    std::fs::write(dir.join(format!("{}.csv", symbol)), content).unwrap();
}
