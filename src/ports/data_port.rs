//! Historical bar feed port trait.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDateTime;

pub trait DataPort {
    /// Bars for `symbol` in source order, optionally limited to the
    /// inclusive `[start, end]` range.
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, BacktestError>;

    fn list_symbols(&self) -> Result<Vec<String>, BacktestError>;

    /// First timestamp, last timestamp and bar count, if any data exists.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, BacktestError> {
        let bars = self.fetch_bars(symbol, None, None)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp, bars.len())),
            _ => None,
        })
    }
}
