//! Bar feed integrity checks.
//!
//! A feed must be strictly ascending by timestamp, carry finite OHLCV
//! values and a positive close. Any violation is fatal and reported before
//! indicators are computed.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::Bar;

pub fn validate_feed(bars: &[Bar]) -> Result<(), BacktestError> {
    for (i, bar) in bars.iter().enumerate() {
        if !bar.is_finite() {
            return Err(BacktestError::feed(i, "missing or non-finite OHLCV field"));
        }
        if bar.close <= 0.0 {
            return Err(BacktestError::feed(
                i,
                format!("close price must be positive, got {}", bar.close),
            ));
        }
        if i == 0 {
            continue;
        }
        let prev = &bars[i - 1];
        if bar.timestamp == prev.timestamp {
            return Err(BacktestError::feed(
                i,
                format!("duplicate timestamp {}", bar.timestamp),
            ));
        }
        if bar.timestamp < prev.timestamp {
            return Err(BacktestError::feed(
                i,
                format!(
                    "timestamp {} precedes previous bar {}",
                    bar.timestamp, prev.timestamp
                ),
            ));
        }
    }
    Ok(())
}
