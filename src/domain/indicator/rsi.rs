//! RSI (Relative Strength Index) indicator.
//!
//! Uses simple moving averages of gains and losses over the trailing `n`
//! price changes (no Wilder smoothing):
//! - gain = max(delta, 0), loss = max(-delta, 0)
//! - RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//!
//! If avg_loss == 0: RSI = 100 when avg_gain > 0, otherwise 50 (flat window).
//!
//! Warmup: first n bars are invalid (need n price changes).

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

/// RSI value for one window of average gain/loss.
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain > 0.0 { 100.0 } else { 50.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

pub fn calculate_rsi(closes: &[f64], period: usize) -> IndicatorSeries {
    let mut values = vec![None; closes.len()];

    if period == 0 || closes.len() <= period {
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values,
        };
    }

    // gains[i] / losses[i] describe the change from bar i-1 to bar i; index 0 is unused.
    let mut gains = vec![0.0; closes.len()];
    let mut losses = vec![0.0; closes.len()];
    for i in 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            gains[i] = change;
        } else if change < 0.0 {
            losses[i] = -change;
        }
    }

    for i in period..closes.len() {
        let start = i + 1 - period;
        let avg_gain = gains[start..=i].iter().sum::<f64>() / period as f64;
        let avg_loss = losses[start..=i].iter().sum::<f64>() / period as f64;
        values[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}
