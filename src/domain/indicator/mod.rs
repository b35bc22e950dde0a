//! Momentum indicator engine.
//!
//! This module provides:
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSeries`: a same-length series of optional values
//! - `IndicatorFrame`: a bar annotated with RSI and its moving average
//!
//! Every value at index `i` is computed from indices `0..=i` only.

pub mod rsi;
pub mod sma;

use serde::Serialize;
use std::fmt;

use crate::domain::ohlcv::{Bar, closes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IndicatorType {
    Rsi(usize),
    RsiMa { rsi_window: usize, ma_window: usize },
}

/// A series aligned 1:1 with the input prices; `None` marks warm-up.
#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<Option<f64>>,
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Rsi(window) => write!(f, "RSI({})", window),
            IndicatorType::RsiMa {
                rsi_window,
                ma_window,
            } => write!(f, "SMA(RSI({}),{})", rsi_window, ma_window),
        }
    }
}

/// A bar plus its indicator values. Read-only once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    pub bar: Bar,
    pub rsi: Option<f64>,
    pub rsi_ma: Option<f64>,
}

impl IndicatorFrame {
    /// Both RSI and its average, when the frame is past warm-up.
    pub fn indicators(&self) -> Option<(f64, f64)> {
        Some((self.rsi?, self.rsi_ma?))
    }

    pub fn is_ready(&self) -> bool {
        self.indicators().is_some()
    }
}

/// Number of leading bars with an undefined RSI moving average.
pub fn warmup_bars(rsi_window: usize, ma_window: usize) -> usize {
    (rsi_window + ma_window).saturating_sub(1)
}

/// Annotate every bar with RSI(`rsi_window`) and SMA(RSI, `ma_window`).
pub fn compute_frames(bars: &[Bar], rsi_window: usize, ma_window: usize) -> Vec<IndicatorFrame> {
    let rsi = rsi::calculate_rsi(&closes(bars), rsi_window);
    let rsi_ma = sma::calculate_sma(&rsi.values, ma_window);

    bars.iter()
        .zip(rsi.values)
        .zip(rsi_ma)
        .map(|((bar, rsi), rsi_ma)| IndicatorFrame {
            bar: bar.clone(),
            rsi,
            rsi_ma,
        })
        .collect()
}
