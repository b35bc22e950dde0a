//! Strategy decision contract and the built-in strategy variants.
//!
//! Strategies are stateless: everything a decision needs arrives through a
//! [`MarketSnapshot`] and a [`PositionView`], so one strategy value can be
//! shared across concurrent runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::BacktestError;
use crate::domain::monte_carlo::{MonteCarloParams, MonteCarloStrategy};

/// Market state at the bar being decided. `closes` ends at the current bar.
#[derive(Debug, Clone, Copy)]
pub struct MarketSnapshot<'a> {
    pub index: usize,
    pub rsi_now: f64,
    pub rsi_prev: Option<f64>,
    pub rsi_ma_now: f64,
    pub price_now: f64,
    pub price_prev: f64,
    pub closes: &'a [f64],
}

/// Read-only view of the position, supplied by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionView {
    pub is_invested: bool,
    pub entry_price: Option<f64>,
    pub bars_held: usize,
}

/// Which condition produced a sell. Diagnostic only; every reason maps to
/// the same full liquidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Crossover,
    StopLoss,
    TrendBreak,
    TakeProfit,
    TrailingStop,
    Overbought,
    TimeExit,
    Forecast,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::Crossover => "crossover",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TrendBreak => "trend_break",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::Overbought => "overbought",
            ExitReason::TimeExit => "time_exit",
            ExitReason::Forecast => "forecast",
        };
        f.pad(s)
    }
}

pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn should_buy(&self, market: &MarketSnapshot<'_>, position: &PositionView) -> bool;

    /// `Some(reason)` when the open position should be liquidated.
    fn exit_signal(&self, market: &MarketSnapshot<'_>, position: &PositionView)
    -> Option<ExitReason>;

    fn should_sell(&self, market: &MarketSnapshot<'_>, position: &PositionView) -> bool {
        self.exit_signal(market, position).is_some()
    }
}

/// RSI above its average on a rising bar, while flat.
pub fn crossover_should_buy(
    rsi_now: f64,
    rsi_ma_now: f64,
    price_now: f64,
    price_prev: f64,
    is_invested: bool,
) -> bool {
    !is_invested && rsi_now > rsi_ma_now && price_now - price_prev > 0.0
}

/// RSI below its average on a falling bar, while invested.
pub fn crossover_should_sell(
    rsi_now: f64,
    rsi_ma_now: f64,
    price_now: f64,
    price_prev: f64,
    is_invested: bool,
) -> bool {
    is_invested && rsi_now < rsi_ma_now && price_now - price_prev < 0.0
}

/// Stop-loss first, then trend-break. `None` when flat or no trigger.
pub fn stop_loss_exit(
    rsi_now: f64,
    rsi_ma_now: f64,
    price_now: f64,
    entry_price: Option<f64>,
    is_invested: bool,
    stop_loss_pct: f64,
) -> Option<ExitReason> {
    if !is_invested {
        return None;
    }
    let stop_hit = entry_price
        .map(|entry| price_now < entry * (1.0 - stop_loss_pct / 100.0))
        .unwrap_or(false);
    if stop_hit {
        return Some(ExitReason::StopLoss);
    }
    if rsi_now < rsi_ma_now {
        return Some(ExitReason::TrendBreak);
    }
    None
}

/// Plain RSI/RSI-MA crossover confirmed by price direction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CrossoverStrategy;

impl Strategy for CrossoverStrategy {
    fn name(&self) -> &str {
        "crossover"
    }

    fn should_buy(&self, m: &MarketSnapshot<'_>, position: &PositionView) -> bool {
        crossover_should_buy(
            m.rsi_now,
            m.rsi_ma_now,
            m.price_now,
            m.price_prev,
            position.is_invested,
        )
    }

    fn exit_signal(&self, m: &MarketSnapshot<'_>, position: &PositionView) -> Option<ExitReason> {
        crossover_should_sell(
            m.rsi_now,
            m.rsi_ma_now,
            m.price_now,
            m.price_prev,
            position.is_invested,
        )
        .then_some(ExitReason::Crossover)
    }
}

pub const DEFAULT_STOP_LOSS_PCT: f64 = 1.0;

/// Crossover entry; exits on a stop-loss below entry or on an RSI trend-break.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopLossStrategy {
    pub stop_loss_pct: f64,
}

impl Default for StopLossStrategy {
    fn default() -> Self {
        StopLossStrategy {
            stop_loss_pct: DEFAULT_STOP_LOSS_PCT,
        }
    }
}

impl Strategy for StopLossStrategy {
    fn name(&self) -> &str {
        "stop_loss"
    }

    fn should_buy(&self, m: &MarketSnapshot<'_>, position: &PositionView) -> bool {
        crossover_should_buy(
            m.rsi_now,
            m.rsi_ma_now,
            m.price_now,
            m.price_prev,
            position.is_invested,
        )
    }

    fn exit_signal(&self, m: &MarketSnapshot<'_>, position: &PositionView) -> Option<ExitReason> {
        stop_loss_exit(
            m.rsi_now,
            m.rsi_ma_now,
            m.price_now,
            position.entry_price,
            position.is_invested,
            self.stop_loss_pct,
        )
    }
}

/// Strategy selector as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Crossover,
    StopLoss,
    MonteCarlo,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Crossover => "crossover",
            StrategyKind::StopLoss => "stop_loss",
            StrategyKind::MonteCarlo => "monte_carlo",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "crossover" => Ok(StrategyKind::Crossover),
            "stop_loss" => Ok(StrategyKind::StopLoss),
            "monte_carlo" | "gbm" => Ok(StrategyKind::MonteCarlo),
            other => Err(BacktestError::invalid(
                "strategy",
                "kind",
                format!(
                    "unknown strategy '{}', expected crossover, stop_loss or monte_carlo",
                    other
                ),
            )),
        }
    }
}

/// The closed set of strategies selectable for a run.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyVariant {
    Crossover(CrossoverStrategy),
    StopLoss(StopLossStrategy),
    MonteCarlo(MonteCarloStrategy),
}

impl StrategyVariant {
    /// Build a variant with default parameters for the given selector.
    pub fn from_kind(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Crossover => StrategyVariant::Crossover(CrossoverStrategy),
            StrategyKind::StopLoss => StrategyVariant::StopLoss(StopLossStrategy::default()),
            StrategyKind::MonteCarlo => {
                StrategyVariant::MonteCarlo(MonteCarloStrategy::new(MonteCarloParams::default()))
            }
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyVariant::Crossover(_) => StrategyKind::Crossover,
            StrategyVariant::StopLoss(_) => StrategyKind::StopLoss,
            StrategyVariant::MonteCarlo(_) => StrategyKind::MonteCarlo,
        }
    }

    fn inner(&self) -> &dyn Strategy {
        match self {
            StrategyVariant::Crossover(s) => s,
            StrategyVariant::StopLoss(s) => s,
            StrategyVariant::MonteCarlo(s) => s,
        }
    }
}

impl Strategy for StrategyVariant {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn should_buy(&self, market: &MarketSnapshot<'_>, position: &PositionView) -> bool {
        self.inner().should_buy(market, position)
    }

    fn exit_signal(
        &self,
        market: &MarketSnapshot<'_>,
        position: &PositionView,
    ) -> Option<ExitReason> {
        self.inner().exit_signal(market, position)
    }
}
