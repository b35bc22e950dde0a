//! Backtest engine and bar-by-bar event loop.
//!
//! The run is a two-state machine (flat / long) driven once per bar, in
//! chronological order, from the first bar whose RSI and RSI average are
//! both defined. Configuration, feed and warm-up checks all happen before
//! the loop; inside it only contract violations can fail, and those panic.

use serde::Serialize;
use tracing::{debug, info, info_span, trace};

use crate::domain::error::BacktestError;
use crate::domain::feed::validate_feed;
use crate::domain::indicator::{IndicatorFrame, compute_frames, warmup_bars};
use crate::domain::ledger::{EquityPoint, IndicatorSnapshot, TradeLedger, TradeRecord};
use crate::domain::ohlcv::Bar;
use crate::domain::position::PositionState;
use crate::domain::strategy::{MarketSnapshot, Strategy};

pub const DEFAULT_RSI_WINDOW: usize = 14;
pub const DEFAULT_MA_WINDOW: usize = 14;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestConfig {
    pub rsi_window: usize,
    pub ma_window: usize,
    pub initial_capital: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            rsi_window: DEFAULT_RSI_WINDOW,
            ma_window: DEFAULT_MA_WINDOW,
            initial_capital: 1000.0,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if !(self.initial_capital > 0.0) || !self.initial_capital.is_finite() {
            return Err(BacktestError::invalid(
                "backtest",
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
        if self.rsi_window == 0 {
            return Err(BacktestError::invalid(
                "indicator",
                "rsi_window",
                "rsi_window must be positive",
            ));
        }
        if self.ma_window == 0 {
            return Err(BacktestError::invalid(
                "indicator",
                "ma_window",
                "ma_window must be positive",
            ));
        }
        Ok(())
    }

    /// Leading bars without a fully-defined indicator frame.
    pub fn warmup(&self) -> usize {
        warmup_bars(self.rsi_window, self.ma_window)
    }

    /// Smallest feed that yields at least one fully-defined frame.
    pub fn minimum_bars(&self) -> usize {
        self.rsi_window + self.ma_window
    }
}

/// End-of-run valuation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Valuation {
    pub final_value: f64,
    pub total_return: f64,
    pub total_return_pct: f64,
    pub still_holding: bool,
}

impl Valuation {
    /// An open position is marked at `last_close`, never sold.
    pub fn compute(position: &PositionState, last_close: f64, initial_capital: f64) -> Self {
        let still_holding = position.is_invested();
        let final_value = position.cash()
            + if still_holding {
                position.market_value(last_close)
            } else {
                0.0
            };
        let total_return = final_value - initial_capital;
        Valuation {
            final_value,
            total_return,
            total_return_pct: total_return / initial_capital * 100.0,
            still_holding,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub strategy: String,
    pub initial_capital: f64,
    pub trades: TradeLedger,
    pub final_value: f64,
    pub total_return: f64,
    pub total_return_pct: f64,
    pub still_holding: bool,
    pub bars_processed: usize,
    pub equity_curve: Vec<EquityPoint>,
}

/// Check config, feed integrity and warm-up length, then compute frames.
pub fn prepare_frames(
    bars: &[Bar],
    config: &BacktestConfig,
) -> Result<Vec<IndicatorFrame>, BacktestError> {
    config.validate()?;
    validate_feed(bars)?;

    let minimum = config.minimum_bars();
    if bars.len() < minimum {
        return Err(BacktestError::InsufficientData {
            bars: bars.len(),
            minimum,
        });
    }

    Ok(compute_frames(bars, config.rsi_window, config.ma_window))
}

pub fn run_backtest<S: Strategy + ?Sized>(
    bars: &[Bar],
    config: &BacktestConfig,
    strategy: &S,
) -> Result<BacktestResult, BacktestError> {
    let span = info_span!(
        "backtest",
        strategy = strategy.name(),
        rsi_window = config.rsi_window,
        ma_window = config.ma_window
    );
    let _guard = span.enter();

    let frames = prepare_frames(bars, config)?;
    let closes: Vec<f64> = frames.iter().map(|f| f.bar.close).collect();
    let start = config.warmup();

    let mut position = PositionState::new(config.initial_capital);
    let mut ledger = TradeLedger::new();
    let mut equity_curve = Vec::with_capacity(frames.len() - start);

    for i in start..frames.len() {
        let frame = &frames[i];
        let Some((rsi_now, rsi_ma_now)) = frame.indicators() else {
            continue;
        };
        // start >= 1 for any positive windows, so a previous bar exists
        let prev = &frames[i - 1];

        let market = MarketSnapshot {
            index: i,
            rsi_now,
            rsi_prev: prev.rsi,
            rsi_ma_now,
            price_now: frame.bar.close,
            price_prev: prev.bar.close,
            closes: &closes[..=i],
        };
        let view = position.view(i);
        let snapshot = IndicatorSnapshot {
            rsi: rsi_now,
            rsi_ma: rsi_ma_now,
            delta_rsi: prev.rsi.map(|p| rsi_now - p),
            delta_price: frame.bar.price_delta(&prev.bar),
        };

        if !view.is_invested {
            if strategy.should_buy(&market, &view) {
                let fill = position.buy_all_in(market.price_now, i);
                debug!(
                    timestamp = %frame.bar.timestamp,
                    price = fill.price,
                    quantity = fill.quantity,
                    cost = fill.cost,
                    rsi = rsi_now,
                    rsi_ma = rsi_ma_now,
                    "buy"
                );
                ledger.record(TradeRecord::buy(frame.bar.timestamp, &fill, snapshot));
            }
        } else if let Some(reason) = strategy.exit_signal(&market, &view) {
            let exit = position.liquidate(market.price_now);
            debug!(
                timestamp = %frame.bar.timestamp,
                price = exit.exit_price,
                profit = exit.profit,
                profit_pct = exit.profit_pct,
                %reason,
                "sell"
            );
            ledger.record(TradeRecord::sell(
                frame.bar.timestamp,
                &exit,
                reason,
                snapshot,
            ));
        }

        let equity = position.equity(market.price_now);
        trace!(index = i, equity, invested = position.is_invested(), "bar");
        equity_curve.push(EquityPoint {
            timestamp: frame.bar.timestamp,
            cash: position.cash(),
            quantity: position.quantity(),
            equity,
        });
    }

    let last_close = closes[closes.len() - 1];
    let valuation = Valuation::compute(&position, last_close, config.initial_capital);

    info!(
        bars = equity_curve.len(),
        trades = ledger.len(),
        final_value = valuation.final_value,
        total_return_pct = valuation.total_return_pct,
        still_holding = valuation.still_holding,
        "backtest complete"
    );

    Ok(BacktestResult {
        strategy: strategy.name().to_string(),
        initial_capital: config.initial_capital,
        trades: ledger,
        final_value: valuation.final_value,
        total_return: valuation.total_return,
        total_return_pct: valuation.total_return_pct,
        still_holding: valuation.still_holding,
        bars_processed: equity_curve.len(),
        equity_curve,
    })
}
