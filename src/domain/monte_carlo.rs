//! Monte-Carlo hybrid strategy.
//!
//! Combines RSI momentum with a Geometric Brownian Motion forecast:
//! dS = mu * S * dt + sigma * S * dW, discretised with Euler-Maruyama.
//! Drift and volatility are estimated from the trailing close returns.
//!
//! The random stream is seeded from `seed` and the bar index, so the same
//! bar always yields the same forecast and the strategy stays a pure
//! function of its inputs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use crate::domain::error::BacktestError;
use crate::domain::strategy::{ExitReason, MarketSnapshot, PositionView, Strategy};

/// Minute bars: 252 sessions of 390 minutes.
pub const MINUTE_DT: f64 = 1.0 / (252.0 * 390.0);
pub const MIN_HISTORY: usize = 20;
const SIGMA_CAP: f64 = 0.5;
const PRICE_FLOOR: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloParams {
    pub simulations: usize,
    pub steps: usize,
    pub dt: f64,
    /// Trailing closes used to estimate drift and volatility.
    pub lookback: usize,
    pub seed: u64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub trailing_trigger_pct: f64,
    pub trailing_pullback_pct: f64,
    pub max_hold_bars: usize,
    /// Minimum forecast move (fraction of price) to count as a signal.
    pub forecast_threshold: f64,
}

impl Default for MonteCarloParams {
    fn default() -> Self {
        MonteCarloParams {
            simulations: 500,
            steps: 10,
            dt: MINUTE_DT,
            lookback: 60,
            seed: 42,
            stop_loss_pct: 2.0,
            take_profit_pct: 3.0,
            trailing_trigger_pct: 1.5,
            trailing_pullback_pct: 0.5,
            max_hold_bars: 60,
            forecast_threshold: 0.002,
        }
    }
}

impl MonteCarloParams {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.simulations == 0 {
            return Err(BacktestError::invalid(
                "monte_carlo",
                "simulations",
                "simulations must be at least 1",
            ));
        }
        if self.steps == 0 {
            return Err(BacktestError::invalid(
                "monte_carlo",
                "steps",
                "steps must be at least 1",
            ));
        }
        if !(self.dt > 0.0) {
            return Err(BacktestError::invalid(
                "monte_carlo",
                "dt",
                "dt must be positive",
            ));
        }
        if self.lookback < MIN_HISTORY {
            return Err(BacktestError::invalid(
                "monte_carlo",
                "lookback",
                format!("lookback must be at least {}", MIN_HISTORY),
            ));
        }
        Ok(())
    }
}

/// Lower/upper forecast percentiles used by the decision rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forecast {
    pub p40: f64,
    pub p60: f64,
}

/// Simulate terminal prices. `None` when `history` is too short to estimate
/// drift and volatility.
pub fn simulate_gbm(
    current_price: f64,
    history: &[f64],
    simulations: usize,
    steps: usize,
    dt: f64,
    rng: &mut StdRng,
) -> Option<Vec<f64>> {
    if history.len() < MIN_HISTORY {
        return None;
    }

    let returns: Vec<f64> = history.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect();
    let n = returns.len() as f64;
    let mu = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mu).powi(2)).sum::<f64>() / n;
    let sigma = variance.sqrt().min(SIGMA_CAP);
    let sqrt_dt = dt.sqrt();

    let terminal = (0..simulations)
        .map(|_| {
            let mut price = current_price;
            for _ in 0..steps {
                let dw = standard_normal(rng) * sqrt_dt;
                let ds = mu * price * dt + sigma * price * dw;
                price = (price + ds).max(PRICE_FLOOR);
            }
            price
        })
        .collect();

    Some(terminal)
}

/// Box-Muller transform.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.r#gen::<f64>();
    let u2: f64 = rng.r#gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Linear-interpolated percentile of an ascending slice, `p` in [0, 100].
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloStrategy {
    pub params: MonteCarloParams,
}

impl MonteCarloStrategy {
    pub fn new(params: MonteCarloParams) -> Self {
        MonteCarloStrategy { params }
    }

    fn rng_for(&self, index: usize) -> StdRng {
        let mixed = self.params.seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        StdRng::seed_from_u64(mixed)
    }

    pub fn forecast(&self, market: &MarketSnapshot<'_>) -> Option<Forecast> {
        let start = market.closes.len().saturating_sub(self.params.lookback);
        let history = &market.closes[start..];
        let mut rng = self.rng_for(market.index);
        let mut terminal = simulate_gbm(
            market.price_now,
            history,
            self.params.simulations,
            self.params.steps,
            self.params.dt,
            &mut rng,
        )?;
        terminal.sort_by(f64::total_cmp);
        Some(Forecast {
            p40: percentile(&terminal, 40.0),
            p60: percentile(&terminal, 60.0),
        })
    }
}

impl Strategy for MonteCarloStrategy {
    fn name(&self) -> &str {
        "monte_carlo"
    }

    fn should_buy(&self, m: &MarketSnapshot<'_>, position: &PositionView) -> bool {
        if position.is_invested {
            return false;
        }

        let rsi_bullish = m.rsi_now > m.rsi_ma_now && m.rsi_now < 70.0 && m.rsi_now > 30.0;
        let price_rising = m.price_now - m.price_prev > 0.0;
        if !(rsi_bullish && price_rising) {
            return false;
        }

        match self.forecast(m) {
            Some(f) => (f.p60 - m.price_now) / m.price_now > self.params.forecast_threshold,
            None => m.rsi_prev.is_some_and(|prev| m.rsi_now - prev > 0.5),
        }
    }

    fn exit_signal(&self, m: &MarketSnapshot<'_>, position: &PositionView) -> Option<ExitReason> {
        if !position.is_invested {
            return None;
        }
        let p = &self.params;

        let profit_pct = position
            .entry_price
            .map(|entry| (m.price_now - entry) / entry * 100.0);

        if let Some(pct) = profit_pct {
            if pct <= -p.stop_loss_pct {
                return Some(ExitReason::StopLoss);
            }
            if pct >= p.take_profit_pct {
                return Some(ExitReason::TakeProfit);
            }
            let pullback_pct = (m.price_now - m.price_prev) / m.price_prev * 100.0;
            if pct >= p.trailing_trigger_pct && pullback_pct < -p.trailing_pullback_pct {
                return Some(ExitReason::TrailingStop);
            }
        }

        let rsi_bearish = m.rsi_now < m.rsi_ma_now || m.rsi_now > 75.0;
        let price_falling = m.price_now - m.price_prev < 0.0;

        if m.rsi_now > 80.0 {
            return Some(ExitReason::Overbought);
        }

        if let Some(pct) = profit_pct {
            if position.bars_held > p.max_hold_bars && pct > 0.0 && pct < 0.5 {
                return Some(ExitReason::TimeExit);
            }
        }

        match self.forecast(m) {
            Some(f) => {
                let bearish = (f.p40 - m.price_now) / m.price_now < -p.forecast_threshold;
                (bearish && (rsi_bearish || price_falling)).then_some(ExitReason::Forecast)
            }
            None => {
                if rsi_bearish && price_falling {
                    Some(ExitReason::TrendBreak)
                } else if m.rsi_now > 75.0 {
                    Some(ExitReason::Overbought)
                } else {
                    None
                }
            }
        }
    }
}
