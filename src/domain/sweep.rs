//! Parameter sweeps: independent runs over a grid of windows and strategies.

use rayon::prelude::*;
use tracing::info;

use crate::domain::backtest::{BacktestConfig, BacktestResult, run_backtest};
use crate::domain::error::BacktestError;
use crate::domain::ohlcv::Bar;
use crate::domain::strategy::{Strategy, StrategyVariant};

/// Parameter grid for a sweep.
#[derive(Debug, Clone)]
pub struct SweepGrid {
    pub rsi_windows: Vec<usize>,
    pub ma_windows: Vec<usize>,
    pub strategies: Vec<StrategyVariant>,
    pub initial_capital: f64,
}

/// One cell of the grid.
#[derive(Debug, Clone)]
pub struct SweepCase {
    pub config: BacktestConfig,
    pub strategy: StrategyVariant,
}

impl SweepGrid {
    pub fn size(&self) -> usize {
        self.rsi_windows.len() * self.ma_windows.len() * self.strategies.len()
    }

    pub fn cases(&self) -> Vec<SweepCase> {
        let mut cases = Vec::with_capacity(self.size());
        for &rsi_window in &self.rsi_windows {
            for &ma_window in &self.ma_windows {
                for strategy in &self.strategies {
                    cases.push(SweepCase {
                        config: BacktestConfig {
                            rsi_window,
                            ma_window,
                            initial_capital: self.initial_capital,
                        },
                        strategy: strategy.clone(),
                    });
                }
            }
        }
        cases
    }
}

#[derive(Debug)]
pub struct SweepOutcome {
    pub rsi_window: usize,
    pub ma_window: usize,
    pub strategy: String,
    pub result: Result<BacktestResult, BacktestError>,
}

fn run_case(bars: &[Bar], case: &SweepCase) -> SweepOutcome {
    SweepOutcome {
        rsi_window: case.config.rsi_window,
        ma_window: case.config.ma_window,
        strategy: case.strategy.name().to_string(),
        result: run_backtest(bars, &case.config, &case.strategy),
    }
}

/// Run every grid cell against the same feed. Outcomes come back in grid
/// order regardless of `parallel`.
pub fn run_sweep(bars: &[Bar], grid: &SweepGrid, parallel: bool) -> Vec<SweepOutcome> {
    let cases = grid.cases();
    info!(cases = cases.len(), parallel, "starting sweep");

    if parallel {
        cases.par_iter().map(|case| run_case(bars, case)).collect()
    } else {
        cases.iter().map(|case| run_case(bars, case)).collect()
    }
}

/// Successful outcomes, best total return first.
pub fn rank_by_return(outcomes: &[SweepOutcome]) -> Vec<&SweepOutcome> {
    let mut ok: Vec<&SweepOutcome> = outcomes.iter().filter(|o| o.result.is_ok()).collect();
    ok.sort_by(|a, b| {
        let ra = a.result.as_ref().map_or(f64::NEG_INFINITY, |r| r.total_return);
        let rb = b.result.as_ref().map_or(f64::NEG_INFINITY, |r| r.total_return);
        rb.total_cmp(&ra)
    });
    ok
}
