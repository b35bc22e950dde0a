//! JSON report adapter implementing ReportPort.
//!
//! Writes the whole `BacktestResult` (ledger, valuation and equity curve)
//! together with the derived trade statistics.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;
use crate::domain::metrics::TradeStats;
use crate::ports::report_port::ReportPort;

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    result: &'a BacktestResult,
    stats: TradeStats,
}

pub struct JsonReportAdapter {
    include_equity_curve: bool,
}

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self {
            include_equity_curve: true,
        }
    }

    /// Drop the per-bar equity curve from the output.
    pub fn without_equity_curve() -> Self {
        Self {
            include_equity_curve: false,
        }
    }

    pub fn render(&self, result: &BacktestResult) -> Result<String, BacktestError> {
        let stats = TradeStats::compute(&result.trades, &result.equity_curve);
        let trimmed;
        let result = if self.include_equity_curve {
            result
        } else {
            trimmed = BacktestResult {
                equity_curve: Vec::new(),
                ..result.clone()
            };
            &trimmed
        };
        serde_json::to_string_pretty(&JsonReport { result, stats }).map_err(|e| {
            BacktestError::Report {
                reason: format!("failed to serialize report: {}", e),
            }
        })
    }
}

impl Default for JsonReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), BacktestError> {
        let json = self.render(result)?;
        fs::write(output_path, json).map_err(|e| BacktestError::Report {
            reason: format!("failed to write {}: {}", output_path.display(), e),
        })?;
        info!(path = %output_path.display(), trades = result.trades.len(), "wrote JSON report");
        Ok(())
    }
}
