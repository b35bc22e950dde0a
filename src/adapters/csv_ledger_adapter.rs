//! CSV trade ledger adapter implementing ReportPort.
//!
//! One row per trade. SELL-only columns are left empty on BUY rows.

use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;
use crate::domain::ledger::{TradeAction, TradeRecord};
use crate::domain::strategy::ExitReason;
use crate::ports::report_port::ReportPort;

#[derive(Serialize)]
struct LedgerRow {
    timestamp: NaiveDateTime,
    action: TradeAction,
    price: f64,
    quantity: f64,
    cash_after: f64,
    rsi: f64,
    rsi_ma: f64,
    delta_rsi: Option<f64>,
    delta_price: f64,
    profit: Option<f64>,
    profit_pct: Option<f64>,
    exit_reason: Option<ExitReason>,
}

impl From<&TradeRecord> for LedgerRow {
    fn from(t: &TradeRecord) -> Self {
        LedgerRow {
            timestamp: t.timestamp,
            action: t.action,
            price: t.price,
            quantity: t.quantity,
            cash_after: t.cash_after,
            rsi: t.indicators.rsi,
            rsi_ma: t.indicators.rsi_ma,
            delta_rsi: t.indicators.delta_rsi,
            delta_price: t.indicators.delta_price,
            profit: t.profit,
            profit_pct: t.profit_pct,
            exit_reason: t.exit_reason,
        }
    }
}

fn report_err(e: impl std::fmt::Display) -> BacktestError {
    BacktestError::Report {
        reason: e.to_string(),
    }
}

pub struct CsvLedgerAdapter;

impl CsvLedgerAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, result: &BacktestResult) -> Result<String, BacktestError> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        for trade in result.trades.iter() {
            wtr.serialize(LedgerRow::from(trade)).map_err(report_err)?;
        }
        let bytes = wtr.into_inner().map_err(report_err)?;
        String::from_utf8(bytes).map_err(report_err)
    }
}

impl Default for CsvLedgerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for CsvLedgerAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), BacktestError> {
        let mut wtr = csv::Writer::from_path(output_path).map_err(|e| BacktestError::Report {
            reason: format!("failed to open {}: {}", output_path.display(), e),
        })?;
        for trade in result.trades.iter() {
            wtr.serialize(LedgerRow::from(trade)).map_err(report_err)?;
        }
        wtr.flush()?;
        info!(path = %output_path.display(), trades = result.trades.len(), "wrote CSV ledger");
        Ok(())
    }
}
