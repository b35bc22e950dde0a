//! Append-only trade ledger and equity tracking.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;

use crate::domain::position::{Fill, Liquidation};
use crate::domain::strategy::ExitReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => f.pad("BUY"),
            TradeAction::Sell => f.pad("SELL"),
        }
    }
}

/// Indicator state at the moment a trade fired.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub rsi_ma: f64,
    pub delta_rsi: Option<f64>,
    pub delta_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub timestamp: NaiveDateTime,
    pub action: TradeAction,
    pub price: f64,
    pub quantity: f64,
    pub cash_after: f64,
    pub indicators: IndicatorSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_reason: Option<ExitReason>,
}

impl TradeRecord {
    pub fn buy(timestamp: NaiveDateTime, fill: &Fill, indicators: IndicatorSnapshot) -> Self {
        TradeRecord {
            timestamp,
            action: TradeAction::Buy,
            price: fill.price,
            quantity: fill.quantity,
            cash_after: 0.0,
            indicators,
            profit: None,
            profit_pct: None,
            exit_reason: None,
        }
    }

    pub fn sell(
        timestamp: NaiveDateTime,
        exit: &Liquidation,
        reason: ExitReason,
        indicators: IndicatorSnapshot,
    ) -> Self {
        TradeRecord {
            timestamp,
            action: TradeAction::Sell,
            price: exit.exit_price,
            quantity: exit.quantity,
            cash_after: exit.proceeds,
            indicators,
            profit: Some(exit.profit),
            profit_pct: Some(exit.profit_pct),
            exit_reason: Some(reason),
        }
    }
}

/// Ordered trades of one run. Only the state machine appends; everyone
/// else sees a read-only slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TradeLedger {
    records: Vec<TradeRecord>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    /// If the record would break BUY/SELL alternation.
    pub(crate) fn record(&mut self, trade: TradeRecord) {
        let expected = match self.records.last().map(|t| t.action) {
            None | Some(TradeAction::Sell) => TradeAction::Buy,
            Some(TradeAction::Buy) => TradeAction::Sell,
        };
        assert_eq!(
            trade.action, expected,
            "ledger must alternate BUY and SELL"
        );
        self.records.push(trade);
    }

    pub fn as_slice(&self) -> &[TradeRecord] {
        &self.records
    }
}

impl Deref for TradeLedger {
    type Target = [TradeRecord];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub cash: f64,
    pub quantity: f64,
    pub equity: f64,
}
