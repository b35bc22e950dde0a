//! Cash/position state for a single-asset, all-in/all-out run.

use serde::Serialize;

use crate::domain::strategy::PositionView;

/// The one mutable state of a run. Flat means `quantity == 0` and no entry
/// price; long means all cash has been converted into `quantity` units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionState {
    cash: f64,
    quantity: f64,
    entry_price: Option<f64>,
    entry_index: Option<usize>,
}

/// Result of an all-in buy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub quantity: f64,
    pub price: f64,
    pub cost: f64,
}

/// Result of a full liquidation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Liquidation {
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub proceeds: f64,
    pub profit: f64,
    pub profit_pct: f64,
}

impl PositionState {
    pub fn new(initial_capital: f64) -> Self {
        PositionState {
            cash: initial_capital,
            quantity: 0.0,
            entry_price: None,
            entry_index: None,
        }
    }

    pub fn is_invested(&self) -> bool {
        self.entry_price.is_some()
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    /// Realized cash plus the mark-to-market value of any holding.
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.market_value(price)
    }

    pub fn view(&self, index: usize) -> PositionView {
        PositionView {
            is_invested: self.is_invested(),
            entry_price: self.entry_price,
            bars_held: self.entry_index.map_or(0, |entry| index - entry),
        }
    }

    /// Convert all cash into units at `price`.
    ///
    /// # Panics
    /// If a position is already open.
    pub fn buy_all_in(&mut self, price: f64, index: usize) -> Fill {
        assert!(!self.is_invested(), "buy attempted while already long");

        let cost = self.cash;
        let quantity = cost / price;
        self.quantity = quantity;
        self.entry_price = Some(price);
        self.entry_index = Some(index);
        self.cash = 0.0;

        Fill {
            quantity,
            price,
            cost,
        }
    }

    /// Sell the whole position at `price`.
    ///
    /// # Panics
    /// If no position is open.
    pub fn liquidate(&mut self, price: f64) -> Liquidation {
        let Some(entry_price) = self.entry_price else {
            panic!("sell attempted while flat");
        };

        let quantity = self.quantity;
        let proceeds = quantity * price;
        let cost_basis = quantity * entry_price;
        let profit = proceeds - cost_basis;
        let profit_pct = profit / cost_basis * 100.0;

        self.cash = proceeds;
        self.quantity = 0.0;
        self.entry_price = None;
        self.entry_index = None;

        Liquidation {
            quantity,
            entry_price,
            exit_price: price,
            proceeds,
            profit,
            profit_pct,
        }
    }
}
