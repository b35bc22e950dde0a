//! Trade statistics derived from a finished run.
//!
//! These are reporting concerns layered on top of the ledger; the engine
//! itself never consults them.

use serde::Serialize;

use super::ledger::{EquityPoint, TradeRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeStats {
    pub round_trips: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub avg_profit: f64,
    pub avg_profit_pct: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub profit_factor: f64,
    pub max_drawdown: f64,
}

impl TradeStats {
    pub fn compute(trades: &[TradeRecord], equity_curve: &[EquityPoint]) -> Self {
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut total_profit_pct = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        for (profit, profit_pct) in trades
            .iter()
            .filter_map(|t| Some((t.profit?, t.profit_pct?)))
        {
            total_profit_pct += profit_pct;
            if profit > 0.0 {
                trades_won += 1;
                total_wins += profit;
                largest_win = largest_win.max(profit);
            } else if profit < 0.0 {
                trades_lost += 1;
                total_losses += profit.abs();
                largest_loss = largest_loss.max(profit.abs());
            } else {
                trades_breakeven += 1;
            }
        }

        let round_trips = trades_won + trades_lost + trades_breakeven;
        let (win_rate, avg_profit, avg_profit_pct) = if round_trips > 0 {
            let n = round_trips as f64;
            (
                trades_won as f64 / n,
                (total_wins - total_losses) / n,
                total_profit_pct / n,
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        TradeStats {
            round_trips,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            avg_profit,
            avg_profit_pct,
            largest_win,
            largest_loss,
            profit_factor,
            max_drawdown: compute_drawdown(equity_curve),
        }
    }
}

/// Largest peak-to-trough fall of the equity curve, as a fraction of the peak.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let Some(first) = equity_curve.first() else {
        return 0.0;
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
    }
    max_dd
}
