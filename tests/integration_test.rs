//! End-to-end runs of the engine over synthetic feeds.

mod common;

use approx::assert_relative_eq;
use common::*;
use proptest::prelude::*;
use rsitrader::domain::backtest::{BacktestConfig, BacktestResult, run_backtest};
use rsitrader::domain::error::BacktestError;
use rsitrader::domain::ledger::TradeAction;
use rsitrader::domain::monte_carlo::{MonteCarloParams, MonteCarloStrategy};
use rsitrader::domain::strategy::{
    CrossoverStrategy, ExitReason, StopLossStrategy, StrategyKind, StrategyVariant,
};
use rsitrader::domain::sweep::{SweepGrid, rank_by_return, run_sweep};
use rsitrader::ports::data_port::DataPort;

fn default_config() -> BacktestConfig {
    BacktestConfig::default()
}

fn assert_alternates(result: &BacktestResult) {
    for (i, trade) in result.trades.iter().enumerate() {
        let expected = if i % 2 == 0 {
            TradeAction::Buy
        } else {
            TradeAction::Sell
        };
        assert_eq!(trade.action, expected, "trade {} out of order", i);
    }
}

mod warmup_boundary {
    use super::*;

    #[test]
    fn one_bar_short_is_rejected() {
        let bars = make_bars(&generate_closes(27, 100.0));
        let err = run_backtest(&bars, &default_config(), &CrossoverStrategy).unwrap_err();
        assert!(matches!(
            err,
            BacktestError::InsufficientData {
                bars: 27,
                minimum: 28
            }
        ));
    }

    #[test]
    fn exact_minimum_is_accepted() {
        let bars = make_bars(&generate_closes(28, 100.0));
        let result = run_backtest(&bars, &default_config(), &CrossoverStrategy).unwrap();
        assert_eq!(result.bars_processed, 1);
        assert_eq!(result.equity_curve[0].timestamp, bars[27].timestamp);
    }

    #[test]
    fn empty_feed_is_insufficient() {
        let err = run_backtest(&[], &default_config(), &CrossoverStrategy).unwrap_err();
        assert!(matches!(err, BacktestError::InsufficientData { bars: 0, .. }));
    }
}

mod scenarios {
    use super::*;

    #[test]
    fn uptrend_after_chop_buys_once_and_holds() {
        let closes = uptrend_after_chop();
        let bars = make_bars(&closes);
        let result = run_backtest(&bars, &default_config(), &CrossoverStrategy).unwrap();

        assert_eq!(result.trades.len(), 1);
        let buy = &result.trades[0];
        assert_eq!(buy.action, TradeAction::Buy);
        assert_eq!(buy.timestamp, bars[27].timestamp);
        assert_eq!(buy.price, 107.0);
        assert!(buy.indicators.rsi > buy.indicators.rsi_ma);
        assert!(result.still_holding);
        assert!(result.final_value > result.initial_capital);
        assert_relative_eq!(result.final_value, 1000.0 / 107.0 * 109.0, epsilon = 1e-9);
    }

    #[test]
    fn uptrend_from_first_bar_never_crosses() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let result =
            run_backtest(&make_bars(&closes), &default_config(), &CrossoverStrategy).unwrap();
        assert!(result.trades.is_empty());
        assert!(!result.still_holding);
        assert_eq!(result.final_value, 1000.0);
    }

    #[test]
    fn flat_feed_never_trades() {
        let bars = make_bars(&[100.0; 40]);
        for strategy in [
            StrategyVariant::from_kind(StrategyKind::Crossover),
            StrategyVariant::from_kind(StrategyKind::StopLoss),
        ] {
            let result = run_backtest(&bars, &default_config(), &strategy).unwrap();
            assert!(result.trades.is_empty());
            assert_eq!(result.final_value, result.initial_capital);
            assert_eq!(result.total_return, 0.0);
        }
    }

    #[test]
    fn stop_loss_fires_below_one_percent() {
        let bars = make_bars(&[10.0, 9.0, 10.0, 9.0, 10.0, 100.0, 98.9]);
        let config = BacktestConfig {
            rsi_window: 2,
            ma_window: 3,
            initial_capital: 1000.0,
        };
        let result = run_backtest(&bars, &config, &StopLossStrategy::default()).unwrap();

        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.trades[0].price, 100.0);
        let sell = &result.trades[1];
        assert_eq!(sell.exit_reason, Some(ExitReason::StopLoss));
        assert_relative_eq!(sell.profit_pct.unwrap(), -1.1, epsilon = 1e-9);
        assert_relative_eq!(result.final_value, 989.0, epsilon = 1e-9);
        assert!(!result.still_holding);
    }

    #[test]
    fn crossover_ignores_same_drop() {
        let bars = make_bars(&[10.0, 9.0, 10.0, 9.0, 10.0, 100.0, 98.9]);
        let config = BacktestConfig {
            rsi_window: 2,
            ma_window: 3,
            initial_capital: 1000.0,
        };
        let result = run_backtest(&bars, &config, &CrossoverStrategy).unwrap();
        // RSI stays above its average, so the crossover exit does not fire
        assert_eq!(result.trades.len(), 1);
        assert!(result.still_holding);
    }

    #[test]
    fn round_trip_identity_holds() {
        let bars = make_bars(&generate_closes(300, 100.0));
        for kind in [
            StrategyKind::Crossover,
            StrategyKind::StopLoss,
            StrategyKind::MonteCarlo,
        ] {
            let strategy = StrategyVariant::from_kind(kind);
            let result = run_backtest(&bars, &default_config(), &strategy).unwrap();
            assert_relative_eq!(
                result.final_value,
                result.initial_capital + result.total_return,
                epsilon = 1e-9
            );
            assert_relative_eq!(
                result.total_return_pct,
                result.total_return / result.initial_capital * 100.0,
                epsilon = 1e-9
            );
            assert_alternates(&result);
            assert_eq!(result.still_holding, result.trades.len() % 2 == 1);
        }
    }
}

mod determinism {
    use super::*;

    #[test]
    fn repeated_runs_are_identical() {
        let bars = make_bars(&generate_closes(250, 50.0));
        let strategy = StrategyVariant::from_kind(StrategyKind::StopLoss);
        let a = run_backtest(&bars, &default_config(), &strategy).unwrap();
        let b = run_backtest(&bars, &default_config(), &strategy).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn seeded_monte_carlo_is_repeatable() {
        let bars = make_bars(&generate_closes(250, 50.0));
        let params = MonteCarloParams {
            simulations: 100,
            ..MonteCarloParams::default()
        };
        let a = run_backtest(&bars, &default_config(), &MonteCarloStrategy::new(params.clone()))
            .unwrap();
        let b = run_backtest(&bars, &default_config(), &MonteCarloStrategy::new(params)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn truncation_does_not_change_earlier_decisions() {
        let bars = make_bars(&generate_closes(200, 80.0));
        let strategies = [
            StrategyVariant::from_kind(StrategyKind::Crossover),
            StrategyVariant::from_kind(StrategyKind::StopLoss),
            StrategyVariant::from_kind(StrategyKind::MonteCarlo),
        ];
        for strategy in &strategies {
            let full = run_backtest(&bars, &default_config(), strategy).unwrap();
            for cut in [40, 97, 150] {
                let cutoff = bars[cut - 1].timestamp;
                let partial = run_backtest(&bars[..cut], &default_config(), strategy).unwrap();
                let expected: Vec<_> = full
                    .trades
                    .iter()
                    .filter(|t| t.timestamp <= cutoff)
                    .cloned()
                    .collect();
                assert_eq!(partial.trades.as_slice(), expected.as_slice());
                assert_eq!(
                    partial.equity_curve.as_slice(),
                    &full.equity_curve[..partial.equity_curve.len()]
                );
            }
        }
    }
}

mod feed_integrity {
    use super::*;

    fn config() -> BacktestConfig {
        BacktestConfig {
            rsi_window: 2,
            ma_window: 2,
            initial_capital: 1000.0,
        }
    }

    #[test]
    fn duplicate_timestamp_rejected() {
        let mut bars = make_bars(&generate_closes(10, 100.0));
        bars[5].timestamp = bars[4].timestamp;
        let err = run_backtest(&bars, &config(), &CrossoverStrategy).unwrap_err();
        assert!(matches!(err, BacktestError::FeedIntegrity { index: 5, .. }));
    }

    #[test]
    fn out_of_order_rejected() {
        let mut bars = make_bars(&generate_closes(10, 100.0));
        bars.swap(3, 4);
        let err = run_backtest(&bars, &config(), &CrossoverStrategy).unwrap_err();
        assert!(matches!(err, BacktestError::FeedIntegrity { index: 4, .. }));
    }

    #[test]
    fn nan_and_non_positive_close_rejected() {
        let mut bars = make_bars(&generate_closes(10, 100.0));
        bars[2].close = f64::NAN;
        assert!(matches!(
            run_backtest(&bars, &config(), &CrossoverStrategy),
            Err(BacktestError::FeedIntegrity { index: 2, .. })
        ));

        let mut bars = make_bars(&generate_closes(10, 100.0));
        bars[7].close = 0.0;
        assert!(matches!(
            run_backtest(&bars, &config(), &CrossoverStrategy),
            Err(BacktestError::FeedIntegrity { index: 7, .. })
        ));
    }

    #[test]
    fn data_port_errors_propagate() {
        let port = MockDataPort::new().with_error("BAD", "connection reset");
        assert!(matches!(
            port.fetch_bars("BAD", None, None),
            Err(BacktestError::Data { .. })
        ));
    }

    #[test]
    fn mock_port_range_filter() {
        let port = MockDataPort::new().with_bars("X", make_bars(&generate_closes(10, 100.0)));
        let bars = port.fetch_bars("X", Some(ts(2)), Some(ts(4))).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(port.get_data_range("X").unwrap(), Some((ts(0), ts(9), 10)));
        assert_eq!(port.get_data_range("Y").unwrap(), None);
    }
}

mod sweeps {
    use super::*;

    #[test]
    fn sweep_cells_match_individual_runs() {
        let bars = make_bars(&generate_closes(150, 100.0));
        let grid = SweepGrid {
            rsi_windows: vec![7, 14],
            ma_windows: vec![5, 14],
            strategies: vec![
                StrategyVariant::from_kind(StrategyKind::Crossover),
                StrategyVariant::from_kind(StrategyKind::StopLoss),
            ],
            initial_capital: 500.0,
        };

        let outcomes = run_sweep(&bars, &grid, true);
        assert_eq!(outcomes.len(), 8);

        for (case, outcome) in grid.cases().iter().zip(&outcomes) {
            let single = run_backtest(&bars, &case.config, &case.strategy).unwrap();
            assert_eq!(outcome.result.as_ref().unwrap(), &single);
        }

        let ranked = rank_by_return(&outcomes);
        assert_eq!(ranked.len(), 8);
        let best = ranked[0].result.as_ref().unwrap().total_return;
        assert!(
            outcomes
                .iter()
                .all(|o| o.result.as_ref().unwrap().total_return <= best)
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn invariants_hold_on_random_walks(
        returns in prop::collection::vec(-0.05f64..0.05, 30..200),
        rsi_window in 2usize..16,
        ma_window in 2usize..16,
        stop in prop::bool::ANY,
    ) {
        let bars = make_bars(&walk_from_returns(100.0, &returns));
        prop_assume!(bars.len() >= rsi_window + ma_window);

        let config = BacktestConfig { rsi_window, ma_window, initial_capital: 1000.0 };
        let strategy = if stop {
            StrategyVariant::from_kind(StrategyKind::StopLoss)
        } else {
            StrategyVariant::from_kind(StrategyKind::Crossover)
        };
        let result = run_backtest(&bars, &config, &strategy).unwrap();

        for (i, trade) in result.trades.iter().enumerate() {
            let expected = if i % 2 == 0 { TradeAction::Buy } else { TradeAction::Sell };
            prop_assert_eq!(trade.action, expected);
        }
        for point in &result.equity_curve {
            prop_assert!(point.cash >= 0.0);
            prop_assert!(point.quantity >= 0.0);
            prop_assert!(point.cash == 0.0 || point.quantity == 0.0);
        }
        prop_assert_eq!(result.bars_processed, bars.len() - config.warmup());
        prop_assert!((result.final_value - (1000.0 + result.total_return)).abs() < 1e-9);
        prop_assert_eq!(result.still_holding, result.trades.len() % 2 == 1);
    }
}
