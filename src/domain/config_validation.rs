//! Configuration validation.
//!
//! Validates all config fields before a run starts. Absent optional keys
//! fall back to their defaults; present keys must parse and be in range.

use crate::domain::error::BacktestError;
use crate::domain::monte_carlo::MonteCarloParams;
use crate::domain::ohlcv::parse_timestamp;
use crate::domain::strategy::{DEFAULT_STOP_LOSS_PCT, StrategyKind};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDateTime;
use std::str::FromStr;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_symbol(config)?;
    validate_initial_capital(config)?;
    validate_range(config)?;
    validate_indicator_config(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let kind = read_strategy_kind(config)?;
    validate_stop_loss(config)?;
    if kind == StrategyKind::MonteCarlo {
        read_monte_carlo_params(config)?.validate()?;
    }
    Ok(())
}

pub fn validate_sweep_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    read_window_list(config, "rsi_windows")?;
    read_window_list(config, "ma_windows")?;
    for raw in config.get_list("sweep", "strategies") {
        let kind = raw.parse::<StrategyKind>().map_err(|_| {
            BacktestError::invalid("sweep", "strategies", format!("unknown strategy '{}'", raw))
        })?;
        if kind == StrategyKind::StopLoss {
            read_stop_loss_pct(config)?;
        }
    }
    Ok(())
}

/// Parse `[section] key` when present. Absent keys yield `None`; present but
/// unparsable keys are an error rather than a silent default.
pub fn read_parsed<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, BacktestError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            BacktestError::invalid(section, key, format!("cannot parse '{}'", raw))
        }),
    }
}

pub fn read_timestamp(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDateTime>, BacktestError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw).map(Some).ok_or_else(|| {
            BacktestError::invalid(
                section,
                key,
                format!("invalid {} '{}', expected YYYY-MM-DD or RFC 3339", key, raw),
            )
        }),
    }
}

pub fn read_strategy_kind(config: &dyn ConfigPort) -> Result<StrategyKind, BacktestError> {
    match config.get_string("strategy", "kind") {
        None => Ok(StrategyKind::Crossover),
        Some(raw) => raw.parse(),
    }
}

/// `[monte_carlo]` keys layered over the defaults.
pub fn read_monte_carlo_params(config: &dyn ConfigPort) -> Result<MonteCarloParams, BacktestError> {
    let mut params = MonteCarloParams::default();
    let section = "monte_carlo";
    if let Some(v) = read_parsed(config, section, "simulations")? {
        params.simulations = v;
    }
    if let Some(v) = read_parsed(config, section, "steps")? {
        params.steps = v;
    }
    if let Some(v) = read_parsed(config, section, "dt")? {
        params.dt = v;
    }
    if let Some(v) = read_parsed(config, section, "lookback")? {
        params.lookback = v;
    }
    if let Some(v) = read_parsed(config, section, "seed")? {
        params.seed = v;
    }
    if let Some(v) = read_parsed(config, section, "stop_loss_pct")? {
        params.stop_loss_pct = v;
    }
    if let Some(v) = read_parsed(config, section, "take_profit_pct")? {
        params.take_profit_pct = v;
    }
    if let Some(v) = read_parsed(config, section, "max_hold_bars")? {
        params.max_hold_bars = v;
    }
    if let Some(v) = read_parsed(config, section, "forecast_threshold")? {
        params.forecast_threshold = v;
    }
    if let Some(v) = read_parsed(config, section, "trailing_trigger_pct")? {
        params.trailing_trigger_pct = v;
    }
    if let Some(v) = read_parsed(config, section, "trailing_pullback_pct")? {
        params.trailing_pullback_pct = v;
    }
    Ok(params)
}

/// Comma-separated list of positive window lengths from `[sweep]`.
pub fn read_window_list(config: &dyn ConfigPort, key: &str) -> Result<Vec<usize>, BacktestError> {
    config
        .get_list("sweep", key)
        .iter()
        .map(|raw| match raw.parse::<usize>() {
            Ok(w) if w > 0 => Ok(w),
            _ => Err(BacktestError::invalid(
                "sweep",
                key,
                format!("'{}' is not a positive window length", raw),
            )),
        })
        .collect()
}

fn validate_symbol(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    match config.get_string("backtest", "symbol") {
        Some(_) => Ok(()),
        None => Err(BacktestError::ConfigMissing {
            section: "backtest".to_string(),
            key: "symbol".to_string(),
        }),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    match read_parsed::<f64>(config, "backtest", "initial_capital")? {
        Some(v) if !(v > 0.0) || !v.is_finite() => Err(BacktestError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        )),
        _ => Ok(()),
    }
}

fn validate_range(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let start = read_timestamp(config, "backtest", "start")?;
    let end = read_timestamp(config, "backtest", "end")?;
    match (start, end) {
        (Some(s), Some(e)) if s > e => Err(BacktestError::invalid(
            "backtest",
            "start",
            "start must not be after end",
        )),
        _ => Ok(()),
    }
}

fn validate_indicator_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    for key in ["rsi_window", "ma_window"] {
        if read_parsed::<usize>(config, "indicator", key)? == Some(0) {
            return Err(BacktestError::invalid(
                "indicator",
                key,
                format!("{} must be positive", key),
            ));
        }
    }
    Ok(())
}

fn validate_stop_loss(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    read_stop_loss_pct(config).map(|_| ())
}

/// `[strategy] stop_loss_pct`, a finite percentage in `[0, 100)`.
pub fn read_stop_loss_pct(config: &dyn ConfigPort) -> Result<f64, BacktestError> {
    match read_parsed::<f64>(config, "strategy", "stop_loss_pct")? {
        None => Ok(DEFAULT_STOP_LOSS_PCT),
        Some(v) if v.is_finite() && (0.0..100.0).contains(&v) => Ok(v),
        Some(v) => Err(BacktestError::invalid(
            "strategy",
            "stop_loss_pct",
            format!("stop_loss_pct must be in [0, 100), got {}", v),
        )),
    }
}
