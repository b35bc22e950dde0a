//! CLI definition and dispatch.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_ledger_adapter::CsvLedgerAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::{
    self as backtest_engine, BacktestConfig, BacktestResult, DEFAULT_MA_WINDOW, DEFAULT_RSI_WINDOW,
};
use crate::domain::config_validation::{
    read_monte_carlo_params, read_parsed, read_stop_loss_pct, read_strategy_kind, read_timestamp,
    read_window_list, validate_backtest_config, validate_strategy_config, validate_sweep_config,
};
use crate::domain::error::BacktestError;
use crate::domain::metrics::TradeStats;
use crate::domain::monte_carlo::MonteCarloStrategy;
use crate::domain::ohlcv::Bar;
use crate::domain::strategy::{
    CrossoverStrategy, StopLossStrategy, Strategy, StrategyKind, StrategyVariant,
};
use crate::domain::sweep::{SweepGrid, rank_by_return, run_sweep};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_INITIAL_CAPITAL: f64 = 1000.0;
const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "rsitrader", about = "RSI crossover backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Override [backtest] symbol
        #[arg(long)]
        symbol: Option<String>,
        /// Override [strategy] kind
        #[arg(short, long)]
        strategy: Option<StrategyKind>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
        format: ReportFormat,
    },
    /// Run every combination of the [sweep] grid
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        /// Number of ranked results to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Json,
    Csv,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            symbol,
            strategy,
            output,
            format,
        } => run_backtest(&config, symbol.as_deref(), strategy, output.as_deref(), format),
        Command::Sweep {
            config,
            symbol,
            top,
        } => run_sweep_command(&config, symbol.as_deref(), top),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, BacktestError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, BacktestError> {
    let config = BacktestConfig {
        rsi_window: read_parsed(adapter, "indicator", "rsi_window")?.unwrap_or(DEFAULT_RSI_WINDOW),
        ma_window: read_parsed(adapter, "indicator", "ma_window")?.unwrap_or(DEFAULT_MA_WINDOW),
        initial_capital: read_parsed(adapter, "backtest", "initial_capital")?
            .unwrap_or(DEFAULT_INITIAL_CAPITAL),
    };
    config.validate()?;
    Ok(config)
}

/// Strategy from `[strategy]`, optionally overriding its kind.
pub fn build_strategy(
    adapter: &dyn ConfigPort,
    kind_override: Option<StrategyKind>,
) -> Result<StrategyVariant, BacktestError> {
    let kind = match kind_override {
        Some(kind) => kind,
        None => read_strategy_kind(adapter)?,
    };
    build_strategy_of_kind(adapter, kind)
}

fn build_strategy_of_kind(
    adapter: &dyn ConfigPort,
    kind: StrategyKind,
) -> Result<StrategyVariant, BacktestError> {
    Ok(match kind {
        StrategyKind::Crossover => StrategyVariant::Crossover(CrossoverStrategy),
        StrategyKind::StopLoss => StrategyVariant::StopLoss(StopLossStrategy {
            stop_loss_pct: read_stop_loss_pct(adapter)?,
        }),
        StrategyKind::MonteCarlo => {
            let params = read_monte_carlo_params(adapter)?;
            params.validate()?;
            StrategyVariant::MonteCarlo(MonteCarloStrategy::new(params))
        }
    })
}

/// Grid from `[sweep]`. Empty lists fall back to the single configured value.
pub fn build_sweep_grid(adapter: &dyn ConfigPort) -> Result<SweepGrid, BacktestError> {
    let base = build_backtest_config(adapter)?;

    let mut rsi_windows = read_window_list(adapter, "rsi_windows")?;
    if rsi_windows.is_empty() {
        rsi_windows.push(base.rsi_window);
    }
    let mut ma_windows = read_window_list(adapter, "ma_windows")?;
    if ma_windows.is_empty() {
        ma_windows.push(base.ma_window);
    }

    let kinds = adapter.get_list("sweep", "strategies");
    let strategies = if kinds.is_empty() {
        vec![build_strategy(adapter, None)?]
    } else {
        kinds
            .iter()
            .map(|raw| build_strategy_of_kind(adapter, raw.parse()?))
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(SweepGrid {
        rsi_windows,
        ma_windows,
        strategies,
        initial_capital: base.initial_capital,
    })
}

pub fn build_data_port(adapter: &dyn ConfigPort) -> CsvAdapter {
    let dir = adapter
        .get_string("backtest", "data_dir")
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
    CsvAdapter::new(PathBuf::from(dir))
}

pub fn resolve_symbol(
    symbol_override: Option<&str>,
    adapter: &dyn ConfigPort,
) -> Result<String, BacktestError> {
    symbol_override
        .map(str::to_string)
        .or_else(|| adapter.get_string("backtest", "symbol"))
        .ok_or_else(|| BacktestError::ConfigMissing {
            section: "backtest".to_string(),
            key: "symbol".to_string(),
        })
}

fn fetch_configured_bars(
    data_port: &dyn DataPort,
    adapter: &dyn ConfigPort,
    symbol: &str,
) -> Result<Vec<Bar>, BacktestError> {
    let start = read_timestamp(adapter, "backtest", "start")?;
    let end = read_timestamp(adapter, "backtest", "end")?;
    let bars = data_port.fetch_bars(symbol, start, end)?;
    info!(symbol, bars = bars.len(), "fetched bars");
    Ok(bars)
}

fn run_backtest(
    config_path: &Path,
    symbol_override: Option<&str>,
    kind_override: Option<StrategyKind>,
    output_path: Option<&Path>,
    format: ReportFormat,
) -> Result<(), BacktestError> {
    let adapter = load_config(config_path)?;
    if symbol_override.is_none() {
        validate_backtest_config(&adapter)?;
    }
    if kind_override.is_none() {
        validate_strategy_config(&adapter)?;
    }

    let bt_config = build_backtest_config(&adapter)?;
    let strategy = build_strategy(&adapter, kind_override)?;
    let symbol = resolve_symbol(symbol_override, &adapter)?;
    let data_port = build_data_port(&adapter);

    run_backtest_pipeline(
        &data_port,
        &adapter,
        &symbol,
        &strategy,
        &bt_config,
        output_path,
        format,
    )
    .map(|_| ())
}

/// Fetch, simulate, print the console summary and optionally write a report.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    adapter: &dyn ConfigPort,
    symbol: &str,
    strategy: &StrategyVariant,
    bt_config: &BacktestConfig,
    output_path: Option<&Path>,
    format: ReportFormat,
) -> Result<BacktestResult, BacktestError> {
    let bars = fetch_configured_bars(data_port, adapter, symbol)?;

    eprintln!(
        "Running {} on {}: {} bars, RSI({}) / SMA({})",
        strategy.name(),
        symbol,
        bars.len(),
        bt_config.rsi_window,
        bt_config.ma_window,
    );

    let result = backtest_engine::run_backtest(&bars, bt_config, strategy)?;
    print_summary(&result);

    if let Some(path) = output_path {
        let writer: Box<dyn ReportPort> = match format {
            ReportFormat::Json => Box::new(JsonReportAdapter::new()),
            ReportFormat::Csv => Box::new(CsvLedgerAdapter::new()),
        };
        writer.write(&result, path)?;
        eprintln!("\nReport written to: {}", path.display());
    }

    Ok(result)
}

fn print_summary(result: &BacktestResult) {
    let stats = TradeStats::compute(&result.trades, &result.equity_curve);

    eprintln!("\n=== Trades ===");
    for trade in result.trades.iter() {
        match (trade.profit, trade.exit_reason) {
            (Some(profit), Some(reason)) => eprintln!(
                "  {}  {:<4} {:>12.4} x {:<12.6} {:+.2} ({})",
                trade.timestamp, trade.action, trade.price, trade.quantity, profit, reason
            ),
            _ => eprintln!(
                "  {}  {:<4} {:>12.4} x {:<12.6}",
                trade.timestamp, trade.action, trade.price, trade.quantity
            ),
        }
    }

    eprintln!("\n=== Results ===");
    eprintln!("Initial Capital:  {:.2}", result.initial_capital);
    eprintln!("Final Value:      {:.2}", result.final_value);
    eprintln!(
        "Total Return:     {:+.2} ({:+.2}%)",
        result.total_return, result.total_return_pct
    );
    eprintln!("Still Holding:    {}", result.still_holding);
    eprintln!("Round Trips:      {}", stats.round_trips);
    eprintln!("Win Rate:         {:.1}%", stats.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", stats.profit_factor);
    eprintln!("Max Drawdown:     -{:.2}%", stats.max_drawdown * 100.0);
}

fn run_sweep_command(
    config_path: &Path,
    symbol_override: Option<&str>,
    top: usize,
) -> Result<(), BacktestError> {
    let adapter = load_config(config_path)?;
    validate_sweep_config(&adapter)?;

    let grid = build_sweep_grid(&adapter)?;
    let symbol = resolve_symbol(symbol_override, &adapter)?;
    let parallel = adapter.get_bool("sweep", "parallel", true);
    let bars = fetch_configured_bars(&build_data_port(&adapter), &adapter, &symbol)?;

    eprintln!(
        "Sweeping {} combinations on {} ({} bars)",
        grid.size(),
        symbol,
        bars.len()
    );

    let outcomes = run_sweep(&bars, &grid, parallel);

    for outcome in outcomes.iter().filter(|o| o.result.is_err()) {
        if let Err(e) = &outcome.result {
            eprintln!(
                "  skipped {} RSI({}) / SMA({}): {}",
                outcome.strategy, outcome.rsi_window, outcome.ma_window, e
            );
        }
    }

    let ranked = rank_by_return(&outcomes);
    if ranked.is_empty() {
        // every cell failed; surface the first error's exit code
        return match outcomes.into_iter().find_map(|o| o.result.err()) {
            Some(e) => Err(e),
            None => Ok(()),
        };
    }

    eprintln!("\n=== Top {} ===", top.min(ranked.len()));
    eprintln!(
        "  {:<12} {:>4} {:>4} {:>8} {:>12} {:>9}",
        "strategy", "rsi", "ma", "trades", "return", "return %"
    );
    for outcome in ranked.iter().take(top) {
        if let Ok(r) = &outcome.result {
            eprintln!(
                "  {:<12} {:>4} {:>4} {:>8} {:>+12.2} {:>+8.2}%",
                outcome.strategy,
                outcome.rsi_window,
                outcome.ma_window,
                r.trades.len(),
                r.total_return,
                r.total_return_pct
            );
        }
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), BacktestError> {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = load_config(config_path)?;

    validate_backtest_config(&adapter)?;
    validate_strategy_config(&adapter)?;
    validate_sweep_config(&adapter)?;

    let bt_config = build_backtest_config(&adapter)?;
    let strategy = build_strategy(&adapter, None)?;

    eprintln!("\nBacktest:");
    eprintln!("  symbol:          {}", resolve_symbol(None, &adapter)?);
    eprintln!("  initial capital: {:.2}", bt_config.initial_capital);
    eprintln!(
        "  indicators:      RSI({}) / SMA({}), warm-up {} bars",
        bt_config.rsi_window,
        bt_config.ma_window,
        bt_config.warmup()
    );
    eprintln!("  minimum bars:    {}", bt_config.minimum_bars());
    eprintln!("  strategy:        {}", strategy.name());

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_info(config_path: &Path, symbol: Option<&str>) -> Result<(), BacktestError> {
    let adapter = load_config(config_path)?;
    let data_port = build_data_port(&adapter);

    let symbols = match symbol {
        Some(s) => vec![s.to_string()],
        None => data_port.list_symbols()?,
    };

    if symbols.is_empty() {
        eprintln!("No symbols found");
        return Ok(());
    }

    for s in &symbols {
        match data_port.get_data_range(s)? {
            Some((first, last, count)) => {
                println!("{}: {} bars, {} to {}", s, count, first, last);
            }
            None => {
                eprintln!("{}: no data found", s);
            }
        }
    }
    Ok(())
}
