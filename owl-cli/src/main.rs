//! Owl CLI: breakout backtests from a TOML config.
//!
//! Commands:
//! - `run`: load bars, execute the backtest, print the report, save artifacts
//! - `check-config`: validate a config file and print its fingerprint

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use owl_runner::{run_single_backtest, save_artifacts, BacktestConfig, BacktestResult};

#[derive(Parser)]
#[command(name = "owl", about = "Owl: long-only breakout backtester")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Skip writing artifacts.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Validate a TOML config file without running it.
    CheckConfig {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            no_save,
        } => run_backtest_cmd(&config, &output_dir, no_save),
        Commands::CheckConfig { config } => check_config_cmd(&config),
    }
}

/// `RUST_LOG` wins over the config's `[logging] level`.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn load_config(path: &Path) -> Result<BacktestConfig> {
    BacktestConfig::from_file(path)
        .with_context(|| format!("failed to load config {}", path.display()))
}

fn run_backtest_cmd(config_path: &Path, output_dir: &Path, no_save: bool) -> Result<()> {
    let config = load_config(config_path)?;
    init_tracing(&config.logging.level);

    let result = run_single_backtest(&config)?;
    print_summary(&result);

    if !no_save {
        let run_dir = save_artifacts(&result, output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn check_config_cmd(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    init_tracing(&config.logging.level);

    let params = config.validate()?;
    println!("Config OK: {}", config_path.display());
    println!("  Symbol:        {}", params.symbol);
    println!("  Period:        {} to {}", params.start_date, params.end_date);
    println!("  Lookback:      {} bars", params.lookback_period);
    println!(
        "  Buy window:    {} (UTC{:+})",
        params.buy_window_end.format("%H:%M"),
        params.local_offset.local_minus_utc() / 3600
    );
    println!("  Holding:       {}h", params.holding_period.num_hours());
    println!("  Daily bars:    {}", config.data.daily_csv.display());
    println!("  Hourly bars:   {}", config.data.hourly_csv.display());
    println!("  Fingerprint:   {}", config.fingerprint()?);
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let r = &result.report;
    let run = &result.run;

    println!();
    println!("=== Backtest Results ===");
    println!("Symbol:           {}", result.symbol());
    println!(
        "Period:           {} to {}",
        result.config.backtest.start_date, result.config.backtest.end_date
    );
    println!("Bars:             {}", run.bar_count);
    println!("Signals:          {}", run.signal_count);
    println!();
    println!("Initial Capital:  {:.2}", r.initial_capital);
    println!("Final Value:      {:.2}", r.final_value);
    println!("Total Return:     {:.2}%", r.total_return_pct);
    println!("Max Drawdown:     {:.2}%", r.max_drawdown_pct);
    match r.sharpe_ratio {
        Some(s) => println!("Sharpe Ratio:     {s:.3}"),
        None => println!("Sharpe Ratio:     N/A"),
    }
    println!(
        "Trades:           {} ({} buy / {} sell)",
        r.total_trades, r.buy_trades, r.sell_trades
    );
    println!("Commission Paid:  {:.4}", r.total_commission);

    if let Some(pos) = &run.open_position {
        println!(
            "Open Position:    {:.8} @ {:.4} since {}",
            pos.quantity, pos.entry_price, pos.entry_timestamp
        );
    }
    if run.unresolved_sell_days > 0 {
        println!("Deferred Exits:   {} day(s)", run.unresolved_sell_days);
    }
    if !run.data_quality_warnings.is_empty() {
        println!();
        println!("Data quality warnings ({}):", run.data_quality_warnings.len());
        for w in &run.data_quality_warnings {
            println!("  - {w}");
        }
    }
    println!();
    println!("Run ID:           {}", result.run_id);
}
