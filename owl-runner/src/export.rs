//! Reporting and export: JSON and CSV artifact generation.
//!
//! A run directory holds:
//! - `manifest.json`: the full `BacktestResult` with schema version
//! - `trades.csv`: the trade log
//! - `snapshots.csv`: the per-day portfolio valuation
//!
//! The directory name and every file are derived from the result alone, so
//! the same config and data always produce byte-identical artifacts.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use owl_core::domain::{PortfolioSnapshot, TradeRecord};
use tracing::info;

use crate::runner::{BacktestResult, SCHEMA_VERSION};

/// Hex characters of the run id used in the directory name.
const RUN_ID_PREFIX_LEN: usize = 12;

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "symbol",
        "side",
        "price",
        "quantity",
        "value",
        "commission",
    ])?;
    for t in trades {
        wtr.write_record([
            &format_ts(t.timestamp),
            &t.symbol,
            &t.side.to_string(),
            &format!("{:.6}", t.price),
            &format!("{:.8}", t.quantity),
            &format!("{:.6}", t.value),
            &format!("{:.6}", t.commission),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn export_snapshots_csv(snapshots: &[PortfolioSnapshot]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "cash",
        "asset_quantity",
        "price",
        "asset_value",
        "total_value",
    ])?;
    for s in snapshots {
        wtr.write_record([
            &format_ts(s.timestamp),
            &format!("{:.6}", s.cash),
            &format!("{:.8}", s.asset_quantity),
            &format!("{:.6}", s.price),
            &format!("{:.6}", s.asset_value),
            &format!("{:.6}", s.total_value),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// `<symbol>_<run id prefix>`, with anything but ASCII alphanumerics in the
/// symbol replaced by `-` ("BTC/USDT" becomes "BTC-USDT").
pub fn run_dir_name(result: &BacktestResult) -> String {
    let symbol: String = result
        .symbol()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let prefix_len = RUN_ID_PREFIX_LEN.min(result.run_id.len());
    format!("{}_{}", symbol, &result.run_id[..prefix_len])
}

/// Save the full artifact set for a single backtest run under `output_dir`.
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(run_dir_name(result));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write(&run_dir.join("manifest.json"), &export_json(result)?)?;
    write(
        &run_dir.join("trades.csv"),
        &export_trades_csv(&result.run.trades)?,
    )?;
    write(
        &run_dir.join("snapshots.csv"),
        &export_snapshots_csv(&result.run.snapshots)?,
    )?;

    info!(dir = %run_dir.display(), "artifacts saved");
    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use owl_core::domain::OrderSide;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap()
    }

    #[test]
    fn trades_csv_has_header_and_rows() {
        let trades = vec![TradeRecord {
            timestamp: ts(),
            symbol: "BTC/USDT".into(),
            side: OrderSide::Buy,
            price: 100.0,
            quantity: 5.0,
            commission: 0.5,
            value: 500.0,
        }];
        let csv = export_trades_csv(&trades).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("timestamp,symbol,side,price,quantity,value,commission")
        );
        assert_eq!(
            lines.next(),
            Some("2024-01-05T08:00:00Z,BTC/USDT,BUY,100.000000,5.00000000,500.000000,0.500000")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn snapshots_csv_formats_values() {
        let snaps = vec![PortfolioSnapshot::revalue(ts(), 499.5, 5.0, 110.0)];
        let csv = export_snapshots_csv(&snaps).unwrap();
        assert!(csv.starts_with("timestamp,cash,asset_quantity,price,asset_value,total_value\n"));
        assert!(csv.contains("2024-01-05T08:00:00Z,499.500000,5.00000000,110.000000,550.000000,1049.500000"));
    }

    #[test]
    fn empty_trade_log_is_header_only() {
        let csv = export_trades_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
