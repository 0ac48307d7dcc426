// src/services/report.rs
use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::models::{FittedRecord, RegressionResult};

pub fn format_summary(label: &str, result: &RegressionResult) -> String {
    let [intercept, growth, margin] = result.coefficients;
    format!(
        "=== {} ===\nR²: {:.3} | Intercept: {:.3} | Sales Q/Q: {:.3} | Oper. Margin: {:.3}\nTickers: {}",
        label,
        result.r_squared,
        intercept,
        growth,
        margin,
        result.fitted.len()
    )
}

fn by_residual_desc(rows: &[FittedRecord]) -> Vec<&FittedRecord> {
    let mut sorted: Vec<&FittedRecord> = rows.iter().filter(|r| !r.residual.is_nan()).collect();
    sorted.sort_by(|a, b| b.residual.total_cmp(&a.residual));
    sorted
}

/// The `n` most expensive names relative to the model, largest residual first.
pub fn top_residuals(rows: &[FittedRecord], n: usize) -> Vec<&FittedRecord> {
    let mut sorted = by_residual_desc(rows);
    sorted.truncate(n);
    sorted
}

/// The `n` cheapest names relative to the model, smallest residual first.
pub fn bottom_residuals(rows: &[FittedRecord], n: usize) -> Vec<&FittedRecord> {
    let mut sorted = by_residual_desc(rows);
    sorted.reverse();
    sorted.truncate(n);
    sorted
}

pub fn format_ranking(title: &str, rows: &[&FittedRecord]) -> String {
    let mut out = format!("=== {} ===\n", title);
    out.push_str(&format!(
        "{:<8} {:<20} {:>10} {:>10} {:>10}\n",
        "ticker", "sector", "ev_sales", "predicted", "residual"
    ));
    for row in rows {
        out.push_str(&format_row(row));
        out.push('\n');
    }
    out
}

fn format_row(row: &FittedRecord) -> String {
    format!(
        "{:<8} {:<20} {:>10.3} {:>10.3} {:>10.3}",
        row.record.symbol,
        row.record.sector.as_deref().unwrap_or("-"),
        row.record.valuation,
        row.predicted,
        row.residual
    )
}

/// Rows for one ticker, if it made it into any fitted group.
pub fn format_focus(symbol: &str, rows: &[FittedRecord]) -> Option<String> {
    let matches: Vec<&FittedRecord> = rows.iter().filter(|r| r.record.symbol == symbol).collect();
    if matches.is_empty() {
        return None;
    }
    Some(format_ranking(symbol, &matches))
}

/// `{prefix}_{label}.svg` with the label lower-cased and each space turned
/// into an underscore.
pub fn chart_file_name(prefix: &str, label: &str) -> String {
    format!("{}_{}.svg", prefix, slug(label))
}

pub fn slug(label: &str) -> String {
    label.replace(' ', "_").to_lowercase()
}

#[derive(Serialize)]
struct ResidualRow<'a> {
    ticker: &'a str,
    sector: &'a str,
    ev_sales: f64,
    sales_qoq: f64,
    oper_margin: f64,
    profit_margin: f64,
    predicted: f64,
    residual: f64,
}

/// Writes every fitted row to `{prefix}_residuals.csv` in `dir`.
pub fn write_residuals_csv(dir: &Path, prefix: &str, rows: &[FittedRecord]) -> Result<PathBuf> {
    let path = dir.join(format!("{}_residuals.csv", prefix));
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer.serialize(ResidualRow {
            ticker: &row.record.symbol,
            sector: row.record.sector.as_deref().unwrap_or(""),
            ev_sales: row.record.valuation,
            sales_qoq: row.record.growth_pct,
            oper_margin: row.record.margin_pct,
            profit_margin: row.record.profit_margin_pct,
            predicted: row.predicted,
            residual: row.residual,
        })?;
    }
    writer.flush()?;
    info!("Wrote {} residual rows to {}", rows.len(), path.display());
    Ok(path)
}
