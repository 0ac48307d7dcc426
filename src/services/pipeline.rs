// src/services/pipeline.rs
use anyhow::{Context, Result};
use chrono::Utc;
use log::{error, info, warn};
use std::fs;

use crate::config::Config;
use crate::models::{GroupOutcome, Grouping, RawSnapshot, RunSummary, TickerRecord};
use crate::services::chart::render_chart;
use crate::services::dataset::{build_dataset, partition};
use crate::services::fetcher::SnapshotSource;
use crate::services::normalizer::normalize;
use crate::services::regression::fit;
use crate::services::report::{
    bottom_residuals, chart_file_name, format_focus, format_ranking, format_summary, top_residuals,
    write_residuals_csv,
};

/// Fetches every configured ticker in order, one at a time.
pub async fn collect_snapshots<S: SnapshotSource>(config: &Config, source: &S) -> Vec<RawSnapshot> {
    let mut raw = Vec::with_capacity(config.ticker_count());
    for universe in &config.universe {
        println!("Scraping {}...", universe.sector.as_deref().unwrap_or("tickers"));
        for symbol in &universe.tickers {
            let fields = source.fetch_snapshot(symbol).await;
            raw.push(RawSnapshot {
                symbol: symbol.clone(),
                sector: universe.sector.clone(),
                fields,
            });
        }
    }
    raw
}

/// Runs the whole analysis: fetch, build, normalise, fit and report.
pub async fn run<S: SnapshotSource>(config: &Config, source: &S) -> Result<RunSummary> {
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating output directory {}", config.output_dir.display()))?;

    println!("Comps run started {}", Utc::now().format("%Y-%m-%d %H:%M UTC"));
    let raw = collect_snapshots(config, source).await;
    let mut summary = RunSummary {
        requested: raw.len(),
        fetched: raw.iter().filter(|r| r.fields.is_some()).count(),
        ..RunSummary::default()
    };
    info!("Fetched {} of {} snapshots", summary.fetched, summary.requested);

    let records = build_dataset(&raw);
    summary.included = records.len();
    println!("\nTotal tickers scraped: {}", records.len());

    let sector_order: Vec<String> = config.universe.iter().filter_map(|u| u.sector.clone()).collect();
    for (label, group) in partition(records, config.grouping, &sector_order, &config.pooled_label) {
        let outcome = analyze_group(config, label, group);
        if let GroupOutcome::Fitted { result, .. } = &outcome {
            summary.combined.extend(result.fitted.iter().cloned());
        }
        summary.outcomes.push(outcome);
    }

    report_combined(config, &summary);
    Ok(summary)
}

/// Normalises, fits and reports a single group. All console output and the
/// chart for the group are produced before returning.
pub fn analyze_group(config: &Config, label: String, group: Vec<TickerRecord>) -> GroupOutcome {
    let group = if config.winsorize { normalize(group) } else { group };

    if group.is_empty() {
        warn!("{}: no valid tickers, skipping regression", label);
        println!("\n=== {} ===\nNo valid tickers, nothing to fit", label);
        return GroupOutcome::Empty { label };
    }

    let result = match fit(&label, &group, config.transform) {
        Ok(result) => result,
        Err(e) => {
            error!("{} ({})", e, e.kind());
            println!("\n=== {} ===\nRegression skipped: {}", label, e);
            return GroupOutcome::Failed { label, error: e };
        }
    };

    println!("\n{}", format_summary(&label, &result));

    let path = config.output_dir.join(chart_file_name(&config.chart_prefix, &label));
    let chart = match render_chart(&path, &label, &result) {
        Ok(()) => {
            println!("Chart saved: {}", path.display());
            Some(path)
        }
        Err(e) => {
            error!("{}: {} ({})", label, e, e.kind());
            None
        }
    };

    GroupOutcome::Fitted { label, result, chart }
}

fn report_combined(config: &Config, summary: &RunSummary) {
    if summary.combined.is_empty() {
        println!("\nNo group could be fitted; no rankings to report");
        return;
    }

    let scope = match config.grouping {
        Grouping::BySector => " ACROSS ALL SECTORS",
        Grouping::Pooled => "",
    };
    let n = config.top_n;
    println!(
        "\n{}",
        format_ranking(&format!("TOP {} RICHEST{}", n, scope), &top_residuals(&summary.combined, n))
    );
    println!(
        "{}",
        format_ranking(&format!("TOP {} CHEAPEST{}", n, scope), &bottom_residuals(&summary.combined, n))
    );

    if let Some(symbol) = &config.focus_symbol {
        match format_focus(symbol, &summary.combined) {
            Some(text) => println!("{}", text),
            None => info!("{} is not in any fitted group", symbol),
        }
    }

    if let Err(e) = write_residuals_csv(&config.output_dir, &config.chart_prefix, &summary.combined) {
        warn!("Could not write residuals CSV: {:#}", e);
    }
}
