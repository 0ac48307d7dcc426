use anyhow::{bail, Context, Result};
use dotenv::dotenv;
use log::info;

use sector_comps::config::Config;
use sector_comps::models::GroupOutcome;
use sector_comps::services::fetcher::QuotePageFetcher;
use sector_comps::services::pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();
    info!("Logger initialized. Starting comps run...");

    let config = Config::from_env().context("loading configuration")?;
    info!(
        "{} tickers across {} lists, charts to {}",
        config.ticker_count(),
        config.universe.len(),
        config.output_dir.display()
    );

    let fetcher = QuotePageFetcher::new(config.fetch.clone()).context("building HTTP client")?;
    let summary = pipeline::run(&config, &fetcher).await?;

    for outcome in &summary.outcomes {
        match outcome {
            GroupOutcome::Fitted { label, result, .. } => {
                info!("{}: fitted {} tickers, R² {:.3}", label, result.fitted.len(), result.r_squared)
            }
            GroupOutcome::Empty { label } => info!("{}: empty", label),
            GroupOutcome::Failed { label, error } => info!("{}: failed ({})", label, error.kind()),
        }
    }

    if summary.fitted_groups() == 0 {
        bail!(
            "no group could be fitted ({} of {} tickers fetched, {} usable)",
            summary.fetched,
            summary.requested,
            summary.included
        );
    }
    Ok(())
}
