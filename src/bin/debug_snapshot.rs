// src/bin/debug_snapshot.rs
// Run with: cargo run --bin debug_snapshot -- SPOT

use dotenv::dotenv;
use log::{error, info};
use std::env;

use sector_comps::config::Config;
use sector_comps::services::dataset::{
    build_record, FIELD_EV_SALES, FIELD_OPER_MARGIN, FIELD_PROFIT_MARGIN, FIELD_SALES_QOQ,
};
use sector_comps::services::fetcher::{parse_snapshot_table, QuotePageFetcher};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let symbol = env::args().nth(1).unwrap_or_else(|| "SPOT".to_string()).to_uppercase();
    let config = Config::from_env()?;
    let fetcher = QuotePageFetcher::new(config.fetch.clone())?;

    info!("Debugging snapshot table for {} at {}", symbol, fetcher.quote_url(&symbol));

    let body = match fetcher.fetch_page(&symbol).await {
        Ok(body) => body,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    let snapshot = parse_snapshot_table(&body);
    if snapshot.is_empty() {
        error!("No snapshot cells matched; the page layout may have changed");
        let sample = match body.char_indices().nth(5000) {
            Some((end, _)) => &body[..end],
            None => &body[..],
        };
        info!("HTML sample (first 5000 chars):");
        println!("{}", sample);
        return Ok(());
    }

    let mut keys: Vec<&String> = snapshot.keys().collect();
    keys.sort();
    for key in keys {
        println!("{:<20} {}", key, snapshot[key]);
    }

    println!();
    for field in [FIELD_EV_SALES, FIELD_SALES_QOQ, FIELD_OPER_MARGIN, FIELD_PROFIT_MARGIN] {
        println!("{:<20} {:?}", field, snapshot.get(field));
    }
    match build_record(&symbol, None, &snapshot) {
        Ok(record) => println!("\nUsable record: {:?}", record),
        Err(e) => println!("\nWould be excluded ({}): {}", e.kind(), e),
    }

    Ok(())
}
