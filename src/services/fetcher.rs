// src/services/fetcher.rs
use log::{info, warn};
use rand::Rng;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use std::time::Duration;

use crate::config::FetchConfig;
use crate::error::AnalysisError;
use crate::models::Snapshot;

const SNAPSHOT_CELLS: &str = "table.snapshot-table2 td";

/// Anything that can produce a quote snapshot for a ticker.
///
/// Returning `None` means "no data for this ticker"; the batch carries on.
#[allow(async_fn_in_trait)]
pub trait SnapshotSource {
    async fn fetch_snapshot(&self, symbol: &str) -> Option<Snapshot>;
}

/// Scrapes the snapshot table off a quote page, one polite request at a time.
pub struct QuotePageFetcher {
    client: Client,
    config: FetchConfig,
}

impl QuotePageFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(QuotePageFetcher { client, config })
    }

    pub fn quote_url(&self, symbol: &str) -> String {
        self.config.url_template.replace("{ticker}", symbol)
    }

    fn jitter(&self) -> Duration {
        let min = self.config.min_delay.as_secs_f64();
        let max = self.config.max_delay.as_secs_f64();
        if max <= min {
            return self.config.min_delay;
        }
        Duration::from_secs_f64(rand::thread_rng().gen_range(min..=max))
    }

    async fn get(&self, url: &str) -> Result<(StatusCode, String), reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    /// Fetches one page: delay, request, and a single retry after a cooldown
    /// if the site answers 429.
    pub async fn fetch_page(&self, symbol: &str) -> Result<String, AnalysisError> {
        let url = self.quote_url(symbol);
        tokio::time::sleep(self.jitter()).await;

        let (mut status, mut body) = self
            .get(&url)
            .await
            .map_err(|e| AnalysisError::fetch(symbol, e.to_string()))?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(
                "{}: rate limited, cooling down for {:?} before retrying",
                symbol, self.config.cooldown
            );
            tokio::time::sleep(self.config.cooldown).await;
            (status, body) = self
                .get(&url)
                .await
                .map_err(|e| AnalysisError::fetch(symbol, e.to_string()))?;
        }

        if status != StatusCode::OK {
            return Err(AnalysisError::fetch(symbol, format!("HTTP {}", status.as_u16())));
        }
        Ok(body)
    }
}

impl SnapshotSource for QuotePageFetcher {
    async fn fetch_snapshot(&self, symbol: &str) -> Option<Snapshot> {
        match self.fetch_page(symbol).await {
            Ok(body) => {
                let snapshot = parse_snapshot_table(&body);
                if snapshot.is_empty() {
                    warn!("{}: page had no snapshot table", symbol);
                    return None;
                }
                info!("{}: {} snapshot fields", symbol, snapshot.len());
                Some(snapshot)
            }
            Err(e) => {
                warn!("{} ({})", e, e.kind());
                None
            }
        }
    }
}

/// Pairs up the table cells as label, value, label, value, ...
pub fn parse_snapshot_table(html: &str) -> Snapshot {
    let document = Html::parse_document(html);
    let selector = match Selector::parse(SNAPSHOT_CELLS) {
        Ok(selector) => selector,
        Err(_) => return Snapshot::new(),
    };

    let cells: Vec<String> = document
        .select(&selector)
        .map(|td| td.text().collect::<String>().trim().to_string())
        .collect();

    cells
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect()
}
