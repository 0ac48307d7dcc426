// src/config.rs
use anyhow::{bail, Context, Result};
use log::{info, warn};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::{Grouping, ResponseTransform};

const DEFAULT_URL_TEMPLATE: &str = "https://finviz.com/quote.ashx?t={ticker}";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36";

/// A named list of tickers. `sector` is `None` for a flat, unclassified list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SectorUniverse {
    pub sector: Option<String>,
    pub tickers: Vec<String>,
}

impl SectorUniverse {
    pub fn new(sector: &str, tickers: &[&str]) -> Self {
        SectorUniverse {
            sector: Some(sector.to_string()),
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Per-sector groups, winsorised, log-linear fit.
    Sector,
    /// One pooled group, raw ratios, linear fit.
    Pooled,
}

impl std::str::FromStr for Variant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sector" | "sectors" => Ok(Variant::Sector),
            "pooled" | "pool" => Ok(Variant::Pooled),
            other => bail!("unknown variant '{}', expected 'sector' or 'pooled'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Quote page URL with a `{ticker}` placeholder.
    pub url_template: String,
    pub user_agent: String,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Wait after a 429 before the single retry.
    pub cooldown: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            min_delay: Duration::from_millis(1200),
            max_delay: Duration::from_millis(2000),
            cooldown: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub universe: Vec<SectorUniverse>,
    pub grouping: Grouping,
    pub transform: ResponseTransform,
    pub winsorize: bool,
    pub fetch: FetchConfig,
    pub output_dir: PathBuf,
    pub chart_prefix: String,
    pub top_n: usize,
    pub focus_symbol: Option<String>,
    /// Label of the single group in pooled runs.
    pub pooled_label: String,
}

impl Config {
    pub fn for_variant(variant: Variant) -> Self {
        let (grouping, transform, winsorize) = match variant {
            Variant::Sector => (Grouping::BySector, ResponseTransform::Log, true),
            Variant::Pooled => (Grouping::Pooled, ResponseTransform::Identity, false),
        };
        Config {
            universe: default_universe(),
            grouping,
            transform,
            winsorize,
            fetch: FetchConfig::default(),
            output_dir: PathBuf::from("."),
            chart_prefix: "spot_comps".to_string(),
            top_n: 5,
            focus_symbol: Some("SPOT".to_string()),
            pooled_label: "All Tickers".to_string(),
        }
    }

    /// Builds the configuration from `COMPS_*` environment variables on top of
    /// the compiled-in defaults.
    pub fn from_env() -> Result<Self> {
        let variant = match env::var("COMPS_VARIANT") {
            Ok(v) => v.parse::<Variant>()?,
            Err(_) => Variant::Sector,
        };
        info!("Using {:?} variant", variant);
        let mut config = Config::for_variant(variant);

        if let Ok(path) = env::var("COMPS_UNIVERSE_FILE") {
            config.universe = load_universe(&path)?;
            info!("Loaded {} ticker lists from {}", config.universe.len(), path);
        }
        if let Ok(dir) = env::var("COMPS_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = env::var("COMPS_CHART_PREFIX") {
            config.chart_prefix = prefix;
        }
        if let Ok(n) = env::var("COMPS_TOP_N") {
            config.top_n = n.parse().context("COMPS_TOP_N must be a whole number")?;
        }
        if let Ok(symbol) = env::var("COMPS_FOCUS") {
            let symbol = symbol.trim().to_uppercase();
            config.focus_symbol = if symbol.is_empty() { None } else { Some(symbol) };
        }
        if let Ok(template) = env::var("COMPS_URL_TEMPLATE") {
            if !template.contains("{ticker}") {
                bail!("COMPS_URL_TEMPLATE must contain a {{ticker}} placeholder");
            }
            config.fetch.url_template = template;
        }
        if let Ok(agent) = env::var("COMPS_USER_AGENT") {
            config.fetch.user_agent = agent;
        }
        if let Some(d) = duration_var("COMPS_MIN_DELAY_SECS")? {
            config.fetch.min_delay = d;
        }
        if let Some(d) = duration_var("COMPS_MAX_DELAY_SECS")? {
            config.fetch.max_delay = d;
        }
        if let Some(d) = duration_var("COMPS_COOLDOWN_SECS")? {
            config.fetch.cooldown = d;
        }
        if config.fetch.max_delay < config.fetch.min_delay {
            warn!("Max delay below min delay, using min delay for both");
            config.fetch.max_delay = config.fetch.min_delay;
        }

        Ok(config)
    }

    pub fn ticker_count(&self) -> usize {
        self.universe.iter().map(|u| u.tickers.len()).sum()
    }
}

fn duration_var(name: &str) -> Result<Option<Duration>> {
    match env::var(name) {
        Ok(raw) => {
            let secs: f64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds", name))?;
            if !secs.is_finite() || secs < 0.0 {
                bail!("{} must be a non-negative number of seconds", name);
            }
            let duration = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("{} is out of range", name))?;
            Ok(Some(duration))
        }
        Err(_) => Ok(None),
    }
}

/// Reads a JSON array of `{"sector": ..., "tickers": [...]}` objects.
pub fn load_universe(path: &str) -> Result<Vec<SectorUniverse>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading universe file {}", path))?;
    parse_universe(&text).with_context(|| format!("parsing universe file {}", path))
}

pub fn parse_universe(text: &str) -> Result<Vec<SectorUniverse>> {
    let universe: Vec<SectorUniverse> = serde_json::from_str(text)?;
    if universe.iter().all(|u| u.tickers.is_empty()) {
        bail!("universe contains no tickers");
    }
    Ok(universe)
}

pub fn default_universe() -> Vec<SectorUniverse> {
    vec![
        SectorUniverse::new(
            "SaaS",
            &[
                "CRM", "NOW", "WDAY", "HUBS", "DDOG", "SNOW", "NET", "MDB", "ESTC", "CFLT", "CRWD",
                "ZS", "OKTA", "DOCU", "MNDY", "ASAN", "TEAM", "GTLB", "ZM", "RNG", "FIVN", "TWLO",
                "DBX", "BOX",
            ],
        ),
        SectorUniverse::new(
            "Consumer Internet",
            &[
                "SPOT", "NFLX", "DIS", "WBD", "PARA", "CMCSA", "RDDT", "SNAP", "PINS", "MTCH",
                "BMBL", "GRND", "RBLX", "DUOL", "COUR", "UDMY", "CHGG", "TWOU", "YELP", "IAC",
                "ANGI", "VMEO", "ROKU", "KIND", "EB", "FVRR", "UPWK", "PTON",
            ],
        ),
        SectorUniverse::new(
            "Fintech",
            &[
                "SQ", "PYPL", "HOOD", "COIN", "SOFI", "AFRM", "TOST", "LSPD", "FOUR", "DKNG",
                "PENN", "FLUT", "ZIP",
            ],
        ),
        SectorUniverse::new(
            "E-commerce",
            &[
                "SHOP", "ETSY", "EBAY", "MELI", "CPNG", "SE", "TDUP", "REAL", "BIGC", "WIX", "GDDY",
                "OPEN", "COMP", "CSGP", "RDFN", "Z", "BKNG", "EXPE", "TRIP", "ABNB", "DASH", "UBER",
                "LYFT", "AMZN", "GOOGL", "META", "MSFT", "AAPL", "EA", "TTWO",
            ],
        ),
    ]
}
