// tests/fetcher_integration.rs

use mockito::{mock, Matcher};
use sector_comps::config::{Config, FetchConfig, SectorUniverse, Variant};
use sector_comps::models::GroupOutcome;
use sector_comps::services::fetcher::{QuotePageFetcher, SnapshotSource};
use sector_comps::services::pipeline;
use std::error::Error;
use std::time::Duration;

fn page(ev: &str, growth: &str, margin: &str) -> String {
    format!(
        r#"<html><body>
        <table class="snapshot-table2"><tbody>
          <tr><td>Market Cap</td><td><b>120.5B</b></td><td>EV/Sales</td><td><b>{}</b></td></tr>
          <tr><td>Sales Q/Q</td><td><b>{}</b></td><td>Oper. Margin</td><td><b>{}</b></td></tr>
          <tr><td>Profit Margin</td><td><b>-</b></td><td>Beta</td><td><b>1.12</b></td></tr>
        </tbody></table>
        </body></html>"#,
        ev, growth, margin
    )
}

fn fetch_config() -> FetchConfig {
    FetchConfig {
        url_template: format!("{}/quote.ashx?t={{ticker}}", mockito::server_url()),
        min_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
        cooldown: Duration::from_millis(10),
        ..FetchConfig::default()
    }
}

fn quote(symbol: &str) -> Matcher {
    Matcher::UrlEncoded("t".into(), symbol.into())
}

#[tokio::test]
async fn test_fetch_snapshot_parses_table() -> Result<(), Box<dyn Error>> {
    let _mock = mock("GET", "/quote.ashx")
        .match_query(quote("CRM"))
        .match_header("user-agent", Matcher::Regex("Mozilla".into()))
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page("7.85", "8.30%", "19.02%"))
        .create();

    let fetcher = QuotePageFetcher::new(fetch_config())?;
    let snapshot = fetcher.fetch_snapshot("CRM").await.ok_or("expected a snapshot")?;

    assert_eq!(snapshot.get("EV/Sales").map(String::as_str), Some("7.85"));
    assert_eq!(snapshot.get("Sales Q/Q").map(String::as_str), Some("8.30%"));
    assert_eq!(snapshot.get("Oper. Margin").map(String::as_str), Some("19.02%"));
    assert_eq!(snapshot.get("Profit Margin").map(String::as_str), Some("-"));
    assert_eq!(snapshot.len(), 6);
    Ok(())
}

#[tokio::test]
async fn test_rate_limit_is_retried_once() -> Result<(), Box<dyn Error>> {
    let throttled = mock("GET", "/quote.ashx")
        .match_query(quote("NOW"))
        .with_status(429)
        .expect(1)
        .create();
    let ok = mock("GET", "/quote.ashx")
        .match_query(quote("NOW"))
        .with_status(200)
        .with_body(page("12.40", "21.50%", "8.10%"))
        .expect(1)
        .create();

    let fetcher = QuotePageFetcher::new(fetch_config())?;
    let snapshot = fetcher.fetch_snapshot("NOW").await;

    throttled.assert();
    ok.assert();
    assert_eq!(
        snapshot.and_then(|s| s.get("EV/Sales").cloned()),
        Some("12.40".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn test_second_rate_limit_gives_up() -> Result<(), Box<dyn Error>> {
    let throttled = mock("GET", "/quote.ashx")
        .match_query(quote("WDAY"))
        .with_status(429)
        .expect(2)
        .create();

    let fetcher = QuotePageFetcher::new(fetch_config())?;
    assert!(fetcher.fetch_snapshot("WDAY").await.is_none());
    throttled.assert();
    Ok(())
}

#[tokio::test]
async fn test_other_status_is_no_data_without_retry() -> Result<(), Box<dyn Error>> {
    let missing = mock("GET", "/quote.ashx")
        .match_query(quote("TWOU"))
        .with_status(404)
        .expect(2)
        .create();

    let fetcher = QuotePageFetcher::new(fetch_config())?;
    assert!(fetcher.fetch_snapshot("TWOU").await.is_none());

    let err = fetcher.fetch_page("TWOU").await.unwrap_err();
    assert_eq!(err.kind(), "fetch");
    assert!(err.to_string().contains("HTTP 404"));
    missing.assert();
    Ok(())
}

#[tokio::test]
async fn test_page_without_snapshot_table_is_no_data() -> Result<(), Box<dyn Error>> {
    let _mock = mock("GET", "/quote.ashx")
        .match_query(quote("HUBS"))
        .with_status(200)
        .with_body("<html><body><h1>Access denied</h1></body></html>")
        .create();

    let fetcher = QuotePageFetcher::new(fetch_config())?;
    assert!(fetcher.fetch_snapshot("HUBS").await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_pipeline_over_http() -> Result<(), Box<dyn Error>> {
    let pages = [
        ("DDOG", "16.10", "25.60%", "2.10%"),
        ("SNOW", "14.20", "28.90%", "-38.50%"),
        ("NET", "22.30", "27.80%", "-9.40%"),
        ("MDB", "9.10", "19.50%", "-11.20%"),
        ("ESTC", "5.20", "16.70%", "-2.30%"),
    ];
    let _mocks: Vec<_> = pages
        .iter()
        .map(|(symbol, ev, growth, margin)| {
            mock("GET", "/quote.ashx")
                .match_query(quote(symbol))
                .with_status(200)
                .with_body(page(ev, growth, margin))
                .create()
        })
        .collect();
    let _gone = mock("GET", "/quote.ashx")
        .match_query(quote("CFLT"))
        .with_status(500)
        .create();

    let mut config = Config::for_variant(Variant::Sector);
    config.fetch = fetch_config();
    config.universe = vec![SectorUniverse::new(
        "SaaS",
        &["DDOG", "SNOW", "NET", "CFLT", "MDB", "ESTC"],
    )];
    config.output_dir = std::env::temp_dir().join(format!("sector_comps_http_{}", std::process::id()));
    config.focus_symbol = Some("NET".to_string());

    let summary = pipeline::run(&config, &QuotePageFetcher::new(config.fetch.clone())?).await?;

    assert_eq!(summary.requested, 6);
    assert_eq!(summary.fetched, 5);
    assert_eq!(summary.included, 5);
    assert_eq!(summary.outcomes.len(), 1);
    match &summary.outcomes[0] {
        GroupOutcome::Fitted { label, result, .. } => {
            assert_eq!(label, "SaaS");
            assert_eq!(result.fitted.len(), 5);
            assert!(result.r_squared <= 1.0);
        }
        other => panic!("expected SaaS to be fitted, got {:?}", other),
    }

    std::fs::remove_dir_all(&config.output_dir).ok();
    Ok(())
}
