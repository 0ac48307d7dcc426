// src/services/dataset.rs
use log::{debug, info};

use crate::error::AnalysisError;
use crate::models::{Grouping, RawSnapshot, Snapshot, TickerRecord};
use crate::services::parser::{parse_percentage, parse_ratio, MISSING_PLACEHOLDER};

pub const FIELD_EV_SALES: &str = "EV/Sales";
pub const FIELD_SALES_QOQ: &str = "Sales Q/Q";
pub const FIELD_OPER_MARGIN: &str = "Oper. Margin";
pub const FIELD_PROFIT_MARGIN: &str = "Profit Margin";

/// Group label for records without a sector in a sector-grouped run.
pub const UNCLASSIFIED: &str = "Unclassified";

/// Turns raw snapshots into model-ready records, keeping input order.
pub fn build_dataset(raw: &[RawSnapshot]) -> Vec<TickerRecord> {
    let mut records = Vec::with_capacity(raw.len());

    for snap in raw {
        let fields = match &snap.fields {
            Some(fields) => fields,
            None => {
                debug!("{}: no snapshot, skipping", snap.symbol);
                continue;
            }
        };

        match build_record(&snap.symbol, snap.sector.as_deref(), fields) {
            Ok(record) => records.push(record),
            Err(e) => debug!("{}: excluded ({}): {}", snap.symbol, e.kind(), e),
        }
    }

    info!("Dataset built: {} of {} snapshots usable", records.len(), raw.len());
    records
}

fn field<'a>(fields: &'a Snapshot, name: &str) -> &'a str {
    fields.get(name).map(String::as_str).unwrap_or(MISSING_PLACEHOLDER)
}

fn required_percentage(fields: &Snapshot, name: &str) -> Result<f64, AnalysisError> {
    let raw = field(fields, name);
    let value = parse_percentage(raw);
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AnalysisError::parse(name, raw))
    }
}

pub fn build_record(
    symbol: &str,
    sector: Option<&str>,
    fields: &Snapshot,
) -> Result<TickerRecord, AnalysisError> {
    let valuation = parse_ratio(FIELD_EV_SALES, field(fields, FIELD_EV_SALES))?;
    let growth_pct = required_percentage(fields, FIELD_SALES_QOQ)?;
    let margin_pct = required_percentage(fields, FIELD_OPER_MARGIN)?;
    let profit_margin_pct = parse_percentage(field(fields, FIELD_PROFIT_MARGIN));

    Ok(TickerRecord {
        symbol: symbol.to_string(),
        sector: sector.map(str::to_string),
        valuation,
        growth_pct,
        margin_pct,
        profit_margin_pct,
        log_valuation: None,
    })
}

/// Splits records into labelled groups.
///
/// Sector groups follow `sector_order` first (so sectors with no usable
/// records still appear, empty), then any other labels in first-seen order.
pub fn partition(
    records: Vec<TickerRecord>,
    grouping: Grouping,
    sector_order: &[String],
    pooled_label: &str,
) -> Vec<(String, Vec<TickerRecord>)> {
    match grouping {
        Grouping::Pooled => vec![(pooled_label.to_string(), records)],
        Grouping::BySector => {
            let mut groups: Vec<(String, Vec<TickerRecord>)> = Vec::new();
            for sector in sector_order {
                if !groups.iter().any(|(label, _)| label == sector) {
                    groups.push((sector.clone(), Vec::new()));
                }
            }
            for record in records {
                let label = record.sector.clone().unwrap_or_else(|| UNCLASSIFIED.to_string());
                match groups.iter_mut().find(|(l, _)| *l == label) {
                    Some((_, members)) => members.push(record),
                    None => groups.push((label, vec![record])),
                }
            }
            groups
        }
    }
}
