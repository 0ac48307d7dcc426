// src/services/normalizer.rs
use log::{debug, warn};

use crate::models::TickerRecord;

pub const LOWER_QUANTILE: f64 = 0.05;
pub const UPPER_QUANTILE: f64 = 0.95;

/// Quantile with linear interpolation between closest ranks.
/// Returns `None` for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Clips every valuation to `[lower, upper]`.
pub fn winsorize(records: &mut [TickerRecord], lower: f64, upper: f64) {
    for record in records.iter_mut() {
        record.valuation = record.valuation.clamp(lower, upper);
    }
}

/// Valuation quantile bounds for one group.
pub fn bounds(records: &[TickerRecord]) -> Option<(f64, f64)> {
    let values: Vec<f64> = records.iter().map(|r| r.valuation).collect();
    Some((
        percentile(&values, LOWER_QUANTILE)?,
        percentile(&values, UPPER_QUANTILE)?,
    ))
}

/// Winsorises a single group's valuations to its own 5th-95th percentile band
/// and fills in `log_valuation`.
///
/// Records with a non-positive valuation have no logarithm and are dropped
/// before the bounds are computed.
pub fn normalize(group: Vec<TickerRecord>) -> Vec<TickerRecord> {
    let (mut kept, dropped): (Vec<_>, Vec<_>) = group.into_iter().partition(|r| r.valuation > 0.0);
    for record in &dropped {
        warn!(
            "{}: non-positive EV/Sales {} cannot be log-transformed, dropping",
            record.symbol, record.valuation
        );
    }

    if let Some((lower, upper)) = bounds(&kept) {
        debug!("Clipping EV/Sales to [{:.3}, {:.3}]", lower, upper);
        winsorize(&mut kept, lower, upper);
    }
    for record in kept.iter_mut() {
        record.log_valuation = Some(record.valuation.ln());
    }
    kept
}
