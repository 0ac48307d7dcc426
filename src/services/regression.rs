// src/services/regression.rs
use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::error::AnalysisError;
use crate::models::{FittedRecord, RegressionResult, ResponseTransform, TickerRecord};

/// Intercept, growth and margin.
pub const PREDICTORS: usize = 3;
/// Smallest group that still leaves a residual degree of freedom.
pub const MIN_OBSERVATIONS: usize = PREDICTORS + 1;

/// Ordinary least squares of valuation on `[1, growth_pct, margin_pct]`.
///
/// In `Log` mode the response is `ln(valuation)` and R² is measured in log
/// space; predictions and residuals are always reported on the raw scale.
pub fn fit(
    group: &str,
    records: &[TickerRecord],
    transform: ResponseTransform,
) -> Result<RegressionResult, AnalysisError> {
    let n = records.len();
    if n == 0 {
        return Err(AnalysisError::EmptyDataset {
            group: group.to_string(),
        });
    }
    if n < MIN_OBSERVATIONS {
        return Err(AnalysisError::Underdetermined {
            group: group.to_string(),
            observations: n,
            required: MIN_OBSERVATIONS,
        });
    }

    let x = design_matrix(records);
    let y = DVector::from_iterator(n, records.iter().map(|r| response(r, transform)));
    if y.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::Solver(format!(
            "{}: response contains non-finite values",
            group
        )));
    }

    let beta = solve_least_squares(&x, &y)?;
    let linear = &x * &beta;
    let r_squared = r_squared(y.as_slice(), linear.as_slice());

    let fitted = records
        .iter()
        .zip(linear.iter())
        .map(|(record, lin)| {
            let predicted = match transform {
                ResponseTransform::Identity => *lin,
                ResponseTransform::Log => lin.exp(),
            };
            FittedRecord {
                record: record.clone(),
                predicted,
                residual: record.valuation - predicted,
            }
        })
        .collect();

    debug!("{}: fitted {} records, R² {:.4}", group, n, r_squared);

    Ok(RegressionResult {
        coefficients: [beta[0], beta[1], beta[2]],
        r_squared,
        transform,
        fitted,
    })
}

fn response(record: &TickerRecord, transform: ResponseTransform) -> f64 {
    match transform {
        ResponseTransform::Identity => record.valuation,
        ResponseTransform::Log => record.log_valuation.unwrap_or_else(|| record.valuation.ln()),
    }
}

pub fn design_matrix(records: &[TickerRecord]) -> DMatrix<f64> {
    DMatrix::from_fn(records.len(), PREDICTORS, |i, j| match j {
        0 => 1.0,
        1 => records[i].growth_pct,
        _ => records[i].margin_pct,
    })
}

/// Minimum-norm least-squares solution via SVD. Singular values below the
/// usual `eps * max(n, p) * σ_max` cutoff are treated as zero.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>, AnalysisError> {
    let (rows, cols) = x.shape();
    let svd = x.clone().svd(true, true);
    let cutoff = f64::EPSILON * rows.max(cols) as f64 * svd.singular_values.max();
    svd.solve(y, cutoff)
        .map_err(|e| AnalysisError::Solver(e.to_string()))
}

/// `1 - RSS / TSS` on the scale the model was fit in.
pub fn r_squared(actual: &[f64], fitted: &[f64]) -> f64 {
    let n = actual.len() as f64;
    let mean = actual.iter().sum::<f64>() / n;
    let rss: f64 = actual.iter().zip(fitted).map(|(a, f)| (a - f).powi(2)).sum();
    let tss: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    if rss == 0.0 {
        1.0
    } else if tss == 0.0 {
        0.0
    } else {
        1.0 - rss / tss
    }
}
