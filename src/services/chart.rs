// src/services/chart.rs
use log::info;
use plotters::prelude::*;
use std::path::Path;

use crate::error::AnalysisError;
use crate::models::RegressionResult;
use crate::BoxError;

/// 11x7 inches at 150 dpi.
pub const CHART_SIZE: (u32, u32) = (1650, 1050);
const CURVE_POINTS: usize = 100;

/// Fitted valuation across the observed growth range, margin held at its
/// group mean.
pub fn fitted_curve(result: &RegressionResult) -> Vec<(f64, f64)> {
    let n = result.fitted.len();
    if n == 0 {
        return Vec::new();
    }
    let (x_min, x_max) = growth_range(result);
    let mean_margin = result.fitted.iter().map(|f| f.record.margin_pct).sum::<f64>() / n as f64;

    (0..CURVE_POINTS)
        .map(|i| {
            let x = x_min + (x_max - x_min) * i as f64 / (CURVE_POINTS - 1) as f64;
            (x, result.predict(x, mean_margin))
        })
        .collect()
}

fn growth_range(result: &RegressionResult) -> (f64, f64) {
    result
        .fitted
        .iter()
        .map(|f| f.record.growth_pct)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)))
}

fn padded(lo: f64, hi: f64) -> (f64, f64) {
    let span = hi - lo;
    if span <= 0.0 || !span.is_finite() {
        (lo - 1.0, hi + 1.0)
    } else {
        (lo - span * 0.05, hi + span * 0.05)
    }
}

/// Scatter of growth vs EV/Sales, one labelled point per ticker, with the
/// regression curve overlaid. Overwrites `path`.
pub fn render_chart(path: &Path, label: &str, result: &RegressionResult) -> Result<(), AnalysisError> {
    draw(path, label, result).map_err(|e| AnalysisError::Chart(e.to_string()))?;
    info!("{}: chart written to {}", label, path.display());
    Ok(())
}

fn draw(path: &Path, label: &str, result: &RegressionResult) -> Result<(), BoxError> {
    if result.fitted.is_empty() {
        return Err("no points to plot".into());
    }

    let curve = fitted_curve(result);
    let points: Vec<(f64, f64, &str)> = result
        .fitted
        .iter()
        .map(|f| (f.record.growth_pct, f.record.valuation, f.record.symbol.as_str()))
        .collect();

    let (g_min, g_max) = growth_range(result);
    let (x_lo, x_hi) = padded(g_min, g_max);
    let (y_lo, y_hi) = points
        .iter()
        .map(|(_, y, _)| *y)
        .chain(curve.iter().map(|(_, y)| *y).filter(|y| y.is_finite()))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));
    let (y_lo, y_hi) = padded(y_lo, y_hi);

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{}: EV/Sales vs Revenue Growth", label), ("sans-serif", 28.0))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("Sales Q/Q (%)")
        .y_desc("EV/Sales")
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|(x, y, _)| Circle::new((*x, *y), 5, BLUE.mix(0.6).filled())),
    )?;
    chart.draw_series(
        points
            .iter()
            .map(|(x, y, symbol)| Text::new(symbol.to_string(), (*x, *y), ("sans-serif", 12.0))),
    )?;

    chart
        .draw_series(LineSeries::new(curve, RED.stroke_width(2)))?
        .label(format!("Regression (R²={:.2})", result.r_squared))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FittedRecord, ResponseTransform, TickerRecord};

    fn result(transform: ResponseTransform) -> RegressionResult {
        let fitted = [(5.0, 10.0, 2.0), (15.0, 20.0, 3.0), (25.0, 30.0, 6.0)]
            .iter()
            .enumerate()
            .map(|(i, (g, m, v))| FittedRecord {
                record: TickerRecord {
                    symbol: format!("T{}", i),
                    sector: None,
                    valuation: *v,
                    growth_pct: *g,
                    margin_pct: *m,
                    profit_margin_pct: f64::NAN,
                    log_valuation: None,
                },
                predicted: *v,
                residual: 0.0,
            })
            .collect();
        RegressionResult {
            coefficients: [1.0, 0.1, 0.05],
            r_squared: 0.9,
            transform,
            fitted,
        }
    }

    #[test]
    fn test_fitted_curve_spans_growth_at_mean_margin() {
        let linear = result(ResponseTransform::Identity);
        let curve = fitted_curve(&linear);
        assert_eq!(curve.len(), CURVE_POINTS);
        assert_eq!(curve[0].0, 5.0);
        assert!((curve[CURVE_POINTS - 1].0 - 25.0).abs() < 1e-12);
        // mean margin is 20
        assert!((curve[0].1 - (1.0 + 0.5 + 1.0)).abs() < 1e-12);

        let log = result(ResponseTransform::Log);
        let curve = fitted_curve(&log);
        assert!((curve[0].1 - 2.5_f64.exp()).abs() < 1e-9);
    }

    #[test]
    fn test_render_chart_writes_svg() {
        let dir = std::env::temp_dir().join(format!("sector_comps_chart_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("chart.svg");

        render_chart(&path, "SaaS", &result(ResponseTransform::Log)).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
