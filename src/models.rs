// src/models.rs
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::AnalysisError;

/// Label -> value pairs scraped from a quote page's snapshot table.
pub type Snapshot = HashMap<String, String>;

/// One fetch attempt for a ticker. `fields` is `None` when the fetch failed.
#[derive(Debug, Clone)]
pub struct RawSnapshot {
    pub symbol: String,
    pub sector: Option<String>,
    pub fields: Option<Snapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickerRecord {
    pub symbol: String,
    pub sector: Option<String>,
    /// EV/Sales
    pub valuation: f64,
    /// Sales Q/Q, in percent
    pub growth_pct: f64,
    /// Operating margin, in percent
    pub margin_pct: f64,
    /// Informational only; NaN when the page had no value.
    pub profit_margin_pct: f64,
    pub log_valuation: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseTransform {
    Identity,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    BySector,
    Pooled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FittedRecord {
    pub record: TickerRecord,
    pub predicted: f64,
    pub residual: f64,
}

#[derive(Debug, Clone)]
pub struct RegressionResult {
    /// `[intercept, growth, margin]`
    pub coefficients: [f64; 3],
    pub r_squared: f64,
    pub transform: ResponseTransform,
    pub fitted: Vec<FittedRecord>,
}

impl RegressionResult {
    /// Model value on the raw valuation scale for arbitrary predictors.
    pub fn predict(&self, growth_pct: f64, margin_pct: f64) -> f64 {
        let [b0, b1, b2] = self.coefficients;
        let linear = b0 + b1 * growth_pct + b2 * margin_pct;
        match self.transform {
            ResponseTransform::Identity => linear,
            ResponseTransform::Log => linear.exp(),
        }
    }
}

/// What happened to one group during a run.
#[derive(Debug)]
pub enum GroupOutcome {
    Fitted {
        label: String,
        result: RegressionResult,
        chart: Option<PathBuf>,
    },
    Empty {
        label: String,
    },
    Failed {
        label: String,
        error: AnalysisError,
    },
}

impl GroupOutcome {
    pub fn label(&self) -> &str {
        match self {
            GroupOutcome::Fitted { label, .. }
            | GroupOutcome::Empty { label }
            | GroupOutcome::Failed { label, .. } => label,
        }
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub requested: usize,
    pub fetched: usize,
    pub included: usize,
    pub outcomes: Vec<GroupOutcome>,
    /// Fitted rows across every successful group, in group order.
    pub combined: Vec<FittedRecord>,
}

impl RunSummary {
    pub fn fitted_groups(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, GroupOutcome::Fitted { .. }))
            .count()
    }
}
