// src/error.rs
use std::fmt;

/// Failure kinds surfaced by the comps pipeline.
///
/// `Fetch` and `Parse` are recovered per ticker and only ever logged.
/// `Underdetermined` and `EmptyDataset` end processing for a single group.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    Fetch { symbol: String, reason: String },
    Parse { field: String, raw: String },
    Underdetermined { group: String, observations: usize, required: usize },
    EmptyDataset { group: String },
    Solver(String),
    Chart(String),
}

impl AnalysisError {
    pub fn fetch(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalysisError::Fetch {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    pub fn parse(field: impl Into<String>, raw: impl Into<String>) -> Self {
        AnalysisError::Parse {
            field: field.into(),
            raw: raw.into(),
        }
    }

    /// Short tag used in log lines so the four kinds stay distinguishable.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Fetch { .. } => "fetch",
            AnalysisError::Parse { .. } => "parse",
            AnalysisError::Underdetermined { .. } => "underdetermined",
            AnalysisError::EmptyDataset { .. } => "empty",
            AnalysisError::Solver(_) => "solver",
            AnalysisError::Chart(_) => "chart",
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AnalysisError::Fetch { symbol, reason } => {
                write!(f, "failed to fetch snapshot for {}: {}", symbol, reason)
            }
            AnalysisError::Parse { field, raw } => {
                write!(f, "could not parse {} from {:?}", field, raw)
            }
            AnalysisError::Underdetermined { group, observations, required } => write!(
                f,
                "{}: {} observations is too few for a regression (need at least {})",
                group, observations, required
            ),
            AnalysisError::EmptyDataset { group } => {
                write!(f, "{}: no valid tickers, nothing to fit", group)
            }
            AnalysisError::Solver(message) => write!(f, "least-squares solve failed: {}", message),
            AnalysisError::Chart(message) => write!(f, "chart rendering failed: {}", message),
        }
    }
}

impl std::error::Error for AnalysisError {}
