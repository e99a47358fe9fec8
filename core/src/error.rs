use thiserror::Error;

use crate::types::Metric;

/// Feiltaksonomi for kjernen. Alle feil oppdages før beregning starter,
/// så delvise resultater sendes aldri ut.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Ingen aktiviteter (eller ingen brukbare verdier) å bygge baseline av.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Ugyldig benchmark- eller arketypetabell (hull, overlapp, inverterte intervaller).
    #[error("configuration error for {}: {detail}", metric_label(.metric))]
    Configuration {
        metric: Option<Metric>,
        detail: String,
    },

    /// Degenererte syntese-parametre (W < 2, R = 0, negativ støy).
    #[error("invalid horizon: {0}")]
    InvalidHorizon(String),

    /// JSON-grensesnittet: sti til feltet som feilet + melding.
    #[error("invalid JSON at `{path}`: {message}")]
    Json { path: String, message: String },
}

fn metric_label(metric: &Option<Metric>) -> String {
    match metric {
        Some(m) => format!("metric `{}`", m.key()),
        None => "table".to_string(),
    }
}

impl CoreError {
    pub fn config(metric: Metric, detail: impl Into<String>) -> Self {
        CoreError::Configuration { metric: Some(metric), detail: detail.into() }
    }

    pub fn table(detail: impl Into<String>) -> Self {
        CoreError::Configuration { metric: None, detail: detail.into() }
    }
}

impl From<serde_path_to_error::Error<serde_json::Error>> for CoreError {
    fn from(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        CoreError::Json {
            path: err.path().to_string(),
            message: err.inner().to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Json { path: ".".to_string(), message: err.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
