//! Error taxonomy for the pipeline stages.
//!
//! Geocoding failures never leave the geocoder (they become "no result"),
//! but they are still classified so the logs can tell a missing place apart
//! from an unreachable service.

use thiserror::Error;

/// Failure while resolving a single place name.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// The service answered, but with nothing usable for this name.
    #[error("no geocode found for {0:?}")]
    NotFound(String),

    /// Timeout, transport error, or a non-success HTTP status.
    #[error("geocoding service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The service answered with a body we could not read.
    #[error("malformed geocoder response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for GeocodeError {
    fn from(err: reqwest::Error) -> Self {
        GeocodeError::ServiceUnavailable(err.to_string())
    }
}

/// Failures of the non-geocoding stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The page is missing the markup the extractor relies on.
    #[error("malformed page {url}: {reason}")]
    MalformedPage { url: String, reason: String },

    #[error("no data: {0}")]
    NoData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("feed XML error: {0}")]
    Xml(#[from] quick_xml::DeError),
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status == reqwest::StatusCode::NOT_FOUND => {
                PipelineError::NotFound(err.to_string())
            }
            _ => PipelineError::ServiceUnavailable(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
