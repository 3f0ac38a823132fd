use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid header name '{header}': {source}")]
    InvalidHeaderName {
        header: String,
        #[source]
        source: reqwest::header::InvalidHeaderName,
    },
    #[error("Invalid value for header '{header}': {source}")]
    InvalidHeaderValue {
        header: String,
        #[source]
        source: reqwest::header::InvalidHeaderValue,
    },
    #[error("Invalid proxy URL '{url}': {source}")]
    InvalidProxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to build HTTP client: {source}")]
    BuildClientFailed {
        #[source]
        source: reqwest::Error,
    },
}

/// Failure of a single request attempt.
///
/// The rendered message is what the report groups errors by, so variants keep
/// the underlying client message intact.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },
    #[error("connection failed: {source}")]
    Connect {
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read response body: {source}")]
    Body {
        #[source]
        source: reqwest::Error,
    },
    #[error("request failed: {source}")]
    Request {
        #[source]
        source: reqwest::Error,
    },
}
