use std::time::Duration;

use serde::Deserialize;

use crate::args::{HttpMethod, OutputFormat, parse_duration_value};
use crate::error::ValidationError;

/// Settings read from `salvo.toml` / `salvo.json`. Every field is optional
/// and only fills in what the command line left unset.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub method: Option<HttpMethod>,
    pub headers: Option<Vec<String>>,
    pub data: Option<String>,
    pub data_file: Option<String>,
    pub accept: Option<String>,
    pub content_type: Option<String>,
    pub basic_auth: Option<String>,
    #[serde(alias = "proxy")]
    pub proxy_url: Option<String>,
    pub requests: Option<u64>,
    pub concurrency: Option<usize>,
    pub rate: Option<u64>,
    pub duration: Option<DurationValue>,
    pub timeout: Option<DurationValue>,
    pub insecure: Option<bool>,
    pub disable_compression: Option<bool>,
    pub disable_keepalive: Option<bool>,
    pub read_all: Option<bool>,
    pub output: Option<OutputFormat>,
    #[serde(alias = "histogram_bins")]
    pub bins: Option<usize>,
    pub cpus: Option<usize>,
    pub no_progress: Option<bool>,
    pub no_color: Option<bool>,
}

/// A duration written either as whole seconds or with a unit suffix.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(0) => Err(ValidationError::DurationZero),
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => parse_duration_value(text),
        }
    }
}
