use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgMatches, CommandFactory, FromArgMatches};

use crate::args::{LoadArgs, PositiveU64, PositiveUsize, parse_header};
use crate::config::types::ConfigFile;
use crate::config::{apply_config, resolve_run_settings};
use crate::error::{AppError, AppResult, ConfigError};
use crate::metrics::StreamingHistogram;

thread_local! {
    static BASE_MATCHES: ArgMatches =
        LoadArgs::command().get_matches_from(["salvo", "http://localhost/"]);
}

/// Parses a header string in `Key: Value` format.
///
/// # Errors
///
/// Returns an error when the header is malformed.
pub fn parse_header_input(input: &str) -> AppResult<(String, String)> {
    parse_header(input).map_err(AppError::from)
}

/// Parses a duration value (e.g. `10s`, `500ms`).
///
/// # Errors
///
/// Returns an error when the duration is invalid.
pub fn parse_duration_value_input(input: &str) -> AppResult<Duration> {
    crate::args::parse_duration_value(input).map_err(AppError::from)
}

/// Parses TOML config, merges it over default arguments and resolves the
/// run settings.
///
/// # Errors
///
/// Returns an error when parsing, merging, or validation fails.
pub fn apply_config_from_toml(input: &str) -> AppResult<()> {
    let config: ConfigFile = toml::from_str(input).map_err(|err| {
        AppError::config(ConfigError::ParseToml {
            path: PathBuf::from("<fuzz>"),
            source: err,
        })
    })?;
    apply_config_to_defaults(&config)
}

/// Parses a positive u64 string value.
///
/// # Errors
///
/// Returns an error when the value is invalid or zero.
pub fn parse_positive_u64_input(input: &str) -> AppResult<u64> {
    let value: PositiveU64 = input.parse()?;
    Ok(value.get())
}

/// Parses a positive usize string value.
///
/// # Errors
///
/// Returns an error when the value is invalid or zero.
pub fn parse_positive_usize_input(input: &str) -> AppResult<usize> {
    let value: PositiveUsize = input.parse()?;
    Ok(value.get())
}

/// Feeds samples into a histogram capped at `max_bins` and returns it.
#[must_use]
pub fn histogram_from_samples(max_bins: NonZeroUsize, samples: &[f64]) -> StreamingHistogram {
    let mut histogram = StreamingHistogram::new(max_bins);
    for sample in samples {
        histogram.add(*sample);
    }
    histogram
}

fn apply_config_to_defaults(config: &ConfigFile) -> AppResult<()> {
    BASE_MATCHES.with(|matches| {
        let mut args = LoadArgs::from_arg_matches(matches)?;
        apply_config(&mut args, matches, config)?;
        resolve_run_settings(&args)?;
        Ok(())
    })
}
