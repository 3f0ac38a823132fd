use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::{BasicAuth, LoadArgs, PositiveU64, PositiveUsize, parse_header};
use crate::error::{AppError, AppResult, ConfigError};

use super::types::{ConfigFile, DurationValue};

/// Applies configuration values to CLI arguments. Values given on the
/// command line always win.
///
/// # Errors
///
/// Returns an error when config values are invalid or conflict with each
/// other.
pub fn apply_config(args: &mut LoadArgs, matches: &ArgMatches, config: &ConfigFile) -> AppResult<()> {
    if config.requests.is_some() && config.duration.is_some() {
        return Err(AppError::config(ConfigError::Conflict {
            left: "requests",
            right: "duration",
        }));
    }
    if config.data.is_some() && config.data_file.is_some() {
        return Err(AppError::config(ConfigError::Conflict {
            left: "data",
            right: "data_file",
        }));
    }

    apply_target(args, matches, config)?;
    apply_load(args, matches, config)?;
    apply_connection(args, matches, config);
    apply_output(args, matches, config)?;
    Ok(())
}

fn apply_target(args: &mut LoadArgs, matches: &ArgMatches, config: &ConfigFile) -> AppResult<()> {
    if !is_cli(matches, "url")
        && let Some(url) = config.url.clone()
    {
        args.url = Some(url);
    }

    if !is_cli(matches, "method")
        && let Some(method) = config.method
    {
        args.method = method;
    }

    if !is_cli(matches, "headers")
        && !is_cli(matches, "header_list")
        && let Some(headers) = config.headers.as_ref()
    {
        args.headers = parse_headers(headers)?;
    }

    // A body source on the command line replaces both config body fields.
    let body_from_cli = is_cli(matches, "data") || is_cli(matches, "data_file");
    if !body_from_cli {
        if let Some(data) = config.data.clone() {
            args.data = data;
        }
        if let Some(data_file) = config.data_file.clone() {
            args.data_file = Some(data_file);
        }
    }

    if !is_cli(matches, "accept_header")
        && let Some(accept) = config.accept.clone()
    {
        args.accept_header = Some(accept);
    }

    if !is_cli(matches, "content_type")
        && let Some(content_type) = config.content_type.clone()
    {
        args.content_type = content_type;
    }

    if !is_cli(matches, "basic_auth")
        && let Some(basic_auth) = config.basic_auth.as_deref()
    {
        args.basic_auth = Some(basic_auth.parse::<BasicAuth>()?);
    }

    Ok(())
}

fn apply_load(args: &mut LoadArgs, matches: &ArgMatches, config: &ConfigFile) -> AppResult<()> {
    if !is_cli(matches, "requests")
        && let Some(requests) = config.requests
    {
        args.requests = ensure_positive_u64(requests, "requests")?;
    }

    // An explicit count on the command line also overrides a config duration.
    if !is_cli(matches, "duration")
        && !is_cli(matches, "requests")
        && let Some(duration) = config.duration.as_ref()
    {
        args.duration = Some(to_duration(duration, "duration")?);
    }

    if !is_cli(matches, "concurrency")
        && let Some(concurrency) = config.concurrency
    {
        args.concurrency = ensure_positive_usize(concurrency, "concurrency")?;
    }

    if !is_cli(matches, "rate_limit")
        && let Some(rate) = config.rate
    {
        args.rate_limit = rate;
    }

    if !is_cli(matches, "timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.timeout = Some(to_duration(timeout, "timeout")?);
    }

    Ok(())
}

fn apply_connection(args: &mut LoadArgs, matches: &ArgMatches, config: &ConfigFile) {
    if !is_cli(matches, "proxy_url")
        && let Some(proxy_url) = config.proxy_url.clone()
    {
        args.proxy_url = Some(proxy_url);
    }

    let flags = [
        ("insecure", config.insecure, &mut args.insecure),
        (
            "disable_compression",
            config.disable_compression,
            &mut args.disable_compression,
        ),
        (
            "disable_keepalive",
            config.disable_keepalive,
            &mut args.disable_keepalive,
        ),
        ("read_all", config.read_all, &mut args.read_all),
    ];
    for (name, value, target) in flags {
        if !is_cli(matches, name)
            && let Some(value) = value
        {
            *target = value;
        }
    }
}

fn apply_output(args: &mut LoadArgs, matches: &ArgMatches, config: &ConfigFile) -> AppResult<()> {
    if !is_cli(matches, "output")
        && let Some(output) = config.output
    {
        args.output = output;
    }

    if !is_cli(matches, "histogram_bins")
        && let Some(bins) = config.bins
    {
        args.histogram_bins = ensure_positive_usize(bins, "bins")?;
    }

    if !is_cli(matches, "cpus")
        && let Some(cpus) = config.cpus
    {
        args.cpus = Some(ensure_positive_usize(cpus, "cpus")?);
    }

    if !is_cli(matches, "no_progress")
        && let Some(no_progress) = config.no_progress
    {
        args.no_progress = no_progress;
    }

    if !is_cli(matches, "no_color")
        && let Some(no_color) = config.no_color
    {
        args.no_color = no_color;
    }

    Ok(())
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn ensure_positive_u64(value: u64, field: &str) -> AppResult<PositiveU64> {
    PositiveU64::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}

fn ensure_positive_usize(value: usize, field: &str) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}

fn to_duration(value: &DurationValue, field: &'static str) -> AppResult<std::time::Duration> {
    value
        .to_duration()
        .map_err(|err| AppError::config(ConfigError::InvalidDuration { field, source: err }))
}

fn parse_headers(headers: &[String]) -> AppResult<Vec<(String, String)>> {
    let mut parsed = Vec::with_capacity(headers.len());
    for header in headers {
        parsed.push(
            parse_header(header)
                .map_err(|err| AppError::config(ConfigError::InvalidHeader { source: err }))?,
        );
    }
    Ok(parsed)
}
