use std::time::Duration;

use super::types::{BasicAuth, HeaderList, PositiveU64, PositiveUsize};
use crate::error::{AppError, AppResult, ValidationError};

pub(crate) fn parse_header(s: &str) -> Result<(String, String), ValidationError> {
    match s.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.trim().to_owned()))
        }
        Some(_) | None => Err(ValidationError::InvalidHeaderFormat {
            value: s.to_owned(),
        }),
    }
}

/// Splits `Key: Value;Key: Value` on `;`. Empty segments are skipped, but
/// the list must name at least one header.
pub(crate) fn parse_header_list(s: &str) -> Result<HeaderList, ValidationError> {
    let entries = s
        .split(';')
        .filter(|segment| !segment.trim().is_empty())
        .map(parse_header)
        .collect::<Result<Vec<_>, _>>()?;
    if entries.is_empty() {
        return Err(ValidationError::InvalidHeaderFormat {
            value: s.to_owned(),
        });
    }
    Ok(HeaderList::from(entries))
}

pub(super) fn parse_positive_u64(s: &str) -> AppResult<PositiveU64> {
    s.parse::<PositiveU64>().map_err(AppError::from)
}

pub(super) fn parse_positive_usize(s: &str) -> AppResult<PositiveUsize> {
    s.parse::<PositiveUsize>().map_err(AppError::from)
}

pub(super) fn parse_basic_auth(s: &str) -> AppResult<BasicAuth> {
    s.parse::<BasicAuth>().map_err(AppError::from)
}

/// Parses `<digits><unit>` where unit is `ms`, `s`, `m` or `h`. A bare
/// number is seconds.
pub(crate) fn parse_duration_arg(s: &str) -> AppResult<Duration> {
    parse_duration_value(s).map_err(AppError::from)
}

/// Duration grammar shared by CLI flags and config values.
///
/// # Errors
///
/// Returns an error for empty input, a missing number, an unknown unit, an
/// overflowing value, or a zero duration.
pub fn parse_duration_value(s: &str) -> Result<Duration, ValidationError> {
    let value = s.trim();
    if value.is_empty() {
        return Err(ValidationError::DurationEmpty);
    }

    let digits_len = value.chars().take_while(char::is_ascii_digit).count();
    if digits_len == 0 {
        return Err(ValidationError::InvalidDurationFormat {
            value: value.to_owned(),
        });
    }
    let (num_part, unit_part) = value.split_at(digits_len);
    let number: u64 = num_part
        .parse()
        .map_err(|err| ValidationError::InvalidDurationNumber {
            value: value.to_owned(),
            source: err,
        })?;

    let unit = if unit_part.is_empty() { "s" } else { unit_part };
    let duration = match unit {
        "ms" => Duration::from_millis(number),
        "s" => Duration::from_secs(number),
        "m" => {
            let secs = number
                .checked_mul(60)
                .ok_or(ValidationError::DurationOverflow)?;
            Duration::from_secs(secs)
        }
        "h" => {
            let secs = number
                .checked_mul(60)
                .and_then(|seconds| seconds.checked_mul(60))
                .ok_or(ValidationError::DurationOverflow)?;
            Duration::from_secs(secs)
        }
        _ => {
            return Err(ValidationError::InvalidDurationUnit {
                unit: unit.to_owned(),
            });
        }
    };

    if duration.is_zero() {
        return Err(ValidationError::DurationZero);
    }

    Ok(duration)
}
