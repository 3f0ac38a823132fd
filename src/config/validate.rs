use std::num::NonZeroUsize;

use crate::args::LoadArgs;
use crate::engine::{RateLimit, RunMode, RunSettings};
use crate::error::{AppError, AppResult, ValidationError};

/// Turns fully merged arguments into engine settings.
///
/// # Errors
///
/// Returns an error when the URL is missing, or when a count-limited run
/// asks for fewer requests than workers.
pub fn resolve_run_settings(args: &LoadArgs) -> AppResult<RunSettings> {
    if args.url.as_deref().is_none_or(str::is_empty) {
        return Err(AppError::validation(ValidationError::MissingUrl));
    }

    let concurrency = NonZeroUsize::from(args.concurrency);
    let mode = match args.duration {
        Some(duration) => RunMode::Duration(duration),
        None => {
            let requests = args.requests.get();
            let fewer_than_workers = usize::try_from(requests)
                .map(|requests| requests < concurrency.get())
                .unwrap_or(false);
            if fewer_than_workers {
                return Err(AppError::validation(
                    ValidationError::RequestsBelowConcurrency {
                        requests,
                        concurrency: concurrency.get(),
                    },
                ));
            }
            RunMode::Count(requests)
        }
    };

    let rate = match args.rate_limit {
        0 => None,
        rate => Some(RateLimit::per_second(rate)?),
    };

    Ok(RunSettings {
        mode,
        concurrency,
        rate,
        timeout: args.timeout,
        histogram_bins: NonZeroUsize::from(args.histogram_bins),
    })
}
