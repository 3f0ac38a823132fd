//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
mod parsers;
mod types;

#[cfg(test)]
mod test_support;

pub use cli::LoadArgs;
pub use types::{BasicAuth, HeaderList, HttpMethod, OutputFormat, PositiveU64, PositiveUsize};

pub(crate) use defaults::DEFAULT_USER_AGENT;
pub use parsers::parse_duration_value;
pub(crate) use parsers::parse_header;
