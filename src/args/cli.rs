use clap::Parser;
use std::time::Duration;

use super::defaults::{
    DEFAULT_CONCURRENCY, DEFAULT_CONTENT_TYPE, DEFAULT_HISTOGRAM_BINS, DEFAULT_REQUESTS,
};
use super::parsers::{
    parse_basic_auth, parse_duration_arg, parse_header, parse_header_list, parse_positive_u64,
    parse_positive_usize,
};
use super::types::{BasicAuth, HeaderList, HttpMethod, OutputFormat, PositiveU64, PositiveUsize};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "HTTP load generator: sends a fixed number of requests, or keeps sending for a fixed duration, and reports latency statistics."
)]
pub struct LoadArgs {
    /// Target URL
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Number of requests to run
    #[arg(
        long = "requests",
        short = 'n',
        default_value = DEFAULT_REQUESTS,
        value_parser = parse_positive_u64
    )]
    pub requests: PositiveU64,

    /// Number of workers to run concurrently
    #[arg(
        long = "concurrency",
        short = 'c',
        default_value = DEFAULT_CONCURRENCY,
        value_parser = parse_positive_usize
    )]
    pub concurrency: PositiveUsize,

    /// Rate limit in requests per second across all workers (0 = unlimited)
    #[arg(long = "rate", short = 'q', default_value = "0")]
    pub rate_limit: u64,

    /// Send requests for this long instead of a fixed count (supports ms/s/m/h)
    #[arg(long = "duration", short = 'l', value_parser = parse_duration_arg)]
    pub duration: Option<Duration>,

    /// Per-request timeout (supports ms/s/m/h)
    #[arg(long = "timeout", short = 't', value_parser = parse_duration_arg)]
    pub timeout: Option<Duration>,

    /// HTTP method to use
    #[arg(long, short = 'm', default_value = "get", ignore_case = true)]
    pub method: HttpMethod,

    /// HTTP headers in 'Key: Value' format (repeatable)
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// HTTP headers as one list, e.g. 'Accept: text/plain;X-Id: 7'
    #[arg(long = "headers", value_parser = parse_header_list)]
    pub header_list: Option<HeaderList>,

    /// Request body
    #[arg(long, short = 'd', default_value = "")]
    pub data: String,

    /// Request body from file
    #[arg(long = "data-file", short = 'D', conflicts_with = "data")]
    pub data_file: Option<String>,

    /// HTTP Accept header
    #[arg(long = "accept", short = 'A')]
    pub accept_header: Option<String>,

    /// Content-Type header
    #[arg(long = "content-type", short = 'T', default_value = DEFAULT_CONTENT_TYPE)]
    pub content_type: String,

    /// Basic authentication in 'username:password' format
    #[arg(long = "basic-auth", short = 'a', value_parser = parse_basic_auth)]
    pub basic_auth: Option<BasicAuth>,

    /// HTTP proxy address
    #[arg(long = "proxy", short = 'x')]
    pub proxy_url: Option<String>,

    /// Skip TLS certificate and hostname verification
    #[arg(long)]
    pub insecure: bool,

    /// Disable response compression
    #[arg(long = "disable-compression")]
    pub disable_compression: bool,

    /// Disable keep-alive; every request opens a new connection
    #[arg(long = "disable-keepalive")]
    pub disable_keepalive: bool,

    /// Read the full response body and report its size
    #[arg(long = "read-all")]
    pub read_all: bool,

    /// Output format
    #[arg(long, short = 'o', default_value = "text", ignore_case = true)]
    pub output: OutputFormat,

    /// Number of latency histogram bins
    #[arg(
        long = "bins",
        default_value = DEFAULT_HISTOGRAM_BINS,
        value_parser = parse_positive_usize
    )]
    pub histogram_bins: PositiveUsize,

    /// Number of runtime worker threads (defaults to the number of CPUs)
    #[arg(long = "cpus", value_parser = parse_positive_usize)]
    pub cpus: Option<PositiveUsize>,

    /// Path to config file (TOML/JSON). Defaults to ./salvo.toml or ./salvo.json if present.
    #[arg(long)]
    pub config: Option<String>,

    /// Disable the live progress line
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    /// Disable colored log output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Enable verbose logging (sets log level to debug unless overridden by SALVO_LOG/RUST_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,
}
