use std::time::Duration;

use reqwest::{Client, Proxy};
use tracing::debug;

use crate::args::DEFAULT_USER_AGENT;
use crate::error::{AppError, AppResult, HttpError};

/// Connection-level switches for the shared client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    pub insecure: bool,
    pub disable_compression: bool,
    pub disable_keepalive: bool,
    pub proxy_url: Option<String>,
    pub read_all: bool,
}

/// Builds the pooled client every worker shares.
///
/// # Errors
///
/// Returns an error when the proxy URL is invalid or the client cannot be
/// built.
pub fn build_client(options: &TransportOptions) -> AppResult<Client> {
    let mut client_builder = Client::builder().user_agent(DEFAULT_USER_AGENT);

    if options.disable_keepalive {
        client_builder = client_builder
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(Some(Duration::from_secs(0)));
    }

    if options.disable_compression {
        client_builder = client_builder.no_gzip().no_brotli().no_deflate();
    }

    if options.insecure {
        client_builder = client_builder
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
    }

    if let Some(proxy_url) = options.proxy_url.as_ref() {
        let proxy = Proxy::all(proxy_url).map_err(|err| {
            AppError::http(HttpError::InvalidProxy {
                url: proxy_url.clone(),
                source: err,
            })
        })?;
        debug!("Routing requests through proxy {}", proxy_url);
        client_builder = client_builder.proxy(proxy);
    }

    client_builder
        .build()
        .map_err(|err| AppError::http(HttpError::BuildClientFailed { source: err }))
}
