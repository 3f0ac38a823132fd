pub(crate) const DEFAULT_USER_AGENT: &str = concat!("salvo/", env!("CARGO_PKG_VERSION"));

pub(crate) const DEFAULT_REQUESTS: &str = "200";
pub(crate) const DEFAULT_CONCURRENCY: &str = "50";
pub(crate) const DEFAULT_CONTENT_TYPE: &str = "text/html";
pub(crate) const DEFAULT_HISTOGRAM_BINS: &str = "10";
