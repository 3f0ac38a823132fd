use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;

use crate::error::TransportError;

use super::Job;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub content_length: u64,
}

/// Executes one job against the target.
///
/// Implementations are shared by every worker for the whole run.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        request: Job,
        timeout: Option<Duration>,
    ) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    read_all: bool,
}

impl ReqwestTransport {
    /// The body is always drained. With `read_all` the drained byte count is
    /// reported, otherwise the `Content-Length` header (0 when absent).
    #[must_use]
    pub const fn new(client: Client, read_all: bool) -> Self {
        Self { client, read_all }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        mut request: Job,
        timeout: Option<Duration>,
    ) -> Result<TransportResponse, TransportError> {
        if let Some(limit) = timeout {
            *request.timeout_mut() = Some(limit);
        }

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|err| classify_request_error(err, timeout))?;
        let status = response.status().as_u16();

        let header_length = response.content_length().unwrap_or(0);
        // The body is always consumed so the connection can return to the pool.
        let drained = drain_response_body(response)
            .await
            .map_err(|err| classify_body_error(err, timeout))?;
        let content_length = if self.read_all {
            drained
        } else {
            header_length
        };

        Ok(TransportResponse {
            status,
            content_length,
        })
    }
}

async fn drain_response_body(response: reqwest::Response) -> Result<u64, reqwest::Error> {
    let mut stream = response.bytes_stream();
    let mut total_bytes: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let bytes = chunk?;
        total_bytes = total_bytes.saturating_add(u64::try_from(bytes.len()).unwrap_or(u64::MAX));
    }
    Ok(total_bytes)
}

/// Timeouts are only reported as such when a limit was passed in; otherwise
/// the client's own message is kept.
fn classify_request_error(err: reqwest::Error, timeout: Option<Duration>) -> TransportError {
    if let Some(timeout) = timeout
        && err.is_timeout()
    {
        TransportError::Timeout { timeout }
    } else if err.is_connect() {
        TransportError::Connect { source: err }
    } else {
        TransportError::Request { source: err }
    }
}

fn classify_body_error(err: reqwest::Error, timeout: Option<Duration>) -> TransportError {
    if let Some(timeout) = timeout
        && err.is_timeout()
    {
        TransportError::Timeout { timeout }
    } else {
        TransportError::Body { source: err }
    }
}
