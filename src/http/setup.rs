use std::sync::Arc;

use tracing::debug;

use crate::args::LoadArgs;
use crate::error::{AppError, AppResult, HttpError, ValidationError};

use super::{RequestTemplate, ReqwestTransport, Transport, TransportOptions, build_client};

/// Builds the request template from the resolved arguments.
///
/// # Errors
///
/// Returns an error when the URL is missing or invalid, a header is invalid,
/// or the body file cannot be read.
pub fn build_request_template(args: &LoadArgs) -> AppResult<RequestTemplate> {
    let url = args
        .url
        .as_deref()
        .ok_or_else(|| AppError::validation(ValidationError::MissingUrl))?;

    let mut builder = RequestTemplate::builder(args.method.as_method(), url)?
        .content_type(&args.content_type)?;
    if let Some(accept) = args.accept_header.as_ref() {
        builder = builder.accept(accept)?;
    }
    if let Some(auth) = args.basic_auth.as_ref() {
        builder = builder.basic_auth(&auth.username, &auth.password)?;
    }
    let listed = args
        .header_list
        .as_ref()
        .map_or(&[][..], |list| list.entries());
    for (name, value) in args.headers.iter().chain(listed) {
        builder = builder.header(name, value)?;
    }

    let body = match args.data_file.as_ref() {
        Some(path) => std::fs::read(path).map_err(|err| {
            AppError::http(HttpError::ReadFile {
                path: path.clone().into(),
                source: err,
            })
        })?,
        None => args.data.clone().into_bytes(),
    };

    Ok(builder.body(body).build())
}

#[must_use]
pub fn transport_options(args: &LoadArgs) -> TransportOptions {
    TransportOptions {
        insecure: args.insecure,
        disable_compression: args.disable_compression,
        disable_keepalive: args.disable_keepalive,
        proxy_url: args.proxy_url.clone(),
        read_all: args.read_all,
    }
}

/// Builds the shared transport every worker sends through.
///
/// # Errors
///
/// Returns an error when the HTTP client cannot be built.
pub fn setup_transport(args: &LoadArgs) -> AppResult<Arc<dyn Transport>> {
    let options = transport_options(args);
    let client = build_client(&options)?;
    debug!("HTTP client ready (read_all = {})", options.read_all);
    Ok(Arc::new(ReqwestTransport::new(client, options.read_all)))
}
