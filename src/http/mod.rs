//! Request templates and the transport jobs are executed through.
mod client;
mod setup;
mod template;
mod transport;


pub use client::{TransportOptions, build_client};
pub use setup::{build_request_template, setup_transport, transport_options};
pub use template::{Job, RequestTemplate, RequestTemplateBuilder};
pub use transport::{ReqwestTransport, Transport, TransportResponse};
