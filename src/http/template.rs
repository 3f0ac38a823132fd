use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use reqwest::{
    Body, Method, Request, Url,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};

use crate::error::{AppError, AppResult, HttpError};

/// A single unit of work handed to a worker.
pub type Job = Request;

/// Immutable description of the request every job is cloned from.
///
/// Built once before the run; [`RequestTemplate::job`] produces an
/// independent request per dispatch, so no two workers ever share a body
/// stream.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
}

impl RequestTemplate {
    /// # Errors
    ///
    /// Returns an error when `url` cannot be parsed.
    pub fn builder(method: Method, url: &str) -> AppResult<RequestTemplateBuilder> {
        let parsed = Url::parse(url).map_err(|err| {
            AppError::http(HttpError::InvalidUrl {
                url: url.to_owned(),
                source: err,
            })
        })?;
        Ok(RequestTemplateBuilder {
            template: Self {
                method,
                url: parsed,
                headers: HeaderMap::new(),
                body: Bytes::new(),
            },
        })
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Produces a fresh request carrying the template's method, URL, headers
    /// and body.
    #[must_use]
    pub fn job(&self) -> Job {
        let mut request = Request::new(self.method.clone(), self.url.clone());
        request.headers_mut().clone_from(&self.headers);
        if !self.body.is_empty() {
            *request.body_mut() = Some(Body::from(self.body.clone()));
        }
        request
    }
}

#[derive(Debug)]
pub struct RequestTemplateBuilder {
    template: RequestTemplate,
}

impl RequestTemplateBuilder {
    /// Appends a header. Repeated names keep every value.
    ///
    /// # Errors
    ///
    /// Returns an error when the name or value is not a valid HTTP header.
    pub fn header(mut self, name: &str, value: &str) -> AppResult<Self> {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
            AppError::http(HttpError::InvalidHeaderName {
                header: name.to_owned(),
                source: err,
            })
        })?;
        let header_value = parse_value(name, value)?;
        self.template.headers.append(header_name, header_value);
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns an error when `value` is not a valid header value.
    pub fn accept(self, value: &str) -> AppResult<Self> {
        self.replace(ACCEPT, value)
    }

    /// # Errors
    ///
    /// Returns an error when `value` is not a valid header value.
    pub fn content_type(self, value: &str) -> AppResult<Self> {
        self.replace(CONTENT_TYPE, value)
    }

    /// Sets `Authorization: Basic <base64(username:password)>`.
    ///
    /// # Errors
    ///
    /// Returns an error when the encoded credentials are not a valid header
    /// value.
    pub fn basic_auth(self, username: &str, password: &str) -> AppResult<Self> {
        let encoded = STANDARD.encode(format!("{username}:{password}"));
        self.replace(AUTHORIZATION, &format!("Basic {encoded}"))
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.template.body = body.into();
        self
    }

    #[must_use]
    pub fn build(self) -> RequestTemplate {
        self.template
    }

    fn replace(mut self, name: HeaderName, value: &str) -> AppResult<Self> {
        let header_value = parse_value(name.as_str(), value)?;
        self.template.headers.insert(name, header_value);
        Ok(self)
    }
}

fn parse_value(name: &str, value: &str) -> AppResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|err| {
        AppError::http(HttpError::InvalidHeaderValue {
            header: name.to_owned(),
            source: err,
        })
    })
}
