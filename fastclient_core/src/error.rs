use crate::hooks::Phase;
use crate::method::Method;
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD as B64;
use http::{HeaderMap, StatusCode};
use std::borrow::Cow;
use std::error::Error;
use std::fmt::Debug;
use thiserror::Error;

pub type FxError = Box<dyn Error + Send + Sync>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiClientError {
    #[error("no transport available: configure one or enable the `reqwest` feature")]
    NoTransportAvailable,

    #[error("invalid base url {base:?}: {reason}")]
    InvalidBaseUrl {
        base: String,
        reason: &'static str,
    },

    #[error("build url error: {0}")]
    BuildUrl(#[from] url::ParseError),

    #[error("resolved url {url} leaves the base origin {base}")]
    ForeignOrigin { base: String, url: String },

    #[error("unresolved path placeholder {{{name}}} in {template:?}")]
    UnresolvedPlaceholder { name: String, template: String },

    #[error("{method} requests cannot carry a body")]
    BodyNotAllowed { method: Method },

    #[error("invalid header: {0}")]
    InvalidHeader(Cow<'static, str>),

    #[error("transport: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("{phase} hook failed: {source}")]
    Hook { phase: Phase, source: FxError },

    #[error("middleware: {0}")]
    Middleware(FxError),

    #[error("status {status}")]
    HttpStatus {
        status: StatusCode,
        headers: HeaderMap,
        body: String,
    },

    #[error("parse error: {source}")]
    Parse { source: FxError, body: String },

    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("in endpoint {endpoint}: {source}")]
    InEndpoint {
        endpoint: String,
        source: Box<ApiClientError>,
    },
}

impl ApiClientError {
    pub fn middleware(error: impl Into<FxError>) -> ApiClientError {
        ApiClientError::Middleware(error.into())
    }

    #[inline]
    pub fn in_endpoint(endpoint: &str, e: ApiClientError) -> ApiClientError {
        match e {
            ApiClientError::InEndpoint { .. } => e,
            _ => ApiClientError::InEndpoint {
                endpoint: endpoint.to_string(),
                source: Box::new(e),
            },
        }
    }

    /// Strips any `InEndpoint` wrapper.
    pub fn root(&self) -> &ApiClientError {
        match self {
            ApiClientError::InEndpoint { source, .. } => source.root(),
            other => other,
        }
    }
}

pub fn body_as_text(headers: &HeaderMap, body: &bytes::Bytes, full_len: Option<usize>) -> String {
    const MAX: usize = 8 * 1024;
    let ct = headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let slice = if body.len() > MAX {
        &body[..MAX]
    } else {
        &body[..]
    };
    let total_len = full_len.unwrap_or(body.len());
    if ct.is_empty() || ct.starts_with("application/json") || ct.starts_with("text/") {
        match std::str::from_utf8(slice) {
            Ok(s) => {
                if total_len > slice.len() {
                    format!("{}...", s)
                } else {
                    s.to_owned()
                }
            }
            Err(_) => format!("<non-utf8-text; {} bytes>", slice.len()),
        }
    } else {
        let b64 = B64.encode(slice);
        format!(
            "<non-text; {} bytes; base64:{}{}>",
            total_len,
            &b64[..b64.len().min(1024)],
            if b64.len() > 1024 { "..." } else { "" }
        )
    }
}
