use crate::error::{ApiClientError, FxError};
use crate::method::Method;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use url::Url;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Clone, Debug)]
pub struct RequestMeta {
    pub endpoint: Arc<str>,
    /// 1-based; bumped every time the request goes through `Next::run`.
    pub attempt: u32,
}

impl RequestMeta {
    pub fn new(endpoint: impl Into<Arc<str>>) -> Self {
        Self {
            endpoint: endpoint.into(),
            attempt: 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Request {
    pub meta: RequestMeta,
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            meta: RequestMeta::new(format!("{method} {}", url.path())),
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    #[inline]
    pub fn header_str(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Clone, Debug)]
pub struct Response {
    pub meta: RequestMeta,
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    /// Builds a response answering `req`, carrying over its url and metadata.
    pub fn for_request(req: &Request, status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            meta: req.meta.clone(),
            url: req.url.clone(),
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    #[inline]
    pub fn header_str(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.body)
    }

    #[cfg(feature = "json")]
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Turns a non-2xx response into `ApiClientError::HttpStatus`.
    pub fn error_for_status(self) -> Result<Self, ApiClientError> {
        if self.is_success() {
            return Ok(self);
        }
        let body = crate::error::body_as_text(&self.headers, &self.body, Some(self.body.len()));
        Err(ApiClientError::HttpStatus {
            status: self.status,
            headers: self.headers,
            body,
        })
    }
}

#[derive(Debug)]
pub struct TransportError(FxError);

impl TransportError {
    #[inline]
    pub fn new(e: impl Error + Send + Sync + 'static) -> Self {
        Self(Box::new(e))
    }

    #[inline]
    pub fn msg(m: impl Into<String>) -> Self {
        Self(m.into().into())
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.0)
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        Self::new(e)
    }
}

/// Injectable transport layer.
///
/// Contract:
/// - Must honor `Request` fields (method/url/headers/body/timeout).
/// - Must not leak a concrete HTTP client type in its public surface.
///
/// Any `Fn(Request) -> impl Future<Output = Result<Response, TransportError>>`
/// is a transport.
pub trait Transport: Send + Sync + 'static {
    fn send<'a>(&'a self, req: Request) -> BoxFuture<'a, Result<Response, TransportError>>;
}

impl<F, Fut> Transport for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, TransportError>> + Send + 'static,
{
    fn send<'a>(&'a self, req: Request) -> BoxFuture<'a, Result<Response, TransportError>> {
        Box::pin(self(req))
    }
}

static INSTALLED: OnceLock<Arc<dyn Transport>> = OnceLock::new();
static PLATFORM: OnceLock<Option<Arc<dyn Transport>>> = OnceLock::new();

/// Installs the process-wide default transport used by clients configured
/// without one. First call wins; later calls hand the transport back.
pub fn set_default_transport(t: Arc<dyn Transport>) -> Result<(), Arc<dyn Transport>> {
    INSTALLED.set(t)
}

/// Resolution order: explicit, installed default, platform transport. Later
/// sources are only consulted when the earlier ones are empty.
pub(crate) fn resolve(
    explicit: Option<Arc<dyn Transport>>,
) -> Result<Arc<dyn Transport>, ApiClientError> {
    resolve_from(
        explicit,
        || INSTALLED.get().cloned(),
        || PLATFORM.get_or_init(platform_transport).clone(),
    )
}

fn resolve_from(
    explicit: Option<Arc<dyn Transport>>,
    installed: impl FnOnce() -> Option<Arc<dyn Transport>>,
    platform: impl FnOnce() -> Option<Arc<dyn Transport>>,
) -> Result<Arc<dyn Transport>, ApiClientError> {
    explicit
        .or_else(installed)
        .or_else(platform)
        .ok_or(ApiClientError::NoTransportAvailable)
}

#[cfg(feature = "reqwest")]
fn platform_transport() -> Option<Arc<dyn Transport>> {
    match reqwest::Client::builder().build() {
        Ok(client) => Some(Arc::new(ReqwestTransport::new(client))),
        Err(error) => {
            tracing::warn!(target: "fastclient", %error, "building the reqwest transport failed");
            None
        }
    }
}

#[cfg(not(feature = "reqwest"))]
fn platform_transport() -> Option<Arc<dyn Transport>> {
    None
}

#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

#[cfg(feature = "reqwest")]
impl ReqwestTransport {
    #[inline]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    #[inline]
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
    fn send<'a>(&'a self, req: Request) -> BoxFuture<'a, Result<Response, TransportError>> {
        Box::pin(async move {
            let Request {
                meta,
                method,
                url,
                headers,
                body,
                timeout,
            } = req;
            let mut rb = self.client.request(method.as_http(), url).headers(headers);
            if let Some(b) = body {
                rb = rb.body(b);
            }
            if let Some(t) = timeout {
                rb = rb.timeout(t);
            }
            let resp = rb.send().await?;
            let status = resp.status();
            let headers = resp.headers().clone();
            let url = resp.url().clone();
            let body = resp.bytes().await?;
            Ok(Response {
                meta,
                url,
                status,
                headers,
                body,
            })
        })
    }
}
