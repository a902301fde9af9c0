use crate::debug::DebugLevel;
use crate::endpoint::BoundEndpoint;
use crate::error::ApiClientError;
use crate::method::{BodyRule, Method};
use crate::timeout::TimeoutOverride;
use crate::transport::{Request, RequestMeta};
use crate::types::{ParamValue, Params};
use bytes::Bytes;
use core::future::IntoFuture;
use http::header::{CONTENT_TYPE, HeaderName};
use http::{HeaderMap, HeaderValue};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Per-call payload.
#[derive(Clone, Debug, Default)]
pub struct CallArgs {
    pub path: Params,
    pub query: Params,
    pub body: Option<Bytes>,
    pub headers: HeaderMap,
    /// Replaces the JSON default for POST/PUT/PATCH when no Content-Type
    /// header is given.
    pub content_type: Option<String>,
    pub timeout: Option<Duration>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.path.set(name, value);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.query.set(key, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the body. The Content-Type rule is unchanged.
    #[cfg(feature = "json")]
    pub fn json<T: serde::Serialize + ?Sized>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(crate::codec::json::encode(value)?);
        Ok(self)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn content_type(mut self, ct: impl Into<String>) -> Self {
        self.content_type = Some(ct.into());
        self
    }

    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout = Some(d);
        self
    }
}

/// Builds the outgoing request. `url` is already resolved and `timeout`
/// already layered.
pub(crate) fn assemble(
    method: Method,
    url: Url,
    meta: RequestMeta,
    args: CallArgs,
    timeout: Option<Duration>,
) -> Result<Request, ApiClientError> {
    let CallArgs {
        body,
        mut headers,
        content_type,
        ..
    } = args;

    match method.body_rule() {
        BodyRule::Forbidden if body.is_some() => {
            return Err(ApiClientError::BodyNotAllowed { method });
        }
        BodyRule::Json if !headers.contains_key(CONTENT_TYPE) => {
            let value = match content_type {
                Some(ct) => HeaderValue::try_from(ct.as_str()).map_err(|_| {
                    ApiClientError::InvalidHeader(format!("content type {ct:?}").into())
                })?,
                None => HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
            };
            headers.insert(CONTENT_TYPE, value);
        }
        _ => {}
    }

    Ok(Request {
        meta,
        method,
        url,
        headers,
        body,
        timeout,
    })
}

/// An endpoint call that has not been awaited yet.
///
/// Awaiting it runs the pipeline; the builder methods tune this single call.
pub struct PendingCall<'a, T> {
    endpoint: &'a BoundEndpoint<T>,
    args: CallArgs,
    debug_level: Option<DebugLevel>,
    timeout_override: TimeoutOverride,
}

impl<'a, T: Send + 'static> PendingCall<'a, T> {
    #[inline]
    pub(crate) fn new(endpoint: &'a BoundEndpoint<T>, args: CallArgs) -> Self {
        Self {
            endpoint,
            args,
            debug_level: None,
            timeout_override: TimeoutOverride::Inherit,
        }
    }

    #[inline]
    pub fn debug_level(mut self, level: DebugLevel) -> Self {
        self.debug_level = Some(level);
        self
    }

    #[inline]
    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout_override = TimeoutOverride::Set(d);
        self
    }

    #[inline]
    pub fn clear_timeout(mut self) -> Self {
        self.timeout_override = TimeoutOverride::Clear;
        self
    }

    #[inline]
    pub fn inherit_timeout(mut self) -> Self {
        self.timeout_override = TimeoutOverride::Inherit;
        self
    }

    pub async fn execute(self) -> Result<T, ApiClientError> {
        let ep = self.endpoint;
        ep.client()
            .execute_with(
                ep.name(),
                ep.descriptor(),
                self.args,
                self.debug_level,
                self.timeout_override,
            )
            .await
    }
}

impl<'a, T: Send + 'static> IntoFuture for PendingCall<'a, T> {
    type Output = Result<T, ApiClientError>;
    type IntoFuture = std::pin::Pin<Box<dyn std::future::Future<Output = Self::Output> + Send + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.execute())
    }
}
