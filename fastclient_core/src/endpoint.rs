use crate::client::Client;
use crate::error::{ApiClientError, FxError};
use crate::method::Method;
use crate::request::{CallArgs, PendingCall};
use crate::template::PathTemplate;
use crate::transport::{BoxFuture, Response};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Turns a raw response into the endpoint's output.
pub trait ResponseParser<T>: Send + Sync + 'static {
    fn parse<'a>(&'a self, resp: Response) -> BoxFuture<'a, Result<T, FxError>>;
}

impl<T, F, Fut> ResponseParser<T> for F
where
    F: Fn(Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FxError>> + Send + 'static,
{
    fn parse<'a>(&'a self, resp: Response) -> BoxFuture<'a, Result<T, FxError>> {
        Box::pin(self(resp))
    }
}

enum Parser<T> {
    /// No parser: the output is the response itself.
    Raw(fn(Response) -> T),
    Custom(Arc<dyn ResponseParser<T>>),
}

impl<T> Clone for Parser<T> {
    fn clone(&self) -> Self {
        match self {
            Parser::Raw(f) => Parser::Raw(*f),
            Parser::Custom(p) => Parser::Custom(p.clone()),
        }
    }
}

fn identity(resp: Response) -> Response {
    resp
}

/// Method + path template + optional parser. Immutable once bound.
pub struct EndpointDescriptor<T = Response> {
    method: Method,
    path: PathTemplate,
    parser: Parser<T>,
    timeout: Option<Duration>,
    name: Option<Cow<'static, str>>,
}

impl<T> Clone for EndpointDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            path: self.path.clone(),
            parser: self.parser.clone(),
            timeout: self.timeout,
            name: self.name.clone(),
        }
    }
}

impl EndpointDescriptor<Response> {
    pub fn new(method: Method, path: impl Into<PathTemplate>) -> Self {
        Self {
            method,
            path: path.into(),
            parser: Parser::Raw(identity),
            timeout: None,
            name: None,
        }
    }

    pub fn get(path: impl Into<PathTemplate>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn head(path: impl Into<PathTemplate>) -> Self {
        Self::new(Method::Head, path)
    }

    pub fn post(path: impl Into<PathTemplate>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<PathTemplate>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<PathTemplate>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn patch(path: impl Into<PathTemplate>) -> Self {
        Self::new(Method::Patch, path)
    }
}

impl<T: 'static> EndpointDescriptor<T> {
    /// Replaces the parser; the descriptor now yields `U`.
    pub fn with_parser<U: 'static>(self, parser: impl ResponseParser<U>) -> EndpointDescriptor<U> {
        EndpointDescriptor {
            method: self.method,
            path: self.path,
            parser: Parser::Custom(Arc::new(parser)),
            timeout: self.timeout,
            name: self.name,
        }
    }

    #[cfg(feature = "json")]
    pub fn json<U>(self) -> EndpointDescriptor<U>
    where
        U: serde::de::DeserializeOwned + Send + 'static,
    {
        self.with_parser::<U>(crate::codec::json::Json::<U>::new())
    }

    pub fn text(self) -> EndpointDescriptor<String> {
        self.with_parser::<String>(crate::codec::text::Text)
    }

    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout = Some(d);
        self
    }

    /// Name used in logs and errors for ad hoc endpoints.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn method(&self) -> Method {
        self.method
    }

    #[inline]
    pub fn path(&self) -> &PathTemplate {
        &self.path
    }

    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    #[inline]
    pub fn has_parser(&self) -> bool {
        matches!(self.parser, Parser::Custom(_))
    }

    pub(crate) fn display_name(&self) -> String {
        match &self.name {
            Some(n) => n.to_string(),
            None => format!("{} {}", self.method, self.path),
        }
    }

    pub(crate) async fn parse(&self, resp: Response) -> Result<T, ApiClientError> {
        match &self.parser {
            Parser::Raw(f) => Ok(f(resp)),
            Parser::Custom(p) => {
                let headers = resp.headers.clone();
                let body = resp.body.clone();
                p.parse(resp).await.map_err(|source| ApiClientError::Parse {
                    source,
                    body: crate::error::body_as_text(&headers, &body, Some(body.len())),
                })
            }
        }
    }
}

impl<T: 'static> std::fmt::Debug for EndpointDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointDescriptor")
            .field("method", &self.method)
            .field("path", &self.path.as_str())
            .field("parser", &self.has_parser())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Named descriptors waiting to be bound to a client.
pub struct EndpointRegistry<T = Response> {
    entries: BTreeMap<String, EndpointDescriptor<T>>,
}

impl<T> Default for EndpointRegistry<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> Clone for EndpointRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T> EndpointRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the descriptor previously registered under `name`, if any.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        descriptor: EndpointDescriptor<T>,
    ) -> Option<EndpointDescriptor<T>> {
        self.entries.insert(name.into(), descriptor)
    }

    pub fn with(mut self, name: impl Into<String>, descriptor: EndpointDescriptor<T>) -> Self {
        self.register(name, descriptor);
        self
    }

    pub fn get(&self, name: &str) -> Option<&EndpointDescriptor<T>> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (String, EndpointDescriptor<T>)> {
        self.entries.into_iter()
    }
}

/// A descriptor bound to a client: the callable endpoint.
pub struct BoundEndpoint<T = Response> {
    client: Client,
    name: Arc<str>,
    descriptor: Arc<EndpointDescriptor<T>>,
}

impl<T> Clone for BoundEndpoint<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            name: self.name.clone(),
            descriptor: self.descriptor.clone(),
        }
    }
}

impl<T: Send + 'static> BoundEndpoint<T> {
    pub(crate) fn new(client: Client, name: Arc<str>, descriptor: EndpointDescriptor<T>) -> Self {
        Self {
            client,
            name,
            descriptor: Arc::new(descriptor),
        }
    }

    #[inline]
    pub fn call(&self, args: CallArgs) -> PendingCall<'_, T> {
        PendingCall::new(self, args)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn descriptor(&self) -> &EndpointDescriptor<T> {
        &self.descriptor
    }

    #[inline]
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Every endpoint of a registry, bound to one client.
pub struct Endpoints<T = Response> {
    bound: BTreeMap<String, BoundEndpoint<T>>,
}

impl<T> Clone for Endpoints<T> {
    fn clone(&self) -> Self {
        Self {
            bound: self.bound.clone(),
        }
    }
}

impl<T: Send + 'static> Endpoints<T> {
    pub(crate) fn new(bound: BTreeMap<String, BoundEndpoint<T>>) -> Self {
        Self { bound }
    }

    pub fn get(&self, name: &str) -> Option<&BoundEndpoint<T>> {
        self.bound.get(name)
    }

    pub fn endpoint(&self, name: &str) -> Result<&BoundEndpoint<T>, ApiClientError> {
        self.get(name)
            .ok_or_else(|| ApiClientError::UnknownEndpoint(name.to_string()))
    }

    pub async fn call(&self, name: &str, args: CallArgs) -> Result<T, ApiClientError> {
        self.endpoint(name)?.call(args).await
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bound.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bound.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}
