use crate::codec::Format;
use crate::debug::{DebugLevel, DebugSink, TracingDebugSink};
use crate::endpoint::{BoundEndpoint, EndpointDescriptor, EndpointRegistry, Endpoints};
use crate::error::ApiClientError;
use crate::hooks::{HookBus, RequestHook, ResponseHook, Subscription};
use crate::middleware::{Middleware, Next};
use crate::request::{CallArgs, assemble};
use crate::template::resolve_url;
use crate::timeout::{TimeoutOverride, layered};
use crate::transport::{self, Request, RequestMeta, Response, Transport};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const MAX_DEBUG_BODY_CHARS: usize = 32 * 1024;

/// Everything a client is built from. Cloning is cheap; one config can
/// produce any number of independent clients.
#[derive(Clone)]
pub struct ClientConfig {
    base: String,
    transport: Option<Arc<dyn Transport>>,
    middleware: Option<Arc<dyn Middleware>>,
    hooks: Option<HookBus>,
    timeout: Option<Duration>,
    debug_level: DebugLevel,
    debug_sink: Arc<dyn DebugSink>,
    strict_placeholders: bool,
}

impl ClientConfig {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            transport: None,
            middleware: None,
            hooks: None,
            timeout: None,
            debug_level: DebugLevel::default(),
            debug_sink: Arc::new(TracingDebugSink),
            strict_placeholders: false,
        }
    }

    #[inline]
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn with_transport(self, transport: impl Transport) -> Self {
        self.with_shared_transport(Arc::new(transport))
    }

    pub fn with_shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_middleware(self, middleware: impl Middleware) -> Self {
        self.with_shared_middleware(Arc::new(middleware))
    }

    pub fn with_shared_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware = Some(middleware);
        self
    }

    /// Makes the client use `bus` instead of a fresh one. Clients built with
    /// the same bus observe the same hooks.
    pub fn with_hook_bus(mut self, bus: HookBus) -> Self {
        self.hooks = Some(bus);
        self
    }

    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout = Some(d);
        self
    }

    pub fn with_debug_level(mut self, level: DebugLevel) -> Self {
        self.debug_level = level;
        self
    }

    pub fn with_debug_sink(mut self, sink: impl DebugSink) -> Self {
        self.debug_sink = Arc::new(sink);
        self
    }

    /// Fail calls whose path leaves a `{placeholder}` unresolved instead of
    /// sending the literal text.
    pub fn with_strict_placeholders(mut self, strict: bool) -> Self {
        self.strict_placeholders = strict;
        self
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base", &self.base)
            .field("transport", &self.transport.is_some())
            .field("middleware", &self.middleware.is_some())
            .field("timeout", &self.timeout)
            .field("debug_level", &self.debug_level)
            .field("strict_placeholders", &self.strict_placeholders)
            .finish()
    }
}

/// Request hooks → transport → response hooks, with diagnostics.
pub(crate) struct Dispatch {
    hooks: HookBus,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn DebugSink>,
}

impl Dispatch {
    pub(crate) async fn send(&self, req: Request, dbg: DebugLevel) -> Result<Response, ApiClientError> {
        let req = self.hooks.run_request(req).await?;
        self.log_request(dbg, &req);
        let resp = self.transport.send(req).await?;
        self.log_response(dbg, &resp);
        self.hooks.run_response(resp).await
    }

    fn log_request(&self, dbg: DebugLevel, req: &Request) {
        if !dbg.is_verbose() {
            return;
        }
        self.sink.request_start(
            dbg,
            req.method,
            req.url.as_str(),
            &req.meta.endpoint,
            req.meta.attempt,
        );
        if dbg.is_very_verbose() {
            self.sink.request_headers(dbg, &req.headers);
            if let Some(body) = req.body.as_ref() {
                let format = Format::from_headers(&req.headers);
                self.sink.request_body(dbg, body, format, MAX_DEBUG_BODY_CHARS);
            }
        }
    }

    fn log_response(&self, dbg: DebugLevel, resp: &Response) {
        if !dbg.is_verbose() {
            return;
        }
        self.sink
            .response_status(dbg, resp.status, resp.url.as_str(), resp.is_success());
        if dbg.is_very_verbose() {
            self.sink.response_headers(dbg, &resp.headers);
            let format = Format::from_headers(&resp.headers);
            self.sink
                .response_body(dbg, &resp.body, format, MAX_DEBUG_BODY_CHARS);
        }
    }
}

struct ClientInner {
    base: Url,
    dispatch: Arc<Dispatch>,
    middleware: Option<Arc<dyn Middleware>>,
    timeout: Option<Duration>,
    debug_level: DebugLevel,
    strict_placeholders: bool,
}

/// Cloning yields another handle to the same client (same hooks, transport
/// and middleware).
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

fn parse_base(base: &str) -> Result<Url, ApiClientError> {
    let url = Url::parse(base)?;
    if url.cannot_be_a_base() || !url.has_host() {
        return Err(ApiClientError::InvalidBaseUrl {
            base: base.to_string(),
            reason: "base must carry a scheme and a host",
        });
    }
    Ok(url)
}

impl Client {
    /// Resolves the transport now, so a missing transport fails here and
    /// not on the first call.
    pub fn new(config: ClientConfig) -> Result<Self, ApiClientError> {
        let base = parse_base(&config.base)?;
        let transport = transport::resolve(config.transport)?;
        let dispatch = Dispatch {
            hooks: config.hooks.unwrap_or_default(),
            transport,
            sink: config.debug_sink,
        };
        Ok(Self {
            inner: Arc::new(ClientInner {
                base,
                dispatch: Arc::new(dispatch),
                middleware: config.middleware,
                timeout: config.timeout,
                debug_level: config.debug_level,
                strict_placeholders: config.strict_placeholders,
            }),
        })
    }

    #[inline]
    pub fn base(&self) -> &Url {
        &self.inner.base
    }

    #[inline]
    pub fn hooks(&self) -> &HookBus {
        &self.inner.dispatch.hooks
    }

    #[inline]
    pub fn debug_level(&self) -> DebugLevel {
        self.inner.debug_level
    }

    #[inline]
    pub fn on_request(&self, hook: impl RequestHook) -> Subscription {
        self.hooks().on_request(hook)
    }

    #[inline]
    pub fn on_response(&self, hook: impl ResponseHook) -> Subscription {
        self.hooks().on_response(hook)
    }

    /// Binds one descriptor outside any registry.
    pub fn endpoint<T: Send + 'static>(&self, descriptor: EndpointDescriptor<T>) -> BoundEndpoint<T> {
        let name = descriptor.display_name();
        self.bind_one(name.into(), descriptor)
    }

    /// Binds every descriptor of `registry` to this client.
    pub fn bind<T: Send + 'static>(&self, registry: EndpointRegistry<T>) -> Endpoints<T> {
        let bound: BTreeMap<String, BoundEndpoint<T>> = registry
            .into_entries()
            .map(|(name, descriptor)| {
                let ep = self.bind_one(name.as_str().into(), descriptor);
                (name, ep)
            })
            .collect();
        Endpoints::new(bound)
    }

    fn bind_one<T: Send + 'static>(
        &self,
        name: Arc<str>,
        descriptor: EndpointDescriptor<T>,
    ) -> BoundEndpoint<T> {
        for warning in descriptor.path().warnings() {
            self.inner
                .dispatch
                .sink
                .template_warning(&name, descriptor.path().as_str(), &warning);
        }
        BoundEndpoint::new(self.clone(), name, descriptor)
    }

    /// Runs `descriptor` once without binding it.
    pub async fn execute<T: Send + 'static>(
        &self,
        descriptor: &EndpointDescriptor<T>,
        args: CallArgs,
    ) -> Result<T, ApiClientError> {
        let name = descriptor.display_name();
        self.execute_with(&name, descriptor, args, None, TimeoutOverride::Inherit)
            .await
    }

    pub(crate) async fn execute_with<T: Send + 'static>(
        &self,
        name: &str,
        descriptor: &EndpointDescriptor<T>,
        args: CallArgs,
        debug_level: Option<DebugLevel>,
        timeout_override: TimeoutOverride,
    ) -> Result<T, ApiClientError> {
        let dbg = debug_level.unwrap_or(self.inner.debug_level);
        let req = self
            .build_request(name, descriptor, args, timeout_override)
            .map_err(|e| ApiClientError::in_endpoint(name, e))?;

        let next = Next::new(self.inner.dispatch.clone(), dbg);
        let resp = match &self.inner.middleware {
            Some(middleware) => middleware.handle(req, next).await,
            None => next.run(req).await,
        }
        .map_err(|e| ApiClientError::in_endpoint(name, e))?;

        descriptor
            .parse(resp)
            .await
            .map_err(|e| ApiClientError::in_endpoint(name, e))
    }

    fn build_request<T: 'static>(
        &self,
        name: &str,
        descriptor: &EndpointDescriptor<T>,
        args: CallArgs,
        timeout_override: TimeoutOverride,
    ) -> Result<Request, ApiClientError> {
        let url = resolve_url(
            descriptor.path(),
            &args.path,
            &args.query,
            &self.inner.base,
            self.inner.strict_placeholders,
        )?;
        let timeout = layered(self.inner.timeout, descriptor.timeout(), args.timeout);
        let mut req = assemble(descriptor.method(), url, RequestMeta::new(name), args, timeout)?;
        req.timeout = timeout_override.apply(req.timeout);
        Ok(req)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base", &self.inner.base.as_str())
            .field("hooks", self.hooks())
            .field("middleware", &self.inner.middleware.is_some())
            .finish()
    }
}
