//! Request/response hook bus shared by every endpoint of a client.
//!
//! Handlers run in registration order. Each dispatch iterates a snapshot of
//! the list taken when its phase starts, so subscribing or unsubscribing
//! while calls are in flight never affects those calls.

use crate::error::{ApiClientError, FxError};
use crate::transport::{BoxFuture, Request, Response};
use core::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Phase {
    Request,
    Response,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Request => f.write_str("request"),
            Phase::Response => f.write_str("response"),
        }
    }
}

pub trait RequestHook: Send + Sync + 'static {
    fn on_request<'a>(&'a self, req: Request) -> BoxFuture<'a, Result<Request, FxError>>;
}

pub trait ResponseHook: Send + Sync + 'static {
    fn on_response<'a>(&'a self, resp: Response) -> BoxFuture<'a, Result<Response, FxError>>;
}

impl<F, Fut> RequestHook for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Request, FxError>> + Send + 'static,
{
    fn on_request<'a>(&'a self, req: Request) -> BoxFuture<'a, Result<Request, FxError>> {
        Box::pin(self(req))
    }
}

impl<F, Fut> ResponseHook for F
where
    F: Fn(Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, FxError>> + Send + 'static,
{
    fn on_response<'a>(&'a self, resp: Response) -> BoxFuture<'a, Result<Response, FxError>> {
        Box::pin(self(resp))
    }
}

#[derive(Default)]
struct BusInner {
    request: RwLock<Vec<Arc<dyn RequestHook>>>,
    response: RwLock<Vec<Arc<dyn ResponseHook>>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Removes the first entry that is the very same handler instance.
fn remove_instance<H: ?Sized>(list: &RwLock<Vec<Arc<H>>>, handler: &Arc<H>) -> bool {
    let mut list = write(list);
    match list.iter().position(|h| Arc::ptr_eq(h, handler)) {
        Some(idx) => {
            list.remove(idx);
            true
        }
        None => false,
    }
}

/// Cloning yields another handle to the same bus.
#[derive(Clone, Default)]
pub struct HookBus {
    inner: Arc<BusInner>,
}

impl HookBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_request(&self, hook: impl RequestHook) -> Subscription {
        self.subscribe_request(Arc::new(hook))
    }

    pub fn on_response(&self, hook: impl ResponseHook) -> Subscription {
        self.subscribe_response(Arc::new(hook))
    }

    /// Registers an already shared handler. Registering the same `Arc` twice
    /// makes it run twice; each subscription removes one registration.
    pub fn subscribe_request(&self, hook: Arc<dyn RequestHook>) -> Subscription {
        write(&self.inner.request).push(hook.clone());
        Subscription::new(&self.inner, Registered::Request(hook))
    }

    pub fn subscribe_response(&self, hook: Arc<dyn ResponseHook>) -> Subscription {
        write(&self.inner.response).push(hook.clone());
        Subscription::new(&self.inner, Registered::Response(hook))
    }

    /// Removes one registration of `hook`. Unknown handlers are ignored.
    pub fn off_request(&self, hook: &Arc<dyn RequestHook>) -> bool {
        remove_instance(&self.inner.request, hook)
    }

    pub fn off_response(&self, hook: &Arc<dyn ResponseHook>) -> bool {
        remove_instance(&self.inner.response, hook)
    }

    pub fn len(&self, phase: Phase) -> usize {
        match phase {
            Phase::Request => read(&self.inner.request).len(),
            Phase::Response => read(&self.inner.response).len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len(Phase::Request) == 0 && self.len(Phase::Response) == 0
    }

    /// True when both handles point at the same bus.
    pub fn same_bus(&self, other: &HookBus) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) async fn run_request(&self, mut req: Request) -> Result<Request, ApiClientError> {
        let snapshot: Vec<_> = read(&self.inner.request).clone();
        for hook in snapshot {
            req = hook
                .on_request(req)
                .await
                .map_err(|source| ApiClientError::Hook {
                    phase: Phase::Request,
                    source,
                })?;
        }
        Ok(req)
    }

    pub(crate) async fn run_response(
        &self,
        mut resp: Response,
    ) -> Result<Response, ApiClientError> {
        let snapshot: Vec<_> = read(&self.inner.response).clone();
        for hook in snapshot {
            resp = hook
                .on_response(resp)
                .await
                .map_err(|source| ApiClientError::Hook {
                    phase: Phase::Response,
                    source,
                })?;
        }
        Ok(resp)
    }
}

impl fmt::Debug for HookBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookBus")
            .field("request", &self.len(Phase::Request))
            .field("response", &self.len(Phase::Response))
            .finish()
    }
}

enum Registered {
    Request(Arc<dyn RequestHook>),
    Response(Arc<dyn ResponseHook>),
}

/// Handle returned by `on_request`/`on_response`.
///
/// Dropping it keeps the handler registered; call [`Subscription::unsubscribe`]
/// to remove it. The handle does not keep the bus alive.
pub struct Subscription {
    bus: Weak<BusInner>,
    handler: Registered,
    active: AtomicBool,
}

impl Subscription {
    fn new(bus: &Arc<BusInner>, handler: Registered) -> Self {
        Self {
            bus: Arc::downgrade(bus),
            handler,
            active: AtomicBool::new(true),
        }
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        match self.handler {
            Registered::Request(_) => Phase::Request,
            Registered::Response(_) => Phase::Response,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Idempotent: only the first call removes the registration.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        match &self.handler {
            Registered::Request(h) => {
                remove_instance(&bus.request, h);
            }
            Registered::Response(h) => {
                remove_instance(&bus.response, h);
            }
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("phase", &self.phase())
            .field("active", &self.is_active())
            .finish()
    }
}
