use crate::client::Dispatch;
use crate::debug::DebugLevel;
use crate::error::ApiClientError;
use crate::transport::{BoxFuture, Request, Response};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Wraps the hook-decorated transport call.
///
/// The middleware decides whether and how often `next` runs: zero times to
/// answer on its own, once to pass through, several times to retry.
pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a, Result<Response, ApiClientError>>;
}

impl<F, Fut> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, ApiClientError>> + Send + 'static,
{
    fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a, Result<Response, ApiClientError>> {
        Box::pin(self(req, next))
    }
}

/// The rest of the pipeline for one call: request hooks, transport,
/// response hooks. Cheap to clone; clones share the attempt counter.
#[derive(Clone)]
pub struct Next {
    dispatch: Arc<Dispatch>,
    dbg: DebugLevel,
    attempts: Arc<AtomicU32>,
}

impl Next {
    pub(crate) fn new(dispatch: Arc<Dispatch>, dbg: DebugLevel) -> Self {
        Self {
            dispatch,
            dbg,
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    /// How many times `run` has been entered for this call.
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    pub async fn run(&self, mut req: Request) -> Result<Response, ApiClientError> {
        req.meta.attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;
        self.dispatch.send(req, self.dbg).await
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("dbg", &self.dbg)
            .field("attempts", &self.attempts())
            .finish()
    }
}
