//! Middleware support for request/response processing.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::request::Request;
use crate::response::Response;

/// The rest of the chain below a middleware.
///
/// Calling [`Next::run`] hands the request to the next layer (eventually the
/// route handler). Dropping it without calling `run` short-circuits the
/// chain; nothing further down executes.
pub struct Next<'a> {
    inner: &'a (dyn Fn(Request) -> Response + 'a),
}

impl<'a> Next<'a> {
    pub(crate) fn new(inner: &'a (dyn Fn(Request) -> Response + 'a)) -> Self {
        Self { inner }
    }

    /// Continues to the next middleware/handler.
    pub fn run(self, req: Request) -> Response {
        (self.inner)(req)
    }
}

/// Trait for middleware that wraps route handlers.
///
/// Middleware can:
/// - Inspect or modify the request before it reaches the handler
/// - Short-circuit processing by returning its own response
/// - Inspect or modify the response on the way out
///
/// Closures with the signature `Fn(Request, Next<'_>) -> Response` are
/// middleware too.
///
/// # Example
///
/// ```
/// use mivra_router::{Middleware, Next, Request, Response};
///
/// struct RequireJson;
///
/// impl Middleware for RequireJson {
///     fn handle(&self, req: Request, next: Next<'_>) -> Response {
///         if req.header("Accept") != Some("application/json") {
///             return Response::new(406);
///         }
///         next.run(req)
///     }
/// }
/// ```
pub trait Middleware: Send + Sync {
    /// Processes the request, optionally delegating to `next`.
    fn handle(&self, req: Request, next: Next<'_>) -> Response;
}

impl<F> Middleware for F
where
    F: Fn(Request, Next<'_>) -> Response + Send + Sync,
{
    fn handle(&self, req: Request, next: Next<'_>) -> Response {
        self(req, next)
    }
}

/// A composed chain, outermost layer first when called.
type Chain<'a> = Box<dyn Fn(Request) -> Response + 'a>;

/// Wraps `next` in one more middleware layer.
fn wrap<'a>(next: Chain<'a>, mw: Arc<dyn Middleware>) -> Chain<'a> {
    Box::new(move |req: Request| mw.handle(req, Next::new(&*next)))
}

/// Runs `req` through `stack` and then `endpoint`.
///
/// `stack` is in execution order: the first entry sees the request first.
/// The fold starts from the endpoint and wraps it from the innermost layer
/// (last entry) outwards.
pub(crate) fn run_chain<'a>(
    stack: Vec<Arc<dyn Middleware>>,
    endpoint: impl Fn(Request) -> Response + 'a,
    req: Request,
) -> Response {
    let chain = stack
        .into_iter()
        .rev()
        .fold(Box::new(endpoint) as Chain<'a>, wrap);
    chain(req)
}

/// Middleware that logs requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn handle(&self, req: Request, next: Next<'_>) -> Response {
        let method = req.method.clone();
        let path = req.path.clone();
        let started = Instant::now();

        let res = next.run(req);

        info!(
            method = %method,
            path = %path,
            status = res.status,
            elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
            "request handled"
        );
        res
    }
}
