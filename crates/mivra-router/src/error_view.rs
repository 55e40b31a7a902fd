//! Rendering of 404 and 405 outcomes.

use crate::request::{Method, Request};
use crate::response::Response;

/// Renders the responses the router produces itself.
///
/// The router sets the status and the `Allow` header; implementations only
/// choose the body (HTML page, JSON, plain text).
pub trait ErrorView: Send + Sync {
    /// No route matches the path under any method.
    fn not_found(&self, req: &Request) -> Response;

    /// The path matches, but only under `allowed`.
    fn method_not_allowed(&self, req: &Request, allowed: &[Method]) -> Response;
}

/// Plain-text error bodies.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainErrorView;

impl ErrorView for PlainErrorView {
    fn not_found(&self, _req: &Request) -> Response {
        Response::not_found()
    }

    fn method_not_allowed(&self, _req: &Request, _allowed: &[Method]) -> Response {
        Response::method_not_allowed()
    }
}
