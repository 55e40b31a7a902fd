//! # mivra-router
//!
//! A small regex-based request router.
//!
//! This crate provides:
//! - Path patterns with `{name}` placeholders
//! - Dispatch by method and path, with 404 and 405 outcomes
//! - Global and per-route middleware with short-circuiting
//! - `"Controller@method"` actions resolved through a controller registry
//! - Named routes for URL generation
//! - A JSON route cache that skips registration on later starts
//!
//! ## Quick Start
//!
//! ```
//! use mivra_router::{Action, Request, Response, Router};
//!
//! let mut router = Router::new();
//! router.get("/", Action::callable(|_req, _params| Response::text("Hello, World!")));
//! router
//!     .get("/users/{id}", Action::callable(|_req, params| {
//!         Response::text(format!("User: {}", params.get("id").unwrap_or("unknown")))
//!     }))
//!     .name("user.show");
//!
//! let res = router.dispatch(Request::get("/users/123")).unwrap();
//! assert_eq!(res.body_string().unwrap(), "User: 123");
//! ```
//!
//! ## Path Parameters
//!
//! A placeholder matches one or more characters other than `/`. Patterns
//! match the whole path, so `/users/{id}` matches neither `/users/1/edit`
//! nor `/users/1/`.
//!
//! ## Middleware
//!
//! ```
//! use mivra_router::{Action, LoggingMiddleware, Next, Request, Response, Router};
//!
//! let mut router = Router::new();
//! router.use_middleware(LoggingMiddleware);
//! router
//!     .post("/contact", Action::callable(|_req, _params| Response::ok()))
//!     .middleware(|req: Request, next: Next<'_>| {
//!         if req.input("_csrf").is_none() {
//!             return Response::new(419);
//!         }
//!         next.run(req)
//!     });
//!
//! let res = router.dispatch(Request::post("/contact")).unwrap();
//! assert_eq!(res.status, 419);
//! ```
//!
//! Global middleware runs first, in the order added, then the route's own
//! middleware in declaration order, then the handler.
//!
//! ## Route Cache
//!
//! ```no_run
//! use mivra_router::Router;
//!
//! fn register(router: &mut Router) {
//!     router.get("/", "HomeController@index").name("home");
//! }
//!
//! let mut router = Router::new();
//! if !router.load_cache("storage/routes.json") {
//!     register(&mut router);
//!     router.dump_cache("storage/routes.json").unwrap();
//! }
//! ```

mod cache;
mod controller;
mod error;
mod error_view;
mod middleware;
mod request;
mod response;
mod router;

pub mod path;

pub use cache::{CachedRoute, RouteCache};
pub use controller::{Action, Controller, ControllerRegistry, HandlerFn, parse_descriptor};
pub use error::{Result, RouterError};
pub use error_view::{ErrorView, PlainErrorView};
pub use middleware::{LoggingMiddleware, Middleware, Next};
pub use path::PathPattern;
pub use request::{Method, PathParams, Request};
pub use response::Response;
pub use router::{Match, NamedRoute, Route, RouteHandle, RouteMiddleware, Router};
