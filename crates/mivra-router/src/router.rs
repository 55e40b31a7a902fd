//! Main router implementation.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::RouteCache;
use crate::controller::{Action, Controller, ControllerRegistry};
use crate::error::{Result, RouterError};
use crate::error_view::{ErrorView, PlainErrorView};
use crate::middleware::{Middleware, run_chain};
use crate::path::{PathPattern, expand};
use crate::request::{Method, PathParams, Request};
use crate::response::Response;

/// Per-route middleware, either held directly or looked up by alias.
#[derive(Clone)]
pub enum RouteMiddleware {
    /// A middleware value.
    Inline(Arc<dyn Middleware>),
    /// The name of middleware registered with [`Router::alias`].
    Alias(String),
}

impl fmt::Debug for RouteMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(_) => f.write_str("Inline(<middleware>)"),
            Self::Alias(name) => f.debug_tuple("Alias").field(name).finish(),
        }
    }
}

/// A single route definition.
#[derive(Debug, Clone)]
pub struct Route {
    pub(crate) method: Method,
    pub(crate) pattern: PathPattern,
    pub(crate) action: Action,
    pub(crate) middleware: Vec<RouteMiddleware>,
}

impl Route {
    /// HTTP method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The raw path pattern, e.g. `/users/{id}`.
    pub fn path(&self) -> &str {
        self.pattern.pattern()
    }

    /// The compiled pattern.
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// What the route runs.
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Per-route middleware, in declaration order.
    pub fn middleware(&self) -> &[RouteMiddleware] {
        &self.middleware
    }
}

/// Where a named route points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRoute {
    /// Method the route was registered under.
    pub method: Method,
    /// Raw path pattern.
    pub path: String,
    /// Placeholder names, left to right.
    pub keys: Vec<String>,
}

/// Outcome of matching a method and path against the route table.
#[derive(Debug)]
pub enum Match<'r> {
    /// A route matched both path and method.
    Found {
        /// The winning route.
        route: &'r Route,
        /// Captured placeholder values.
        params: PathParams,
    },
    /// The path matched, but only under these methods.
    MethodNotAllowed(Vec<Method>),
    /// Nothing matched the path.
    NotFound,
}

/// Handle on a route that was just registered.
///
/// Dropping it is fine; it only exists so names and middleware can be
/// chained onto the registration they belong to.
pub struct RouteHandle<'r> {
    router: &'r mut Router,
    method: Method,
    index: usize,
    name: Option<String>,
}

impl RouteHandle<'_> {
    fn route(&mut self) -> &mut Route {
        let bucket = self
            .router
            .routes
            .get_mut(&self.method)
            .expect("handle points at a registered route");
        &mut bucket[self.index]
    }

    /// Names this route for URL generation.
    ///
    /// A route carries one name: naming it again replaces the first name.
    /// Reusing a name already given to another route replaces that entry.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if let Some(previous) = self.name.take() {
            self.router.named.remove(&previous);
        }
        let route = self.route();
        let entry = NamedRoute {
            method: route.method,
            path: route.path().to_string(),
            keys: route.pattern.param_names().to_vec(),
        };

        if let Some(previous) = self.router.named.insert(name.clone(), entry) {
            warn!(
                name = %name,
                previous = %previous.path,
                "route name reused; previous entry replaced"
            );
        }
        self.name = Some(name);
        self
    }

    /// Adds per-route middleware.
    pub fn middleware(mut self, mw: impl Middleware + 'static) -> Self {
        self.route().middleware.push(RouteMiddleware::Inline(Arc::new(mw)));
        self
    }

    /// Adds per-route middleware registered under `alias`.
    pub fn middleware_alias(mut self, alias: impl Into<String>) -> Self {
        self.route().middleware.push(RouteMiddleware::Alias(alias.into()));
        self
    }
}

/// The application router.
///
/// Routes live in one bucket per method, in registration order. Dispatch
/// scans the buckets and the first route whose pattern and method both
/// match wins.
///
/// # Example
///
/// ```
/// use mivra_router::{Action, Controller, Request, Response, Router};
///
/// let mut router = Router::new();
/// router.controller("UserController", || {
///     Controller::new().action("show", |_req: &Request, params: &mivra_router::PathParams| {
///         Response::text(format!("user {}", params.get("id").unwrap_or("?")))
///     })
/// });
/// router.get("/users/{id}", "UserController@show").name("user.show");
/// router.get("/health", Action::callable(|_req, _params| Response::text("ok")));
///
/// let res = router.dispatch(Request::get("/users/42")).unwrap();
/// assert_eq!(res.body_string().unwrap(), "user 42");
/// assert_eq!(router.url("user.show", &[("id", "a b")]).unwrap(), "/users/a%20b");
/// ```
pub struct Router {
    pub(crate) routes: BTreeMap<Method, Vec<Route>>,
    pub(crate) named: HashMap<String, NamedRoute>,
    middleware: Vec<Arc<dyn Middleware>>,
    aliases: HashMap<String, Arc<dyn Middleware>>,
    controllers: ControllerRegistry,
    error_view: Arc<dyn ErrorView>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("named", &self.named)
            .field("middleware", &self.middleware.len())
            .field("aliases", &self.aliases.keys().collect::<Vec<_>>())
            .field("controllers", &self.controllers)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Creates a new empty router.
    pub fn new() -> Self {
        Self {
            routes: BTreeMap::new(),
            named: HashMap::new(),
            middleware: Vec::new(),
            aliases: HashMap::new(),
            controllers: ControllerRegistry::new(),
            error_view: Arc::new(PlainErrorView),
        }
    }

    /// Adds a GET route.
    pub fn get(&mut self, path: &str, action: impl Into<Action>) -> RouteHandle<'_> {
        self.route(Method::Get, path, action)
    }

    /// Adds a POST route.
    pub fn post(&mut self, path: &str, action: impl Into<Action>) -> RouteHandle<'_> {
        self.route(Method::Post, path, action)
    }

    /// Adds a PUT route.
    pub fn put(&mut self, path: &str, action: impl Into<Action>) -> RouteHandle<'_> {
        self.route(Method::Put, path, action)
    }

    /// Adds a DELETE route.
    pub fn delete(&mut self, path: &str, action: impl Into<Action>) -> RouteHandle<'_> {
        self.route(Method::Delete, path, action)
    }

    /// Adds a route with any method.
    ///
    /// # Panics
    ///
    /// Panics if the pattern cannot be compiled. Routes are registered at
    /// startup, so this surfaces before any request is served.
    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        action: impl Into<Action>,
    ) -> RouteHandle<'_> {
        let pattern =
            PathPattern::new(path).unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        let bucket = self.routes.entry(method).or_default();
        bucket.push(Route {
            method,
            pattern,
            action: action.into(),
            middleware: Vec::new(),
        });
        let index = bucket.len() - 1;

        RouteHandle {
            router: self,
            method,
            index,
            name: None,
        }
    }

    /// Adds global middleware.
    ///
    /// Global middleware wraps every route, in the order added, outside any
    /// per-route middleware.
    pub fn use_middleware(&mut self, mw: impl Middleware + 'static) -> &mut Self {
        self.middleware.push(Arc::new(mw));
        self
    }

    /// Registers middleware that routes can reference by name.
    pub fn alias(&mut self, name: impl Into<String>, mw: impl Middleware + 'static) -> &mut Self {
        self.aliases.insert(name.into(), Arc::new(mw));
        self
    }

    /// Registers a controller factory for `Name@method` actions.
    ///
    /// The factory runs the first time a request reaches one of the
    /// controller's actions through the middleware chain, and not at all if
    /// middleware answers first.
    pub fn controller<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Controller + Send + Sync + 'static,
    {
        self.controllers.register(name, factory);
        self
    }

    /// Replaces the renderer for 404 and 405 responses.
    pub fn error_view(&mut self, view: impl ErrorView + 'static) -> &mut Self {
        self.error_view = Arc::new(view);
        self
    }

    /// Iterates over all routes, method bucket by method bucket.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values().flatten()
    }

    /// Returns the named-route index.
    pub fn named_routes(&self) -> &HashMap<String, NamedRoute> {
        &self.named
    }

    /// Returns true when no route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.values().all(Vec::is_empty)
    }

    /// Generates a URL for a named route.
    ///
    /// Placeholders without a supplied value stay in the output as literal
    /// `{key}` text.
    pub fn url(&self, name: &str, params: &[(&str, &str)]) -> Result<String> {
        let named = self
            .named
            .get(name)
            .ok_or_else(|| RouterError::RouteNotFound(name.to_string()))?;
        Ok(expand(&named.path, params))
    }

    /// Matches a method and path against the route table.
    ///
    /// A path match under another method is remembered but does not stop
    /// the scan, so an exact match in a later bucket still wins.
    pub fn find(&self, method: &str, path: &str) -> Match<'_> {
        let mut allowed = Vec::new();

        for (m, group) in &self.routes {
            for route in group {
                let Some(params) = route.pattern.match_path(path) else {
                    continue;
                };
                if m.as_str() == method {
                    return Match::Found { route, params };
                }
                if !allowed.contains(m) {
                    allowed.push(*m);
                }
            }
        }

        if allowed.is_empty() {
            Match::NotFound
        } else {
            Match::MethodNotAllowed(allowed)
        }
    }

    /// Handles an incoming request.
    ///
    /// Unmatched paths and methods are answered with 404 and 405 responses.
    /// An `Err` means the route table itself is misconfigured: an action
    /// that cannot be resolved or an unknown middleware alias. Malformed
    /// descriptors, unregistered controllers and unknown aliases are caught
    /// before any middleware runs; a missing action on a registered
    /// controller only once the chain reaches the handler.
    pub fn dispatch(&self, req: Request) -> Result<Response> {
        match self.find(&req.method, &req.path) {
            Match::Found { route, params } => {
                debug!(
                    method = %req.method,
                    path = %req.path,
                    route = %route.path(),
                    action = %route.action,
                    "route matched"
                );
                if let Action::Symbol(descriptor) = &route.action {
                    self.controllers.check(descriptor)?;
                }
                let stack = self.stack_for(route)?;

                let failure = RefCell::new(None);
                let res = run_chain(
                    stack,
                    |req| match self.controllers.handler(&route.action) {
                        Ok(handler) => handler(&req, &params),
                        Err(e) => {
                            failure.replace(Some(e));
                            Response::new(500)
                        }
                    },
                    req,
                );
                failure.into_inner().map_or(Ok(res), Err)
            }
            Match::MethodNotAllowed(allowed) => {
                let allow = allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                debug!(method = %req.method, path = %req.path, allow = %allow, "method not allowed");
                Ok(self
                    .error_view
                    .method_not_allowed(&req, &allowed)
                    .status(405)
                    .header("Allow", allow))
            }
            Match::NotFound => {
                debug!(method = %req.method, path = %req.path, "no route matched");
                Ok(self.error_view.not_found(&req).status(404))
            }
        }
    }

    /// Global middleware followed by the route's own, in execution order.
    fn stack_for(&self, route: &Route) -> Result<Vec<Arc<dyn Middleware>>> {
        let mut stack = self.middleware.clone();
        for mw in &route.middleware {
            let mw = match mw {
                RouteMiddleware::Inline(mw) => Arc::clone(mw),
                RouteMiddleware::Alias(name) => self
                    .aliases
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RouterError::UnknownMiddleware(name.clone()))?,
            };
            stack.push(mw);
        }
        Ok(stack)
    }

    /// Writes the route table and named index to `path`.
    ///
    /// Fails if any route holds a callable action or inline middleware,
    /// since neither can be rebuilt from a file.
    pub fn dump_cache(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let cache = RouteCache::from_router(self)?;
        cache.write(path)?;
        info!(
            path = %path.display(),
            routes = cache.route_count(),
            named = cache.named.len(),
            "route cache written"
        );
        Ok(())
    }

    /// Replaces the route table and named index with the cache at `path`.
    ///
    /// Returns false, leaving the router untouched, when the file is
    /// missing or does not hold a valid snapshot. Callers then register
    /// routes the normal way.
    pub fn load_cache(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match RouteCache::read(path).and_then(RouteCache::into_tables) {
            Ok((routes, named)) => {
                self.routes = routes;
                self.named = named;
                info!(path = %path.display(), "route cache loaded");
                true
            }
            Err(RouterError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no route cache");
                false
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring route cache");
                false
            }
        }
    }

    /// Deletes the cache file at `path`, if there is one.
    ///
    /// Returns whether a file was removed.
    pub fn clear_cache(path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => {
                info!(path = %path.display(), "route cache cleared");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::middleware::Next;

    fn text(body: &'static str) -> Action {
        Action::callable(move |_req, _params| Response::text(body))
    }

    fn echo_id(_req: &Request, params: &PathParams) -> Response {
        Response::text(params.get("id").unwrap_or("none").to_string())
    }

    #[test]
    fn test_basic_routing() {
        let mut router = Router::new();
        router.get("/", text("home"));
        router.get("/users/{id}", Action::callable(echo_id));

        let res = router.dispatch(Request::get("/")).unwrap();
        assert_eq!(res.status, 200);
        assert_eq!(res.body_string(), Some("home".to_string()));

        let res = router.dispatch(Request::get("/users/123?tab=posts")).unwrap();
        assert_eq!(res.body_string(), Some("123".to_string()));
    }

    #[test]
    fn test_first_registered_wins() {
        let mut router = Router::new();
        router.get("/users/{id}", text("by id"));
        router.get("/users/me", text("me"));

        let res = router.dispatch(Request::get("/users/me")).unwrap();
        assert_eq!(res.body_string(), Some("by id".to_string()));
    }

    #[test]
    fn test_not_found() {
        let mut router = Router::new();
        router.get("/", text("home"));

        let res = router.dispatch(Request::new("DELETE", "/missing")).unwrap();
        assert_eq!(res.status, 404);
        assert!(res.header_value("Allow").is_none());
        assert!(matches!(router.find("GET", "/missing"), Match::NotFound));
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let mut router = Router::new();
        router.get("/items/{id}", text("get"));
        router.post("/items/{id}", text("post"));
        router.post("/items/{slug}", text("post again"));

        let res = router.dispatch(Request::new("PUT", "/items/5")).unwrap();
        assert_eq!(res.status, 405);
        assert_eq!(res.header_value("Allow"), Some("GET, POST"));

        match router.find("PUT", "/items/5") {
            Match::MethodNotAllowed(allowed) => {
                assert_eq!(allowed, [Method::Get, Method::Post]);
            }
            other => panic!("expected 405, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_match_in_later_bucket_beats_405() {
        let mut router = Router::new();
        router.get("/contact", text("show"));
        router.delete("/contact", text("delete"));

        let res = router.dispatch(Request::new("DELETE", "/contact")).unwrap();
        assert_eq!(res.status, 200);
        assert_eq!(res.body_string(), Some("delete".to_string()));
    }

    #[test]
    fn test_unknown_verb_gets_405_when_path_matches() {
        let mut router = Router::new();
        router.get("/", text("home"));

        let res = router.dispatch(Request::new("PATCH", "/")).unwrap();
        assert_eq!(res.status, 405);
        assert_eq!(res.header_value("Allow"), Some("GET"));
    }

    #[test]
    fn test_middleware_order_and_short_circuit() {
        let log = Arc::new(Mutex::new(Vec::<&'static str>::new()));
        let layer = |label: &'static str, pass: bool| {
            let log = Arc::clone(&log);
            move |req: Request, next: Next<'_>| {
                log.lock().unwrap().push(label);
                if pass { next.run(req) } else { Response::new(419) }
            }
        };

        let handler_log = Arc::clone(&log);
        let mut router = Router::new();
        router.use_middleware(layer("A", true));
        router.use_middleware(layer("B", true));
        router
            .post(
                "/contact",
                Action::callable(move |_req, _params| {
                    handler_log.lock().unwrap().push("handler");
                    Response::ok()
                }),
            )
            .middleware(layer("C", true))
            .middleware(layer("D", true));

        let res = router.dispatch(Request::post("/contact")).unwrap();
        assert_eq!(res.status, 200);
        assert_eq!(*log.lock().unwrap(), ["A", "B", "C", "D", "handler"]);

        log.lock().unwrap().clear();
        let mut router = Router::new();
        router.use_middleware(layer("A", true));
        router.use_middleware(layer("B", false));
        router
            .post("/contact", text("unreachable"))
            .middleware(layer("C", true))
            .middleware(layer("D", true));

        let res = router.dispatch(Request::post("/contact")).unwrap();
        assert_eq!(res.status, 419);
        assert_eq!(*log.lock().unwrap(), ["A", "B"]);
    }

    #[test]
    fn test_middleware_alias() {
        let mut router = Router::new();
        router.alias("deny", |_req: Request, _next: Next<'_>| Response::new(403));
        router.get("/admin", text("secret")).middleware_alias("deny");
        router.get("/broken", text("never")).middleware_alias("missing");

        let res = router.dispatch(Request::get("/admin")).unwrap();
        assert_eq!(res.status, 403);

        let err = router.dispatch(Request::get("/broken")).unwrap_err();
        assert!(matches!(err, RouterError::UnknownMiddleware(name) if name == "missing"));
    }

    #[test]
    fn test_controller_actions() {
        let mut router = Router::new();
        router.controller("UserController", || {
            Controller::new().action("show", echo_id)
        });
        router.get("/users/{id}", "UserController@show");
        router.get("/posts/{id}", "PostController@show");
        router.get("/bad", "not-an-action");

        let res = router.dispatch(Request::get("/users/9")).unwrap();
        assert_eq!(res.body_string(), Some("9".to_string()));

        assert!(matches!(
            router.dispatch(Request::get("/posts/1")),
            Err(RouterError::ControllerNotFound(_))
        ));
        assert!(matches!(
            router.dispatch(Request::get("/bad")),
            Err(RouterError::InvalidAction(_))
        ));
    }

    #[test]
    fn test_named_routes_and_url() {
        let mut router = Router::new();
        router.get("/contact", text("show")).name("contact.show");
        router.post("/contact", text("submit")).name("contact.submit");
        router.get("/users/{id}", Action::callable(echo_id)).name("user.show");

        assert_eq!(router.url("contact.submit", &[]).unwrap(), "/contact");
        assert_eq!(
            router.url("user.show", &[("id", "a b")]).unwrap(),
            "/users/a%20b"
        );
        assert_eq!(router.url("user.show", &[]).unwrap(), "/users/{id}");
        assert!(matches!(
            router.url("nope", &[]),
            Err(RouterError::RouteNotFound(name)) if name == "nope"
        ));

        let named = &router.named_routes()["contact.submit"];
        assert_eq!(named.method, Method::Post);
        assert!(named.keys.is_empty());
        assert_eq!(router.named_routes()["user.show"].keys, ["id"]);
    }

    #[test]
    fn test_duplicate_name_last_wins() {
        let mut router = Router::new();
        router.get("/old", text("old")).name("page");
        router.get("/new", text("new")).name("page");

        assert_eq!(router.url("page", &[]).unwrap(), "/new");
        assert_eq!(router.named_routes().len(), 1);
    }

    #[test]
    fn test_renaming_a_route_replaces_its_name() {
        let mut router = Router::new();
        router.get("/a", text("a")).name("first").name("second");

        assert!(router.url("first", &[]).is_err());
        assert_eq!(router.url("second", &[]).unwrap(), "/a");
        assert_eq!(router.named_routes().len(), 1);
    }

    #[test]
    fn test_controller_built_only_when_chain_reaches_it() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let mut router = Router::new();
        router.controller("HomeController", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Controller::new().action("index", echo_id)
        });
        router.alias("expired", |_req: Request, _next: Next<'_>| Response::new(419));
        router.get("/", "HomeController@index").middleware_alias("expired");
        router.get("/open", "HomeController@index");
        router.get("/missing", "HomeController@missing").middleware_alias("expired");

        assert_eq!(router.dispatch(Request::get("/")).unwrap().status, 419);
        assert_eq!(router.dispatch(Request::get("/missing")).unwrap().status, 419);
        assert_eq!(built.load(Ordering::SeqCst), 0);

        assert_eq!(router.dispatch(Request::get("/open")).unwrap().status, 200);
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unnamed_registration_leaves_index_alone() {
        let mut router = Router::new();
        router.get("/a", text("a"));
        router.get("/b", text("b")).name("b");
        router.get("/c", text("c"));

        assert_eq!(router.named_routes().len(), 1);
        assert_eq!(router.url("b", &[]).unwrap(), "/b");
    }

    #[test]
    fn test_custom_error_view() {
        struct JsonErrors;

        impl ErrorView for JsonErrors {
            fn not_found(&self, req: &Request) -> Response {
                Response::json(&serde_json::json!({ "missing": req.path() }))
            }

            fn method_not_allowed(&self, _req: &Request, allowed: &[Method]) -> Response {
                Response::json(&serde_json::json!({ "allowed": allowed }))
            }
        }

        let mut router = Router::new();
        router.error_view(JsonErrors);
        router.get("/", text("home"));

        let res = router.dispatch(Request::get("/nope")).unwrap();
        assert_eq!(res.status, 404);
        assert_eq!(res.body_string(), Some(r#"{"missing":"/nope"}"#.to_string()));

        let res = router.dispatch(Request::post("/")).unwrap();
        assert_eq!(res.status, 405);
        assert_eq!(res.body_string(), Some(r#"{"allowed":["GET"]}"#.to_string()));
    }

    #[test]
    fn test_routes_iterate_in_bucket_order() {
        let mut router = Router::new();
        assert!(router.is_empty());
        router.delete("/x", text("d"));
        router.get("/y", text("g"));
        router.get("/x", text("g2"));

        let listed: Vec<_> = router.routes().map(|r| (r.method(), r.path())).collect();
        assert_eq!(
            listed,
            [(Method::Get, "/y"), (Method::Get, "/x"), (Method::Delete, "/x")]
        );
    }

    #[test]
    fn test_router_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Router>();
    }
}
