//! Application bootstrap.

use std::path::PathBuf;

use mivra_router::{LoggingMiddleware, Result, Router};
use tracing::info;

use crate::{controllers, routes};

/// Startup options.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Route cache to load instead of registering routes, if present.
    pub route_cache: Option<PathBuf>,
}

/// Where the route table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
    /// Loaded from the route cache.
    Cache,
    /// Built by running the route definitions.
    Registered,
}

/// A ready-to-dispatch application.
#[derive(Debug)]
pub struct App {
    /// The configured router.
    pub router: Router,
    /// How the route table was obtained.
    pub source: RouteSource,
}

/// Builds the router: middleware aliases, routes and controllers.
///
/// Routes come from the configured cache when it loads, and from
/// [`routes::web`] otherwise.
pub fn build(config: &AppConfig) -> Result<App> {
    let mut router = Router::new();
    router.alias("log", LoggingMiddleware);

    let source = match &config.route_cache {
        Some(path) if router.load_cache(path) => RouteSource::Cache,
        _ => {
            routes::web(&mut router);
            RouteSource::Registered
        }
    };

    let contact_url = router.url("contact.show", &[])?;
    let submit_url = router.url("contact.submit", &[])?;
    router.controller("HomeController", move || controllers::home(contact_url.clone()));
    router.controller("ContactController", move || controllers::contact(submit_url.clone()));

    info!(source = ?source, routes = router.routes().count(), "router ready");
    Ok(App { router, source })
}
