//! Route cache snapshots.
//!
//! A snapshot holds exactly two things: the route table and the named-route
//! index. Patterns are stored alongside their compiled regex source so that
//! loading does not depend on re-running registration code. Only symbolic
//! actions and aliased middleware can be stored; closures have no
//! serialized form.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::controller::Action;
use crate::error::{Result, RouterError};
use crate::path::PathPattern;
use crate::request::Method;
use crate::router::{NamedRoute, Route, RouteMiddleware, Router};

/// One route in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRoute {
    /// Raw path pattern.
    pub path: String,
    /// Compiled regex source.
    pub regex: String,
    /// Placeholder names, left to right.
    pub keys: Vec<String>,
    /// `Controller@method` descriptor.
    pub action: String,
    /// Middleware aliases, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub middleware: Vec<String>,
}

/// Serializable snapshot of a router's route table and named index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCache {
    /// Routes per method, in registration order.
    pub routes: BTreeMap<Method, Vec<CachedRoute>>,
    /// Named-route index.
    pub named: BTreeMap<String, NamedRoute>,
}

impl RouteCache {
    /// Captures a router's tables.
    pub fn from_router(router: &Router) -> Result<Self> {
        let mut routes: BTreeMap<Method, Vec<CachedRoute>> = BTreeMap::new();

        for route in router.routes() {
            routes
                .entry(route.method)
                .or_default()
                .push(Self::cached_route(route)?);
        }

        let named = router
            .named
            .iter()
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect();

        Ok(Self { routes, named })
    }

    fn cached_route(route: &Route) -> Result<CachedRoute> {
        let not_cacheable = |reason| RouterError::NotCacheable {
            method: route.method.to_string(),
            path: route.path().to_string(),
            reason,
        };

        let Action::Symbol(action) = &route.action else {
            return Err(not_cacheable("action is a closure"));
        };

        let middleware = route
            .middleware
            .iter()
            .map(|mw| match mw {
                RouteMiddleware::Alias(name) => Ok(name.clone()),
                RouteMiddleware::Inline(_) => Err(not_cacheable("middleware is not aliased")),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CachedRoute {
            path: route.path().to_string(),
            regex: route.pattern.regex_source().to_string(),
            keys: route.pattern.param_names().to_vec(),
            action: action.clone(),
            middleware,
        })
    }

    /// Number of routes across all methods.
    pub fn route_count(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    /// Writes the snapshot as JSON.
    ///
    /// The file is written next to its destination first and then renamed,
    /// so a concurrent reader sees either the old or the new snapshot. The
    /// temporary file is removed if either step fails.
    pub fn write(&self, path: &Path) -> Result<()> {
        let file_name = path.file_name().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "cache path has no file name")
        })?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);

        if let Err(e) = fs::write(&tmp, json).and_then(|()| fs::rename(&tmp, path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Reads a snapshot written by [`RouteCache::write`].
    pub fn read(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| RouterError::InvalidCache {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Rebuilds the route table and named index.
    pub fn into_tables(
        self,
    ) -> Result<(BTreeMap<Method, Vec<Route>>, HashMap<String, NamedRoute>)> {
        let mut routes = BTreeMap::new();

        for (method, cached) in self.routes {
            let bucket = cached
                .into_iter()
                .map(|c| -> Result<Route> {
                    Ok(Route {
                        method,
                        pattern: PathPattern::from_parts(&c.path, &c.regex, c.keys)?,
                        action: Action::Symbol(c.action),
                        middleware: c.middleware.into_iter().map(RouteMiddleware::Alias).collect(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            routes.insert(method, bucket);
        }

        Ok((routes, self.named.into_iter().collect()))
    }
}
