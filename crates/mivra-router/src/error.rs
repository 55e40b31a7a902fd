//! Error types for routing.

use std::path::PathBuf;

use thiserror::Error;

/// Router-specific errors.
///
/// Unmatched paths and wrong methods are not errors: they are answered with
/// 404 and 405 responses. Everything here is a configuration or caller
/// mistake that should surface loudly during development.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Invalid path pattern.
    #[error("invalid path pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The pattern as registered.
        pattern: String,
        /// Why it was rejected.
        message: String,
    },

    /// Route name not found.
    #[error("route '{0}' not found")]
    RouteNotFound(String),

    /// An action descriptor is not of the `Name@method` shape.
    #[error("invalid route action '{0}': expected 'Controller@method'")]
    InvalidAction(String),

    /// The controller named in an action descriptor is not registered.
    #[error("controller '{0}' is not registered")]
    ControllerNotFound(String),

    /// The controller exists but has no such action.
    #[error("controller '{controller}' has no action '{action}'")]
    ActionNotFound {
        /// Controller name.
        controller: String,
        /// Action name.
        action: String,
    },

    /// A per-route middleware alias was never registered.
    #[error("middleware alias '{0}' is not registered")]
    UnknownMiddleware(String),

    /// A route cannot be written to the route cache.
    #[error("route {method} {path} cannot be cached: {reason}")]
    NotCacheable {
        /// Route method.
        method: String,
        /// Route pattern.
        path: String,
        /// What prevents caching.
        reason: &'static str,
    },

    /// The route cache file is missing or malformed.
    #[error("invalid route cache '{path}': {message}")]
    InvalidCache {
        /// Path to the cache file.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },

    /// IO error (reading/writing the route cache).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;
