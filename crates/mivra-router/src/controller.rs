//! Route actions and the controller registry.
//!
//! A route's action is either a function value or a `"Name@method"`
//! descriptor. Descriptors are resolved at dispatch time against a registry
//! of controller factories built at startup, so routes can be cached and
//! reloaded without holding on to any code.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::error::{Result, RouterError};
use crate::request::{PathParams, Request};
use crate::response::Response;

/// A boxed route handler.
pub type HandlerFn = Arc<dyn Fn(&Request, &PathParams) -> Response + Send + Sync>;

/// What a route runs once it has matched.
#[derive(Clone)]
pub enum Action {
    /// A function invoked directly.
    Callable(HandlerFn),
    /// A `"Controller@method"` descriptor, resolved through the registry.
    Symbol(String),
}

impl Action {
    /// Wraps a function or closure.
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&Request, &PathParams) -> Response + Send + Sync + 'static,
    {
        Self::Callable(Arc::new(f))
    }

    /// Returns the descriptor of a symbolic action.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::Callable(_) => None,
            Self::Symbol(s) => Some(s.as_str()),
        }
    }
}

impl From<&str> for Action {
    fn from(s: &str) -> Self {
        Self::Symbol(s.to_string())
    }
}

impl From<String> for Action {
    fn from(s: String) -> Self {
        Self::Symbol(s)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callable(_) => f.write_str("Callable(<fn>)"),
            Self::Symbol(s) => f.debug_tuple("Symbol").field(s).finish(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callable(_) => f.write_str("<closure>"),
            Self::Symbol(s) => f.write_str(s),
        }
    }
}

/// Splits a `Name@method` descriptor. Both halves must be non-empty.
pub fn parse_descriptor(descriptor: &str) -> Result<(&str, &str)> {
    match descriptor.split_once('@') {
        Some((controller, action)) if !controller.is_empty() && !action.is_empty() => {
            Ok((controller, action))
        }
        _ => Err(RouterError::InvalidAction(descriptor.to_string())),
    }
}

/// A named set of actions.
#[derive(Default)]
pub struct Controller {
    actions: HashMap<String, HandlerFn>,
}

impl Controller {
    /// Creates a controller with no actions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an action.
    #[must_use]
    pub fn action<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Request, &PathParams) -> Response + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Arc::new(f));
        self
    }

    /// Looks up an action by name.
    pub fn get(&self, name: &str) -> Option<&HandlerFn> {
        self.actions.get(name)
    }
}

type Factory = Box<dyn Fn() -> Controller + Send + Sync>;

/// A controller factory and the instance it produced, once it has run.
struct Entry {
    factory: Factory,
    instance: OnceLock<Controller>,
}

impl Entry {
    fn instance(&self) -> &Controller {
        self.instance.get_or_init(|| (self.factory)())
    }
}

/// Registry of controllers addressable by name.
///
/// Factories run on first use, not at registration.
#[derive(Default)]
pub struct ControllerRegistry {
    entries: HashMap<String, Entry>,
}

impl ControllerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a controller factory under `name`, replacing any earlier one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Controller + Send + Sync + 'static,
    {
        self.entries.insert(
            name.into(),
            Entry {
                factory: Box::new(factory),
                instance: OnceLock::new(),
            },
        );
    }

    /// Returns true if a controller is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Checks that a descriptor is well formed and names a registered
    /// controller, without running its factory.
    pub fn check(&self, descriptor: &str) -> Result<()> {
        let (name, _) = parse_descriptor(descriptor)?;
        if self.contains(name) {
            Ok(())
        } else {
            Err(RouterError::ControllerNotFound(name.to_string()))
        }
    }

    /// Resolves a `Name@method` descriptor to its handler.
    pub fn resolve(&self, descriptor: &str) -> Result<HandlerFn> {
        let (name, action) = parse_descriptor(descriptor)?;
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| RouterError::ControllerNotFound(name.to_string()))?;

        if entry.instance.get().is_none() {
            debug!(controller = name, "instantiating controller");
        }

        entry
            .instance()
            .get(action)
            .cloned()
            .ok_or_else(|| RouterError::ActionNotFound {
                controller: name.to_string(),
                action: action.to_string(),
            })
    }

    /// Resolves any action to a handler.
    pub fn handler(&self, action: &Action) -> Result<HandlerFn> {
        match action {
            Action::Callable(f) => Ok(Arc::clone(f)),
            Action::Symbol(descriptor) => self.resolve(descriptor),
        }
    }
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}
