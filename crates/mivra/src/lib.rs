//! The Mivra site.
//!
//! A home page and a contact page whose form is validated server-side and
//! answered with JSON. Routing is done by [`mivra_router`]; this crate only
//! holds the route definitions, the controllers and the page markup.
//!
//! # CLI Usage
//!
//! ```bash
//! # List registered routes
//! mivra routes
//!
//! # Write the route cache, then serve from it
//! mivra --cache storage/routes.json cache
//!
//! # Simulate a request
//! mivra dispatch POST /contact -f name=Ada -f email=ada@example.com -f message=Hello
//! ```

pub mod app;
pub mod controllers;
pub mod routes;
pub mod views;

pub use app::{App, AppConfig, RouteSource, build};
