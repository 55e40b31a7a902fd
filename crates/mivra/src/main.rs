//! mivra CLI
//!
//! Inspects the site's routes, manages the route cache and simulates
//! requests against the router.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use mivra::{AppConfig, RouteSource, build};
use mivra_router::{Request, RouteMiddleware, Router};

/// Route tooling for the Mivra site.
#[derive(Parser)]
#[command(name = "mivra")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Route cache file.
    #[arg(short, long, env = "MIVRA_ROUTE_CACHE")]
    cache: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered routes.
    Routes,

    /// Write the route cache.
    Cache,

    /// Delete the route cache.
    ClearCache,

    /// Dispatch a simulated request and print the response.
    Dispatch {
        /// HTTP method.
        method: String,

        /// Request URI, query string included.
        uri: String,

        /// Form field as `key=value`; repeatable.
        #[arg(short, long = "field", value_parser = parse_key_val)]
        fields: Vec<(String, String)>,

        /// Header as `name=value`; repeatable.
        #[arg(short = 'H', long = "header", value_parser = parse_key_val)]
        headers: Vec<(String, String)>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{s}`"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Routes => {
            let app = build(&AppConfig {
                route_cache: cli.cache,
            })?;
            if app.source == RouteSource::Cache {
                info!("Routes loaded from cache.");
            }
            print_routes(&app.router);
        }

        Commands::Cache => {
            let Some(path) = cli.cache else {
                bail!("no cache file given; pass --cache or set MIVRA_ROUTE_CACHE");
            };
            let app = build(&AppConfig::default())?;
            app.router
                .dump_cache(&path)
                .with_context(|| format!("writing route cache to {}", path.display()))?;
            info!("Route cache written to {}", path.display());
        }

        Commands::ClearCache => {
            let Some(path) = cli.cache else {
                bail!("no cache file given; pass --cache or set MIVRA_ROUTE_CACHE");
            };
            if Router::clear_cache(&path)? {
                info!("Route cache cleared.");
            } else {
                info!("No route cache at {}.", path.display());
            }
        }

        Commands::Dispatch {
            method,
            uri,
            fields,
            headers,
        } => {
            let app = build(&AppConfig {
                route_cache: cli.cache,
            })?;

            let mut req = Request::new(&method, &uri);
            req.form.extend(fields);
            req.headers.extend(headers);

            let res = app.router.dispatch(req)?;
            println!("{} {}", res.status, res.status_text());
            let mut names: Vec<_> = res.headers.keys().collect();
            names.sort();
            for name in names {
                println!("{name}: {}", res.headers[name]);
            }
            println!();
            println!("{}", String::from_utf8_lossy(&res.body));
        }
    }

    Ok(())
}

fn print_routes(router: &Router) {
    let names: HashMap<(&str, &str), &str> = router
        .named_routes()
        .iter()
        .map(|(name, route)| ((route.method.as_str(), route.path.as_str()), name.as_str()))
        .collect();

    println!(
        "\n{:<8} {:<20} {:<28} {:<16} MIDDLEWARE",
        "METHOD", "PATH", "ACTION", "NAME"
    );
    println!("{:-<86}", "");

    for route in router.routes() {
        let middleware = route
            .middleware()
            .iter()
            .map(|mw| match mw {
                RouteMiddleware::Alias(name) => name.as_str(),
                RouteMiddleware::Inline(_) => "<inline>",
            })
            .collect::<Vec<_>>()
            .join(", ");

        println!(
            "{:<8} {:<20} {:<28} {:<16} {}",
            route.method().as_str(),
            route.path(),
            route.action().to_string(),
            names
                .get(&(route.method().as_str(), route.path()))
                .copied()
                .unwrap_or("-"),
            middleware
        );
    }
    println!();
}
