use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context as _, Result};
use clap::{Parser, Subcommand};
use http::header::HeaderValue;
use http::Method;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::middleware::{chain, handler_fn, middleware_fn, Middleware};
use crate::router::{MiddlewareScope, Router};

/// Response header each labelled middleware appends its label to
pub const MIDDLEWARE_TRACE_HEADER: &str = "x-segroute-middleware";

/// Command-line interface for segroute
#[derive(Parser)]
#[command(name = "segroute")]
#[command(about = "segroute route table tools", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register every route in a table and report the first construction error
    Check {
        /// Path to the YAML route table
        #[arg(short, long)]
        routes: PathBuf,
    },
    /// Resolve one request against a route table and print the match as JSON
    Resolve {
        /// Path to the YAML route table
        #[arg(short, long)]
        routes: PathBuf,

        /// HTTP method of the request
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request path, e.g. /user/42
        #[arg(short, long)]
        path: String,

        /// Middleware scope: frontier or matched_path
        #[arg(long, env = "SEGROUTE_MIDDLEWARE_SCOPE", default_value = "frontier")]
        scope: String,
    },
}

/// One entry of a route table file
#[derive(Debug, Clone, Deserialize)]
pub struct RouteEntry {
    pub method: String,
    pub path: String,
    /// Labels of route-scoped middleware, outermost first
    #[serde(default)]
    pub middleware: Vec<String>,
}

/// Route table file:
///
/// ```yaml
/// routes:
///   - method: GET
///     path: /user/:id
///     middleware: [auth]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteTable {
    pub routes: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read route table {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse route table {}", path.display()))
    }

    /// Build a router from the table, stopping at the first invalid entry
    pub fn build_router(&self, scope: MiddlewareScope) -> Result<Router> {
        let mut router = Router::with_scope(scope);
        for (i, entry) in self.routes.iter().enumerate() {
            let method = parse_method(&entry.method)?;
            let middleware = entry.middleware.iter().map(|l| labelled(l)).collect();
            router
                .add_route(method, &entry.path, handler_fn(|_| {}), middleware)
                .with_context(|| format!("route #{} ({} {})", i + 1, entry.method, entry.path))?;
        }
        Ok(router)
    }
}

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub count: usize,
    pub routes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveReport {
    pub method: String,
    pub path: String,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    pub path_params: HashMap<String, String>,
    /// Middleware labels in execution order
    pub middleware: Vec<String>,
}

fn parse_method(raw: &str) -> Result<Method> {
    Method::from_bytes(raw.to_uppercase().as_bytes())
        .map_err(|_| anyhow!("invalid HTTP method: {raw}"))
}

fn labelled(label: &str) -> Middleware {
    let label = label.to_string();
    middleware_fn(move |ctx, next| {
        if let Ok(value) = HeaderValue::from_str(&label) {
            ctx.resp_headers.append(MIDDLEWARE_TRACE_HEADER, value);
        }
        next(ctx);
    })
}

pub fn check(routes: &Path) -> Result<CheckReport> {
    let router = RouteTable::from_yaml_file(routes)?.build_router(MiddlewareScope::default())?;
    router.log_routes();
    let routes: Vec<String> = router
        .routes()
        .into_iter()
        .map(|(method, path)| format!("{method} {path}"))
        .collect();
    Ok(CheckReport {
        count: routes.len(),
        routes,
    })
}

pub fn resolve(routes: &Path, method: &str, path: &str, scope: &str) -> Result<ResolveReport> {
    let router = RouteTable::from_yaml_file(routes)?.build_router(MiddlewareScope::parse(scope))?;
    let method = parse_method(method)?;
    let mut report = ResolveReport {
        method: method.to_string(),
        path: path.to_string(),
        matched: false,
        route: None,
        path_params: HashMap::new(),
        middleware: Vec::new(),
    };

    let Some(m) = router.find_route(&method, path) else {
        return Ok(report);
    };
    let Some(handler) = m.handler.clone() else {
        return Ok(report);
    };

    let mut ctx = Context::default();
    chain(&m.middleware, handler)(&mut ctx);
    report.matched = true;
    report.route = m.route;
    report.path_params = m.path_params;
    report.middleware = ctx
        .resp_headers
        .get_all(MIDDLEWARE_TRACE_HEADER)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect();
    Ok(report)
}

/// Run the parsed command, printing its report to stdout as JSON
pub fn run_cli(cli: Cli) -> Result<()> {
    let output = match &cli.command {
        Commands::Check { routes } => serde_json::to_string_pretty(&check(routes)?)?,
        Commands::Resolve {
            routes,
            method,
            path,
            scope,
        } => serde_json::to_string_pretty(&resolve(routes, method, path, scope)?)?,
    };
    println!("{output}");
    Ok(())
}
