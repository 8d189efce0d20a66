//! # CLI Module
//!
//! Command-line tools for working with route tables outside a running
//! service.
//!
//! ## Commands
//!
//! ### `check`
//!
//! Register every route in a YAML table and fail on the first construction
//! error (malformed path, duplicate, conflicting sibling, bad regex):
//!
//! ```bash
//! segroute check --routes routes.yaml
//! ```
//!
//! ### `resolve`
//!
//! Resolve a single request and print the matched route, captured
//! parameters and the middleware labels that would run:
//!
//! ```bash
//! segroute resolve --routes routes.yaml --method GET --path /user/42
//! ```
//!
//! `--scope matched_path` (or `SEGROUTE_MIDDLEWARE_SCOPE`) restricts
//! middleware to the winning branch.

mod commands;


pub use commands::{
    check, resolve, run_cli, CheckReport, Cli, Commands, ResolveReport, RouteEntry, RouteTable,
    MIDDLEWARE_TRACE_HEADER,
};
