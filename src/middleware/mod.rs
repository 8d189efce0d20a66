//! # Middleware Module
//!
//! Middleware are decorators around a [`Handler`]: each one receives the next
//! handler and returns a replacement that may run code before and after
//! delegating, or not delegate at all.
//!
//! [`chain`] composes a list so that the first entry is outermost. Given
//! `[A, B]` and a handler `H`, execution order is
//! `A-pre, B-pre, H, B-post, A-post`.
//!
//! ## Built-in decorators
//!
//! - [`RecoveryMiddleware`] - turns a handler panic into a fixed status and body
//! - [`AccessLogMiddleware`] - one JSON access-log line per request
//! - [`ErrorPageBuilder`] - replaces bodies for selected statuses
//! - [`MetricsMiddleware`] - request counts and latency per route pattern
//! - [`TracingMiddleware`] - a `tracing` span per request
//!
//! ```rust
//! use segroute::middleware::{chain, handler_fn, RecoveryMiddleware, TracingMiddleware};
//! use segroute::Context;
//!
//! let handler = chain(
//!     &[RecoveryMiddleware::new(500, "internal error").build(), TracingMiddleware::build()],
//!     handler_fn(|ctx: &mut Context| ctx.resp_body = b"hello".to_vec()),
//! );
//! let mut ctx = Context::default();
//! handler(&mut ctx);
//! assert_eq!(ctx.resp_body, b"hello");
//! ```

mod access_log;
mod core;
mod error_page;
mod metrics;
mod recovery;
mod tracing;

pub use access_log::{AccessLog, AccessLogMiddleware, LogSink};
pub use self::core::{chain, handler_fn, middleware_fn, Handler, Middleware};
pub use error_page::ErrorPageBuilder;
pub use metrics::{MetricsMiddleware, RouteKey, RouteStats, UNKNOWN_ROUTE};
pub use recovery::{RecoveryLog, RecoveryMiddleware};
pub use self::tracing::TracingMiddleware;
