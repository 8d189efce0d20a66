//! # segroute
//!
//! **segroute** is a segment-trie HTTP router with composable middleware. It
//! resolves `(method, path)` to a handler, captures path parameters, collects
//! the middleware bound along the route and runs the whole chain against a
//! per-request [`Context`].
//!
//! ## Overview
//!
//! The crate does not own a socket. An HTTP layer of your choice turns each
//! request into an `http::Request<Vec<u8>>`, passes it to
//! [`HttpServer::handle`] and writes the returned [`http::Response`] back to
//! the wire.
//!
//! ## Architecture
//!
//! - **[`router`]** - One segment trie per method, registration with conflict
//!   checks, breadth-first lookup
//! - **[`middleware`]** - Handler and middleware types, chain composition and
//!   built-in decorators (recovery, access log, error pages, metrics, tracing)
//! - **[`context`]** - Per-request state: path, query and form values, JSON
//!   binding, cookies and response fields
//! - **[`server`]** - The dispatch entry point with server-wide options
//! - **[`file`]** - Upload, download and cached static resource handlers
//! - **[`template`]** - Template rendering for [`Context::render`]
//! - **[`runtime_config`]** - Dispatch settings from code, env or YAML
//! - **[`telemetry`]** - `tracing` subscriber setup for binaries
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Transport
//!     participant Server as HttpServer
//!     participant Router
//!     participant Global as Global Middleware
//!     participant Route as Route Middleware
//!     participant Handler
//!
//!     Transport->>Server: handle(request)
//!     Server->>Router: find_route(method, path)
//!     alt No route or no handler
//!         Server->>Global: not-found writer
//!     else Matched
//!         Router-->>Server: RouteMatch (handler, params, middleware)
//!         Server->>Global: chain
//!         Global->>Route: next
//!         Route->>Handler: next
//!     end
//!     Server-->>Transport: Response (status, headers, body)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use http::{Method, Request};
//! use segroute::middleware::{handler_fn, RecoveryMiddleware};
//! use segroute::server::{with_middleware, HttpServer};
//!
//! # fn main() -> Result<(), segroute::RouteError> {
//! let mut server = HttpServer::new(vec![with_middleware(vec![
//!     RecoveryMiddleware::new(500, "internal error").build(),
//! ])]);
//! server.get(
//!     "/user/:id",
//!     handler_fn(|ctx| {
//!         let id = ctx.path_value("id").map(|v| v.into_string()).unwrap_or_default();
//!         ctx.resp_body = format!("user {id}").into_bytes();
//!     }),
//! )?;
//!
//! let req = Request::builder()
//!     .method(Method::GET)
//!     .uri("/user/42")
//!     .body(Vec::new())
//!     .unwrap();
//! let resp = server.handle(req);
//! assert_eq!(resp.status(), 200);
//! assert_eq!(resp.body(), b"user 42");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod context;
pub mod file;
pub mod ids;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod telemetry;
pub mod template;

pub use context::{Context, Cookie, StringValue, ValueError};
pub use file::{FileDownloader, FileUploader, StaticResourceHandler};
pub use ids::RequestId;
pub use middleware::{chain, handler_fn, middleware_fn, Handler, Middleware};
pub use router::{MiddlewareScope, RouteError, RouteMatch, Router};
pub use runtime_config::ServerConfig;
pub use server::HttpServer;
pub use template::{MiniJinjaEngine, TemplateEngine, TemplateError};
