//! # Router Module
//!
//! The router resolves an incoming `(method, path)` pair to a handler, the
//! path parameters captured on the way, and the middleware bound along the
//! route.
//!
//! ## Overview
//!
//! There is one segment trie per HTTP method, created on first registration
//! for that method. Each node has a map of static children and at most one
//! dynamic child, which is either a parameter (`:id`), a wildcard (`*`) or a
//! regex (`(re)` or `:id(re)`) segment. The three dynamic kinds are mutually
//! exclusive under a parent; registering one next to another is an error.
//!
//! ## Registration
//!
//! [`Router::add_route`] validates the whole path before it touches the tree
//! and returns a [`RouteError`] for malformed paths, duplicate registrations
//! and conflicting siblings. These are startup errors, not request errors.
//!
//! ## Lookup
//!
//! [`Router::find_route`] descends breadth-first over every branch that can
//! still match. At each level a candidate contributes its static child for
//! the segment, then its dynamic child if it accepts the segment. After the
//! last segment the first candidate carrying a handler wins, so a static
//! route beats a parameter route at the same depth. A wildcard node with a
//! handler that cannot descend further is kept as a fallback and wins only
//! when nothing else does.
//!
//! ```rust
//! use http::Method;
//! use segroute::middleware::handler_fn;
//! use segroute::router::Router;
//!
//! # fn main() -> Result<(), segroute::router::RouteError> {
//! let mut router = Router::new();
//! router.add_route(Method::GET, "/order/detail", handler_fn(|_| {}), vec![])?;
//! router.add_route(Method::GET, "/order/:id", handler_fn(|_| {}), vec![])?;
//!
//! let m = router.find_route(&Method::GET, "/order/42").expect("route");
//! assert_eq!(m.route_template(), Some("/order/:id"));
//! assert_eq!(m.get_path_param("id"), Some("42"));
//!
//! let m = router.find_route(&Method::GET, "/order/detail").expect("route");
//! assert_eq!(m.route_template(), Some("/order/detail"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Middleware scope
//!
//! By default ([`MiddlewareScope::Frontier`]) middleware and parameters are
//! collected from every node that entered the frontier, including sibling
//! branches that did not produce the match. [`MiddlewareScope::MatchedPath`]
//! limits both to the nodes between the root and the matched node.

mod core;
mod error;
mod node;
mod segment;

pub use self::core::{MiddlewareScope, RouteMatch, Router, MAX_INLINE_FRONTIER};
pub use error::RouteError;
pub use segment::{SegmentType, PARAM_SIGIL, SEPARATOR, WILDCARD};
