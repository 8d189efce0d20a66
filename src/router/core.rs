//! Router core: registration and frontier lookup.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use http::Method;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::error::RouteError;
use super::node::SegmentNode;
use super::segment::{parse_segment, split_route_path, SegmentType, SEPARATOR};
use crate::middleware::{Handler, Middleware};

/// Maximum number of live candidates before the frontier spills to the heap
pub const MAX_INLINE_FRONTIER: usize = 8;

/// Lookups slower than this are logged at warn level
const SLOW_LOOKUP: Duration = Duration::from_millis(1);

/// Which explored nodes contribute middleware and path parameters to a match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiddlewareScope {
    /// Every node admitted to the frontier contributes, including branches
    /// that did not produce the match. Middleware is ordered by visitation:
    /// root first, then each level in candidate-expansion order.
    #[default]
    Frontier,
    /// Only the nodes from the root down to the matched node contribute.
    MatchedPath,
}

impl MiddlewareScope {
    /// Parse a scope name, defaulting to [`MiddlewareScope::Frontier`]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "matched_path" | "matched-path" => MiddlewareScope::MatchedPath,
            _ => MiddlewareScope::Frontier,
        }
    }
}

/// Result of resolving a request path against the route tree
#[derive(Clone)]
pub struct RouteMatch {
    /// Terminal handler of the matched node; `None` for a bare root hit
    pub handler: Option<Handler>,
    /// Registration path of the matched node
    pub route: Option<String>,
    /// Path parameters captured during lookup
    pub path_params: HashMap<String, String>,
    /// Middleware to run around the handler, outermost first
    pub middleware: Vec<Middleware>,
}

impl RouteMatch {
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    pub fn route_template(&self) -> Option<&str> {
        self.route.as_deref()
    }

    #[inline]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }
}

impl fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("route", &self.route)
            .field("has_handler", &self.handler.is_some())
            .field("path_params", &self.path_params)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// One node reached during lookup, linked to the visit it was expanded from
struct Visit<'t> {
    node: &'t SegmentNode,
    parent: Option<usize>,
    /// Request segment consumed by this node
    segment: &'t str,
}

type Frontier = SmallVec<[usize; MAX_INLINE_FRONTIER]>;

/// Path router with one segment trie per HTTP method
///
/// Routes are registered during startup, before traffic is served. After that
/// the tree is only read, so a `Router` can be shared by any number of request
/// threads without locking.
pub struct Router {
    pub(super) trees: HashMap<Method, SegmentNode>,
    scope: MiddlewareScope,
    route_count: usize,
}

/// Same as [`Router::new`]
impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Empty router using the default [`MiddlewareScope`]
    pub fn new() -> Self {
        Self::with_scope(MiddlewareScope::default())
    }

    /// Empty router collecting middleware according to `scope`
    pub fn with_scope(scope: MiddlewareScope) -> Self {
        Self {
            trees: HashMap::new(),
            scope,
            route_count: 0,
        }
    }

    /// Scope applied when collecting middleware and parameters
    pub fn scope(&self) -> MiddlewareScope {
        self.scope
    }

    /// Change the scope. Only lookups made afterwards are affected.
    pub fn set_scope(&mut self, scope: MiddlewareScope) {
        self.scope = scope;
    }

    /// Number of registered routes across all methods
    pub fn len(&self) -> usize {
        self.route_count
    }

    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }

    /// Register `handler` for `method` and `path`.
    ///
    /// `path` must start with `/`, must not end with `/` (except the root
    /// path), and must not contain empty segments. A failed registration
    /// leaves the router unchanged. Errors mean the route table is invalid and
    /// startup should be aborted.
    pub fn add_route(
        &mut self,
        method: Method,
        path: &str,
        handler: Handler,
        middleware: Vec<Middleware>,
    ) -> Result<(), RouteError> {
        let raw_segments = split_route_path(path)?;
        let segments = raw_segments
            .iter()
            .map(|s| parse_segment(s))
            .collect::<Result<Vec<_>, _>>()?;

        // Validate against the existing tree before creating any node.
        if let Some(root) = self.trees.get(&method) {
            let mut cursor = Some(root);
            for segment in &segments {
                let Some(node) = cursor else { break };
                cursor = node.check_child(segment, path)?;
            }
            if cursor.is_some_and(SegmentNode::has_handler) {
                return Err(RouteError::DuplicateRoute {
                    method,
                    path: path.to_string(),
                });
            }
        }

        let mut node = self
            .trees
            .entry(method.clone())
            .or_insert_with(SegmentNode::root);
        for segment in &segments {
            node = node.child_or_create(segment);
        }
        node.handler = Some(handler);
        node.route = Some(path.to_string());
        node.middleware = middleware;
        self.route_count += 1;

        info!(
            method = %method,
            path = %path,
            middleware = node.middleware.len(),
            "Route registered"
        );
        Ok(())
    }

    /// Registered `(method, route template)` pairs, sorted for stable output
    pub fn routes(&self) -> Vec<(Method, String)> {
        let mut out = Vec::with_capacity(self.route_count);
        for (method, root) in &self.trees {
            let mut templates = Vec::new();
            root.collect_routes(&mut templates);
            out.extend(templates.into_iter().map(|t| (method.clone(), t.to_string())));
        }
        out.sort_by(|a, b| (a.0.as_str(), &a.1).cmp(&(b.0.as_str(), &b.1)));
        out
    }

    /// Log a summary of the routing table
    pub fn log_routes(&self) {
        let routes = self.routes();
        let summary: Vec<String> = routes
            .iter()
            .take(10)
            .map(|(method, path)| format!("{method} {path}"))
            .collect();
        info!(
            routes_count = routes.len(),
            routes_summary = ?summary,
            middleware_scope = ?self.scope,
            "Routing table loaded"
        );
    }

    /// Resolve `method` and `path` to a route.
    ///
    /// Returns `None` when no tree exists for the method or no candidate
    /// matches. The root path `/` always resolves to the root node when the
    /// method has a tree, even if no handler is registered there; callers
    /// treat a match without handler as not found.
    pub fn find_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        debug!(method = %method, path = %path, "Route match attempt");
        let start = Instant::now();
        let result = self.trees.get(method).and_then(|root| {
            if path == "/" {
                return Some(self.root_match(root));
            }
            let rest = path.strip_prefix(SEPARATOR)?;
            let segments: SmallVec<[&str; 16]> = rest.split(SEPARATOR).collect();
            self.search(root, &segments)
        });
        let elapsed = start.elapsed();

        match &result {
            Some(m) => {
                let log_slow = elapsed > SLOW_LOOKUP;
                if log_slow {
                    warn!(
                        method = %method,
                        path = %path,
                        route = ?m.route,
                        duration_us = elapsed.as_micros() as u64,
                        "Slow route matching detected"
                    );
                } else {
                    debug!(
                        method = %method,
                        path = %path,
                        route = ?m.route,
                        path_params = ?m.path_params,
                        duration_us = elapsed.as_micros() as u64,
                        "Route matched"
                    );
                }
            }
            None => debug!(
                method = %method,
                path = %path,
                duration_us = elapsed.as_micros() as u64,
                "No route matched"
            ),
        }
        result
    }

    fn root_match(&self, root: &SegmentNode) -> RouteMatch {
        RouteMatch {
            handler: root.handler.clone(),
            route: root.route.clone(),
            path_params: HashMap::new(),
            middleware: root.middleware.clone(),
        }
    }

    /// Breadth-first descent over every simultaneously plausible branch.
    ///
    /// `visits` is an arena of every node admitted to the frontier; the
    /// frontier itself holds indices into it so that the winning branch can
    /// be walked back to the root.
    fn search<'t>(&self, root: &'t SegmentNode, segments: &[&'t str]) -> Option<RouteMatch> {
        let mut visits: Vec<Visit<'t>> = vec![Visit {
            node: root,
            parent: None,
            segment: "",
        }];
        let mut frontier: Frontier = SmallVec::new();
        frontier.push(0);
        let mut fallback: Option<usize> = None;

        for &seg in segments {
            let mut next = Frontier::new();
            for &idx in &frontier {
                let node = visits[idx].node;
                let children = node.matching_children(seg);
                if children.is_empty() && node.kind == SegmentType::Wildcard && node.has_handler()
                {
                    fallback = Some(idx);
                }
                for child in children {
                    next.push(visits.len());
                    visits.push(Visit {
                        node: child,
                        parent: Some(idx),
                        segment: seg,
                    });
                }
            }
            frontier = next;
            if frontier.is_empty() {
                break;
            }
        }

        let winner = frontier
            .iter()
            .copied()
            .find(|&idx| visits[idx].node.has_handler())
            .or(fallback)?;

        let contributors: Vec<usize> = match self.scope {
            MiddlewareScope::Frontier => (0..visits.len()).collect(),
            MiddlewareScope::MatchedPath => {
                let mut path = Vec::new();
                let mut cursor = Some(winner);
                while let Some(idx) = cursor {
                    path.push(idx);
                    cursor = visits[idx].parent;
                }
                path.reverse();
                path
            }
        };

        let mut middleware = Vec::new();
        let mut path_params = HashMap::new();
        for idx in contributors {
            let visit = &visits[idx];
            middleware.extend(visit.node.middleware.iter().cloned());
            if let Some(name) = visit.node.param_name.as_deref() {
                path_params.insert(name.to_string(), visit.segment.to_string());
            }
        }

        let node = visits[winner].node;
        Some(RouteMatch {
            handler: node.handler.clone(),
            route: node.route.clone(),
            path_params,
            middleware,
        })
    }
}
