use std::fmt;
use std::sync::Arc;

use http::{Method, Request, Response};
use tracing::debug;

use super::response::into_response;
use crate::context::Context;
use crate::middleware::{chain, handler_fn, Handler, Middleware};
use crate::router::{RouteError, RouteMatch, Router};
use crate::runtime_config::ServerConfig;
use crate::template::TemplateEngine;

/// Diagnostic output callback
pub type Logger = Arc<dyn Fn(&str) + Send + Sync>;

/// Startup option applied by [`HttpServer::new`] in order
pub type ServerOption = Box<dyn FnOnce(&mut HttpServer)>;

/// Middleware applied to every request, outermost to all route-level middleware
pub fn with_middleware(middleware: Vec<Middleware>) -> ServerOption {
    Box::new(move |server: &mut HttpServer| server.middleware = middleware)
}

/// Replace the diagnostic logger. The default forwards to `tracing` at debug level.
pub fn with_logger<F>(logger: F) -> ServerOption
where
    F: Fn(&str) + Send + Sync + 'static,
{
    Box::new(move |server: &mut HttpServer| server.logger = Arc::new(logger))
}

/// Replace the dispatch settings. The router's middleware scope follows
/// `config.middleware_scope`.
pub fn with_config(config: ServerConfig) -> ServerOption {
    Box::new(move |server: &mut HttpServer| {
        server.router.set_scope(config.middleware_scope);
        server.config = config;
    })
}

/// Engine used by [`Context::render`]
pub fn with_template_engine(engine: Arc<dyn TemplateEngine>) -> ServerOption {
    Box::new(move |server: &mut HttpServer| server.template_engine = Some(engine))
}

/// Router plus the server-wide middleware and settings used to dispatch requests
///
/// Routes are added during startup through `&mut self`. Once built, the server
/// is only read, so it can be shared behind an `Arc` by every request thread.
pub struct HttpServer {
    router: Router,
    middleware: Vec<Middleware>,
    logger: Logger,
    config: ServerConfig,
    template_engine: Option<Arc<dyn TemplateEngine>>,
}

/// Server with no options applied
impl Default for HttpServer {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpServer")
            .field("routes", &self.router.len())
            .field("middleware", &self.middleware.len())
            .field("config", &self.config)
            .field("template_engine", &self.template_engine.is_some())
            .finish()
    }
}

impl HttpServer {
    /// Build a server from defaults, then apply `options` in order
    pub fn new(options: Vec<ServerOption>) -> Self {
        let mut server = Self {
            router: Router::new(),
            middleware: Vec::new(),
            logger: Arc::new(|msg: &str| debug!("{msg}")),
            config: ServerConfig::default(),
            template_engine: None,
        };
        for option in options {
            option(&mut server);
        }
        server
    }

    /// Underlying route tree
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Active dispatch settings
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Register a route with route-scoped middleware. See [`Router::add_route`].
    pub fn add_route(
        &mut self,
        method: Method,
        path: &str,
        handler: Handler,
        middleware: Vec<Middleware>,
    ) -> Result<(), RouteError> {
        self.router.add_route(method, path, handler, middleware)
    }

    /// Register a `GET` route without route middleware
    pub fn get(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.add_route(Method::GET, path, handler, Vec::new())
    }

    /// `POST` shorthand for [`HttpServer::add_route`]
    pub fn post(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.add_route(Method::POST, path, handler, Vec::new())
    }

    /// `PUT` shorthand for [`HttpServer::add_route`]
    pub fn put(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.add_route(Method::PUT, path, handler, Vec::new())
    }

    /// `DELETE` shorthand for [`HttpServer::add_route`]
    pub fn delete(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.add_route(Method::DELETE, path, handler, Vec::new())
    }

    /// Resolve without dispatching. See [`Router::find_route`].
    pub fn find_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.router.find_route(method, path)
    }

    /// Log the routing table at info level
    pub fn log_routes(&self) {
        self.router.log_routes();
    }

    /// Dispatch one request held in `ctx`.
    ///
    /// On a match the captured parameters and the route template are stored
    /// on the context and the handler runs inside the global middleware, then
    /// the route middleware. Otherwise the not-found outcome is written inside
    /// the global middleware. The caller writes the response fields back.
    pub fn serve(&self, ctx: &mut Context) {
        if self.template_engine.is_some() {
            ctx.set_template_engine(self.template_engine.clone());
        }

        let matched = self
            .router
            .find_route(ctx.req.method(), ctx.req.uri().path());
        let terminal = match matched {
            Some(RouteMatch {
                handler: Some(handler),
                route,
                path_params,
                middleware,
            }) => {
                ctx.path_params = path_params;
                ctx.matched_route = route.unwrap_or_default();
                chain(&middleware, handler)
            }
            _ => {
                (self.logger)(&format!(
                    "no route for {} {}",
                    ctx.req.method(),
                    ctx.req.uri().path()
                ));
                self.not_found()
            }
        };

        let root = chain(&self.middleware, terminal);
        root(ctx);
    }

    /// Dispatch `req` and build the response from the context's final state
    pub fn handle(&self, req: Request<Vec<u8>>) -> Response<Vec<u8>> {
        let mut ctx = Context::new(req);
        self.serve(&mut ctx);
        into_response(ctx)
    }

    fn not_found(&self) -> Handler {
        let status = self.config.not_found_status;
        let body = self.config.not_found_body.clone().into_bytes();
        handler_fn(move |ctx| {
            ctx.resp_status = status;
            ctx.resp_body = body.clone();
        })
    }
}
