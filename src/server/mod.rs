//! Dispatch entry point.
//!
//! [`HttpServer`] owns a [`Router`](crate::router::Router) and the server-wide
//! middleware. Transport is left to the caller: hand a request to
//! [`HttpServer::handle`] or a prepared [`Context`](crate::Context) to
//! [`HttpServer::serve`].

mod http_server;
mod response;

pub use http_server::{
    with_config, with_logger, with_middleware, with_template_engine, HttpServer, Logger,
    ServerOption,
};
pub use response::{into_response, REQUEST_ID_HEADER};
