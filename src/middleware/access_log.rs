use std::sync::Arc;

use serde::Serialize;

use super::{Handler, Middleware};
use crate::context::Context;

/// Callback that receives one serialized access-log line per request
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// One access-log record, serialized to JSON with empty fields omitted
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AccessLog {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub route: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub http_method: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
}

impl AccessLog {
    pub fn from_context(ctx: &Context) -> Self {
        Self {
            host: ctx.host().unwrap_or_default().to_string(),
            route: ctx.matched_route.clone(),
            http_method: ctx.req.method().to_string(),
            path: ctx.req.uri().path().to_string(),
        }
    }
}

/// Middleware that emits an [`AccessLog`] after the rest of the chain has run
pub struct AccessLogMiddleware {
    sink: LogSink,
}

impl AccessLogMiddleware {
    /// Send each serialized line to `sink`
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Access logs forwarded to `tracing` at info level
    pub fn tracing() -> Self {
        Self::new(|line| tracing::info!(target: "segroute::access", "{}", line))
    }

    pub fn build(self) -> Middleware {
        let sink = self.sink;
        Arc::new(move |next: Handler| {
            let sink = Arc::clone(&sink);
            Arc::new(move |ctx: &mut Context| {
                next(ctx);
                let record = AccessLog::from_context(ctx);
                match serde_json::to_string(&record) {
                    Ok(line) => sink(&line),
                    Err(e) => tracing::warn!(error = %e, "Failed to serialize access log"),
                }
            }) as Handler
        })
    }
}
