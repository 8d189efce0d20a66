use std::sync::Arc;
use std::time::Instant;

use tracing::{field, info_span};

use super::{Handler, Middleware};
use crate::context::Context;

/// Middleware that runs the rest of the chain inside a `request` span
///
/// The span carries the request id, method and path up front; the matched
/// route, status and latency are recorded once the inner chain returns.
pub struct TracingMiddleware;

impl TracingMiddleware {
    pub fn build() -> Middleware {
        Arc::new(|next: Handler| {
            Arc::new(move |ctx: &mut Context| {
                let span = info_span!(
                    "request",
                    request_id = %ctx.request_id,
                    method = %ctx.req.method(),
                    path = %ctx.req.uri().path(),
                    route = field::Empty,
                    status = field::Empty,
                    latency_us = field::Empty,
                );
                let _guard = span.enter();
                let start = Instant::now();
                next(ctx);
                if !ctx.matched_route.is_empty() {
                    span.record("route", ctx.matched_route.as_str());
                }
                span.record("status", ctx.resp_status);
                span.record("latency_us", start.elapsed().as_micros() as u64);
            }) as Handler
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{chain, handler_fn};

    #[test]
    fn test_tracing_is_transparent() {
        let handler = chain(
            &[TracingMiddleware::build()],
            handler_fn(|ctx| ctx.resp_status = 202),
        );
        let mut ctx = Context::default();
        handler(&mut ctx);
        assert_eq!(ctx.resp_status, 202);
    }
}
