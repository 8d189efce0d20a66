use std::sync::Arc;

use crate::context::Context;

/// Terminal request action.
///
/// Handlers produce no return value; all output is written onto the
/// [`Context`] response fields.
pub type Handler = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// Decorator that receives the next handler and returns its replacement.
///
/// A middleware may run code before and after calling `next`, call it at most
/// once, or skip it entirely to short-circuit the chain.
pub type Middleware = Arc<dyn Fn(Handler) -> Handler + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler_fn<F>(f: F) -> Handler
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Build a [`Middleware`] from a closure that receives the context and the
/// next handler.
///
/// ```rust
/// use segroute::middleware::{middleware_fn, Middleware};
///
/// let timing: Middleware = middleware_fn(|ctx, next| {
///     let start = std::time::Instant::now();
///     next(ctx);
///     tracing::debug!(elapsed_us = start.elapsed().as_micros() as u64, "handled");
/// });
/// ```
pub fn middleware_fn<F>(f: F) -> Middleware
where
    F: Fn(&mut Context, &Handler) + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |next: Handler| {
        let f = Arc::clone(&f);
        Arc::new(move |ctx: &mut Context| f(ctx, &next)) as Handler
    })
}

/// Compose `middleware` around `terminal`.
///
/// The first middleware in the slice is the outermost at execution time: its
/// pre-logic runs first and its post-logic runs last. Composition captures no
/// per-call state, so the returned handler may be invoked any number of times.
#[must_use]
pub fn chain(middleware: &[Middleware], terminal: Handler) -> Handler {
    middleware
        .iter()
        .rev()
        .fold(terminal, |next, mw| mw(next))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(tag: &'static str) -> Middleware {
        middleware_fn(move |ctx, next| {
            ctx.resp_body.extend_from_slice(tag.as_bytes());
            next(ctx);
            ctx.resp_body.extend_from_slice(tag.as_bytes());
        })
    }

    #[test]
    fn test_chain_outermost_first() {
        let handler = chain(
            &[marker("A"), marker("B")],
            handler_fn(|ctx| ctx.resp_body.extend_from_slice(b"H")),
        );
        let mut ctx = Context::default();
        handler(&mut ctx);
        assert_eq!(ctx.resp_body, b"ABHBA");
    }

    #[test]
    fn test_chain_without_middleware_is_terminal() {
        let handler = chain(&[], handler_fn(|ctx| ctx.resp_status = 204));
        let mut ctx = Context::default();
        handler(&mut ctx);
        assert_eq!(ctx.resp_status, 204);
    }

    #[test]
    fn test_short_circuit_skips_inner() {
        let deny = middleware_fn(|ctx, _next| ctx.resp_status = 403);
        let handler = chain(
            &[marker("A"), deny, marker("B")],
            handler_fn(|ctx| ctx.resp_body.extend_from_slice(b"H")),
        );
        let mut ctx = Context::default();
        handler(&mut ctx);
        assert_eq!(ctx.resp_status, 403);
        assert_eq!(ctx.resp_body, b"AA");
    }

    #[test]
    fn test_composed_handler_is_reusable() {
        let handler = chain(
            &[marker("A")],
            handler_fn(|ctx| ctx.resp_body.extend_from_slice(b"H")),
        );
        for _ in 0..3 {
            let mut ctx = Context::default();
            handler(&mut ctx);
            assert_eq!(ctx.resp_body, b"AHA");
        }
    }
}
