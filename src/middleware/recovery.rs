use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use super::{Handler, Middleware};
use crate::context::Context;

/// Callback invoked with the context after a panic has been recovered
pub type RecoveryLog = Arc<dyn Fn(&Context) + Send + Sync>;

/// Middleware that converts a handler panic into a configured response
///
/// Place it first in the global middleware list so that it encloses every
/// other decorator. Without it, a panicking handler unwinds into the caller.
pub struct RecoveryMiddleware {
    status: u16,
    body: Vec<u8>,
    log: Option<RecoveryLog>,
}

impl RecoveryMiddleware {
    /// Respond with `status` and `body` after a recovered panic
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            log: None,
        }
    }

    /// Forward recovered contexts to `log`
    #[must_use]
    pub fn with_log<F>(mut self, log: F) -> Self
    where
        F: Fn(&Context) + Send + Sync + 'static,
    {
        self.log = Some(Arc::new(log));
        self
    }

    /// Wrap the downstream handler in `catch_unwind`. Whatever the handler
    /// wrote before panicking is replaced.
    pub fn build(self) -> Middleware {
        let this = Arc::new(self);
        Arc::new(move |next: Handler| {
            let this = Arc::clone(&this);
            Arc::new(move |ctx: &mut Context| {
                let outcome = catch_unwind(AssertUnwindSafe(|| next(&mut *ctx)));
                if let Err(payload) = outcome {
                    let message = panic_message(payload.as_ref());
                    warn!(
                        method = %ctx.req.method(),
                        path = %ctx.req.uri().path(),
                        route = %ctx.matched_route,
                        panic = %message,
                        "Recovered from handler panic"
                    );
                    ctx.resp_status = this.status;
                    ctx.resp_body = this.body.clone();
                    if let Some(log) = &this.log {
                        log(ctx);
                    }
                }
            }) as Handler
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{chain, handler_fn};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_recovers_panic_and_logs() {
        let logged = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&logged);
        let recovery = RecoveryMiddleware::new(500, "boom")
            .with_log(move |_ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build();
        let handler = chain(&[recovery], handler_fn(|_ctx| panic!("handler failed")));

        let mut ctx = Context::default();
        handler(&mut ctx);
        assert_eq!(ctx.resp_status, 500);
        assert_eq!(ctx.resp_body, b"boom");
        assert_eq!(logged.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_passes_through_without_panic() {
        let recovery = RecoveryMiddleware::new(500, "boom").build();
        let handler = chain(
            &[recovery],
            handler_fn(|ctx| {
                ctx.resp_status = 201;
                ctx.resp_body = b"ok".to_vec();
            }),
        );
        let mut ctx = Context::default();
        handler(&mut ctx);
        assert_eq!(ctx.resp_status, 201);
        assert_eq!(ctx.resp_body, b"ok");
    }

    #[test]
    fn test_panic_message_extraction() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic");
    }
}
