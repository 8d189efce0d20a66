use std::collections::HashMap;
use std::sync::Arc;

use super::{Handler, Middleware};
use crate::context::Context;

/// Builder for [`Middleware`] that swaps the response body for a fixed page
/// when the final status has one registered.
#[derive(Debug, Default, Clone)]
pub struct ErrorPageBuilder {
    pages: HashMap<u16, Vec<u8>>,
}

impl ErrorPageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `body` for `status`. A later call for the same status replaces it.
    #[must_use]
    pub fn add_error_page(mut self, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(status, body.into());
        self
    }

    pub fn build(self) -> Middleware {
        let pages = Arc::new(self.pages);
        Arc::new(move |next: Handler| {
            let pages = Arc::clone(&pages);
            Arc::new(move |ctx: &mut Context| {
                next(ctx);
                if let Some(page) = pages.get(&ctx.resp_status) {
                    ctx.resp_body = page.clone();
                }
            }) as Handler
        })
    }
}
