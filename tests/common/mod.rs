#![allow(dead_code)]

use std::sync::Arc;

use http::{Method, Request};
use parking_lot::Mutex;
use segroute::{middleware_fn, Middleware};

pub fn request(method: Method, uri: &str) -> Request<Vec<u8>> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Vec::new())
        .unwrap()
}

pub fn request_with_body(method: Method, uri: &str, content_type: &str, body: &str) -> Request<Vec<u8>> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", content_type)
        .body(body.as_bytes().to_vec())
        .unwrap()
}

/// Shared, ordered record of middleware events
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn joined(&self) -> String {
        self.events().join(" ")
    }

    /// Middleware that records `name` before and after calling the next link
    pub fn marker(&self, name: &str) -> Middleware {
        let trace = self.clone();
        let name = name.to_string();
        middleware_fn(move |ctx, next| {
            trace.push(name.clone());
            next(ctx);
            trace.push(name.clone());
        })
    }
}
