//! # Request Context
//!
//! [`Context`] is the per-request record threaded through the router, the
//! middleware chain and the handler. The router fills in `path_params` and
//! `matched_route`; handlers and middleware write `resp_status`, `resp_body`
//! and `resp_headers`, which the HTTP layer flushes once the chain returns.
//!
//! A context is created for one request and dropped when its response has been
//! produced. It is never shared between requests.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::header::{HeaderValue, CONTENT_TYPE, HOST, SET_COOKIE};
use http::{HeaderMap, Request};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::ids::RequestId;
use crate::template::{TemplateEngine, TemplateError};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Failure of a value accessor on [`Context`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The key is absent from the path, query or form
    NotFound(String),
    /// The value exists but could not be coerced to the requested type
    Parse {
        key: String,
        value: String,
        message: String,
    },
    /// The request has no body
    EmptyBody,
    /// The body could not be decoded
    Decode(String),
    /// The value cannot be written as the response
    Encode(String),
    /// The value is not a valid header value
    InvalidHeader(String),
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::NotFound(key) => write!(f, "key '{}' not found", key),
            ValueError::Parse {
                key,
                value,
                message,
            } => write!(f, "value '{}' for key '{}' is invalid: {}", value, key, message),
            ValueError::EmptyBody => write!(f, "request body is empty"),
            ValueError::Decode(message) => write!(f, "failed to decode request body: {}", message),
            ValueError::Encode(message) => write!(f, "failed to encode response: {}", message),
            ValueError::InvalidHeader(message) => write!(f, "invalid header value: {}", message),
        }
    }
}

impl std::error::Error for ValueError {}

/// A raw string value taken from the path, query or form, with typed coercion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringValue {
    key: String,
    value: String,
}

impl StringValue {
    fn new(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }

    /// Raw value without coercion
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Take the raw value
    pub fn into_string(self) -> String {
        self.value
    }

    /// Parse as a signed integer. Fails with [`ValueError::Parse`] naming the key.
    pub fn as_i64(&self) -> Result<i64, ValueError> {
        self.value.parse().map_err(|e: std::num::ParseIntError| self.parse_error(e))
    }

    /// Parse as an unsigned integer; a leading `-` is a parse error
    pub fn as_u64(&self) -> Result<u64, ValueError> {
        self.value.parse().map_err(|e: std::num::ParseIntError| self.parse_error(e))
    }

    fn parse_error(&self, e: impl fmt::Display) -> ValueError {
        ValueError::Parse {
            key: self.key.clone(),
            value: self.value.clone(),
            message: e.to_string(),
        }
    }
}

/// A `Set-Cookie` value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    #[must_use]
    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    #[must_use]
    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, "; Path={}", path)?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", domain)?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age)?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        Ok(())
    }
}

type ValueMap = HashMap<String, Vec<String>>;

/// Per-request state shared by router, middleware and handler
pub struct Context {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// The raw inbound request
    pub req: Request<Vec<u8>>,
    /// Path parameters captured by the router
    pub path_params: HashMap<String, String>,
    /// Template of the route that served the request, empty when none matched
    pub matched_route: String,
    pub resp_status: u16,
    pub resp_body: Vec<u8>,
    pub resp_headers: HeaderMap,
    template_engine: Option<Arc<dyn TemplateEngine>>,
    query_cache: OnceCell<ValueMap>,
    form_cache: OnceCell<ValueMap>,
}

/// Context for an empty `GET /` request
impl Default for Context {
    fn default() -> Self {
        Self::new(Request::default())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("method", self.req.method())
            .field("uri", self.req.uri())
            .field("path_params", &self.path_params)
            .field("matched_route", &self.matched_route)
            .field("resp_status", &self.resp_status)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Wrap an inbound request. The request id comes from `x-request-id` when
    /// present, otherwise a new ULID. The response starts as an empty 200.
    pub fn new(req: Request<Vec<u8>>) -> Self {
        let request_id = RequestId::from_header_or_new(
            req.headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok()),
        );
        Self {
            request_id,
            req,
            path_params: HashMap::new(),
            matched_route: String::new(),
            resp_status: 200,
            resp_body: Vec::new(),
            resp_headers: HeaderMap::new(),
            template_engine: None,
            query_cache: OnceCell::new(),
            form_cache: OnceCell::new(),
        }
    }

    pub(crate) fn set_template_engine(&mut self, engine: Option<Arc<dyn TemplateEngine>>) {
        self.template_engine = engine;
    }

    /// Host the request was addressed to, from the `Host` header or the URI authority
    pub fn host(&self) -> Option<&str> {
        self.req
            .headers()
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.req.uri().host())
    }

    /// Value of a captured path parameter
    pub fn path_value(&self, key: &str) -> Result<StringValue, ValueError> {
        self.path_params
            .get(key)
            .map(|v| StringValue::new(key, v.as_str()))
            .ok_or_else(|| ValueError::NotFound(key.to_string()))
    }

    /// First value of a query-string parameter
    pub fn query_value(&self, key: &str) -> Result<StringValue, ValueError> {
        let values = self.query_cache.get_or_init(|| {
            self.req
                .uri()
                .query()
                .map(|q| parse_urlencoded(q.as_bytes()))
                .unwrap_or_default()
        });
        first_value(values, key)
    }

    /// First value of a field in an `application/x-www-form-urlencoded` body
    pub fn form_value(&self, key: &str) -> Result<StringValue, ValueError> {
        let values = self.form_cache.get_or_init(|| {
            let is_form = self
                .req
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.starts_with(FORM_CONTENT_TYPE));
            if is_form {
                parse_urlencoded(self.req.body())
            } else {
                ValueMap::new()
            }
        });
        first_value(values, key)
    }

    /// Decode the JSON request body into `T`
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, ValueError> {
        let body = self.req.body();
        if body.is_empty() {
            return Err(ValueError::EmptyBody);
        }
        serde_json::from_slice(body).map_err(|e| ValueError::Decode(e.to_string()))
    }

    /// Append a `Set-Cookie` header to the response
    pub fn set_cookie(&mut self, cookie: &Cookie) -> Result<(), ValueError> {
        let value = HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| ValueError::InvalidHeader(e.to_string()))?;
        self.resp_headers.append(SET_COOKIE, value);
        Ok(())
    }

    /// Serialize `value` as the JSON response body
    pub fn resp_json<T: Serialize>(&mut self, status: u16, value: &T) -> Result<(), ValueError> {
        let body = serde_json::to_vec(value).map_err(|e| ValueError::Encode(e.to_string()))?;
        self.resp_status = status;
        self.resp_body = body;
        self.resp_headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(())
    }

    /// Render `name` with the server's template engine into the response body
    pub fn render(&mut self, name: &str, data: &serde_json::Value) -> Result<(), TemplateError> {
        let engine = self
            .template_engine
            .as_ref()
            .ok_or(TemplateError::NotConfigured)?;
        let body = engine.render(name, data)?;
        self.resp_status = 200;
        self.resp_body = body;
        self.resp_headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        Ok(())
    }
}

fn parse_urlencoded(input: &[u8]) -> ValueMap {
    let mut map = ValueMap::new();
    for (k, v) in url::form_urlencoded::parse(input) {
        map.entry(k.into_owned()).or_default().push(v.into_owned());
    }
    map
}

fn first_value(values: &ValueMap, key: &str) -> Result<StringValue, ValueError> {
    values
        .get(key)
        .and_then(|v| v.first())
        .map(|v| StringValue::new(key, v.as_str()))
        .ok_or_else(|| ValueError::NotFound(key.to_string()))
}
