use std::sync::Arc;

use http::Method;
use parking_lot::Mutex;
use segroute::middleware::{
    AccessLogMiddleware, ErrorPageBuilder, MetricsMiddleware, RecoveryMiddleware,
    TracingMiddleware, UNKNOWN_ROUTE,
};
use segroute::server::{with_middleware, HttpServer};
use segroute::{chain, handler_fn, middleware_fn, Context};

mod common;
use common::{request, Trace};

#[test]
fn test_chain_order_is_outermost_first() {
    let trace = Trace::default();
    let terminal = {
        let trace = trace.clone();
        handler_fn(move |_| trace.push("H"))
    };
    let handler = chain(&[trace.marker("A"), trace.marker("B")], terminal);
    handler(&mut Context::default());
    assert_eq!(trace.joined(), "A B H B A");
}

#[test]
fn test_middleware_can_short_circuit() {
    let reached = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&reached);
    let deny = middleware_fn(|ctx, _next| ctx.resp_status = 403);
    let handler = chain(&[deny], handler_fn(move |_| *flag.lock() = true));

    let mut ctx = Context::default();
    handler(&mut ctx);
    assert_eq!(ctx.resp_status, 403);
    assert!(!*reached.lock());
}

#[test]
fn test_recovery_turns_panic_into_response() {
    let logged = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&logged);
    let recovery = RecoveryMiddleware::new(500, "internal error")
        .with_log(move |ctx: &Context| sink.lock().push(ctx.req.uri().path().to_string()))
        .build();

    let mut server = HttpServer::new(vec![with_middleware(vec![recovery])]);
    server
        .get("/boom", handler_fn(|_| panic!("handler failed")))
        .unwrap();

    let resp = server.handle(request(Method::GET, "/boom"));
    assert_eq!(resp.status(), 500);
    assert_eq!(resp.body(), b"internal error");
    assert_eq!(logged.lock().as_slice(), ["/boom"]);
}

#[test]
fn test_error_page_replaces_not_found_body() {
    let pages = ErrorPageBuilder::new()
        .add_error_page(404, "<h1>missing</h1>")
        .build();
    let server = HttpServer::new(vec![with_middleware(vec![pages])]);

    let resp = server.handle(request(Method::GET, "/nowhere"));
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.body(), b"<h1>missing</h1>");
}

#[test]
fn test_access_log_records_matched_route() {
    let lines = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&lines);
    let access = AccessLogMiddleware::new(move |line| sink.lock().push(line.to_string())).build();

    let mut server = HttpServer::new(vec![with_middleware(vec![access])]);
    server.get("/user/:id", handler_fn(|_| {})).unwrap();

    let req = http::Request::builder()
        .method(Method::GET)
        .uri("/user/5")
        .header("host", "example.com")
        .body(Vec::new())
        .unwrap();
    server.handle(req);
    server.handle(request(Method::GET, "/gone"));

    let lines = lines.lock();
    let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(
        first,
        serde_json::json!({
            "host": "example.com",
            "route": "/user/:id",
            "http_method": "GET",
            "path": "/user/5",
        })
    );
    let second: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
    assert!(second.get("route").is_none());
    assert!(second.get("host").is_none());
}

#[test]
fn test_metrics_count_by_route_and_status() {
    let metrics = Arc::new(MetricsMiddleware::new());
    let mut server = HttpServer::new(vec![with_middleware(vec![metrics.build()])]);
    server.get("/item/:id", handler_fn(|_| {})).unwrap();

    for path in ["/item/1", "/item/2", "/nope"] {
        server.handle(request(Method::GET, path));
    }

    assert_eq!(metrics.request_count(), 3);
    assert_eq!(metrics.route_count("/item/:id", "GET", 200), 2);
    assert_eq!(metrics.route_count(UNKNOWN_ROUTE, "GET", 404), 1);
    assert_eq!(metrics.snapshot().len(), 2);
}

#[test]
fn test_tracing_middleware_wraps_dispatch() {
    let mut server = HttpServer::new(vec![with_middleware(vec![TracingMiddleware::build()])]);
    server
        .post("/submit", handler_fn(|ctx| ctx.resp_status = 201))
        .unwrap();
    let resp = server.handle(request(Method::POST, "/submit"));
    assert_eq!(resp.status(), 201);
}
