use std::sync::Arc;
use std::thread;

use http::Method;
use segroute::router::{RouteError, Router, SegmentType};
use segroute::{handler_fn, Context, Handler};

fn named(name: &'static str) -> Handler {
    handler_fn(move |ctx| ctx.resp_body = name.as_bytes().to_vec())
}

fn served_by(router: &Router, method: Method, path: &str) -> Option<String> {
    let m = router.find_route(&method, path)?;
    let handler = m.handler?;
    let mut ctx = Context::default();
    handler(&mut ctx);
    Some(String::from_utf8(ctx.resp_body).unwrap())
}

fn build() -> Router {
    let mut router = Router::new();
    let routes: &[(Method, &str, &'static str)] = &[
        (Method::GET, "/", "root"),
        (Method::GET, "/user", "user"),
        (Method::GET, "/user/home", "user_home"),
        (Method::GET, "/order/detail", "order_detail"),
        (Method::GET, "/order/:id", "order_id"),
        (Method::GET, "/order/:id/items", "order_items"),
        (Method::GET, "/files/*", "files"),
        (Method::GET, "/reg/:code(^[0-9]+)", "reg_digits"),
        (Method::POST, "/order/create", "order_create"),
        (Method::PUT, "/*", "put_any"),
    ];
    for (method, path, name) in routes {
        router
            .add_route(method.clone(), path, named(name), vec![])
            .unwrap();
    }
    router
}

#[test]
fn test_distinct_routes_resolve() {
    let router = build();
    let cases: &[(Method, &str, Option<&str>)] = &[
        (Method::GET, "/", Some("root")),
        (Method::GET, "/user", Some("user")),
        (Method::GET, "/user/home", Some("user_home")),
        (Method::GET, "/order/detail", Some("order_detail")),
        (Method::GET, "/order/123", Some("order_id")),
        (Method::GET, "/order/123/items", Some("order_items")),
        (Method::GET, "/files/a/b/c.txt", Some("files")),
        (Method::GET, "/reg/2024", Some("reg_digits")),
        (Method::GET, "/reg/abc", None),
        (Method::POST, "/order/create", Some("order_create")),
        (Method::POST, "/order/123", None),
        (Method::GET, "/missing", None),
        (Method::DELETE, "/user", None),
    ];
    for (method, path, expected) in cases {
        assert_eq!(
            served_by(&router, method.clone(), path).as_deref(),
            *expected,
            "{method} {path}"
        );
    }
}

#[test]
fn test_methods_are_isolated() {
    let router = build();
    assert_eq!(served_by(&router, Method::PUT, "/user").as_deref(), Some("put_any"));
    assert_eq!(served_by(&router, Method::GET, "/user").as_deref(), Some("user"));
    assert_eq!(served_by(&router, Method::PUT, "/a/b/c").as_deref(), Some("put_any"));
}

#[test]
fn test_params_are_captured() {
    let router = build();
    let m = router.find_route(&Method::GET, "/order/77/items").unwrap();
    assert_eq!(m.route_template(), Some("/order/:id/items"));
    assert_eq!(m.get_path_param("id"), Some("77"));

    let m = router.find_route(&Method::GET, "/reg/9").unwrap();
    assert_eq!(m.get_path_param("code"), Some("9"));
}

#[test]
fn test_regex_is_anchored_to_the_whole_segment() {
    let mut router = Router::new();
    router
        .add_route(Method::GET, "/v/:n(\\d+)", named("digits"), vec![])
        .unwrap();
    assert_eq!(served_by(&router, Method::GET, "/v/12").as_deref(), Some("digits"));
    assert_eq!(served_by(&router, Method::GET, "/v/12a"), None);
}

#[test]
fn test_path_without_leading_slash_is_not_found() {
    let router = build();
    assert!(router.find_route(&Method::GET, "user").is_none());
}

#[test]
fn test_construction_errors() {
    let mut router = build();
    let cases: Vec<(&str, RouteError)> = vec![
        ("", RouteError::EmptyPath),
        (
            "user",
            RouteError::MissingLeadingSlash {
                path: "user".to_string(),
            },
        ),
        (
            "/user/",
            RouteError::TrailingSlash {
                path: "/user/".to_string(),
            },
        ),
        (
            "/a//b",
            RouteError::EmptySegment {
                path: "/a//b".to_string(),
            },
        ),
        (
            "/user",
            RouteError::DuplicateRoute {
                method: Method::GET,
                path: "/user".to_string(),
            },
        ),
        (
            "/order/*",
            RouteError::ConflictingSegment {
                path: "/order/*".to_string(),
                existing: SegmentType::Param,
                attempted: SegmentType::Wildcard,
            },
        ),
        (
            "/files/:name",
            RouteError::ConflictingSegment {
                path: "/files/:name".to_string(),
                existing: SegmentType::Wildcard,
                attempted: SegmentType::Param,
            },
        ),
    ];
    let before = router.len();
    for (path, expected) in cases {
        assert_eq!(
            router.add_route(Method::GET, path, named("x"), vec![]),
            Err(expected),
            "{path:?}"
        );
    }
    assert_eq!(router.len(), before);
}

#[test]
fn test_error_messages_name_the_path() {
    let mut router = Router::new();
    router.add_route(Method::GET, "/a/:id", named("a"), vec![]).unwrap();
    let err = router
        .add_route(Method::GET, "/a/(x+)", named("b"), vec![])
        .unwrap_err();
    assert!(err.to_string().contains("/a/(x+)"), "{err}");
}

#[test]
fn test_router_shared_across_threads() {
    let router = Arc::new(build());
    let workers: Vec<_> = (0..8)
        .map(|i| {
            let router = Arc::clone(&router);
            thread::spawn(move || {
                for _ in 0..200 {
                    let path = format!("/order/{i}");
                    let m = router.find_route(&Method::GET, &path).unwrap();
                    assert_eq!(m.get_path_param("id"), Some(i.to_string().as_str()));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
}
