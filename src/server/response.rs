use http::header::HeaderValue;
use http::{Response, StatusCode};

use crate::context::Context;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the outbound response from a dispatched context.
///
/// Status codes outside the valid HTTP range become 500. The request ID is
/// echoed in `x-request-id` unless a handler already set that header.
pub fn into_response(ctx: Context) -> Response<Vec<u8>> {
    let status = StatusCode::from_u16(ctx.resp_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut headers = ctx.resp_headers;
    if !headers.contains_key(REQUEST_ID_HEADER) {
        if let Ok(value) = HeaderValue::from_str(&ctx.request_id.to_string()) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
    }

    let mut resp = Response::new(ctx.resp_body);
    *resp.status_mut() = status;
    *resp.headers_mut() = headers;
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_status_becomes_500() {
        let mut ctx = Context::default();
        ctx.resp_status = 42;
        ctx.resp_body = b"x".to_vec();
        let resp = into_response(ctx);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.body(), b"x");
    }

    #[test]
    fn test_request_id_echoed() {
        let ctx = Context::default();
        let id = ctx.request_id.to_string();
        let resp = into_response(ctx);
        assert_eq!(resp.headers()[REQUEST_ID_HEADER], id.as_str());
    }
}
