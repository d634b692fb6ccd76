//! Request id middleware.
//!
//! Every response carries an `x-request-id`. An id sent by an upstream proxy
//! is reused when it looks like an id; anything else is replaced with a
//! fresh UUID v4. The id is recorded on the request span and tagged on the
//! Sentry scope so logs and error reports can be matched up.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream id accepted as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Use the upstream id if it is short and made of id characters.
fn upstream_id(headers: &HeaderMap) -> Option<String> {
    let id = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    let valid = !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    valid.then(|| id.to_string())
}

/// Tag the request with an id and echo it on the response.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id =
        upstream_id(request.headers()).unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
        headers
    }

    #[test]
    fn test_upstream_id_is_reused() {
        assert_eq!(
            upstream_id(&headers("cf-8a1b2c.3")),
            Some("cf-8a1b2c.3".to_string())
        );
    }

    #[test]
    fn test_odd_upstream_ids_are_replaced() {
        assert_eq!(upstream_id(&HeaderMap::new()), None);
        assert_eq!(upstream_id(&headers("  ")), None);
        assert_eq!(upstream_id(&headers("id with spaces")), None);
        assert_eq!(upstream_id(&headers(&"a".repeat(200))), None);
    }
}
