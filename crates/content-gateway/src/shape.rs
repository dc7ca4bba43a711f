//! Response shaping: uniform headers regardless of which origin produced the
//! body

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Response};

/// Headers that identify the backing provider; never forwarded.
/// Transfer-Encoding and Connection are hop-by-hop: this server frames its
/// own response body.
const STRIPPED_HEADERS: [&str; 7] = [
    "x-guploader-uploadid",
    "x-goog-hash",
    "x-amz-request-id",
    "x-amz-expiration",
    "x-hw",
    "transfer-encoding",
    "connection",
];

/// A path plus provider names content-stable bytes, so shaped successes are
/// cacheable for a week and immutable.
const CACHE_CONTROL_VALUE: &str = "public, max-age=604800, immutable";

/// Re-shape an upstream response for the client: strip provider-identifying
/// headers, pin disposition, CORS and caching, and stream the body through
/// unbuffered. The upstream status (200, 206, ...) passes through unchanged.
pub fn shape_response(upstream: reqwest::Response, file_name: &str) -> Response<Body> {
    let status = upstream.status();

    let mut headers = HeaderMap::new();
    for (name, value) in upstream.headers() {
        if STRIPPED_HEADERS.contains(&name.as_str()) {
            continue;
        }
        // First value per name wins; the rewrites below are single-valued.
        if !headers.contains_key(name) {
            headers.insert(name.clone(), value.clone());
        }
    }

    let disposition = format!("inline; filename=\"{}\"", urlencoding::encode(file_name));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET,HEAD,OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Range"),
    );
    if file_name.ends_with(".vtt") {
        // Upstreams routinely mislabel WebVTT subtitles.
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/vtt"));
    }
    if status.is_success() {
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_VALUE),
        );
    }

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
