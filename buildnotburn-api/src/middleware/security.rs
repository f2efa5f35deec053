/// Security response headers
///
/// Added to every response:
/// - `X-Content-Type-Options: nosniff`
/// - `X-Frame-Options: DENY`
/// - `Referrer-Policy: strict-origin-when-cross-origin`
/// - `Permissions-Policy` disabling sensors and payment APIs
/// - `Content-Security-Policy: default-src 'none'; frame-ancestors 'none'`
///   (the API serves JSON and event streams only)
/// - `Strict-Transport-Security` in production
///
/// # Example
///
/// ```
/// use axum::{routing::get, Router};
/// use buildnotburn_api::middleware::security::security_headers;
///
/// let app: Router = Router::new()
///     .route("/", get(|| async { "ok" }))
///     .layer(axum::middleware::from_fn_with_state(false, security_headers));
/// ```

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Adds the security headers; `production` turns on HSTS
pub async fn security_headers(State(production): State<bool>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "permissions-policy",
        HeaderValue::from_static("geolocation=(), microphone=(), camera=(), payment=(), usb=()"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );

    if production {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }

    response
}
