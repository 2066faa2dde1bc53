//! HTTP response building module
//!
//! Builders for the synthetic responses produced by the router and the server.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

pub const METHOD_NOT_ALLOWED_BODY: &str = "This method is not allowed";
pub const NOT_FOUND_BODY: &str = "The page you requested could not be found";
pub const WELCOME_HTML: &str = "<iframe src='https://developer.fastly.com/compute-welcome' style='border:0; position: absolute; top: 0; left: 0; width: 100%; height: 100%'></iframe>\n";

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(404)
        .body(Full::new(Bytes::from_static(NOT_FOUND_BODY.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(Full::new(Bytes::from_static(NOT_FOUND_BODY.as_bytes())))
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(405)
        .body(Full::new(Bytes::from_static(
            METHOD_NOT_ALLOWED_BODY.as_bytes(),
        )))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(Full::new(Bytes::from_static(
                METHOD_NOT_ALLOWED_BODY.as_bytes(),
            )))
        })
}

/// Build 400 Bad Request response, used when the request body cannot be read
pub fn build_400_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(400)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from("400 Bad Request")))
        .unwrap_or_else(|e| {
            log_build_error("400", &e);
            Response::new(Full::new(Bytes::from("400 Bad Request")))
        })
}

/// Build 408 Request Timeout response, used when the body stalls past `read_timeout`
pub fn build_408_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(408)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from("408 Request Timeout")))
        .unwrap_or_else(|e| {
            log_build_error("408", &e);
            Response::new(Full::new(Bytes::from("408 Request Timeout")))
        })
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(413)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from("413 Payload Too Large")))
        .unwrap_or_else(|e| {
            log_build_error("413", &e);
            Response::new(Full::new(Bytes::from("413 Payload Too Large")))
        })
}

/// Build 503 Service Unavailable response, returned when a backend cannot be reached
pub fn build_503_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(503)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from("Service Unavailable")))
        .unwrap_or_else(|e| {
            log_build_error("503", &e);
            Response::new(Full::new(Bytes::from("Service Unavailable")))
        })
}

/// Build the welcome page served at `/`
pub fn build_welcome_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(200)
        .header("Content-Type", "text/html; charset=utf-8")
        .body(Full::new(Bytes::from_static(WELCOME_HTML.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_string(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_synthetic_error_responses_have_no_headers() {
        let resp = build_404_response();
        assert_eq!(resp.status(), 404);
        assert!(resp.headers().is_empty());
        assert_eq!(body_string(resp).await, NOT_FOUND_BODY);

        let resp = build_405_response();
        assert_eq!(resp.status(), 405);
        assert!(resp.headers().is_empty());
        assert_eq!(body_string(resp).await, METHOD_NOT_ALLOWED_BODY);
    }

    #[tokio::test]
    async fn test_welcome_response() {
        let resp = build_welcome_response();
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers()["content-type"],
            "text/html; charset=utf-8"
        );
        let body = body_string(resp).await;
        assert!(body.contains("developer.fastly.com/compute-welcome"));
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_platform_responses() {
        assert_eq!(build_400_response().status(), 400);
        assert_eq!(build_408_response().status(), 408);
        assert_eq!(build_413_response().status(), 413);
        assert_eq!(build_503_response().status(), 503);
    }
}
