//! Greeter routes: `GET /ping` and `GET /hello?name=X`

use bytes::Bytes;
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};

use super::Service;
use crate::error::BoxError;
use crate::http::{self, ResponseBody};

/// Stateless greeter service
#[derive(Debug, Default, Clone, Copy)]
pub struct Greeter;

impl Service for Greeter {
    async fn call<B>(&self, req: Request<B>) -> Response<ResponseBody>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let path = req.uri().path();
        if path != "/ping" && path != "/hello" {
            return http::build_404_response();
        }
        if !matches!(*req.method(), Method::GET | Method::HEAD) {
            return http::build_405_response("GET, HEAD");
        }

        if path == "/ping" {
            return http::build_text_response(StatusCode::OK, "pong\n");
        }

        match query_param(req.uri().query(), "name") {
            Some(name) if !name.is_empty() => {
                http::build_text_response(StatusCode::OK, format!("Hello, {name}!\n"))
            }
            _ => http::build_text_response(StatusCode::BAD_REQUEST, "empty name\n"),
        }
    }
}

/// First value of `key` in a query string
fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query?).ok()?;
    pairs.into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Empty};

    async fn get(method: &str, uri: &str) -> (StatusCode, String) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Empty::<Bytes>::new())
            .unwrap();
        let resp = Greeter.call(req).await;
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_ping() {
        assert_eq!(get("GET", "/ping").await, (StatusCode::OK, "pong\n".to_string()));
    }

    #[tokio::test]
    async fn test_hello() {
        assert_eq!(
            get("GET", "/hello?name=Misha").await,
            (StatusCode::OK, "Hello, Misha!\n".to_string())
        );
        assert_eq!(
            get("GET", "/hello?name=Jos%C3%A9+Luis").await,
            (StatusCode::OK, "Hello, José Luis!\n".to_string())
        );
    }

    #[tokio::test]
    async fn test_hello_empty_name() {
        for uri in ["/hello", "/hello?name=", "/hello?other=x"] {
            assert_eq!(
                get("GET", uri).await,
                (StatusCode::BAD_REQUEST, "empty name\n".to_string()),
                "{uri}"
            );
        }
    }

    #[tokio::test]
    async fn test_wrong_method_and_path() {
        assert_eq!(get("POST", "/hello").await.0, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(get("GET", "/nope").await.0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_query_param_takes_first() {
        assert_eq!(
            query_param(Some("name=a&name=b"), "name").as_deref(),
            Some("a")
        );
        assert_eq!(query_param(None, "name"), None);
    }
}
