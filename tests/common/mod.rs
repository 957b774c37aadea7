// Shared helpers for the socket-level tests
#![allow(dead_code)]

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::HeaderMap;
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use rust_fileserver::config::{AppState, Config, Overrides};
use rust_fileserver::handler::Service;
use rust_fileserver::server;

pub const BOUNDARY: &str = "X-INTEGRATION-BOUNDARY";

/// Defaults only; the prefix is never set in the environment
pub fn test_config() -> Config {
    Config::load_from("no-such-config-file", "ITEST_UNSET", &Overrides::default()).unwrap()
}

/// A service listening on an ephemeral loopback port.
///
/// Must be started and stopped inside a `LocalSet`.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn start<S: Service + 'static>(service: S) -> Self {
        Self::start_with(service, test_config())
    }

    pub fn start_with<S: Service + 'static>(service: S, config: Config) -> Self {
        let listener = server::create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let state = Arc::new(AppState::new(config));

        let handle = tokio::task::spawn_local(server::start_server_loop(
            listener,
            state,
            Arc::new(service),
            Arc::clone(&shutdown),
        ));

        Self {
            addr,
            shutdown,
            handle,
        }
    }

    pub async fn stop(self) {
        self.shutdown.notify_one();
        self.handle.await.unwrap();
    }
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Reply {
    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap()
    }
}

/// Send one request on a fresh connection
pub async fn send(addr: SocketAddr, req: Request<Full<Bytes>>) -> Result<Reply, hyper::Error> {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    tokio::task::spawn_local(async move {
        let _ = conn.await;
    });

    let resp = sender.send_request(req).await?;
    let (parts, body) = resp.into_parts();
    let body = body.collect().await?.to_bytes();

    Ok(Reply {
        status: parts.status,
        headers: parts.headers,
        body,
    })
}

pub fn bare(method: &str, uri: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("host", "localhost")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

pub fn multipart(method: &str, uri: &str, filename: &str, content: &[u8]) -> Request<Full<Bytes>> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header("host", "localhost")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
