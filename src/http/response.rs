//! HTTP response building module
//!
//! Builders for the plain-text and streamed responses both services send.

use bytes::{Bytes, BytesMut};
use futures_util::{stream, Stream};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::Frame;
use hyper::{Response, StatusCode};
use std::io;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Body type of every response
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

/// Read size for streamed downloads
const CHUNK_SIZE: usize = 64 * 1024;

/// Wrap a fully buffered body
pub fn full_body(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Build a `text/plain` response
pub fn build_text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<ResponseBody> {
    let body = body.into();
    let content_length = body.len();

    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Length", content_length)
        .body(full_body(body))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(full_body(Bytes::new()))
        })
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<ResponseBody> {
    build_text_response(StatusCode::NOT_FOUND, "404 Not Found\n")
}

/// Build 405 Method Not Allowed response
pub fn build_405_response(allow: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Allow", allow)
        .body(full_body("405 Method Not Allowed\n"))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(full_body("405 Method Not Allowed\n"))
        })
}

/// Build a download response that streams `file` as an attachment
pub fn build_attachment_response(
    filename: &str,
    file: File,
    len: u64,
) -> Response<ResponseBody> {
    let body = StreamBody::new(read_frames(file)).boxed_unsync();

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/octet-stream")
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", escape_quoted(filename)),
        )
        .header("Content-Transfer-Encoding", "binary")
        .header("Content-Length", len)
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            build_text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error\n")
        })
}

/// Read `file` chunk by chunk as body frames
fn read_frames(file: File) -> impl Stream<Item = io::Result<Frame<Bytes>>> {
    stream::try_unfold(file, |mut file| async move {
        let mut buf = BytesMut::with_capacity(CHUNK_SIZE);
        if file.read_buf(&mut buf).await? == 0 {
            return Ok(None);
        }
        Ok(Some((Frame::data(buf.freeze()), file)))
    })
}

/// Escape a value for use inside a quoted header parameter
fn escape_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    tracing::error!("Failed to build {status} response: {error}");
}
