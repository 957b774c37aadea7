//! Multipart upload extraction
//!
//! Locates the `file` part of a `multipart/form-data` body without buffering
//! it; the returned field streams straight into the store.

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Body;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE};
use hyper::Request;
use multer::{Constraints, Field, Multipart, SizeLimit};

use crate::error::{ApiError, BoxError};

/// Form field carrying the uploaded file
pub const FILE_FIELD: &str = "file";

/// The `file` part of an upload
pub struct FilePart {
    /// File name from the part's `Content-Disposition`, if any
    pub file_name: Option<String>,
    /// Part content, streamed
    pub content: Field<'static>,
}

/// Open the multipart body of `req` and advance to its `file` part.
///
/// `max_size` bounds the whole body; a declared `Content-Length` above it is
/// refused before anything is read.
pub async fn file_part<B>(req: Request<B>, max_size: u64) -> Result<FilePart, ApiError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    if let Some(declared) = declared_length(&req) {
        if declared > max_size {
            return Err(ApiError::BadRequest(format!(
                "Upload too large: {declared} bytes (max: {max_size})"
            )));
        }
    }

    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing Content-Type".to_string()))?;
    let boundary = multer::parse_boundary(content_type)?;

    let constraints =
        Constraints::new().size_limit(SizeLimit::new().whole_stream(max_size));
    let stream = req.into_body().into_data_stream();
    let mut multipart = Multipart::with_constraints(stream, boundary, constraints);

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            return Ok(FilePart {
                file_name: field.file_name().map(ToString::to_string),
                content: field,
            });
        }
    }

    Err(ApiError::BadRequest(format!(
        "Missing multipart field '{FILE_FIELD}'"
    )))
}

fn declared_length<B>(req: &Request<B>) -> Option<u64> {
    req.headers()
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;
    use http_body_util::Full;

    const BOUNDARY: &str = "X-TEST-BOUNDARY";

    fn multipart_request(parts: &[(&str, Option<&str>, &str)]) -> Request<Full<Bytes>> {
        let mut body = String::new();
        for (name, file_name, content) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match file_name {
                Some(f) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method("POST")
            .uri("/files")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    }

    async fn collect(part: FilePart) -> Vec<u8> {
        part.content
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_finds_file_part_after_other_fields() {
        let req = multipart_request(&[
            ("comment", None, "ignored"),
            ("file", Some("file1.txt"), "go, go Gophers!"),
        ]);
        let part = file_part(req, 1024).await.unwrap();

        assert_eq!(part.file_name.as_deref(), Some("file1.txt"));
        assert_eq!(collect(part).await, b"go, go Gophers!");
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let req = multipart_request(&[("other", Some("a.txt"), "data")]);
        assert!(matches!(
            file_part(req, 1024).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_not_multipart() {
        let req = Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from_static(b"{}")))
            .unwrap();
        assert!(matches!(
            file_part(req, 1024).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_declared_length_over_limit() {
        let mut req = multipart_request(&[("file", Some("a.txt"), "data")]);
        req.headers_mut().insert(CONTENT_LENGTH, "4096".parse().unwrap());
        assert!(matches!(
            file_part(req, 1024).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_stream_over_limit_fails_while_reading() {
        let big = "x".repeat(4096);
        let req = multipart_request(&[("file", Some("big.bin"), big.as_str())]);

        let result = match file_part(req, 1024).await {
            Ok(part) => part.content.try_for_each(|_| async { Ok(()) }).await,
            Err(_) => return,
        };
        assert!(result.is_err());
    }
}
