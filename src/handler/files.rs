//! File server routes
//!
//! | Route                      | Store operation |
//! |----------------------------|-----------------|
//! | `POST /files`              | save            |
//! | `GET /files`               | list            |
//! | `GET /files/{filename}`    | get             |
//! | `PUT /files/{filename}`    | update          |
//! | `DELETE /files/{filename}` | delete          |

use bytes::Bytes;
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use tracing::{info, warn};

use super::upload;
use super::Service;
use crate::error::{ApiError, BoxError};
use crate::http::{self, ResponseBody};
use crate::storage::{names, FileStore};

const COLLECTION_PATH: &str = "/files";
const ITEM_PREFIX: &str = "/files/";

/// Routes of the file server, resolved from the request path
#[derive(Debug, PartialEq, Eq)]
enum FileRoute<'a> {
    Collection,
    Item(&'a str),
}

impl<'a> FileRoute<'a> {
    fn parse(path: &'a str) -> Option<Self> {
        if path == COLLECTION_PATH {
            return Some(Self::Collection);
        }
        let raw = path.strip_prefix(ITEM_PREFIX)?;
        if raw.is_empty() || raw.contains('/') {
            return None;
        }
        Some(Self::Item(raw))
    }
}

/// HTTP front of a [`FileStore`]
pub struct FileServer {
    store: FileStore,
    max_upload_size: u64,
}

impl FileServer {
    pub const fn new(store: FileStore, max_upload_size: u64) -> Self {
        Self {
            store,
            max_upload_size,
        }
    }

    pub const fn store(&self) -> &FileStore {
        &self.store
    }

    async fn route<B>(&self, req: Request<B>) -> Result<Response<ResponseBody>, ApiError>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let path = req.uri().path().to_string();
        let Some(route) = FileRoute::parse(&path) else {
            return Ok(http::build_404_response());
        };

        match route {
            FileRoute::Collection => match *req.method() {
                Method::POST => self.handle_save(req).await,
                Method::GET | Method::HEAD => self.handle_list().await,
                _ => Ok(http::build_405_response("GET, HEAD, POST")),
            },
            FileRoute::Item(raw) => {
                let allowed = matches!(
                    *req.method(),
                    Method::GET | Method::HEAD | Method::PUT | Method::DELETE
                );
                if !allowed {
                    return Ok(http::build_405_response("GET, HEAD, PUT, DELETE"));
                }

                let filename = decode_filename(raw)?;
                match *req.method() {
                    Method::PUT => self.handle_update(req, &filename).await,
                    Method::DELETE => self.handle_delete(&filename).await,
                    _ => self.handle_get(&filename).await,
                }
            }
        }
    }

    /// POST /files
    async fn handle_save<B>(&self, req: Request<B>) -> Result<Response<ResponseBody>, ApiError>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let part = upload::file_part(req, self.max_upload_size).await?;
        let filename = part
            .file_name
            .ok_or_else(|| ApiError::BadRequest("File part has no file name".to_string()))?;

        let written = self.store.save(&filename, part.content).await?;
        info!(file = %filename, bytes = written, "File uploaded successfully");

        Ok(http::build_text_response(
            StatusCode::CREATED,
            format!("{filename}\n"),
        ))
    }

    /// PUT /files/{filename}
    async fn handle_update<B>(
        &self,
        req: Request<B>,
        filename: &str,
    ) -> Result<Response<ResponseBody>, ApiError>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let part = upload::file_part(req, self.max_upload_size).await?;
        let written = self.store.update(filename, part.content).await?;
        info!(file = %filename, bytes = written, "File updated successfully");

        Ok(http::build_text_response(
            StatusCode::OK,
            "File updated successfully\n",
        ))
    }

    /// GET /files/{filename}
    async fn handle_get(&self, filename: &str) -> Result<Response<ResponseBody>, ApiError> {
        let stored = self.store.get(filename).await?;
        Ok(http::build_attachment_response(
            filename,
            stored.file,
            stored.len,
        ))
    }

    /// GET /files
    async fn handle_list(&self) -> Result<Response<ResponseBody>, ApiError> {
        let listing = self.store.list_as_text().await?;
        Ok(http::build_text_response(StatusCode::OK, listing))
    }

    /// DELETE /files/{filename}
    async fn handle_delete(&self, filename: &str) -> Result<Response<ResponseBody>, ApiError> {
        self.store.delete(filename).await?;
        info!(file = %filename, "File deleted");
        Ok(http::build_text_response(StatusCode::OK, "File deleted\n"))
    }
}

impl Service for FileServer {
    async fn call<B>(&self, req: Request<B>) -> Response<ResponseBody>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        match self.route(req).await {
            Ok(resp) => resp,
            Err(err) => {
                warn!(%method, %path, status = err.status().as_u16(), "{err}");
                http::build_text_response(err.status(), err.public_message())
            }
        }
    }
}

/// Decode a path segment into a stored file name.
///
/// A name that could never have been stored is simply not found.
fn decode_filename(raw: &str) -> Result<String, ApiError> {
    let decoded = urlencoding::decode(raw)
        .map_err(|e| ApiError::BadRequest(format!("Invalid path encoding: {e}")))?
        .into_owned();
    names::validate(&decoded).map_err(|e| ApiError::NotFound(e.to_string()))?;
    Ok(decoded)
}
