//! Request handler module
//!
//! Each service implements [`Service`]; the server loop only sees the trait.
//! Handlers are generic over the request body so they can be driven without
//! a socket.

pub mod files;
pub mod greeter;
pub mod upload;

use bytes::Bytes;
use hyper::body::Body;
use hyper::{Request, Response};
use std::future::Future;

use crate::error::BoxError;
use crate::http::ResponseBody;

pub use files::FileServer;
pub use greeter::Greeter;

/// An HTTP application served by the server loop
pub trait Service {
    /// Handle one request. Failures are already turned into responses.
    fn call<B>(&self, req: Request<B>) -> impl Future<Output = Response<ResponseBody>>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>;
}
