//! HTTP protocol layer module
//!
//! Response builders and the body type, decoupled from the services that use them.

pub mod response;

pub use response::{
    build_404_response, build_405_response, build_attachment_response, build_text_response,
    full_body, ResponseBody,
};
