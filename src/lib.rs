//! Flat-directory file server and a small greeter service.
//!
//! Both binaries share the same stack: layered configuration, a hyper
//! HTTP/1.1 accept loop and `tracing` logs. They differ only in the
//! [`handler::Service`] they serve.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod storage;
