//! Client Module
//!
//! HTTP transport glue.

pub mod http;

pub use http::HttpClient;
