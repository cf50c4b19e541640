//! # forceql-client
//!
//! HTTP transport infrastructure for the forceql data context.
//!
//! This crate knows nothing about queries, entities or change tracking. It
//! provides the plumbing the upper layers are built on:
//! - request building with bearer authentication
//! - automatic retry with exponential backoff and jitter
//! - rate limit detection and `Retry-After` handling
//! - CRM error-body parsing into typed errors
//! - SOQL string escaping for the query translator
//!
//! ## Example
//!
//! ```rust,ignore
//! use forceql_client::{HttpClient, RequestSpec};
//!
//! let http = HttpClient::default_client()?;
//! let page: serde_json::Value = http
//!     .send_json(
//!         RequestSpec::get("https://na1.salesforce.com/services/data/v62.0/limits")
//!             .bearer_auth("token"),
//!     )
//!     .await?;
//! ```

mod config;
mod error;
mod http;
mod request;
mod retry;
pub mod security;

pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, ErrorKind, Result};
pub use http::{HttpClient, Response};
pub use request::{RequestBody, RequestSpec};
pub use retry::{BackoffStrategy, RetryConfig, RetryPolicy};

/// Default API version for the REST endpoints.
pub const DEFAULT_API_VERSION: &str = "62.0";

/// User-Agent string for the client.
pub const USER_AGENT: &str = concat!("forceql/", env!("CARGO_PKG_VERSION"));
