//! # forceql
//!
//! Typed SOQL queries and a change-tracking data context for Salesforce-style
//! CRM APIs.
//!
//! Queries are composed declaratively against typed entity collections and
//! stay deferred until enumerated; the accumulated representation is lowered
//! to SOQL, executed over an OAuth-authenticated REST transport, and rows map
//! back into tracked entities. Local mutations, inserts and deletes accumulate
//! on the context and flush as one batched, best-effort commit.
//!
//! ## Security
//!
//! - Sensitive data (tokens, passwords, secrets) is redacted in Debug output
//! - Tracing spans skip credential parameters
//!
//! ## Crates
//!
//! - **forceql-client** - HTTP transport infrastructure: retry, rate-limit
//!   handling, CRM error parsing, SOQL escaping
//! - **forceql-auth** - Resource-owner password grant and session lifecycle
//! - **forceql-orm** - Metadata, picklists, query translation, relationship
//!   resolution, change tracking
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use forceql::{field, DataContext, ImpersonationParams, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let params = ImpersonationParams::from_env()?;
//!     let session = Arc::new(Session::new(params));
//!     let ctx = DataContext::new(session)?;
//!
//!     let accounts = ctx
//!         .table::<Account>()
//!         .filter(field("Name").contains("cool"))
//!         .take(10)
//!         .load()
//!         .await?;
//!
//!     for account in &accounts {
//!         account.edit(|a| a.name = Some("cooler".into()));
//!     }
//!     ctx.commit().await?;
//!
//!     Ok(())
//! }
//! ```

// Re-export the layer crates for convenient access
#[cfg(feature = "auth")]
pub use forceql_auth as auth;
#[cfg(feature = "client")]
pub use forceql_client as client;
#[cfg(feature = "orm")]
pub use forceql_orm as orm;

// Re-export commonly used types at the top level
#[cfg(feature = "auth")]
pub use forceql_auth::{ImpersonationParams, Instance, Session};
#[cfg(feature = "client")]
pub use forceql_client::ClientConfig;
#[cfg(feature = "orm")]
pub use forceql_orm::{
    field, Capabilities, DataContext, Entity, EntityMetadata, MultiPicklist, Picklist, Table,
    Tracked, TrackingState,
};
