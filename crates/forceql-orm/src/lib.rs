//! # forceql-orm
//!
//! Typed, deferred SOQL queries and a change-tracking data context.
//!
//! The crate is organized around one data flow:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       DataContext                           │
//! │  - one Table<T> per entity type                             │
//! │  - registry of tracked entity instances                     │
//! │  - insert / delete / commit                                 │
//! └─────────────────────────────────────────────────────────────┘
//!                │ compose (no I/O)              │ flush
//!                ▼                               ▼
//! ┌──────────────────────────────┐  ┌──────────────────────────┐
//! │  Table<T> + QueryOps         │  │  pending change set      │
//! │  filter/select/order/        │  │  create / update changed │
//! │  skip/take  (immutable)      │  │  fields only / delete    │
//! └──────────────────────────────┘  └──────────────────────────┘
//!                │ build_soql (pure)              │
//!                ▼                                ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Transport                            │
//! │  query / queryMore / create / update / delete               │
//! │  (RestTransport: authenticated REST, re-auth once on 401)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Composing operators never performs I/O; enumeration (`load`, `first`,
//! `count`, `load_values`) translates the accumulated representation into
//! SOQL and executes it, once per call. Loaded entities are registered with
//! their context, which detects dirty fields against the load-time snapshot
//! at commit time and flushes all pending operations best-effort, reporting
//! per-operation failures in one [`CommitError`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use forceql_orm::{field, DataContext};
//!
//! let ctx = DataContext::new(session)?;
//!
//! let accounts = ctx
//!     .table::<Account>()
//!     .filter(field("Name").contains("cool"))
//!     .take(10)
//!     .load()
//!     .await?;
//!
//! for account in &accounts {
//!     let cases = account.children::<Case>("Cases").await?;
//!     account.edit(|a| a.name = Some(format!("{} (reviewed)", cases.len())));
//! }
//!
//! ctx.commit().await?;
//! ```

mod context;
mod entity;
mod error;
mod metadata;
mod picklist;
mod predicate;
mod query;
mod relations;
mod table;
mod tracked;
mod transport;

pub use context::DataContext;
pub use entity::{Entity, FieldMap};
pub use error::{CommitError, CommitFailure, CommitOperation, Error, Result, TranslateError};
pub use metadata::{
    EntityMetadata, EntityMetadataBuilder, FieldMetadata, RelationshipKind, RelationshipMetadata,
    WireType,
};
pub use picklist::{MultiPicklist, Picklist, UnknownLabel, MULTI_VALUE_SEPARATOR};
pub use predicate::{field, CompareOp, FieldExpr, Literal, Predicate};
pub use query::{
    build_soql, Capabilities, Dialect, Ordering, QueryMode, QueryOps, SelectItem, SortDirection,
    Soql,
};
pub use table::Table;
pub use tracked::{Tracked, TrackingState};
pub use transport::{QueryPage, RestTransport, Transport};
