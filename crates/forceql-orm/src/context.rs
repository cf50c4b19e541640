//! The change-tracking data context.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, instrument, warn};

use forceql_auth::Session;

use crate::entity::{Entity, FieldMap};
use crate::error::{CommitError, CommitFailure, CommitOperation, Error, Result};
use crate::query::{Capabilities, Dialect, Soql};
use crate::table::Table;
use crate::tracked::{Status, Tracked, TrackingState};
use crate::transport::{RestTransport, Transport};

/// Type-erased view of a tracked entity, as the commit loop sees it.
pub(crate) trait PendingRecord: Send + Sync {
    fn object_name(&self) -> &'static str;
    fn record_id(&self) -> Option<String>;
    fn tracking_state(&self) -> TrackingState;
    fn insert_payload(&self) -> Result<FieldMap>;
    fn dirty_fields(&self) -> Result<FieldMap>;
    fn complete_insert(&self, id: String);
    fn refresh_snapshot(&self);
}

fn same_record(a: &Arc<dyn PendingRecord>, b: &Arc<dyn PendingRecord>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Shared state behind a [`DataContext`] and every entity it tracks.
pub(crate) struct ContextInner {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) dialect: Arc<dyn Dialect>,
    pub(crate) capabilities: Capabilities,
    /// All tracked entity instances, in registration order.
    registry: Mutex<Vec<Arc<dyn PendingRecord>>>,
}

impl ContextInner {
    pub(crate) fn track(&self, record: Arc<dyn PendingRecord>) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    fn untrack(&self, record: &Arc<dyn PendingRecord>) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|entry| !same_record(entry, record));
    }

    fn entries(&self) -> Vec<Arc<dyn PendingRecord>> {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Root object of the unit of work.
///
/// A context owns one transport (bound to one session), one registry of
/// tracked entities, and the pending change set derived from it. Loaded
/// entities register here; mutations, inserts and deletes accumulate until
/// [`commit`](DataContext::commit) flushes them.
///
/// The registry is internally locked, so `&self` methods are memory-safe to
/// call from multiple threads; the context does NOT order concurrent
/// mutations for you. Callers with dependent operations (parent before
/// child) must serialize them.
pub struct DataContext {
    inner: Arc<ContextInner>,
}

impl DataContext {
    /// Create a context talking to the real service through the session.
    pub fn new(session: Arc<Session>) -> Result<Self> {
        Ok(Self::with_transport(Arc::new(RestTransport::new(session)?)))
    }

    /// Create a context over any transport with default capabilities.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self::configured(transport, Capabilities::default(), Arc::new(Soql))
    }

    /// Create a fully configured context.
    pub fn configured(
        transport: Arc<dyn Transport>,
        capabilities: Capabilities,
        dialect: Arc<dyn Dialect>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                transport,
                dialect,
                capabilities,
                registry: Mutex::new(Vec::new()),
            }),
        }
    }

    /// A fresh queryable sequence over the given entity type, rooted at
    /// this context: entities it loads register with this context's
    /// tracker.
    pub fn table<T: Entity>(&self) -> Table<T> {
        Table::new(self.inner.clone())
    }

    /// Register a new entity for creation on the next commit.
    ///
    /// The entity must not already carry a remote identity.
    pub fn insert<T: Entity>(&self, entity: T) -> Result<Tracked<T>> {
        if let Some(id) = entity.record_id() {
            return Err(Error::invalid(format!(
                "cannot insert {} {}: it already has a remote identity",
                T::metadata().object_name(),
                id
            )));
        }
        Tracked::create(&self.inner, entity, Status::Inserted)
    }

    /// Mark an entity for deletion on the next commit.
    ///
    /// An entity that was inserted and never committed is simply forgotten:
    /// no remote call will be issued for it.
    pub fn delete<T: Entity>(&self, tracked: &Tracked<T>) -> Result<()> {
        let owner = tracked
            .owner()
            .ok_or_else(|| Error::invalid("the entity's context has been dropped"))?;
        if !Arc::ptr_eq(&owner, &self.inner) {
            return Err(Error::invalid(
                "entity is tracked by a different context",
            ));
        }

        let was_uncommitted_insert = tracked.mark_deleted();
        if was_uncommitted_insert {
            self.inner.untrack(&tracked.as_record());
        }
        Ok(())
    }

    /// Number of operations a commit would attempt right now.
    pub fn pending_count(&self) -> usize {
        self.inner
            .entries()
            .iter()
            .filter(|entry| entry.tracking_state() != TrackingState::Unmodified)
            .count()
    }

    /// Flush all pending operations.
    ///
    /// Iterates the pending change set in registration order, issuing one
    /// remote call per entry: create for inserted entities, update with the
    /// changed fields only for modified ones, delete for deleted ones.
    /// Every entry is attempted regardless of earlier failures; successful
    /// entries are cleared, failed ones stay pending. If any entry failed,
    /// the aggregate [`CommitError`] reports each failure in order.
    /// Successes are NOT rolled back, so a partial commit leaves the remote
    /// store partially updated and the error says so.
    #[instrument(skip(self))]
    pub async fn commit(&self) -> Result<()> {
        let entries = self.inner.entries();

        let mut attempted = 0usize;
        let mut succeeded = 0usize;
        let mut failures = Vec::new();
        let mut committed_deletes = Vec::new();

        for entry in &entries {
            match entry.tracking_state() {
                TrackingState::Unmodified => continue,
                TrackingState::Inserted => {
                    attempted += 1;
                    let payload = match entry.insert_payload() {
                        Ok(payload) => payload,
                        Err(err) => {
                            failures.push(failure(entry, CommitOperation::Create, FieldMap::new(), err));
                            continue;
                        }
                    };
                    match self.inner.transport.create(entry.object_name(), &payload).await {
                        Ok(id) => {
                            debug!(object = entry.object_name(), id = %id, "created record");
                            entry.complete_insert(id);
                            succeeded += 1;
                        }
                        Err(err) => {
                            warn!(object = entry.object_name(), error = %err, "create failed");
                            failures.push(failure(entry, CommitOperation::Create, payload, err));
                        }
                    }
                }
                TrackingState::Modified => {
                    attempted += 1;
                    let id = match entry.record_id() {
                        Some(id) => id,
                        None => {
                            failures.push(failure(
                                entry,
                                CommitOperation::Update,
                                FieldMap::new(),
                                Error::invalid("modified entity has no remote identity"),
                            ));
                            continue;
                        }
                    };
                    let fields = match entry.dirty_fields() {
                        Ok(fields) => fields,
                        Err(err) => {
                            failures.push(failure(entry, CommitOperation::Update, FieldMap::new(), err));
                            continue;
                        }
                    };
                    match self
                        .inner
                        .transport
                        .update(entry.object_name(), &id, &fields)
                        .await
                    {
                        Ok(()) => {
                            debug!(object = entry.object_name(), id = %id, changed = fields.len(), "updated record");
                            entry.refresh_snapshot();
                            succeeded += 1;
                        }
                        Err(err) => {
                            warn!(object = entry.object_name(), id = %id, error = %err, "update failed");
                            failures.push(failure(entry, CommitOperation::Update, fields, err));
                        }
                    }
                }
                TrackingState::Deleted => {
                    let Some(id) = entry.record_id() else {
                        // Never persisted; nothing to send.
                        committed_deletes.push(entry.clone());
                        continue;
                    };
                    attempted += 1;
                    match self.inner.transport.delete(entry.object_name(), &id).await {
                        Ok(()) => {
                            debug!(object = entry.object_name(), id = %id, "deleted record");
                            committed_deletes.push(entry.clone());
                            succeeded += 1;
                        }
                        Err(err) => {
                            warn!(object = entry.object_name(), id = %id, error = %err, "delete failed");
                            failures.push(failure(entry, CommitOperation::Delete, FieldMap::new(), err));
                        }
                    }
                }
            }
        }

        for entry in &committed_deletes {
            self.inner.untrack(entry);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CommitError {
                attempted,
                succeeded,
                failures,
            }
            .into())
        }
    }
}

fn failure(
    entry: &Arc<dyn PendingRecord>,
    operation: CommitOperation,
    fields: FieldMap,
    error: Error,
) -> CommitFailure {
    CommitFailure {
        object: entry.object_name(),
        record_id: entry.record_id(),
        operation,
        fields,
        error,
    }
}
