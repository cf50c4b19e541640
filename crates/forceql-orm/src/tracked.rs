//! Tracked entity handles: value, tracking state, snapshot, relationships.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::OnceCell;

use crate::context::{ContextInner, PendingRecord};
use crate::entity::{self, Entity};
use crate::error::{Error, Result};
use crate::metadata::RelationshipKind;
use crate::relations;

/// Observable tracking state of an entity instance.
///
/// Transitions are one-way: `Unmodified → Modified` on a field write after
/// load (detected by comparing against the load-time snapshot), new
/// instances enter as `Inserted`, and any state may move to `Deleted` but
/// never back out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Unmodified,
    Inserted,
    Modified,
    Deleted,
}

/// Stored status; `Modified` is derived from the snapshot diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Unmodified,
    Inserted,
    Deleted,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct TrackCell<T> {
    value: T,
    status: Status,
    snapshot: entity::FieldMap,
}

type RelationSlot = Arc<OnceCell<Arc<dyn Any + Send + Sync>>>;

pub(crate) struct TrackedInner<T: Entity> {
    ctx: Weak<ContextInner>,
    cell: Mutex<TrackCell<T>>,
    /// Write-once memoized relationship results, keyed by relationship
    /// name. The OnceCell gives at-most-one-in-flight semantics under
    /// concurrent first access.
    relations: Mutex<HashMap<String, RelationSlot>>,
}

/// A shared handle to one tracked entity instance.
///
/// Cloning the handle shares the instance; the value itself lives behind a
/// lock and is accessed through [`read`](Tracked::read) and
/// [`edit`](Tracked::edit). Mutations are not sent anywhere until the
/// owning context commits.
pub struct Tracked<T: Entity> {
    pub(crate) inner: Arc<TrackedInner<T>>,
}

impl<T: Entity> Clone for Tracked<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Entity> std::fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracked")
            .field("object", &T::metadata().object_name())
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

impl<T: Entity> Tracked<T> {
    /// Create a handle registered with the given context.
    pub(crate) fn create(
        ctx: &Arc<ContextInner>,
        value: T,
        status: Status,
    ) -> Result<Tracked<T>> {
        let snapshot = entity::to_field_map(&value)?;
        let inner = Arc::new(TrackedInner {
            ctx: Arc::downgrade(ctx),
            cell: Mutex::new(TrackCell {
                value,
                status,
                snapshot,
            }),
            relations: Mutex::new(HashMap::new()),
        });
        ctx.track(inner.clone());
        Ok(Tracked { inner })
    }

    /// Read the entity value.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let cell = lock(&self.inner.cell);
        f(&cell.value)
    }

    /// Mutate the entity value in place. The change is picked up by the
    /// owning context's dirty detection at commit time.
    pub fn edit<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut cell = lock(&self.inner.cell);
        f(&mut cell.value)
    }

    /// A copy of the entity value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.read(|value| value.clone())
    }

    /// Remote identity, if assigned.
    pub fn id(&self) -> Option<String> {
        self.read(|value| value.record_id().map(String::from))
    }

    /// Current tracking state.
    pub fn state(&self) -> TrackingState {
        self.inner.tracking_state()
    }

    pub(crate) fn owner(&self) -> Option<Arc<ContextInner>> {
        self.inner.ctx.upgrade()
    }

    pub(crate) fn as_record(&self) -> Arc<dyn PendingRecord> {
        self.inner.clone()
    }

    /// Returns true if the entity was an uncommitted insert.
    pub(crate) fn mark_deleted(&self) -> bool {
        let mut cell = lock(&self.inner.cell);
        let was_uncommitted_insert = cell.status == Status::Inserted;
        cell.status = Status::Deleted;
        was_uncommitted_insert
    }

    fn relation_slot(&self, name: &str) -> RelationSlot {
        let mut slots = lock(&self.inner.relations);
        slots
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Resolve a one-to-many child relationship.
    ///
    /// The first access issues one query filtering the child entity set by
    /// this entity's identity through the declared foreign key; the result
    /// is memoized on this instance for its lifetime. Concurrent first
    /// accesses share a single in-flight query.
    pub async fn children<C: Entity>(&self, relationship: &str) -> Result<Vec<Tracked<C>>> {
        let rel = T::metadata()
            .relationship(relationship)
            .ok_or_else(|| {
                Error::invalid(format!(
                    "no relationship `{}` on {}",
                    relationship,
                    T::metadata().object_name()
                ))
            })?
            .clone();
        if rel.kind != RelationshipKind::Child {
            return Err(Error::invalid(format!(
                "`{}` is a parent lookup; use parent()",
                relationship
            )));
        }

        let ctx = self
            .owner()
            .ok_or_else(|| Error::invalid("the entity's context has been dropped"))?;
        let parent_id = self
            .id()
            .ok_or_else(|| Error::invalid("entity has no remote identity yet"))?;

        let slot = self.relation_slot(relationship);
        let cached = slot
            .get_or_try_init(|| async {
                let children = relations::load_children::<C>(ctx.clone(), &rel, &parent_id).await?;
                Ok::<_, Error>(Arc::new(children) as Arc<dyn Any + Send + Sync>)
            })
            .await?;

        cached
            .clone()
            .downcast::<Vec<Tracked<C>>>()
            .map(|children| (*children).clone())
            .map_err(|_| {
                Error::invalid(format!(
                    "relationship `{}` was already resolved with a different entity type",
                    relationship
                ))
            })
    }

    /// Resolve a many-to-one parent lookup.
    ///
    /// Issues a point lookup by the foreign-key value stored on this
    /// entity; `None` when the foreign key is unset. Memoized like
    /// [`children`](Tracked::children).
    pub async fn parent<P: Entity>(&self, relationship: &str) -> Result<Option<Tracked<P>>> {
        let rel = T::metadata()
            .relationship(relationship)
            .ok_or_else(|| {
                Error::invalid(format!(
                    "no relationship `{}` on {}",
                    relationship,
                    T::metadata().object_name()
                ))
            })?
            .clone();
        if rel.kind != RelationshipKind::Parent {
            return Err(Error::invalid(format!(
                "`{}` is a child relationship; use children()",
                relationship
            )));
        }

        let ctx = self
            .owner()
            .ok_or_else(|| Error::invalid("the entity's context has been dropped"))?;

        let fk_value = {
            let cell = lock(&self.inner.cell);
            entity::to_field_map(&cell.value)?
                .get(rel.foreign_key)
                .and_then(|value| value.as_str())
                .map(String::from)
        };

        let slot = self.relation_slot(relationship);
        let cached = slot
            .get_or_try_init(|| async {
                let parent = match fk_value {
                    Some(fk) => relations::load_parent::<P>(ctx.clone(), &rel, &fk).await?,
                    None => None,
                };
                Ok::<_, Error>(Arc::new(parent) as Arc<dyn Any + Send + Sync>)
            })
            .await?;

        cached
            .clone()
            .downcast::<Option<Tracked<P>>>()
            .map(|parent| (*parent).clone())
            .map_err(|_| {
                Error::invalid(format!(
                    "relationship `{}` was already resolved with a different entity type",
                    relationship
                ))
            })
    }
}

impl<T: Entity> PendingRecord for TrackedInner<T> {
    fn object_name(&self) -> &'static str {
        T::metadata().object_name()
    }

    fn record_id(&self) -> Option<String> {
        lock(&self.cell).value.record_id().map(String::from)
    }

    fn tracking_state(&self) -> TrackingState {
        let cell = lock(&self.cell);
        match cell.status {
            Status::Inserted => TrackingState::Inserted,
            Status::Deleted => TrackingState::Deleted,
            Status::Unmodified => match entity::to_field_map(&cell.value) {
                Ok(current)
                    if entity::dirty_diff(T::metadata(), &current, &cell.snapshot)
                        .is_empty() =>
                {
                    TrackingState::Unmodified
                }
                // A serialization failure surfaces from dirty_fields() at
                // commit time.
                _ => TrackingState::Modified,
            },
        }
    }

    fn insert_payload(&self) -> Result<entity::FieldMap> {
        let cell = lock(&self.cell);
        let map = entity::to_field_map(&cell.value)?;
        Ok(entity::insert_payload(T::metadata(), &map))
    }

    fn dirty_fields(&self) -> Result<entity::FieldMap> {
        let cell = lock(&self.cell);
        let current = entity::to_field_map(&cell.value)?;
        Ok(entity::dirty_diff(T::metadata(), &current, &cell.snapshot))
    }

    fn complete_insert(&self, id: String) {
        let mut cell = lock(&self.cell);
        cell.value.set_record_id(id);
        cell.status = Status::Unmodified;
        if let Ok(map) = entity::to_field_map(&cell.value) {
            cell.snapshot = map;
        }
    }

    fn refresh_snapshot(&self) {
        let mut cell = lock(&self.cell);
        if let Ok(map) = entity::to_field_map(&cell.value) {
            cell.snapshot = map;
        }
    }
}
