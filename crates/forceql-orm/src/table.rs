//! The deferred, chainable queryable sequence.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use crate::context::ContextInner;
use crate::entity::{self, Entity, FieldMap};
use crate::error::{Error, Result, TranslateError};
use crate::predicate::Predicate;
use crate::query::{build_soql, QueryOps, SortDirection};
use crate::tracked::{Status, Tracked};

/// A deferred query over one entity type, rooted at a context.
///
/// Operator methods are synchronous, side-effect-free, and return a new
/// `Table`: composing never performs I/O, and a table can be reused and
/// extended along independent chains. Enumeration methods (`load`,
/// `load_values`, `first`, `find`, `count`) translate the accumulated
/// representation and execute it, exactly once per call; results are never
/// cached across calls.
pub struct Table<T: Entity> {
    ctx: Arc<ContextInner>,
    ops: QueryOps,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            ops: self.ops.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Table<T> {
    pub(crate) fn new(ctx: Arc<ContextInner>) -> Self {
        Self {
            ctx,
            ops: QueryOps::default(),
            _entity: PhantomData,
        }
    }

    fn with_ops(&self, ops: QueryOps) -> Self {
        Self {
            ctx: self.ctx.clone(),
            ops,
            _entity: PhantomData,
        }
    }

    /// Add a filter; multiple filters compose conjunctively in call order.
    pub fn filter(&self, predicate: Predicate) -> Self {
        self.with_ops(self.ops.filter(predicate))
    }

    /// Project the given fields. Projected queries return plain value rows
    /// via [`load_values`](Table::load_values) and are not tracked.
    pub fn select<S: Into<String>>(&self, fields: impl IntoIterator<Item = S>) -> Self {
        self.with_ops(self.ops.select(fields))
    }

    /// Project with renamed outputs: `(output_name, source_field)` pairs.
    pub fn select_as<A: Into<String>, F: Into<String>>(
        &self,
        pairs: impl IntoIterator<Item = (A, F)>,
    ) -> Self {
        self.with_ops(self.ops.select_as(pairs))
    }

    /// Append an ordering term.
    pub fn order_by(&self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.with_ops(self.ops.order_by(field, direction))
    }

    /// Skip `n` rows; successive skips accumulate.
    pub fn skip(&self, n: u32) -> Self {
        self.with_ops(self.ops.skip(n))
    }

    /// Limit to `n` rows; successive takes intersect (minimum wins).
    pub fn take(&self, n: u32) -> Self {
        self.with_ops(self.ops.take(n))
    }

    /// The accumulated representation.
    pub fn ops(&self) -> &QueryOps {
        &self.ops
    }

    /// Translate the current representation without executing it.
    pub fn to_soql(&self) -> Result<String> {
        build_soql(
            T::metadata(),
            &self.ops,
            self.ctx.dialect.as_ref(),
            &self.ctx.capabilities,
        )
        .map_err(Error::from)
    }

    /// Execute and map rows into tracked entities.
    ///
    /// Each row becomes an entity registered `Unmodified` with this
    /// context, its snapshot set to the mapped values. Continuation pages
    /// are followed transparently unless `take` already bounds the result.
    pub async fn load(&self) -> Result<Vec<Tracked<T>>> {
        if self.ops.projection.is_some() {
            return Err(Error::invalid(
                "projected queries produce plain values; use load_values()",
            ));
        }

        let rows = self.fetch_rows(&self.ops).await?;
        let mut loaded = Vec::with_capacity(rows.len());
        for row in &rows {
            let value: T = entity::from_row(row)?;
            loaded.push(Tracked::create(&self.ctx, value, Status::Unmodified)?);
        }
        Ok(loaded)
    }

    /// Execute and return plain value rows, untracked.
    ///
    /// With an explicit projection, output keys follow the projection
    /// (including renames); otherwise the raw field maps are returned.
    pub async fn load_values(&self) -> Result<Vec<FieldMap>> {
        let rows = self.fetch_rows(&self.ops).await?;
        let mut out = Vec::with_capacity(rows.len());

        for mut row in rows {
            row.remove("attributes");
            match &self.ops.projection {
                None => out.push(row),
                Some(items) => {
                    let meta = T::metadata();
                    let mut shaped = FieldMap::new();
                    for item in items {
                        let remote = meta.resolve(&item.field).map(|f| f.remote_name).ok_or(
                            TranslateError::UnknownField {
                                object: meta.object_name(),
                                field: item.field.clone(),
                            },
                        )?;
                        let key = item
                            .alias
                            .clone()
                            .unwrap_or_else(|| remote.to_string());
                        let value = row.get(remote).cloned().unwrap_or(Value::Null);
                        shaped.insert(key, value);
                    }
                    out.push(shaped);
                }
            }
        }
        Ok(out)
    }

    /// The first matching entity, or `None` if there is no match.
    pub async fn first(&self) -> Result<Option<Tracked<T>>> {
        Ok(self.take(1).load().await?.into_iter().next())
    }

    /// Shorthand for `filter(predicate).first()`.
    pub async fn find(&self, predicate: Predicate) -> Result<Option<Tracked<T>>> {
        self.filter(predicate).first().await
    }

    /// Count matching records without fetching rows. Routed through the
    /// same translation path as row queries, in count mode.
    pub async fn count(&self) -> Result<u64> {
        let ops = self.ops.count();
        let soql = build_soql(
            T::metadata(),
            &ops,
            self.ctx.dialect.as_ref(),
            &self.ctx.capabilities,
        )?;
        let page = self.ctx.transport.query(&soql).await?;
        Ok(page.total_size)
    }

    async fn fetch_rows(&self, ops: &QueryOps) -> Result<Vec<FieldMap>> {
        let soql = build_soql(
            T::metadata(),
            ops,
            self.ctx.dialect.as_ref(),
            &self.ctx.capabilities,
        )?;

        let mut page = self.ctx.transport.query(&soql).await?;
        let mut rows = std::mem::take(&mut page.records);

        while let Some(next) = page.next_records_url.take() {
            if ops.take.is_some_and(|n| rows.len() >= n as usize) {
                break;
            }
            page = self.ctx.transport.query_next(&next).await?;
            rows.append(&mut page.records);
        }

        if let Some(n) = ops.take {
            rows.truncate(n as usize);
        }
        Ok(rows)
    }
}
