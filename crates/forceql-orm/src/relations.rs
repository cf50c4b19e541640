//! Relationship resolution: child-set queries and parent point lookups.
//!
//! Both directions are routed through [`Table`], so they translate and
//! execute exactly like any other query and the loaded entities register
//! with the same context as the entity they were reached from. Chains
//! (parent → child → grandchild) work by repeated application; each hop is
//! one remote round trip per unique parent.

use std::sync::Arc;

use crate::context::ContextInner;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::metadata::RelationshipMetadata;
use crate::predicate::field;
use crate::table::Table;
use crate::tracked::Tracked;

fn ensure_target<T: Entity>(rel: &RelationshipMetadata) -> Result<()> {
    let declared = T::metadata().object_name();
    if declared != rel.target_object {
        return Err(Error::invalid(format!(
            "relationship `{}` targets {}, not {}",
            rel.name, rel.target_object, declared
        )));
    }
    Ok(())
}

/// Load the child set: all target records whose foreign key references the
/// parent.
pub(crate) async fn load_children<C: Entity>(
    ctx: Arc<ContextInner>,
    rel: &RelationshipMetadata,
    parent_id: &str,
) -> Result<Vec<Tracked<C>>> {
    ensure_target::<C>(rel)?;
    Table::<C>::new(ctx)
        .filter(field(rel.foreign_key).eq(parent_id))
        .load()
        .await
}

/// Point lookup of the parent record by the foreign-key value stored on the
/// child.
pub(crate) async fn load_parent<P: Entity>(
    ctx: Arc<ContextInner>,
    rel: &RelationshipMetadata,
    fk_value: &str,
) -> Result<Option<Tracked<P>>> {
    ensure_target::<P>(rel)?;
    let id_field = P::metadata()
        .id_field()
        .map(|f| f.remote_name)
        .ok_or_else(|| {
            Error::invalid(format!(
                "{} declares no identity field",
                P::metadata().object_name()
            ))
        })?;
    Table::<P>::new(ctx)
        .filter(field(id_field).eq(fk_value))
        .first()
        .await
}
