//! Per-entity-type metadata: remote names, wire types, relationships.
//!
//! Metadata is pure data, built once per entity type and shared by every
//! context. The query translator, the row mapper and the relationship
//! resolver all resolve names through it.

/// Wire type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    /// The record identity field.
    Id,
    Text,
    Number,
    Boolean,
    DateTime,
    Date,
    /// Single-select enumerated field; compared by remote label.
    Picklist,
    /// Multi-select enumerated field; serialized as a `;`-joined label string.
    MultiPicklist,
    /// Foreign-key reference to another object.
    Reference,
}

/// One field of an entity.
#[derive(Debug, Clone)]
pub struct FieldMetadata {
    /// Name of the field on the local type.
    pub local_name: &'static str,
    /// Name of the field on the remote object.
    pub remote_name: &'static str,
    /// Wire type.
    pub wire_type: WireType,
}

/// Direction of a relationship as seen from the declaring entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    /// One-to-many: the target object carries a foreign key back to us.
    Child,
    /// Many-to-one lookup: we carry the foreign key.
    Parent,
}

/// A declared relationship to another object.
#[derive(Debug, Clone)]
pub struct RelationshipMetadata {
    /// Relationship name used at the access site.
    pub name: &'static str,
    /// Remote object name of the target entity type.
    pub target_object: &'static str,
    /// Direction.
    pub kind: RelationshipKind,
    /// Remote name of the foreign-key field. For a child relationship this
    /// field lives on the target object; for a parent lookup it lives on
    /// the declaring object.
    pub foreign_key: &'static str,
}

/// Immutable description of one entity type.
#[derive(Debug, Clone)]
pub struct EntityMetadata {
    object_name: &'static str,
    fields: Vec<FieldMetadata>,
    relationships: Vec<RelationshipMetadata>,
}

impl EntityMetadata {
    /// Start building metadata for the given remote object.
    pub fn builder(object_name: &'static str) -> EntityMetadataBuilder {
        EntityMetadataBuilder {
            meta: EntityMetadata {
                object_name,
                fields: Vec::new(),
                relationships: Vec::new(),
            },
        }
    }

    /// Remote object name.
    pub fn object_name(&self) -> &'static str {
        self.object_name
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &[FieldMetadata] {
        &self.fields
    }

    /// Declared relationships.
    pub fn relationships(&self) -> &[RelationshipMetadata] {
        &self.relationships
    }

    /// Resolve a field by local name, falling back to the remote name.
    pub fn resolve(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields
            .iter()
            .find(|f| f.local_name == name)
            .or_else(|| self.fields.iter().find(|f| f.remote_name == name))
    }

    /// Look up a relationship by name.
    pub fn relationship(&self, name: &str) -> Option<&RelationshipMetadata> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// The identity field, if declared.
    pub fn id_field(&self) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.wire_type == WireType::Id)
    }

    /// Remote names of all declared fields, in declaration order.
    ///
    /// Relationships are not fields; a default projection over these names
    /// never triggers a deep fetch.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.remote_name)
    }
}

/// Builder for [`EntityMetadata`].
#[derive(Debug)]
pub struct EntityMetadataBuilder {
    meta: EntityMetadata,
}

impl EntityMetadataBuilder {
    /// Declare a field.
    pub fn field(
        mut self,
        local_name: &'static str,
        remote_name: &'static str,
        wire_type: WireType,
    ) -> Self {
        self.meta.fields.push(FieldMetadata {
            local_name,
            remote_name,
            wire_type,
        });
        self
    }

    /// Declare a one-to-many child relationship. `foreign_key` is the field
    /// on the target object referencing this entity.
    pub fn child(
        mut self,
        name: &'static str,
        target_object: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        self.meta.relationships.push(RelationshipMetadata {
            name,
            target_object,
            kind: RelationshipKind::Child,
            foreign_key,
        });
        self
    }

    /// Declare a many-to-one parent lookup. `foreign_key` is the field on
    /// this entity referencing the target object.
    pub fn parent(
        mut self,
        name: &'static str,
        target_object: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        self.meta.relationships.push(RelationshipMetadata {
            name,
            target_object,
            kind: RelationshipKind::Parent,
            foreign_key,
        });
        self
    }

    /// Finish building.
    pub fn build(self) -> EntityMetadata {
        self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_meta() -> EntityMetadata {
        EntityMetadata::builder("Account")
            .field("id", "Id", WireType::Id)
            .field("name", "Name", WireType::Text)
            .field("industry", "Industry", WireType::Picklist)
            .child("Cases", "Case", "AccountId")
            .build()
    }

    #[test]
    fn test_resolve_local_and_remote_names() {
        let meta = account_meta();

        assert_eq!(meta.resolve("name").map(|f| f.remote_name), Some("Name"));
        assert_eq!(meta.resolve("Name").map(|f| f.remote_name), Some("Name"));
        assert!(meta.resolve("bogus").is_none());
    }

    #[test]
    fn test_field_names_in_declaration_order() {
        let meta = account_meta();
        let names: Vec<_> = meta.field_names().collect();
        assert_eq!(names, vec!["Id", "Name", "Industry"]);
    }

    #[test]
    fn test_relationship_lookup() {
        let meta = account_meta();
        let rel = meta.relationship("Cases").unwrap();
        assert_eq!(rel.target_object, "Case");
        assert_eq!(rel.kind, RelationshipKind::Child);
        assert_eq!(rel.foreign_key, "AccountId");
        assert!(meta.relationship("Contacts").is_none());
    }

    #[test]
    fn test_id_field() {
        let meta = account_meta();
        assert_eq!(meta.id_field().map(|f| f.remote_name), Some("Id"));
    }
}
