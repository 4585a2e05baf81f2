//! Entity references: related objects converted recursively
//!
//! Reads recurse into the related object's own metadata with the same
//! context, so the visited set is shared by the whole call. An object seen
//! before becomes a stub before any recursive work happens, which bounds the
//! traversal for any graph shape.
//!
//! Writes resolve the incoming id, load the related object through the
//! persistence collaborator and assign it. An id that loads nothing leaves
//! the property untouched.

use super::FieldStrategy;
use crate::context::{stub, ConversionContext, IdentityKey};
use crate::engine::ConversionEngine;
use crate::external_id::extract_reference_id;
use metamorph_core::{EngineError, EngineResult, EntityRef, MappingKind, PropertyValue};
use metamorph_meta::{EntityMetadata, FieldMetadata};
use serde_json::Value;

/// Strategy for `EntityReference` fields
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceStrategy;

impl ReferenceStrategy {
    fn convert_related(
        &self,
        engine: &ConversionEngine,
        related: &EntityRef,
        field: &FieldMetadata,
        ctx: &mut ConversionContext,
    ) -> EngineResult<Value> {
        let key = IdentityKey::of(related)?;
        if ctx.is_visited(&key) {
            tracing::debug!(field = %field.name, key = %key, "already visited, emitting stub");
            return stub(related);
        }

        let metadata = field
            .related_entity_id
            .as_deref()
            .and_then(|id| engine.catalog().entity(id));
        match metadata {
            Some(metadata) => engine
                .convert_to_map_with(related, metadata, &metadata.fields, ctx)
                .map(Value::Object),
            None => {
                tracing::debug!(field = %field.name, key = %key, "no metadata for related entity, emitting stub");
                stub(related)
            }
        }
    }

    fn resolve_one(
        &self,
        engine: &ConversionEngine,
        related: &EntityMetadata,
        type_name: &str,
        value: &Value,
        field: &FieldMetadata,
    ) -> EngineResult<Option<EntityRef>> {
        let raw = extract_reference_id(value).ok_or_else(|| {
            EngineError::type_mismatch(&field.property, "reference id", json_label(value))
        })?;
        let id = engine
            .translator()
            .resolve_reference_id(&related.table_id, &raw)?;

        match engine.persistence().load_by_name_and_id(type_name, &id)? {
            Some(entity) => Ok(Some(entity)),
            None => {
                let err = EngineError::UnresolvedRelatedEntity {
                    entity: type_name.to_string(),
                    id,
                };
                tracing::warn!(field = %field.name, error = %err, "related entity not found, left unset");
                Ok(None)
            }
        }
    }
}

impl FieldStrategy for ReferenceStrategy {
    fn kind(&self) -> MappingKind {
        MappingKind::EntityReference
    }

    fn read(
        &self,
        engine: &ConversionEngine,
        entity: &EntityRef,
        field: &FieldMetadata,
        ctx: &mut ConversionContext,
    ) -> EngineResult<Value> {
        match engine.types().get_path(entity, &field.property)? {
            PropertyValue::Null => Ok(Value::Null),
            PropertyValue::Reference(related) => self.convert_related(engine, &related, field, ctx),
            PropertyValue::List(items) => {
                let mut converted = Vec::with_capacity(items.len());
                for item in &items {
                    converted.push(match item {
                        PropertyValue::Reference(related) => {
                            self.convert_related(engine, related, field, ctx)?
                        }
                        _ => Value::Null,
                    });
                }
                Ok(Value::Array(converted))
            }
            other => Err(EngineError::type_mismatch(
                &field.property,
                "reference",
                other.type_label(),
            )),
        }
    }

    fn write(
        &self,
        engine: &ConversionEngine,
        entity: &EntityRef,
        value: &Value,
        field: &FieldMetadata,
        _ctx: &mut ConversionContext,
    ) -> EngineResult<()> {
        if value.is_null() {
            return engine
                .types()
                .set_path(entity, &field.property, PropertyValue::Null);
        }

        let related = field
            .related_entity_id
            .as_deref()
            .and_then(|id| engine.catalog().entity(id));
        let Some(related) = related else {
            tracing::warn!(
                field = %field.name,
                related = ?field.related_entity_id,
                "related entity metadata missing, field skipped"
            );
            return Ok(());
        };
        let type_name = engine.instantiator().type_name_for(&related.table_id)?;

        let resolved = match value {
            Value::Array(items) => {
                let mut entities = Vec::with_capacity(items.len());
                for item in items.iter().filter(|item| !item.is_null()) {
                    if let Some(entity) = self.resolve_one(engine, related, &type_name, item, field)? {
                        entities.push(entity);
                    }
                }
                PropertyValue::from(entities)
            }
            single => match self.resolve_one(engine, related, &type_name, single, field)? {
                Some(entity) => PropertyValue::Reference(entity),
                None => return Ok(()),
            },
        };

        engine.types().set_path(entity, &field.property, resolved)
    }
}

fn json_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, Category, Product};
    use crate::Persistence;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_read_null_reference() {
        let h = fixtures::harness();
        let field = FieldMetadata::reference("category", "category", "CAT");
        let mut ctx = ConversionContext::new();

        let value = ReferenceStrategy
            .read(&h.engine, &fixtures::product("P1", "A100"), &field, &mut ctx)
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_read_converts_related_with_its_metadata() {
        let h = fixtures::harness();
        let product = fixtures::product("P1", "A100");
        let category = fixtures::category("C1", "Tools");
        fixtures::set(&product, &h.types, "category", category);
        let field = FieldMetadata::reference("category", "category", "CAT");
        let mut ctx = ConversionContext::new();

        let value = ReferenceStrategy
            .read(&h.engine, &product, &field, &mut ctx)
            .unwrap();
        assert_eq!(
            value,
            json!({"id": "C1", "name": "Tools", "parent": null, "products": []})
        );
    }

    #[test]
    fn test_read_visited_emits_stub() {
        let h = fixtures::harness();
        let product = fixtures::product("P1", "A100");
        let category = fixtures::category("C1", "Tools");
        fixtures::set(&product, &h.types, "category", category.clone());
        let field = FieldMetadata::reference("category", "category", "CAT");

        let mut ctx = ConversionContext::new();
        ctx.mark_visited(IdentityKey::of(&category).unwrap());
        let value = ReferenceStrategy
            .read(&h.engine, &product, &field, &mut ctx)
            .unwrap();
        assert_eq!(value, json!({"id": "C1", "identifier": "Tools"}));
    }

    #[test]
    fn test_read_without_related_metadata_emits_stub() {
        let h = fixtures::harness();
        let product = fixtures::product("P1", "A100");
        fixtures::set(&product, &h.types, "category", fixtures::category("C1", "Tools"));
        let field = FieldMetadata::reference("category", "category", "GHOST");
        let mut ctx = ConversionContext::new();

        let value = ReferenceStrategy
            .read(&h.engine, &product, &field, &mut ctx)
            .unwrap();
        assert_eq!(value, json!({"id": "C1", "identifier": "Tools"}));
    }

    #[test]
    fn test_write_loads_related() {
        let h = fixtures::harness();
        let category = fixtures::category("C1", "Tools");
        h.persistence.save(&category).unwrap();
        let product = fixtures::product("P1", "A100");
        let field = FieldMetadata::reference("category", "category", "CAT");
        let mut ctx = ConversionContext::new();

        ReferenceStrategy
            .write(&h.engine, &product, &json!({"id": "C1"}), &field, &mut ctx)
            .unwrap();
        let assigned = product.with(|p: &Product| p.category.clone()).unwrap().flatten();
        assert_eq!(assigned, Some(category));
    }

    #[test]
    fn test_write_unresolved_leaves_property_unset() {
        let h = fixtures::harness();
        let product = fixtures::product("P1", "A100");
        let existing = fixtures::category("C0", "Old");
        fixtures::set(&product, &h.types, "category", existing.clone());
        let field = FieldMetadata::reference("category", "category", "CAT");
        let mut ctx = ConversionContext::new();

        ReferenceStrategy
            .write(&h.engine, &product, &json!("C404"), &field, &mut ctx)
            .unwrap();
        let assigned = product.with(|p: &Product| p.category.clone()).unwrap().flatten();
        assert_eq!(assigned, Some(existing));
    }

    #[test]
    fn test_write_null_clears() {
        let h = fixtures::harness();
        let product = fixtures::product("P1", "A100");
        fixtures::set(&product, &h.types, "category", fixtures::category("C1", "Tools"));
        let field = FieldMetadata::reference("category", "category", "CAT");
        let mut ctx = ConversionContext::new();

        ReferenceStrategy
            .write(&h.engine, &product, &Value::Null, &field, &mut ctx)
            .unwrap();
        let assigned = product.with(|p: &Product| p.category.is_none()).unwrap();
        assert_eq!(assigned, Some(true));
    }

    #[test]
    fn test_write_collection_drops_unresolved() {
        let h = fixtures::harness();
        let p1 = fixtures::product("P1", "A100");
        let p2 = fixtures::product("P2", "B200");
        h.persistence.save(&p1).unwrap();
        h.persistence.save(&p2).unwrap();
        let category = fixtures::category("C1", "Tools");
        let field = FieldMetadata::reference("products", "products", "PRD");
        let mut ctx = ConversionContext::new();

        ReferenceStrategy
            .write(&h.engine, &category, &json!(["P1", {"id": "P404"}, {"id": "P2"}]), &field, &mut ctx)
            .unwrap();
        let products = category.with(|c: &Category| c.products.clone()).unwrap().unwrap();
        assert_eq!(products, vec![p1, p2]);
    }

    #[test]
    fn test_write_rejects_unusable_value() {
        let h = fixtures::harness();
        let field = FieldMetadata::reference("category", "category", "CAT");
        let mut ctx = ConversionContext::new();

        let err = ReferenceStrategy
            .write(&h.engine, &fixtures::product("P1", "A100"), &json!(true), &field, &mut ctx)
            .unwrap_err();
        assert!(matches!(err, EngineError::TypeMismatch { .. }));
    }
}
