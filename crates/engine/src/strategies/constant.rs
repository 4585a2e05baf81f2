//! Constant mappings: values looked up by constant id, never written

use super::FieldStrategy;
use crate::context::ConversionContext;
use crate::engine::ConversionEngine;
use metamorph_core::{EngineError, EngineResult, EntityRef, MappingKind};
use metamorph_meta::FieldMetadata;
use serde_json::Value;

/// Strategy for `ConstantValue` and `ComputedConstant` fields
///
/// Both kinds behave the same; one instance is registered per kind.
#[derive(Debug, Clone)]
pub struct ConstantStrategy {
    kind: MappingKind,
}

impl ConstantStrategy {
    pub fn new(kind: MappingKind) -> Self {
        Self { kind }
    }
}

impl FieldStrategy for ConstantStrategy {
    fn kind(&self) -> MappingKind {
        self.kind.clone()
    }

    fn read(
        &self,
        engine: &ConversionEngine,
        _entity: &EntityRef,
        field: &FieldMetadata,
        _ctx: &mut ConversionContext,
    ) -> EngineResult<Value> {
        let constant_id = field.constant_id.as_deref().ok_or_else(|| {
            EngineError::field_validation("", &field.name, "constant field has no constant id")
        })?;

        engine
            .constants()
            .constant(constant_id)?
            .ok_or_else(|| EngineError::ConstantNotFound(constant_id.to_string()))
    }

    fn write(
        &self,
        _engine: &ConversionEngine,
        _entity: &EntityRef,
        _value: &Value,
        field: &FieldMetadata,
        _ctx: &mut ConversionContext,
    ) -> EngineResult<()> {
        tracing::debug!(field = %field.name, "ignoring write to constant field");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, Product};
    use serde_json::json;

    #[test]
    fn test_constant_read_ignores_entity() {
        let h = fixtures::harness();
        let strategy = ConstantStrategy::new(MappingKind::ComputedConstant);
        let field = FieldMetadata::computed_constant("currency", "CURRENCY");
        let mut ctx = ConversionContext::new();

        for entity in [fixtures::product("P1", "A100"), fixtures::category("C1", "Tools")] {
            assert_eq!(
                strategy.read(&h.engine, &entity, &field, &mut ctx).unwrap(),
                json!("EUR")
            );
        }
    }

    #[test]
    fn test_constant_write_is_noop() {
        let h = fixtures::harness();
        let strategy = ConstantStrategy::new(MappingKind::ConstantValue);
        let field = FieldMetadata::constant("sku", "CURRENCY").with_property("sku");
        let product = fixtures::product("P1", "A100");
        let mut ctx = ConversionContext::new();

        strategy
            .write(&h.engine, &product, &json!("OVERWRITE"), &field, &mut ctx)
            .unwrap();
        let sku = product.with(|p: &Product| p.sku.clone()).unwrap();
        assert_eq!(sku.as_deref(), Some("A100"));
    }

    #[test]
    fn test_missing_constant() {
        let h = fixtures::harness();
        let strategy = ConstantStrategy::new(MappingKind::ConstantValue);
        let field = FieldMetadata::constant("vat", "VAT_RATE");
        let mut ctx = ConversionContext::new();

        let err = strategy
            .read(&h.engine, &fixtures::product("P1", "A100"), &field, &mut ctx)
            .unwrap_err();
        assert!(matches!(err, EngineError::ConstantNotFound(id) if id == "VAT_RATE"));
    }
}
