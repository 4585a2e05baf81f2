//! Path extraction: a sub-value pulled out of structured text

use super::FieldStrategy;
use crate::context::ConversionContext;
use crate::engine::ConversionEngine;
use metamorph_core::{EngineError, EngineResult, EntityRef, MappingKind, PropertyValue};
use metamorph_meta::{FieldMetadata, JsonPath, MetadataCatalog};
use serde_json::Value;
use std::collections::HashMap;

/// Strategy for `PathExtraction` fields
///
/// Expressions found in the catalog are parsed once at construction.
#[derive(Debug, Clone, Default)]
pub struct PathStrategy {
    compiled: HashMap<String, JsonPath>,
}

impl PathStrategy {
    /// Pre-parse every path expression in the catalog
    pub fn compile(catalog: &MetadataCatalog) -> Self {
        let mut compiled = HashMap::new();
        let expressions = catalog
            .entities()
            .flat_map(|entity| entity.fields.iter())
            .filter(|field| field.mapping_kind == MappingKind::PathExtraction)
            .filter_map(|field| field.json_path.as_deref());

        for expr in expressions {
            match JsonPath::parse(expr) {
                Ok(path) => {
                    compiled.insert(expr.to_string(), path);
                }
                Err(e) => tracing::warn!(expr, error = %e, "path expression left uncompiled"),
            }
        }
        Self { compiled }
    }

    /// Number of pre-parsed expressions
    pub fn compiled_count(&self) -> usize {
        self.compiled.len()
    }

    fn extract(&self, expr: &str, document: &Value) -> EngineResult<Value> {
        let found = match self.compiled.get(expr) {
            Some(path) => path.apply(document).cloned(),
            None => JsonPath::parse(expr)?.apply(document).cloned(),
        };
        Ok(found.unwrap_or(Value::Null))
    }
}

impl FieldStrategy for PathStrategy {
    fn kind(&self) -> MappingKind {
        MappingKind::PathExtraction
    }

    fn read(
        &self,
        engine: &ConversionEngine,
        entity: &EntityRef,
        field: &FieldMetadata,
        _ctx: &mut ConversionContext,
    ) -> EngineResult<Value> {
        let expr = field.json_path.as_deref().ok_or_else(|| EngineError::PathExtraction {
            path: String::new(),
            message: format!("field '{}' has no path expression", field.name),
        })?;

        let document = match engine.types().get_path(entity, &field.property)? {
            PropertyValue::Null => return Ok(Value::Null),
            PropertyValue::Text(text) if text.trim().is_empty() => return Ok(Value::Null),
            PropertyValue::Text(text) => {
                serde_json::from_str(&text).map_err(|e| EngineError::PathExtraction {
                    path: expr.to_string(),
                    message: format!("source is not valid JSON: {}", e),
                })?
            }
            PropertyValue::Json(document) => document,
            other => {
                return Err(EngineError::type_mismatch(
                    &field.property,
                    "text or json",
                    other.type_label(),
                ));
            }
        };

        self.extract(expr, &document)
    }

    fn write(
        &self,
        _engine: &ConversionEngine,
        _entity: &EntityRef,
        _value: &Value,
        field: &FieldMetadata,
        _ctx: &mut ConversionContext,
    ) -> EngineResult<()> {
        tracing::warn!(field = %field.name, "path extraction fields are read-only, write ignored");
        Ok(())
    }
}
