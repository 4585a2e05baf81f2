//! Custom mappings: reader/writer pairs registered by the host
//!
//! Registration happens once, before the engine is built. Lookups return
//! [`Resolved::NotRegistered`] rather than failing, and the strategy decides
//! what a missing registration means on each path.

use super::FieldStrategy;
use crate::context::ConversionContext;
use crate::engine::ConversionEngine;
use metamorph_core::{Dto, EngineError, EngineResult, EntityRef, MappingKind};
use metamorph_meta::FieldMetadata;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Produces the DTO value of a custom field
pub type CustomReader =
    Arc<dyn Fn(&EntityRef, &FieldMetadata, &ConversionContext) -> EngineResult<Value> + Send + Sync>;

/// Applies a custom field; receives the whole incoming DTO
pub type CustomWriter =
    Arc<dyn Fn(&EntityRef, &Dto, &FieldMetadata) -> EngineResult<()> + Send + Sync>;

/// Outcome of a registry lookup
#[derive(Clone)]
pub enum Resolved<T> {
    Registered(T),
    NotRegistered,
}

impl<T> Resolved<T> {
    pub fn is_registered(&self) -> bool {
        matches!(self, Resolved::Registered(_))
    }
}

#[derive(Clone, Default)]
struct CustomMapping {
    reader: Option<CustomReader>,
    writer: Option<CustomWriter>,
}

// ============================================================================
// CustomMappingRegistry
// ============================================================================

/// Qualifier to reader/writer registration table
#[derive(Clone, Default)]
pub struct CustomMappingRegistry {
    entries: HashMap<String, CustomMapping>,
}

impl CustomMappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the reader for a qualifier
    pub fn with_reader(
        mut self,
        qualifier: impl Into<String>,
        reader: impl Fn(&EntityRef, &FieldMetadata, &ConversionContext) -> EngineResult<Value>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.entries.entry(qualifier.into()).or_default().reader = Some(Arc::new(reader));
        self
    }

    /// Register the writer for a qualifier
    pub fn with_writer(
        mut self,
        qualifier: impl Into<String>,
        writer: impl Fn(&EntityRef, &Dto, &FieldMetadata) -> EngineResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.entries.entry(qualifier.into()).or_default().writer = Some(Arc::new(writer));
        self
    }

    pub fn resolve_reader(&self, qualifier: &str) -> Resolved<CustomReader> {
        match self.entries.get(qualifier).and_then(|m| m.reader.clone()) {
            Some(reader) => Resolved::Registered(reader),
            None => Resolved::NotRegistered,
        }
    }

    pub fn resolve_writer(&self, qualifier: &str) -> Resolved<CustomWriter> {
        match self.entries.get(qualifier).and_then(|m| m.writer.clone()) {
            Some(writer) => Resolved::Registered(writer),
            None => Resolved::NotRegistered,
        }
    }

    /// Registered qualifiers, sorted
    pub fn qualifiers(&self) -> Vec<&str> {
        let mut qualifiers: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        qualifiers.sort_unstable();
        qualifiers
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for CustomMappingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomMappingRegistry")
            .field("qualifiers", &self.qualifiers())
            .finish()
    }
}

// ============================================================================
// CustomStrategy
// ============================================================================

/// Strategy for `CustomMapping` fields
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomStrategy;

fn qualifier(field: &FieldMetadata) -> &str {
    field.custom_mapping_qualifier.as_deref().unwrap_or_default()
}

impl FieldStrategy for CustomStrategy {
    fn kind(&self) -> MappingKind {
        MappingKind::CustomMapping
    }

    fn read(
        &self,
        engine: &ConversionEngine,
        entity: &EntityRef,
        field: &FieldMetadata,
        ctx: &mut ConversionContext,
    ) -> EngineResult<Value> {
        let qualifier = qualifier(field);
        match engine.custom_mappings().resolve_reader(qualifier) {
            Resolved::Registered(reader) => reader(entity, field, ctx),
            Resolved::NotRegistered => Err(EngineError::CustomMapping {
                qualifier: qualifier.to_string(),
                message: "no reader registered".to_string(),
            }),
        }
    }

    fn write(
        &self,
        engine: &ConversionEngine,
        entity: &EntityRef,
        value: &Value,
        field: &FieldMetadata,
        ctx: &mut ConversionContext,
    ) -> EngineResult<()> {
        let qualifier = qualifier(field);
        let writer = match engine.custom_mappings().resolve_writer(qualifier) {
            Resolved::Registered(writer) => writer,
            Resolved::NotRegistered => {
                tracing::warn!(field = %field.name, qualifier, "no custom writer registered, field skipped");
                return Ok(());
            }
        };

        match ctx.root_dto() {
            Some(root) => writer(entity, root, field),
            None => {
                let mut single = Dto::new();
                single.insert(field.name.clone(), value.clone());
                writer(entity, &single, field)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
