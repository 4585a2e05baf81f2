//! # External-Id Translation
//!
//! Incoming DTOs may carry identifiers from an external system. Before a
//! write, the translator rewrites the top-level `id` and every reference
//! field into internal ids, keeping the value's shape (a string stays a
//! string, an `{"id": ..}` object keeps its other keys).
//!
//! Misses are recorded in a [`TranslationReport`]. A missed top-level id is
//! also a deferred binding: once the caller has saved the new entity it
//! hands the report back to [`ExternalIdTranslator::bind_deferred`].

use crate::collaborators::ExternalIdService;
use crate::ExternalIdMode;
use metamorph_core::{Dto, EngineError, EngineResult, EntityRef, ID_KEY};
use metamorph_meta::{EntityMetadata, MetadataCatalog};
use serde_json::Value;
use std::sync::Arc;

// ============================================================================
// Report
// ============================================================================

/// An external id that must be bound to the entity's id after save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredIdBinding {
    pub table_id: String,
    pub external_id: String,
}

/// An external id the service did not know
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationMiss {
    /// DTO field holding the id
    pub field: String,
    pub table_id: String,
    pub external_id: String,
}

/// What one translation pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationReport {
    /// Number of ids rewritten
    pub translated: usize,

    /// Ids left as they were
    pub misses: Vec<TranslationMiss>,

    /// Bindings to record once the entity has an internal id
    pub deferred: Vec<DeferredIdBinding>,
}

impl TranslationReport {
    /// Check if every id was resolved
    pub fn is_clean(&self) -> bool {
        self.misses.is_empty()
    }

    /// Check if the top-level id missed
    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    fn record_miss(&mut self, field: &str, table_id: &str, external_id: &str) {
        self.misses.push(TranslationMiss {
            field: field.to_string(),
            table_id: table_id.to_string(),
            external_id: external_id.to_string(),
        });
    }
}

// ============================================================================
// ExternalIdTranslator
// ============================================================================

/// Rewrites external ids in a DTO through the external-id service
pub struct ExternalIdTranslator {
    catalog: Arc<MetadataCatalog>,
    service: Arc<dyn ExternalIdService>,
    mode: ExternalIdMode,
}

impl ExternalIdTranslator {
    pub fn new(
        catalog: Arc<MetadataCatalog>,
        service: Arc<dyn ExternalIdService>,
        mode: ExternalIdMode,
    ) -> Self {
        Self {
            catalog,
            service,
            mode,
        }
    }

    pub fn mode(&self) -> ExternalIdMode {
        self.mode
    }

    /// Translate the top-level id and every reference field in place
    pub fn translate(&self, dto: &mut Dto, metadata: &EntityMetadata) -> EngineResult<TranslationReport> {
        let mut report = TranslationReport::default();

        if let Some(Value::String(external)) = dto.get_mut(ID_KEY) {
            if !external.trim().is_empty() {
                match self.lookup(&metadata.table_id, external)? {
                    Some(internal) => {
                        *external = internal;
                        report.translated += 1;
                    }
                    None => {
                        report.record_miss(ID_KEY, &metadata.table_id, external);
                        report.deferred.push(DeferredIdBinding {
                            table_id: metadata.table_id.clone(),
                            external_id: external.clone(),
                        });
                    }
                }
            }
        }

        for field in metadata.reference_fields() {
            let Some(value) = dto.get_mut(&field.name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            let related = field
                .related_entity_id
                .as_deref()
                .and_then(|id| self.catalog.entity(id));
            let Some(related) = related else {
                tracing::warn!(
                    entity = %metadata.name,
                    field = %field.name,
                    related = ?field.related_entity_id,
                    "related entity metadata missing, reference left untranslated"
                );
                continue;
            };

            self.translate_value(value, &related.table_id, &field.name, &mut report)?;
        }

        tracing::debug!(
            entity = %metadata.name,
            translated = report.translated,
            misses = report.misses.len(),
            "external ids translated"
        );
        Ok(report)
    }

    fn translate_value(
        &self,
        value: &mut Value,
        table_id: &str,
        field: &str,
        report: &mut TranslationReport,
    ) -> EngineResult<()> {
        match value {
            Value::String(external) => self.translate_string(external, table_id, field, report)?,
            Value::Object(map) => {
                if let Some(Value::String(external)) = map.get_mut(ID_KEY) {
                    self.translate_string(external, table_id, field, report)?;
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.translate_value(item, table_id, field, report)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn translate_string(
        &self,
        external: &mut String,
        table_id: &str,
        field: &str,
        report: &mut TranslationReport,
    ) -> EngineResult<()> {
        if external.trim().is_empty() {
            return Ok(());
        }
        match self.lookup(table_id, external)? {
            Some(internal) => {
                *external = internal;
                report.translated += 1;
            }
            None => report.record_miss(field, table_id, external),
        }
        Ok(())
    }

    fn lookup(&self, table_id: &str, external_id: &str) -> EngineResult<Option<String>> {
        if let Some(internal) = self.service.resolve(table_id, external_id)? {
            return Ok(Some(internal));
        }
        match self.mode {
            ExternalIdMode::Strict => Err(EngineError::ExternalIdNotFound {
                table_id: table_id.to_string(),
                external_id: external_id.to_string(),
            }),
            ExternalIdMode::Lenient => {
                tracing::warn!(table_id, external_id, "external id not found, keeping raw id");
                Ok(None)
            }
        }
    }

    /// Internal id for a reference being written, or the raw id when unknown
    ///
    /// The DTO has normally been translated already, so a miss here usually
    /// means the id is internal and is not logged as a warning.
    pub fn resolve_reference_id(&self, table_id: &str, raw: &str) -> EngineResult<String> {
        match self.service.resolve(table_id, raw)? {
            Some(internal) => Ok(internal),
            None => {
                tracing::debug!(table_id, id = raw, "reference id used as internal id");
                Ok(raw.to_string())
            }
        }
    }

    /// Bind every deferred external id to the saved entity's id
    pub fn bind_deferred(&self, report: &TranslationReport, entity: &EntityRef) -> EngineResult<usize> {
        if report.deferred.is_empty() {
            return Ok(0);
        }
        let internal = entity.id()?.ok_or_else(|| {
            EngineError::internal("cannot bind external ids to an entity without an id")
        })?;

        let mut bound = 0;
        for binding in &report.deferred {
            if binding.external_id == internal {
                continue;
            }
            self.service
                .bind(&binding.table_id, &binding.external_id, &internal)?;
            tracing::info!(
                table_id = %binding.table_id,
                external_id = %binding.external_id,
                internal_id = %internal,
                "external id bound"
            );
            bound += 1;
        }
        Ok(bound)
    }
}

impl std::fmt::Debug for ExternalIdTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalIdTranslator")
            .field("mode", &self.mode)
            .finish()
    }
}

/// Reference id carried by a DTO value: a bare id or an object's `id`
pub fn extract_reference_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get(ID_KEY).and_then(extract_reference_id),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
