//! # Conversion Engine
//!
//! The orchestrator. It walks the metadata-ordered field list of an entity,
//! hands each field to the strategy registered for its mapping kind and
//! assembles the result.
//!
//! - **Reads** (`convert_to_map`) are best-effort per field: a failing field
//!   becomes `null` and the rest of the map is still produced.
//! - **Writes** (`convert_to_entity`) validate mandatory fields before any
//!   mutation, instantiate the entity when none is given, write the fields
//!   present in the DTO in metadata order and finally run the audit hook.

use crate::accessor::TypeRegistry;
use crate::collaborators::{
    AuditHook, ConstantStore, ExternalIdService, Persistence, TableTypeResolver,
};
use crate::context::{ConversionContext, IdentityKey};
use crate::external_id::{ExternalIdTranslator, TranslationReport};
use crate::instantiator::EntityInstantiator;
use crate::memory::{InMemoryConstants, InMemoryExternalIds};
use crate::strategies::{strategy_table, CustomMappingRegistry, FieldStrategy, StrategyTable};
use crate::EngineConfig;
use metamorph_core::{Dto, EngineError, EngineResult, EntityRef, MappingKind};
use metamorph_meta::{validate_catalog, EntityMetadata, FieldMetadata, MetadataCatalog};
use serde_json::Value;
use std::sync::Arc;

// ============================================================================
// ConversionEngine
// ============================================================================

/// Metadata-driven converter between business objects and DTOs
pub struct ConversionEngine {
    catalog: Arc<MetadataCatalog>,
    types: Arc<TypeRegistry>,
    persistence: Arc<dyn Persistence>,
    constants: Arc<dyn ConstantStore>,
    custom_mappings: CustomMappingRegistry,
    audit: Option<Arc<dyn AuditHook>>,
    translator: ExternalIdTranslator,
    instantiator: EntityInstantiator,
    strategies: StrategyTable,
    config: EngineConfig,
}

impl ConversionEngine {
    /// Start building an engine over a catalog and its business types
    pub fn builder(catalog: Arc<MetadataCatalog>, types: Arc<TypeRegistry>) -> EngineBuilder {
        EngineBuilder::new(catalog, types)
    }

    // ========================================================================
    // Read
    // ========================================================================

    /// Convert an entity to its DTO; `None` in, `None` out
    pub fn convert_to_map(
        &self,
        entity: Option<&EntityRef>,
        metadata: &EntityMetadata,
    ) -> EngineResult<Option<Dto>> {
        let Some(entity) = entity else {
            return Ok(None);
        };
        let mut ctx = ConversionContext::new();
        self.convert_to_map_with(entity, metadata, &metadata.fields, &mut ctx)
            .map(Some)
    }

    /// Convert an entity with an explicit field list and context
    ///
    /// Marks the entity visited first, so references back to it become stubs.
    pub fn convert_to_map_with(
        &self,
        entity: &EntityRef,
        metadata: &EntityMetadata,
        fields: &[FieldMetadata],
        ctx: &mut ConversionContext,
    ) -> EngineResult<Dto> {
        ctx.mark_visited(IdentityKey::of(entity)?);

        let mut dto = Dto::new();
        for field in fields {
            let value = match self.strategies.get(&field.mapping_kind) {
                Some(strategy) => match strategy.read(self, entity, field, ctx) {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::warn!(
                            entity = %metadata.name,
                            field = %field.name,
                            error = %e,
                            "field read failed, using null"
                        );
                        Value::Null
                    }
                },
                None => {
                    tracing::warn!(
                        entity = %metadata.name,
                        field = %field.name,
                        kind = %field.mapping_kind,
                        "unsupported mapping kind, using null"
                    );
                    Value::Null
                }
            };
            dto.insert(field.name.clone(), value);
        }
        Ok(dto)
    }

    // ========================================================================
    // Write
    // ========================================================================

    /// Write a DTO onto an existing entity, or onto a new one
    pub fn convert_to_entity(
        &self,
        dto: &Dto,
        existing: Option<EntityRef>,
        metadata: &EntityMetadata,
    ) -> EngineResult<EntityRef> {
        self.convert_to_entity_with(dto, existing, metadata, &metadata.fields)
    }

    /// Write a DTO with an explicit field list
    pub fn convert_to_entity_with(
        &self,
        dto: &Dto,
        existing: Option<EntityRef>,
        metadata: &EntityMetadata,
        fields: &[FieldMetadata],
    ) -> EngineResult<EntityRef> {
        if let Some(missing) = fields
            .iter()
            .filter(|field| field.requires_value())
            .find(|field| dto.get(&field.name).map_or(true, Value::is_null))
        {
            return Err(EngineError::missing_mandatory(&metadata.name, &missing.name));
        }

        let is_new = existing.is_none();
        let entity = match existing {
            Some(entity) => entity,
            None => self.instantiator.instantiate(metadata)?,
        };

        let mut ctx = ConversionContext::for_write(dto.clone());
        for field in fields {
            let Some(value) = dto.get(&field.name) else {
                continue;
            };
            let Some(strategy) = self.strategies.get(&field.mapping_kind) else {
                tracing::warn!(
                    entity = %metadata.name,
                    field = %field.name,
                    kind = %field.mapping_kind,
                    "unsupported mapping kind, field skipped"
                );
                continue;
            };
            tracing::debug!(entity = %metadata.name, field = %field.name, kind = %field.mapping_kind, "writing field");
            strategy.write(self, &entity, value, field, &mut ctx)?;
        }

        if let Some(audit) = &self.audit {
            if self.types.is_auditable(&entity.entity_name()?) {
                audit.apply(&entity, is_new)?;
            }
        }
        Ok(entity)
    }

    // ========================================================================
    // External Ids
    // ========================================================================

    /// Rewrite external ids in a DTO into internal ones
    pub fn translate_external_ids(
        &self,
        dto: &mut Dto,
        metadata: &EntityMetadata,
    ) -> EngineResult<TranslationReport> {
        self.translator.translate(dto, metadata)
    }

    /// Record deferred external ids against a saved entity
    pub fn bind_deferred(&self, report: &TranslationReport, entity: &EntityRef) -> EngineResult<usize> {
        self.translator.bind_deferred(report, entity)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn catalog(&self) -> &MetadataCatalog {
        &self.catalog
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn persistence(&self) -> &dyn Persistence {
        self.persistence.as_ref()
    }

    pub fn constants(&self) -> &dyn ConstantStore {
        self.constants.as_ref()
    }

    pub fn custom_mappings(&self) -> &CustomMappingRegistry {
        &self.custom_mappings
    }

    pub fn translator(&self) -> &ExternalIdTranslator {
        &self.translator
    }

    pub fn instantiator(&self) -> &EntityInstantiator {
        &self.instantiator
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Strategy registered for a mapping kind
    pub fn strategy(&self, kind: &MappingKind) -> Option<&dyn FieldStrategy> {
        self.strategies.get(kind).map(|strategy| strategy.as_ref())
    }
}

impl std::fmt::Debug for ConversionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionEngine")
            .field("projections", &self.catalog.projection_count())
            .field("types", &self.types.len())
            .field("custom_mappings", &self.custom_mappings)
            .field("config", &self.config)
            .finish()
    }
}

// ============================================================================
// EngineBuilder
// ============================================================================

/// Builder for [`ConversionEngine`]
///
/// Only the persistence collaborator is required. The external-id service and
/// constants store default to empty in-memory stores, and the table resolver
/// defaults to the type registry itself.
pub struct EngineBuilder {
    catalog: Arc<MetadataCatalog>,
    types: Arc<TypeRegistry>,
    config: EngineConfig,
    persistence: Option<Arc<dyn Persistence>>,
    external_ids: Option<Arc<dyn ExternalIdService>>,
    constants: Option<Arc<dyn ConstantStore>>,
    resolver: Option<Arc<dyn TableTypeResolver>>,
    custom_mappings: CustomMappingRegistry,
    audit: Option<Arc<dyn AuditHook>>,
}

impl EngineBuilder {
    pub fn new(catalog: Arc<MetadataCatalog>, types: Arc<TypeRegistry>) -> Self {
        Self {
            catalog,
            types,
            config: EngineConfig::default(),
            persistence: None,
            external_ids: None,
            constants: None,
            resolver: None,
            custom_mappings: CustomMappingRegistry::new(),
            audit: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn with_external_ids(mut self, service: Arc<dyn ExternalIdService>) -> Self {
        self.external_ids = Some(service);
        self
    }

    pub fn with_constants(mut self, constants: Arc<dyn ConstantStore>) -> Self {
        self.constants = Some(constants);
        self
    }

    pub fn with_table_resolver(mut self, resolver: Arc<dyn TableTypeResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_custom_mappings(mut self, registry: CustomMappingRegistry) -> Self {
        self.custom_mappings = registry;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditHook>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Validate the wiring and build the engine
    pub fn build(self) -> EngineResult<ConversionEngine> {
        let persistence = self
            .persistence
            .ok_or_else(|| EngineError::MissingConfig("persistence collaborator".to_string()))?;
        self.config.check()?;

        if self.config.validate_catalog {
            let result = validate_catalog(&self.catalog);
            for warning in &result.warnings {
                tracing::warn!("{}", warning);
            }
            result.to_result()?;
        }
        check_accessors(&self.catalog, &self.types);

        let external_ids = self
            .external_ids
            .unwrap_or_else(|| Arc::new(InMemoryExternalIds::new()));
        let constants = self
            .constants
            .unwrap_or_else(|| Arc::new(InMemoryConstants::new()));
        let resolver: Arc<dyn TableTypeResolver> = match self.resolver {
            Some(resolver) => resolver,
            None => self.types.clone(),
        };

        let translator = ExternalIdTranslator::new(
            self.catalog.clone(),
            external_ids,
            self.config.external_id_mode,
        );
        let instantiator = EntityInstantiator::new(self.types.clone(), resolver);
        let strategies = strategy_table(&self.catalog);

        tracing::info!(
            projections = self.catalog.projection_count(),
            entities = self.catalog.entity_count(),
            types = self.types.len(),
            custom_mappings = self.custom_mappings.len(),
            external_id_mode = %self.config.external_id_mode,
            "conversion engine ready"
        );

        Ok(ConversionEngine {
            catalog: self.catalog,
            types: self.types,
            persistence,
            constants,
            custom_mappings: self.custom_mappings,
            audit: self.audit,
            translator,
            instantiator,
            strategies,
            config: self.config,
        })
    }
}

/// Warn about Direct/PathExtraction properties the accessor table lacks
fn check_accessors(catalog: &MetadataCatalog, types: &TypeRegistry) {
    for entity in catalog.entities() {
        let Some(entity_type) = types.by_table(&entity.table_id) else {
            tracing::debug!(entity = %entity.name, table_id = %entity.table_id, "no business type for table");
            continue;
        };

        for field in entity.fields.iter().filter(|field| {
            matches!(
                field.mapping_kind,
                MappingKind::Direct | MappingKind::PathExtraction
            )
        }) {
            let Some(first) = field.property_segments().first().copied() else {
                continue;
            };
            if !entity_type.has_property(first) {
                tracing::warn!(
                    entity = %entity.name,
                    field = %field.name,
                    property = %field.property,
                    type_name = %entity_type.name,
                    "property not in accessor table"
                );
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
