//! CRUD facade over the conversion engine
//!
//! Addresses entities by projection name and entity name, the way the REST
//! layer exposes them, and strings together id translation, conversion and
//! persistence for each operation.

use crate::engine::ConversionEngine;
use metamorph_core::{Dto, EngineError, EngineResult, EntityRef, ID_KEY, ResultExt};
use metamorph_meta::EntityMetadata;
use std::sync::Arc;

/// Get/create/update operations on projection entities
#[derive(Debug, Clone)]
pub struct ProjectionService {
    engine: Arc<ConversionEngine>,
}

impl ProjectionService {
    pub fn new(engine: Arc<ConversionEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ConversionEngine {
        &self.engine
    }

    /// Load one entity and convert it; `None` when nothing is stored under the id
    pub fn get(&self, projection: &str, entity: &str, id: &str) -> EngineResult<Option<Dto>> {
        let metadata = self.exposed(projection, entity)?;
        let type_name = self.engine.instantiator().type_name_for(&metadata.table_id)?;
        let internal = self
            .engine
            .translator()
            .resolve_reference_id(&metadata.table_id, id)?;

        let loaded = self
            .engine
            .persistence()
            .load_by_name_and_id(&type_name, &internal)?;
        self.engine.convert_to_map(loaded.as_ref(), metadata)
    }

    /// Create a new entity from a DTO and return its saved form
    pub fn create(&self, projection: &str, entity: &str, mut dto: Dto) -> EngineResult<Dto> {
        let metadata = self.exposed(projection, entity)?;
        let report = self.engine.translate_external_ids(&mut dto, metadata)?;
        if report.has_deferred() {
            // Unknown external id: persistence assigns the internal one
            dto.remove(ID_KEY);
        }

        let created = self.engine.convert_to_entity(&dto, None, metadata)?;
        self.engine
            .persistence()
            .save(&created)
            .with_context(format!("saving new {}.{}", projection, entity))?;
        let bound = self.engine.bind_deferred(&report, &created)?;

        tracing::info!(
            projection,
            entity,
            id = ?created.id()?,
            translated = report.translated,
            bound,
            "entity created"
        );
        self.converted(&created, metadata)
    }

    /// Apply a DTO to a stored entity and return its saved form
    pub fn update(&self, projection: &str, entity: &str, id: &str, mut dto: Dto) -> EngineResult<Dto> {
        let metadata = self.exposed(projection, entity)?;
        let type_name = self.engine.instantiator().type_name_for(&metadata.table_id)?;
        let internal = self
            .engine
            .translator()
            .resolve_reference_id(&metadata.table_id, id)?;

        let existing = self
            .engine
            .persistence()
            .load_by_name_and_id(&type_name, &internal)?
            .ok_or_else(|| EngineError::EntityNotFound {
                entity: type_name.clone(),
                id: internal.clone(),
            })?;

        // The addressed id wins over whatever the body carries
        dto.remove(ID_KEY);
        self.engine.translate_external_ids(&mut dto, metadata)?;

        let updated = self.engine.convert_to_entity(&dto, Some(existing), metadata)?;
        self.engine
            .persistence()
            .save(&updated)
            .with_context(format!("saving {}.{} {}", projection, entity, internal))?;

        tracing::info!(projection, entity, id = %internal, "entity updated");
        self.converted(&updated, metadata)
    }

    fn exposed(&self, projection: &str, entity: &str) -> EngineResult<&EntityMetadata> {
        let metadata = self.engine.catalog().entity_in(projection, entity)?;
        if !metadata.rest_endpoint {
            return Err(EngineError::EndpointDisabled(format!("{}.{}", projection, entity)));
        }
        Ok(metadata)
    }

    fn converted(&self, entity: &EntityRef, metadata: &EntityMetadata) -> EngineResult<Dto> {
        self.engine
            .convert_to_map(Some(entity), metadata)?
            .ok_or_else(|| EngineError::internal("conversion of a saved entity produced nothing"))
    }
}
