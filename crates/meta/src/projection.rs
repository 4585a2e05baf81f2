//! Projections and the metadata catalog
//!
//! A projection is a named, external-facing view made of entity metadata.
//! The `MetadataCatalog` holds every projection loaded at startup and is
//! read-only afterwards; it is shared between requests behind an `Arc`.

use crate::entity::EntityMetadata;
use metamorph_core::{EngineError, EngineResult, Named, Validatable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// ProjectionMetadata
// ============================================================================

/// A named set of entity metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionMetadata {
    /// Unique identifier
    pub id: String,

    /// Projection name, the lookup key (e.g., "sales", "inventory")
    pub name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Entities exposed by the projection
    #[serde(default)]
    pub entities: Vec<EntityMetadata>,
}

impl ProjectionMetadata {
    /// Create a new empty projection
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            entities: Vec::new(),
        }
    }

    /// Add an entity
    pub fn with_entity(mut self, entity: EntityMetadata) -> Self {
        self.entities.push(entity);
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Entities of this projection
    pub fn entities(&self) -> &[EntityMetadata] {
        &self.entities
    }

    /// Find an entity by logical or external name (case-insensitive)
    pub fn entity_by_name(&self, name: &str) -> Option<&EntityMetadata> {
        self.entities.iter().find(|e| {
            e.name_matches(name)
                || e
                    .external_name
                    .as_deref()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(name))
        })
    }
}

impl Named for ProjectionMetadata {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Validatable for ProjectionMetadata {
    fn validate(&self) -> EngineResult<()> {
        if self.name.trim().is_empty() {
            return Err(EngineError::validation(format!(
                "Projection '{}' has an empty name",
                self.id
            )));
        }
        for entity in &self.entities {
            entity.validate()?;
        }
        Ok(())
    }
}

// ============================================================================
// MetadataCatalog
// ============================================================================

/// Immutable snapshot of every projection
#[derive(Debug, Clone, Default)]
pub struct MetadataCatalog {
    /// Projections in load order
    projections: Vec<ProjectionMetadata>,

    /// Lookup: lowercase projection name → index into `projections`
    by_name: HashMap<String, usize>,

    /// Lookup: entity metadata id → (projection index, entity index)
    entity_index: HashMap<String, (usize, usize)>,
}

impl MetadataCatalog {
    // ====================================================================
    // Construction
    // ====================================================================

    /// Build the catalog and its lookup indexes
    ///
    /// Fails on duplicate projection names or duplicate entity ids, since
    /// either would make lookups ambiguous.
    pub fn new(projections: Vec<ProjectionMetadata>) -> EngineResult<Self> {
        let mut by_name = HashMap::new();
        let mut entity_index = HashMap::new();

        for (p_idx, projection) in projections.iter().enumerate() {
            let key = projection.name.to_lowercase();
            if by_name.insert(key, p_idx).is_some() {
                return Err(EngineError::DuplicateProjection(projection.name.clone()));
            }

            for (e_idx, entity) in projection.entities.iter().enumerate() {
                if entity_index
                    .insert(entity.id.clone(), (p_idx, e_idx))
                    .is_some()
                {
                    return Err(EngineError::DuplicateEntity(entity.id.clone()));
                }
            }
        }

        tracing::debug!(
            projections = projections.len(),
            entities = entity_index.len(),
            "metadata catalog built"
        );

        Ok(Self {
            projections,
            by_name,
            entity_index,
        })
    }

    /// An empty catalog
    pub fn empty() -> Self {
        Self::default()
    }

    // ====================================================================
    // Lookups
    // ====================================================================

    /// Find a projection by name (case-insensitive)
    pub fn get_projection(&self, name: &str) -> Option<&ProjectionMetadata> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|idx| &self.projections[*idx])
    }

    /// Find entity metadata by its id, across all projections
    pub fn entity(&self, id: &str) -> Option<&EntityMetadata> {
        self.entity_index
            .get(id)
            .map(|(p, e)| &self.projections[*p].entities[*e])
    }

    /// Resolve an entity by projection and entity name
    pub fn entity_in(&self, projection: &str, entity: &str) -> EngineResult<&EntityMetadata> {
        let proj = self
            .get_projection(projection)
            .ok_or_else(|| EngineError::ProjectionNotFound(projection.to_string()))?;
        proj.entity_by_name(entity)
            .ok_or_else(|| EngineError::EntityMetadataNotFound(format!("{}.{}", projection, entity)))
    }

    /// All projections in load order
    pub fn projections(&self) -> &[ProjectionMetadata] {
        &self.projections
    }

    /// Iterate every entity of every projection
    pub fn entities(&self) -> impl Iterator<Item = &EntityMetadata> {
        self.projections.iter().flat_map(|p| p.entities.iter())
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    pub fn entity_count(&self) -> usize {
        self.entity_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projections.is_empty()
    }

    /// Consume the catalog, returning its projections
    pub fn into_projections(self) -> Vec<ProjectionMetadata> {
        self.projections
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldMetadata;

    fn sales() -> ProjectionMetadata {
        ProjectionMetadata::new("P1", "Sales")
            .with_entity(
                EntityMetadata::new("PRD", "Product", "208")
                    .with_external_name("Article")
                    .with_field(FieldMetadata::direct("sku", "sku")),
            )
            .with_entity(EntityMetadata::new("CAT", "Category", "209"))
    }

    #[test]
    fn test_catalog_lookups() {
        let catalog = MetadataCatalog::new(vec![sales()]).unwrap();

        assert_eq!(catalog.projection_count(), 1);
        assert_eq!(catalog.entity_count(), 2);
        assert!(catalog.get_projection("sales").is_some());
        assert!(catalog.get_projection("purchases").is_none());
        assert_eq!(catalog.entity("CAT").unwrap().name, "Category");
        assert!(catalog.entity("NOPE").is_none());
    }

    #[test]
    fn test_entity_in_resolves_external_name() {
        let catalog = MetadataCatalog::new(vec![sales()]).unwrap();
        assert_eq!(catalog.entity_in("Sales", "article").unwrap().id, "PRD");
        assert!(matches!(
            catalog.entity_in("Sales", "Invoice"),
            Err(EngineError::EntityMetadataNotFound(_))
        ));
        assert!(matches!(
            catalog.entity_in("Stock", "Product"),
            Err(EngineError::ProjectionNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_projection_rejected() {
        let err = MetadataCatalog::new(vec![sales(), ProjectionMetadata::new("P2", "SALES")])
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateProjection(_)));
    }

    #[test]
    fn test_duplicate_entity_id_rejected() {
        let other = ProjectionMetadata::new("P2", "Stock")
            .with_entity(EntityMetadata::new("CAT", "Category", "209"));
        let err = MetadataCatalog::new(vec![sales(), other]).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateEntity(id) if id == "CAT"));
    }

    #[test]
    fn test_projection_validation() {
        assert!(sales().is_valid());
        assert!(!ProjectionMetadata::new("P9", "").is_valid());
    }
}
