//! Entity metadata
//!
//! This module contains the `EntityMetadata` struct: the static description
//! of one business-object type's exposed fields within a projection.

use crate::field::FieldMetadata;
use metamorph_core::{EngineError, EngineResult, MappingKind, Named, Validatable};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// EntityMetadata
// ============================================================================

/// Describes one entity exposed by a projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Unique identifier, referenced by `FieldMetadata::related_entity_id`
    pub id: String,

    /// Logical name (e.g., "Product", "SalesOrderLine")
    pub name: String,

    /// Persistence table identifier, resolves the concrete business type
    pub table_id: String,

    /// Name used by external systems, when it differs from `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_name: Option<String>,

    /// Whether the entity is exposed through the REST surface
    #[serde(default = "default_rest_endpoint")]
    pub rest_endpoint: bool,

    /// Fields in serialization order
    #[serde(default)]
    pub fields: Vec<FieldMetadata>,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_rest_endpoint() -> bool {
    true
}

impl EntityMetadata {
    /// Create a new entity with no fields
    pub fn new(id: impl Into<String>, name: impl Into<String>, table_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            table_id: table_id.into(),
            external_name: None,
            rest_endpoint: true,
            fields: Vec::new(),
            description: None,
        }
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Append a field (order of calls is the serialization order)
    pub fn with_field(mut self, field: FieldMetadata) -> Self {
        self.fields.push(field);
        self
    }

    /// Set the external name
    pub fn with_external_name(mut self, external_name: impl Into<String>) -> Self {
        self.external_name = Some(external_name.into());
        self
    }

    /// Hide the entity from the REST surface
    pub fn without_endpoint(mut self) -> Self {
        self.rest_endpoint = false;
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    // ========================================================================
    // Field queries
    // ========================================================================

    /// Get a field by DTO name
    pub fn field(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in serialization order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Fields that must be present on write
    pub fn mandatory_fields(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.iter().filter(|f| f.requires_value())
    }

    /// Fields of the `EntityReference` kind
    pub fn reference_fields(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields
            .iter()
            .filter(|f| f.mapping_kind == MappingKind::EntityReference)
    }

    /// Name used towards external systems
    pub fn external_name(&self) -> &str {
        self.external_name.as_deref().unwrap_or(&self.name)
    }
}

impl Named for EntityMetadata {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Validatable for EntityMetadata {
    fn validate(&self) -> EngineResult<()> {
        if self.id.trim().is_empty() {
            return Err(EngineError::EntityValidation {
                entity: self.name.clone(),
                message: "Entity id cannot be empty".to_string(),
            });
        }

        if self.name.trim().is_empty() {
            return Err(EngineError::EntityValidation {
                entity: self.id.clone(),
                message: "Entity name cannot be empty".to_string(),
            });
        }

        if self.table_id.trim().is_empty() {
            return Err(EngineError::EntityValidation {
                entity: self.name.clone(),
                message: "Table id cannot be empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(EngineError::field_validation(
                    &self.name,
                    "",
                    "Field name cannot be empty",
                ));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(EngineError::field_validation(
                    &self.name,
                    &field.name,
                    "Duplicate field name",
                ));
            }
            if let MappingKind::Unknown(raw) = &field.mapping_kind {
                return Err(EngineError::UnsupportedFieldKind {
                    field: format!("{}.{}", self.name, field.name),
                    kind: raw.clone(),
                });
            }
            if let Some(problem) = field.kind_data_problem() {
                return Err(EngineError::field_validation(
                    &self.name,
                    &field.name,
                    problem,
                ));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
