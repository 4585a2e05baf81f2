//! Field metadata
//!
//! This module contains the `FieldMetadata` struct describing how a single
//! DTO field is produced from, and written back to, a business object.

use metamorph_core::MappingKind;
use serde::{Deserialize, Serialize};

use crate::path::JsonPath;

// ============================================================================
// FieldMetadata
// ============================================================================

/// Represents one exposed field of an entity within a projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// DTO key (unique within the entity)
    pub name: String,

    /// Accessor path on the business object, dot-separated for nested access
    #[serde(default)]
    pub property: String,

    /// Strategy used to read and write the field
    pub mapping_kind: MappingKind,

    /// Whether the field must be present in incoming DTOs
    #[serde(default)]
    pub mandatory: bool,

    /// Constant looked up by `ConstantValue` / `ComputedConstant` fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant_id: Option<String>,

    /// Path expression applied by `PathExtraction` fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_path: Option<String>,

    /// Registry qualifier of a `CustomMapping` field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_mapping_qualifier: Option<String>,

    /// Entity metadata id of the target of an `EntityReference` field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_entity_id: Option<String>,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldMetadata {
    /// Create a field of the given kind whose property equals its name
    pub fn new(name: impl Into<String>, mapping_kind: MappingKind) -> Self {
        let name = name.into();
        Self {
            property: name.clone(),
            name,
            mapping_kind,
            mandatory: false,
            constant_id: None,
            json_path: None,
            custom_mapping_qualifier: None,
            related_entity_id: None,
            description: None,
        }
    }

    /// Create a `Direct` field
    pub fn direct(name: impl Into<String>, property: impl Into<String>) -> Self {
        Self::new(name, MappingKind::Direct).with_property(property)
    }

    /// Create a `ConstantValue` field
    pub fn constant(name: impl Into<String>, constant_id: impl Into<String>) -> Self {
        let mut field = Self::new(name, MappingKind::ConstantValue);
        field.constant_id = Some(constant_id.into());
        field
    }

    /// Create a `ComputedConstant` field
    pub fn computed_constant(name: impl Into<String>, constant_id: impl Into<String>) -> Self {
        let mut field = Self::new(name, MappingKind::ComputedConstant);
        field.constant_id = Some(constant_id.into());
        field
    }

    /// Create an `EntityReference` field
    pub fn reference(
        name: impl Into<String>,
        property: impl Into<String>,
        related_entity_id: impl Into<String>,
    ) -> Self {
        let mut field = Self::new(name, MappingKind::EntityReference).with_property(property);
        field.related_entity_id = Some(related_entity_id.into());
        field
    }

    /// Create a `CustomMapping` field
    pub fn custom(name: impl Into<String>, qualifier: impl Into<String>) -> Self {
        let mut field = Self::new(name, MappingKind::CustomMapping);
        field.custom_mapping_qualifier = Some(qualifier.into());
        field
    }

    /// Create a `PathExtraction` field
    pub fn path(
        name: impl Into<String>,
        property: impl Into<String>,
        json_path: impl Into<String>,
    ) -> Self {
        let mut field = Self::new(name, MappingKind::PathExtraction).with_property(property);
        field.json_path = Some(json_path.into());
        field
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Mark the field as mandatory
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Set the accessor path
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = property.into();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Property path split into its segments
    pub fn property_segments(&self) -> Vec<&str> {
        self.property.split('.').filter(|s| !s.is_empty()).collect()
    }

    /// Whether a DTO without this field must be rejected on write
    pub fn requires_value(&self) -> bool {
        self.mandatory && !self.mapping_kind.is_constant()
    }

    /// Describe what this field's kind-specific data is missing, if anything
    pub fn kind_data_problem(&self) -> Option<String> {
        match &self.mapping_kind {
            MappingKind::Direct => {
                if self.property.trim().is_empty() {
                    Some("Direct field has no property path".to_string())
                } else {
                    None
                }
            }
            MappingKind::ConstantValue | MappingKind::ComputedConstant => {
                if is_blank(&self.constant_id) {
                    Some(format!("{} field has no constant id", self.mapping_kind))
                } else {
                    None
                }
            }
            MappingKind::EntityReference => {
                if is_blank(&self.related_entity_id) {
                    Some("EntityReference field has no related entity id".to_string())
                } else if self.property.trim().is_empty() {
                    Some("EntityReference field has no property path".to_string())
                } else {
                    None
                }
            }
            MappingKind::CustomMapping => {
                if is_blank(&self.custom_mapping_qualifier) {
                    Some("CustomMapping field has no qualifier".to_string())
                } else {
                    None
                }
            }
            MappingKind::PathExtraction => match &self.json_path {
                None => Some("PathExtraction field has no path expression".to_string()),
                Some(expr) => JsonPath::parse(expr).err().map(|e| e.to_string()),
            },
            MappingKind::Unknown(raw) => Some(format!("Unknown mapping kind '{}'", raw)),
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

// ============================================================================
// Tests
// ============================================================================
