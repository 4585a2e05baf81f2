//! Validation rules and utilities for the metadata catalog
//!
//! Catalog validation runs once at startup. Errors make the catalog
//! unusable (unknown mapping kinds, missing kind-specific data, dangling
//! references); warnings flag metadata that loads but is probably wrong.

use crate::MetadataCatalog;
use metamorph_core::{EngineError, EngineResult, MappingKind};
use std::collections::HashSet;

// ============================================================================
// ValidationResult
// ============================================================================

/// Result of a validation operation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the validation passed
    pub valid: bool,

    /// List of errors (empty if valid)
    pub errors: Vec<ValidationError>,

    /// List of warnings (non-fatal issues)
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// Create a successful validation result
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error to the result
    pub fn add_error(&mut self, error: ValidationError) {
        self.valid = false;
        self.errors.push(error);
    }

    /// Add a warning to the result
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Merge another validation result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Convert to EngineResult (fails if any errors)
    ///
    /// An unknown mapping kind surfaces as `UnsupportedFieldKind`; every
    /// other failure is folded into one `Validation` error.
    pub fn to_result(self) -> EngineResult<()> {
        if self.valid {
            return Ok(());
        }

        if let Some(unknown) = self
            .errors
            .iter()
            .find(|e| e.code == ValidationErrorCode::UnknownMappingKind)
        {
            return Err(EngineError::UnsupportedFieldKind {
                field: unknown.path.clone().unwrap_or_default(),
                kind: unknown.detail.clone().unwrap_or_default(),
            });
        }

        let msg = self
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Err(EngineError::validation(msg))
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

// ============================================================================
// ValidationError
// ============================================================================

/// A validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error code for programmatic handling
    pub code: ValidationErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Path to the problematic element (e.g., "sales.Product.fields.sku")
    pub path: Option<String>,

    /// Offending raw value, when there is one
    pub detail: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(code: ValidationErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            detail: None,
        }
    }

    /// Add a path to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach the offending raw value
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "[{}] {}", path, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

/// Error codes for validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorCode {
    // Projection errors
    EmptyProjectionName,

    // Entity errors
    EmptyEntityId,
    EmptyEntityName,
    EmptyTableId,
    DuplicateEntityName,

    // Field errors
    EmptyFieldName,
    DuplicateFieldName,
    UnknownMappingKind,
    MissingKindData,
    UnknownRelatedEntity,

    // Generic
    Custom,
}

// ============================================================================
// ValidationWarning
// ============================================================================

/// A validation warning (non-fatal issue)
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// Warning code
    pub code: ValidationWarningCode,

    /// Human-readable warning message
    pub message: String,

    /// Path to the element
    pub path: Option<String>,
}

impl ValidationWarning {
    /// Create a new warning
    pub fn new(code: ValidationWarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    /// Add a path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "[{}] Warning: {}", path, self.message)
        } else {
            write!(f, "Warning: {}", self.message)
        }
    }
}

/// Warning codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationWarningCode {
    EmptyProjection,
    NoFields,
    MandatoryReadOnlyField,
    MissingIdField,
    Custom,
}

// ============================================================================
// ValidationRule Trait
// ============================================================================

/// Trait for validation rules
pub trait ValidationRule {
    /// Get the rule name
    fn name(&self) -> &'static str;

    /// Get the rule description
    fn description(&self) -> &'static str;

    /// Validate a catalog and return the result
    fn validate(&self, catalog: &MetadataCatalog) -> ValidationResult;
}

// ============================================================================
// Validator
// ============================================================================

/// Catalog validator that runs multiple validation rules
#[derive(Default)]
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    /// Create a new validator
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create a validator with default rules
    pub fn with_default_rules() -> Self {
        let mut validator = Self::new();
        validator.add_rule(Box::new(ProjectionRule));
        validator.add_rule(Box::new(EntityIdentityRule));
        validator.add_rule(Box::new(FieldMappingRule));
        validator.add_rule(Box::new(ReferenceTargetsRule));
        validator
    }

    /// Add a validation rule
    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    /// Validate a catalog with all rules
    pub fn validate(&self, catalog: &MetadataCatalog) -> ValidationResult {
        let mut result = ValidationResult::ok();

        for rule in &self.rules {
            let rule_result = rule.validate(catalog);
            tracing::debug!(
                rule = rule.name(),
                errors = rule_result.errors.len(),
                warnings = rule_result.warnings.len(),
                "validation rule finished"
            );
            result.merge(rule_result);
        }

        result
    }

    /// Validate and return Result
    pub fn validate_result(&self, catalog: &MetadataCatalog) -> EngineResult<()> {
        self.validate(catalog).to_result()
    }
}

// ============================================================================
// Built-in Validation Rules
// ============================================================================

/// Rule: Validate projections
pub struct ProjectionRule;

impl ValidationRule for ProjectionRule {
    fn name(&self) -> &'static str {
        "projections"
    }

    fn description(&self) -> &'static str {
        "Validates that projections are named and expose entities"
    }

    fn validate(&self, catalog: &MetadataCatalog) -> ValidationResult {
        let mut result = ValidationResult::ok();

        for projection in catalog.projections() {
            if projection.name.trim().is_empty() {
                result.add_error(
                    ValidationError::new(
                        ValidationErrorCode::EmptyProjectionName,
                        "Projection name cannot be empty",
                    )
                    .with_path(format!("projections.{}", projection.id)),
                );
            }
            if projection.entities.is_empty() {
                result.add_warning(
                    ValidationWarning::new(
                        ValidationWarningCode::EmptyProjection,
                        format!("Projection '{}' exposes no entities", projection.name),
                    )
                    .with_path(projection.name.clone()),
                );
            }
        }

        result
    }
}

/// Rule: Validate entity identity data
pub struct EntityIdentityRule;

impl ValidationRule for EntityIdentityRule {
    fn name(&self) -> &'static str {
        "entity_identity"
    }

    fn description(&self) -> &'static str {
        "Validates entity ids, names and table ids"
    }

    fn validate(&self, catalog: &MetadataCatalog) -> ValidationResult {
        let mut result = ValidationResult::ok();

        for projection in catalog.projections() {
            let mut seen_names: HashSet<String> = HashSet::new();

            for entity in &projection.entities {
                let path = format!("{}.{}", projection.name, entity.name);

                if entity.id.trim().is_empty() {
                    result.add_error(
                        ValidationError::new(
                            ValidationErrorCode::EmptyEntityId,
                            "Entity id cannot be empty",
                        )
                        .with_path(&path),
                    );
                }

                if entity.name.trim().is_empty() {
                    result.add_error(
                        ValidationError::new(
                            ValidationErrorCode::EmptyEntityName,
                            "Entity name cannot be empty",
                        )
                        .with_path(format!("{}.{}", projection.name, entity.id)),
                    );
                    continue;
                }

                if entity.table_id.trim().is_empty() {
                    result.add_error(
                        ValidationError::new(
                            ValidationErrorCode::EmptyTableId,
                            format!("Entity '{}' has no table id", entity.name),
                        )
                        .with_path(&path),
                    );
                }

                if !seen_names.insert(entity.name.to_lowercase()) {
                    result.add_error(
                        ValidationError::new(
                            ValidationErrorCode::DuplicateEntityName,
                            format!("Duplicate entity name: '{}'", entity.name),
                        )
                        .with_path(&path),
                    );
                }

                if entity.fields.is_empty() {
                    result.add_warning(
                        ValidationWarning::new(
                            ValidationWarningCode::NoFields,
                            format!("Entity '{}' has no fields", entity.name),
                        )
                        .with_path(&path),
                    );
                } else if entity.field(metamorph_core::ID_KEY).is_none() {
                    result.add_warning(
                        ValidationWarning::new(
                            ValidationWarningCode::MissingIdField,
                            format!("Entity '{}' does not expose an 'id' field", entity.name),
                        )
                        .with_path(&path),
                    );
                }
            }
        }

        result
    }
}

/// Rule: Validate field mappings
pub struct FieldMappingRule;

impl ValidationRule for FieldMappingRule {
    fn name(&self) -> &'static str {
        "field_mappings"
    }

    fn description(&self) -> &'static str {
        "Validates field names, mapping kinds and kind-specific data"
    }

    fn validate(&self, catalog: &MetadataCatalog) -> ValidationResult {
        let mut result = ValidationResult::ok();

        for projection in catalog.projections() {
            for entity in &projection.entities {
                let mut seen: HashSet<&str> = HashSet::new();

                for field in &entity.fields {
                    let path = format!("{}.{}.fields.{}", projection.name, entity.name, field.name);

                    if field.name.trim().is_empty() {
                        result.add_error(
                            ValidationError::new(
                                ValidationErrorCode::EmptyFieldName,
                                format!("Entity '{}' has a field without a name", entity.name),
                            )
                            .with_path(&path),
                        );
                        continue;
                    }

                    if !seen.insert(field.name.as_str()) {
                        result.add_error(
                            ValidationError::new(
                                ValidationErrorCode::DuplicateFieldName,
                                format!("Duplicate field name: '{}'", field.name),
                            )
                            .with_path(&path),
                        );
                    }

                    if let MappingKind::Unknown(raw) = &field.mapping_kind {
                        result.add_error(
                            ValidationError::new(
                                ValidationErrorCode::UnknownMappingKind,
                                format!("Unknown mapping kind '{}'", raw),
                            )
                            .with_path(&path)
                            .with_detail(raw.clone()),
                        );
                        continue;
                    }

                    if let Some(problem) = field.kind_data_problem() {
                        result.add_error(
                            ValidationError::new(ValidationErrorCode::MissingKindData, problem)
                                .with_path(&path),
                        );
                    }

                    if field.mandatory && field.mapping_kind == MappingKind::PathExtraction {
                        result.add_warning(
                            ValidationWarning::new(
                                ValidationWarningCode::MandatoryReadOnlyField,
                                format!(
                                    "Field '{}' is mandatory but PathExtraction fields are read-only",
                                    field.name
                                ),
                            )
                            .with_path(&path),
                        );
                    }
                }
            }
        }

        result
    }
}

/// Rule: Validate that reference fields point at known entities
pub struct ReferenceTargetsRule;

impl ValidationRule for ReferenceTargetsRule {
    fn name(&self) -> &'static str {
        "reference_targets"
    }

    fn description(&self) -> &'static str {
        "Validates that EntityReference fields target entity metadata in the catalog"
    }

    fn validate(&self, catalog: &MetadataCatalog) -> ValidationResult {
        let mut result = ValidationResult::ok();

        for projection in catalog.projections() {
            for entity in &projection.entities {
                for field in entity.reference_fields() {
                    let Some(target) = field.related_entity_id.as_deref() else {
                        // Reported by FieldMappingRule
                        continue;
                    };
                    if catalog.entity(target).is_none() {
                        result.add_error(
                            ValidationError::new(
                                ValidationErrorCode::UnknownRelatedEntity,
                                format!("Related entity '{}' is not in the catalog", target),
                            )
                            .with_path(format!(
                                "{}.{}.fields.{}",
                                projection.name, entity.name, field.name
                            ))
                            .with_detail(target),
                        );
                    }
                }
            }
        }

        result
    }
}

/// Validate a catalog with the default rules
pub fn validate_catalog(catalog: &MetadataCatalog) -> ValidationResult {
    Validator::with_default_rules().validate(catalog)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityMetadata, FieldMetadata, ProjectionMetadata};

    fn catalog_with(entity: EntityMetadata) -> MetadataCatalog {
        let category = EntityMetadata::new("CAT", "Category", "209")
            .with_field(FieldMetadata::direct("id", "id"));
        MetadataCatalog::new(vec![
            ProjectionMetadata::new("P1", "sales")
                .with_entity(entity)
                .with_entity(category),
        ])
        .unwrap()
    }

    fn product() -> EntityMetadata {
        EntityMetadata::new("PRD", "Product", "208")
            .with_field(FieldMetadata::direct("id", "id"))
            .with_field(FieldMetadata::direct("sku", "sku").mandatory())
            .with_field(FieldMetadata::reference("category", "category", "CAT"))
    }

    #[test]
    fn test_valid_catalog() {
        let result = validate_catalog(&catalog_with(product()));
        assert!(result.valid, "{:?}", result.errors);
        assert!(!result.has_warnings());
        assert!(result.to_result().is_ok());
    }

    #[test]
    fn test_unknown_mapping_kind_is_unsupported() {
        let entity = product().with_field(FieldMetadata::new("total", MappingKind::from("Formula")));
        let result = validate_catalog(&catalog_with(entity));

        assert!(!result.valid);
        assert_eq!(result.errors[0].code, ValidationErrorCode::UnknownMappingKind);
        match result.to_result() {
            Err(EngineError::UnsupportedFieldKind { field, kind }) => {
                assert_eq!(field, "sales.Product.fields.total");
                assert_eq!(kind, "Formula");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_kind_data() {
        let entity = product().with_field(FieldMetadata::new("rate", MappingKind::ConstantValue));
        let result = validate_catalog(&catalog_with(entity));
        assert!(result
            .errors
            .iter()
            .any(|e| e.code == ValidationErrorCode::MissingKindData));
        assert!(matches!(result.to_result(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_dangling_reference() {
        let entity = product().with_field(FieldMetadata::reference("uom", "uom", "UOM"));
        let result = validate_catalog(&catalog_with(entity));
        let err = result
            .errors
            .iter()
            .find(|e| e.code == ValidationErrorCode::UnknownRelatedEntity)
            .unwrap();
        assert_eq!(err.detail.as_deref(), Some("UOM"));
    }

    #[test]
    fn test_duplicate_field_name() {
        let entity = product().with_field(FieldMetadata::direct("sku", "code"));
        let result = validate_catalog(&catalog_with(entity));
        assert!(result
            .errors
            .iter()
            .any(|e| e.code == ValidationErrorCode::DuplicateFieldName));
    }

    #[test]
    fn test_warnings() {
        let entity = EntityMetadata::new("PRD", "Product", "208")
            .with_field(FieldMetadata::path("color", "attributes", "$.color").mandatory());
        let result = validate_catalog(&catalog_with(entity));

        assert!(result.valid);
        let codes: Vec<ValidationWarningCode> = result.warnings.iter().map(|w| w.code).collect();
        assert!(codes.contains(&ValidationWarningCode::MandatoryReadOnlyField));
        assert!(codes.contains(&ValidationWarningCode::MissingIdField));
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::new(ValidationErrorCode::Custom, "Boom").with_path("a.b");
        assert_eq!(err.to_string(), "[a.b] Boom");
        let warning = ValidationWarning::new(ValidationWarningCode::Custom, "Hmm");
        assert_eq!(warning.to_string(), "Warning: Hmm");
    }
}
