//! Error types for Metamorph
//!
//! This module provides unified error handling across the workspace:
//! conversion errors raised by the engine, metadata and configuration
//! errors raised at startup, lookups that miss, and IO/serialization
//! errors from catalog and config files.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Metamorph
#[derive(Debug, Error)]
pub enum EngineError {
    // ========================================================================
    // Conversion Errors
    // ========================================================================
    /// A mandatory, non-constant field was absent from the incoming DTO
    #[error("Missing mandatory field '{field}' for entity '{entity}'")]
    MissingMandatoryField { entity: String, field: String },

    /// A referenced entity could not be loaded (recoverable on write)
    #[error("Unresolved related entity '{entity}' with id '{id}'")]
    UnresolvedRelatedEntity { entity: String, id: String },

    /// A field carries a mapping kind with no registered strategy
    #[error("Unsupported mapping kind '{kind}' on field '{field}'")]
    UnsupportedFieldKind { field: String, kind: String },

    /// No concrete business type could be constructed for a table
    #[error("Cannot instantiate entity for table '{table_id}': {message}")]
    InstantiationFailure { table_id: String, message: String },

    /// An external identifier had no internal counterpart (strict mode)
    #[error("External id '{external_id}' not found for table '{table_id}'")]
    ExternalIdNotFound {
        table_id: String,
        external_id: String,
    },

    /// Property could not be read or written through the accessor table
    #[error("Property access failed for '{type_name}.{property}': {message}")]
    PropertyAccess {
        type_name: String,
        property: String,
        message: String,
    },

    /// An incoming value could not be coerced to the declared property type
    #[error("Type mismatch for '{property}': expected {expected}, found {found}")]
    TypeMismatch {
        property: String,
        expected: String,
        found: String,
    },

    /// A path expression could not be parsed or applied
    #[error("Path extraction failed for '{path}': {message}")]
    PathExtraction { path: String, message: String },

    /// The constants store has no value for a constant id
    #[error("Constant not found: {0}")]
    ConstantNotFound(String),

    /// A registered custom mapping function failed
    #[error("Custom mapping '{qualifier}' failed: {message}")]
    CustomMapping { qualifier: String, message: String },

    // ========================================================================
    // Metadata Errors
    // ========================================================================
    /// General validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity metadata validation failed
    #[error("Entity validation failed for '{entity}': {message}")]
    EntityValidation { entity: String, message: String },

    /// Field metadata validation failed
    #[error("Field validation failed for '{entity}.{field}': {message}")]
    FieldValidation {
        entity: String,
        field: String,
        message: String,
    },

    /// Two projections share a name
    #[error("Duplicate projection name: '{0}' already exists")]
    DuplicateProjection(String),

    /// Two entity metadata records share an id
    #[error("Duplicate entity metadata id: '{0}' already exists")]
    DuplicateEntity(String),

    /// A business type or table was registered twice
    #[error("Duplicate type registration: '{0}'")]
    DuplicateType(String),

    // ========================================================================
    // Not Found Errors
    // ========================================================================
    /// Projection not found in the catalog
    #[error("Projection not found: {0}")]
    ProjectionNotFound(String),

    /// Entity metadata not found in a projection or the catalog
    #[error("Entity metadata not found: {0}")]
    EntityMetadataNotFound(String),

    /// Business object not found by persistence
    #[error("Entity '{entity}' with id '{id}' not found")]
    EntityNotFound { entity: String, id: String },

    /// Entity is not exposed through the REST surface
    #[error("Entity '{0}' is not exposed as a REST endpoint")]
    EndpointDisabled(String),

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// File IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File read error
    #[error("Failed to read file '{path}': {message}")]
    FileRead { path: PathBuf, message: String },

    /// File write error
    #[error("Failed to write file '{path}': {message}")]
    FileWrite { path: PathBuf, message: String },

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error("TOML deserialization error: {0}")]
    TomlDeserialization(#[from] toml::de::Error),

    /// Invalid catalog file format
    #[error("Invalid catalog file format: {0}")]
    InvalidCatalogFormat(String),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: u32, found: u32 },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },
}

impl EngineError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    /// Create a field validation error
    pub fn field_validation(
        entity: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        EngineError::FieldValidation {
            entity: entity.into(),
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Create a missing mandatory field error
    pub fn missing_mandatory(entity: impl Into<String>, field: impl Into<String>) -> Self {
        EngineError::MissingMandatoryField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create a property access error
    pub fn property_access(
        type_name: impl Into<String>,
        property: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        EngineError::PropertyAccess {
            type_name: type_name.into(),
            property: property.into(),
            message: msg.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(
        property: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        EngineError::TypeMismatch {
            property: property.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an instantiation failure
    pub fn instantiation(table_id: impl Into<String>, msg: impl Into<String>) -> Self {
        EngineError::InstantiationFailure {
            table_id: table_id.into(),
            message: msg.into(),
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        EngineError::Internal(msg.into())
    }

    /// Create an error with context
    pub fn with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        EngineError::WithContext {
            context: context.into(),
            message: msg.into(),
        }
    }

    /// Check if the engine may log this error and carry on with the write
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EngineError::UnresolvedRelatedEntity { .. })
    }

    /// Check if this error stems from metadata or engine configuration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EngineError::UnsupportedFieldKind { .. }
                | EngineError::Validation(_)
                | EngineError::EntityValidation { .. }
                | EngineError::FieldValidation { .. }
                | EngineError::DuplicateProjection(_)
                | EngineError::DuplicateEntity(_)
                | EngineError::DuplicateType(_)
                | EngineError::InvalidConfig(_)
                | EngineError::MissingConfig(_)
        )
    }

    /// Check if this error is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::ProjectionNotFound(_)
                | EngineError::EntityMetadataNotFound(_)
                | EngineError::EntityNotFound { .. }
                | EngineError::ExternalIdNotFound { .. }
                | EngineError::ConstantNotFound(_)
        )
    }

    /// Check if this error is an IO error
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            EngineError::Io(_) | EngineError::FileRead { .. } | EngineError::FileWrite { .. }
        )
    }
}

/// Result type alias using EngineError
pub type EngineResult<T> = Result<T, EngineError>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> EngineResult<T>;
}

impl<T, E: Into<EngineError>> ResultExt<T> for Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> EngineResult<T> {
        self.map_err(|e| {
            let err: EngineError = e.into();
            EngineError::WithContext {
                context: context.into(),
                message: err.to_string(),
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
