//! # Metamorph Meta
//!
//! This crate provides the metadata model the conversion engine is driven
//! by. It contains the structures that describe which fields a projection
//! exposes and how each one maps onto a business object.
//!
//! ## Core Concepts
//!
//! - **Projection**: A named, external-facing view made of entities
//! - **Entity Metadata**: The exposed fields of one business-object type
//! - **Field Metadata**: One DTO field and the mapping kind that produces it
//! - **MetadataCatalog**: The immutable snapshot of every projection
//!

// Module declarations
pub mod entity;
pub mod field;
pub mod path;
pub mod projection;
pub mod serialization;
pub mod validation;

// Re-export commonly used types at crate root
pub use entity::EntityMetadata;
pub use field::FieldMetadata;
pub use path::{JsonPath, PathSegment};
pub use projection::{MetadataCatalog, ProjectionMetadata};
pub use serialization::{
    CatalogFile, load_catalog, load_catalog_dir, load_catalog_from_string, load_catalog_path,
    save_catalog, save_catalog_to_string,
};
pub use validation::{
    ValidationError, ValidationErrorCode, ValidationResult, ValidationRule, ValidationWarning,
    ValidationWarningCode, Validator, validate_catalog,
};

// Re-export core types that are commonly used with metadata
pub use metamorph_core::{EngineError, EngineResult, MappingKind};

/// Current schema version for catalog files
pub const SCHEMA_VERSION: u32 = 1;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Prelude Module
// ============================================================================

/// Convenient re-exports for common usage
pub mod prelude {
    pub use crate::{
        EngineError, EngineResult, EntityMetadata, FieldMetadata, MappingKind, MetadataCatalog,
        ProjectionMetadata, validate_catalog,
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version() {
        assert_eq!(SCHEMA_VERSION, 1);
    }
}
