//! # Metamorph Engine
//!
//! Metadata-driven conversion between business objects and DTOs.
//!
//! This crate turns loaded metadata into conversions: business objects are
//! rendered as ordered DTO maps and incoming DTOs are written back onto new
//! or existing business objects, one field strategy per mapping kind.
//!
//! ## Features
//!
//! - **Accessor Tables**: typed getter/setter closures per business type
//! - **Field Strategies**: Direct, constants, references, custom, path extraction
//! - **Cycle Guard**: reference cycles collapse to `{id, identifier}` stubs
//! - **External Ids**: pre-pass translating external identifiers to internal ones
//! - **Service Facade**: get/create/update wired to a persistence collaborator
//!

// ============================================================================
// Modules
// ============================================================================

pub mod accessor;
pub mod collaborators;
pub mod context;
pub mod engine;
pub mod external_id;
pub mod instantiator;
pub mod memory;
pub mod service;
pub mod strategies;

#[cfg(test)]
pub(crate) mod fixtures;

// ============================================================================
// Re-exports
// ============================================================================

pub use accessor::{EntityType, EntityTypeBuilder, PropertyAccessor, TypeRegistry};
pub use collaborators::{
    AuditHook, ConstantStore, ExternalIdService, Persistence, TableTypeResolver,
};
pub use context::{ConversionContext, Identity, IdentityKey};
pub use engine::{ConversionEngine, EngineBuilder};
pub use external_id::{DeferredIdBinding, ExternalIdTranslator, TranslationMiss, TranslationReport};
pub use instantiator::EntityInstantiator;
pub use memory::{InMemoryConstants, InMemoryExternalIds, InMemoryPersistence, TimestampAudit};
pub use service::ProjectionService;
pub use strategies::{CustomMappingRegistry, FieldStrategy, Resolved};

use metamorph_core::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// ExternalIdMode
// ============================================================================

/// What the translator does when an external id has no internal counterpart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalIdMode {
    /// Keep the raw id, log the miss and record it in the report
    #[default]
    Lenient,
    /// Fail with `ExternalIdNotFound`
    Strict,
}

impl std::fmt::Display for ExternalIdMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExternalIdMode::Lenient => write!(f, "lenient"),
            ExternalIdMode::Strict => write!(f, "strict"),
        }
    }
}

// ============================================================================
// EngineConfig
// ============================================================================

/// Configuration for the conversion engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Behavior on unresolved external ids
    pub external_id_mode: ExternalIdMode,

    /// chrono format used to render and parse dates
    pub date_format: String,

    /// chrono format used to render and parse datetimes
    pub datetime_format: String,

    /// Whether `build()` validates the catalog
    pub validate_catalog: bool,

    /// User recorded by the audit hook
    pub audit_user: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            external_id_mode: ExternalIdMode::Lenient,
            date_format: "%Y-%m-%d".to_string(),
            datetime_format: "%Y-%m-%dT%H:%M:%S".to_string(),
            validate_catalog: true,
            audit_user: "system".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail on unresolved external ids instead of keeping the raw id
    pub fn strict_external_ids(mut self) -> Self {
        self.external_id_mode = ExternalIdMode::Strict;
        self
    }

    /// Set the date format
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Set the datetime format
    pub fn with_datetime_format(mut self, format: impl Into<String>) -> Self {
        self.datetime_format = format.into();
        self
    }

    /// Skip catalog validation at build time
    pub fn without_catalog_validation(mut self) -> Self {
        self.validate_catalog = false;
        self
    }

    /// Set the audit user
    pub fn with_audit_user(mut self, user: impl Into<String>) -> Self {
        self.audit_user = user.into();
        self
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let config: EngineConfig = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::FileRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), mode = %config.external_id_mode, "engine config loaded");
        Ok(config)
    }

    /// Reject settings the engine cannot work with
    pub fn check(&self) -> EngineResult<()> {
        if self.date_format.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "date_format must not be empty".to_string(),
            ));
        }
        if self.datetime_format.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "datetime_format must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::new();
        assert_eq!(config.external_id_mode, ExternalIdMode::Lenient);
        assert_eq!(config.date_format, "%Y-%m-%d");
        assert!(config.validate_catalog);
        assert_eq!(config.audit_user, "system");
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::new()
            .strict_external_ids()
            .without_catalog_validation()
            .with_audit_user("importer");

        assert_eq!(config.external_id_mode, ExternalIdMode::Strict);
        assert!(!config.validate_catalog);
        assert_eq!(config.audit_user, "importer");
    }

    #[test]
    fn test_config_from_partial_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            external_id_mode = "strict"
            date_format = "%d/%m/%Y"
            "#,
        )
        .unwrap();

        assert_eq!(config.external_id_mode, ExternalIdMode::Strict);
        assert_eq!(config.date_format, "%d/%m/%Y");
        assert_eq!(config.datetime_format, "%Y-%m-%dT%H:%M:%S");
    }

    #[test]
    fn test_config_rejects_bad_toml() {
        let err = EngineConfig::from_toml_str("external_id_mode = \"sometimes\"").unwrap_err();
        assert!(matches!(err, EngineError::TomlDeserialization(_)));

        let err = EngineConfig::from_toml_str("date_format = \"\"").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_config_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "audit_user = \"batch\"\nvalidate_catalog = false\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.audit_user, "batch");
        assert!(!config.validate_catalog);

        let err = EngineConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(err.is_io());
    }
}
