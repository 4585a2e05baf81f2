//! Collaborator contracts
//!
//! The engine owns conversion only. Loading and saving business objects,
//! external id bookkeeping, constants, auditing and table-to-type lookup are
//! supplied by the host through these traits.

use metamorph_core::{EngineResult, EntityRef};
use serde_json::Value;

/// Loads and saves business objects
pub trait Persistence: Send + Sync {
    /// Load a business object by runtime type name and internal id
    fn load_by_name_and_id(&self, entity_name: &str, id: &str) -> EngineResult<Option<EntityRef>>;

    /// Persist a business object, assigning an id when it has none
    fn save(&self, entity: &EntityRef) -> EngineResult<()>;
}

/// Maps identifiers from external systems to internal ids
pub trait ExternalIdService: Send + Sync {
    /// Internal id for an external id in a table, if one is known
    fn resolve(&self, table_id: &str, external_id: &str) -> EngineResult<Option<String>>;

    /// Record that an external id now stands for an internal id
    fn bind(&self, table_id: &str, external_id: &str, internal_id: &str) -> EngineResult<()>;

    /// Resolve an external id, falling back to the input unchanged
    fn convert_external_to_internal_id(&self, table_id: &str, external_id: &str) -> String {
        match self.resolve(table_id, external_id) {
            Ok(Some(internal)) => internal,
            Ok(None) => {
                tracing::warn!(table_id, external_id, "external id not found, keeping raw id");
                external_id.to_string()
            }
            Err(e) => {
                tracing::warn!(table_id, external_id, error = %e, "external id lookup failed, keeping raw id");
                external_id.to_string()
            }
        }
    }
}

/// Read-only store of constant values
pub trait ConstantStore: Send + Sync {
    /// Value registered under a constant id
    fn constant(&self, constant_id: &str) -> EngineResult<Option<Value>>;
}

/// Creation/update bookkeeping applied after a write
pub trait AuditHook: Send + Sync {
    /// Stamp the entity; `is_new` is true when the write instantiated it
    fn apply(&self, entity: &EntityRef, is_new: bool) -> EngineResult<()>;
}

/// Resolves the business type name behind a table id
pub trait TableTypeResolver: Send + Sync {
    fn resolve_type_name(&self, table_id: &str) -> EngineResult<Option<String>>;
}
