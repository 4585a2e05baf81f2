//! In-memory collaborators
//!
//! Reference implementations of the collaborator contracts, used by the
//! tests and by tooling that needs an engine without a database.

use crate::accessor::TypeRegistry;
use crate::collaborators::{AuditHook, ConstantStore, ExternalIdService, Persistence};
use chrono::{NaiveDateTime, Utc};
use metamorph_core::{EngineError, EngineResult, EntityRef, PropertyValue};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

fn poisoned() -> EngineError {
    EngineError::internal("in-memory store lock poisoned")
}

/// New internal id: 32 uppercase hex characters
pub fn new_internal_id() -> String {
    Uuid::new_v4().simple().to_string().to_uppercase()
}

// ============================================================================
// InMemoryPersistence
// ============================================================================

/// Business objects keyed by `(type name, id)`
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    objects: RwLock<HashMap<(String, String), EntityRef>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or_default()
    }

    /// Check if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Persistence for InMemoryPersistence {
    fn load_by_name_and_id(&self, entity_name: &str, id: &str) -> EngineResult<Option<EntityRef>> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        Ok(objects
            .get(&(entity_name.to_string(), id.to_string()))
            .cloned())
    }

    fn save(&self, entity: &EntityRef) -> EngineResult<()> {
        let (entity_name, id) = {
            let mut guard = entity.write()?;
            let id = match guard.id() {
                Some(id) if !id.is_empty() => id,
                _ => {
                    let id = new_internal_id();
                    guard.set_id(id.clone());
                    id
                }
            };
            (guard.entity_name().to_string(), id)
        };

        tracing::debug!(entity = %entity_name, id = %id, "entity saved");
        self.objects
            .write()
            .map_err(|_| poisoned())?
            .insert((entity_name, id), entity.clone());
        Ok(())
    }
}

// ============================================================================
// InMemoryExternalIds
// ============================================================================

/// External-to-internal id bindings keyed by `(table id, external id)`
#[derive(Debug, Default)]
pub struct InMemoryExternalIds {
    bindings: RwLock<HashMap<(String, String), String>>,
}

impl InMemoryExternalIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding, builder style
    pub fn with_binding(mut self, table_id: &str, external_id: &str, internal_id: &str) -> Self {
        if let Ok(bindings) = self.bindings.get_mut() {
            bindings.insert(
                (table_id.to_string(), external_id.to_string()),
                internal_id.to_string(),
            );
        }
        self
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.bindings.read().map(|b| b.len()).unwrap_or_default()
    }

    /// Check if there are no bindings
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExternalIdService for InMemoryExternalIds {
    fn resolve(&self, table_id: &str, external_id: &str) -> EngineResult<Option<String>> {
        let bindings = self.bindings.read().map_err(|_| poisoned())?;
        Ok(bindings
            .get(&(table_id.to_string(), external_id.to_string()))
            .cloned())
    }

    fn bind(&self, table_id: &str, external_id: &str, internal_id: &str) -> EngineResult<()> {
        self.bindings.write().map_err(|_| poisoned())?.insert(
            (table_id.to_string(), external_id.to_string()),
            internal_id.to_string(),
        );
        Ok(())
    }
}

// ============================================================================
// InMemoryConstants
// ============================================================================

/// Fixed map of constant values
#[derive(Debug, Clone, Default)]
pub struct InMemoryConstants {
    values: HashMap<String, Value>,
}

impl InMemoryConstants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constant, builder style
    pub fn with_constant(mut self, constant_id: impl Into<String>, value: Value) -> Self {
        self.values.insert(constant_id.into(), value);
        self
    }
}

impl ConstantStore for InMemoryConstants {
    fn constant(&self, constant_id: &str) -> EngineResult<Option<Value>> {
        Ok(self.values.get(constant_id).cloned())
    }
}

// ============================================================================
// TimestampAudit
// ============================================================================

pub const CREATED: &str = "created";
pub const CREATED_BY: &str = "created_by";
pub const UPDATED: &str = "updated";
pub const UPDATED_BY: &str = "updated_by";

/// Stamps creation/update time and user through the accessor table
///
/// Types that do not declare a bookkeeping property are left alone for that
/// property.
pub struct TimestampAudit {
    types: Arc<TypeRegistry>,
    user: String,
    clock: Box<dyn Fn() -> NaiveDateTime + Send + Sync>,
}

impl TimestampAudit {
    pub fn new(types: Arc<TypeRegistry>, user: impl Into<String>) -> Self {
        Self {
            types,
            user: user.into(),
            clock: Box::new(|| Utc::now().naive_utc()),
        }
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    fn stamp(
        &self,
        entity: &EntityRef,
        type_name: &str,
        property: &str,
        value: PropertyValue,
    ) -> EngineResult<()> {
        if self.types.has_property(type_name, property) {
            self.types.set_property(entity, property, value)?;
        }
        Ok(())
    }
}

impl AuditHook for TimestampAudit {
    fn apply(&self, entity: &EntityRef, is_new: bool) -> EngineResult<()> {
        let type_name = entity.entity_name()?;
        let now = (self.clock)();

        if is_new {
            self.stamp(entity, &type_name, CREATED, now.into())?;
            self.stamp(entity, &type_name, CREATED_BY, self.user.as_str().into())?;
        }
        self.stamp(entity, &type_name, UPDATED, now.into())?;
        self.stamp(entity, &type_name, UPDATED_BY, self.user.as_str().into())?;

        tracing::debug!(entity = %type_name, is_new, user = %self.user, "audit applied");
        Ok(())
    }
}

impl std::fmt::Debug for TimestampAudit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampAudit")
            .field("user", &self.user)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
