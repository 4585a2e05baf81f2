//! Entity instantiation by table id
//!
//! The table-to-type lookup is a collaborator round trip; successful lookups
//! are memoized for the lifetime of the instantiator. Misses are not cached.

use crate::accessor::TypeRegistry;
use crate::collaborators::TableTypeResolver;
use metamorph_core::{EngineError, EngineResult, EntityRef};
use metamorph_meta::EntityMetadata;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Creates empty business objects for entity metadata
pub struct EntityInstantiator {
    types: Arc<TypeRegistry>,
    resolver: Arc<dyn TableTypeResolver>,
    memo: RwLock<HashMap<String, String>>,
    lookups: AtomicUsize,
}

impl EntityInstantiator {
    pub fn new(types: Arc<TypeRegistry>, resolver: Arc<dyn TableTypeResolver>) -> Self {
        Self {
            types,
            resolver,
            memo: RwLock::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Business type name for a table
    pub fn type_name_for(&self, table_id: &str) -> EngineResult<String> {
        if let Some(name) = self
            .memo
            .read()
            .map_err(|_| EngineError::internal("instantiator memo lock poisoned"))?
            .get(table_id)
        {
            return Ok(name.clone());
        }

        self.lookups.fetch_add(1, Ordering::Relaxed);
        let name = self.resolver.resolve_type_name(table_id)?.ok_or_else(|| {
            EngineError::instantiation(table_id, "no business type registered for table")
        })?;

        tracing::debug!(table_id, type_name = %name, "table type resolved");
        self.memo
            .write()
            .map_err(|_| EngineError::internal("instantiator memo lock poisoned"))?
            .insert(table_id.to_string(), name.clone());
        Ok(name)
    }

    /// Create an empty business object for the entity's table
    pub fn instantiate(&self, metadata: &EntityMetadata) -> EngineResult<EntityRef> {
        let type_name = self.type_name_for(&metadata.table_id)?;
        let entity_type = self.types.get(&type_name).ok_or_else(|| {
            EngineError::instantiation(
                &metadata.table_id,
                format!("type '{}' has no constructor", type_name),
            )
        })?;
        Ok(entity_type.instantiate())
    }

    /// Number of resolver round trips so far
    pub fn resolver_lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for EntityInstantiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityInstantiator")
            .field("resolver_lookups", &self.resolver_lookups())
            .finish()
    }
}
