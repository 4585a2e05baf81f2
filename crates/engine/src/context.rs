//! # Conversion Context
//!
//! Per-call traversal state. A context is created at the start of one
//! top-level conversion and dropped at its end; it is never shared between
//! calls or threads.

use metamorph_core::{Dto, EngineResult, EntityRef, IDENTIFIER_KEY, ID_KEY};
use serde_json::Value;
use std::collections::HashSet;

// ============================================================================
// IdentityKey
// ============================================================================

/// How an object is recognized as already visited
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Stable business identifier
    Business(String),
    /// Allocation address of the shared handle, for objects without an id
    Address(usize),
}

/// Runtime type plus identity, the cycle-guard key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    /// Runtime type name
    pub type_name: String,

    /// Business or structural identity
    pub identity: Identity,
}

impl IdentityKey {
    /// Key for a business object
    pub fn of(entity: &EntityRef) -> EngineResult<Self> {
        let guard = entity.read()?;
        let identity = match guard.id() {
            Some(id) if !id.is_empty() => Identity::Business(id),
            _ => Identity::Address(entity.address()),
        };
        Ok(Self {
            type_name: guard.entity_name().to_string(),
            identity,
        })
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.identity {
            Identity::Business(id) => write!(f, "{}#{}", self.type_name, id),
            Identity::Address(addr) => write!(f, "{}@{:#x}", self.type_name, addr),
        }
    }
}

// ============================================================================
// ConversionContext
// ============================================================================

/// Mutable state of one conversion call
#[derive(Debug, Default)]
pub struct ConversionContext {
    /// Objects already converted in this call
    visited: HashSet<IdentityKey>,

    /// The complete incoming DTO, present on writes only
    root_dto: Option<Dto>,
}

impl ConversionContext {
    /// Context for a read
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a write over the given incoming DTO
    pub fn for_write(dto: Dto) -> Self {
        Self {
            visited: HashSet::new(),
            root_dto: Some(dto),
        }
    }

    /// Record a visit; returns false if the key was already present
    pub fn mark_visited(&mut self, key: IdentityKey) -> bool {
        self.visited.insert(key)
    }

    /// Check if a key was already visited
    pub fn is_visited(&self, key: &IdentityKey) -> bool {
        self.visited.contains(key)
    }

    /// Number of distinct objects visited
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// The incoming DTO of the current write
    pub fn root_dto(&self) -> Option<&Dto> {
        self.root_dto.as_ref()
    }
}

/// Minimal `{id, identifier}` record standing in for a related object
pub fn stub(entity: &EntityRef) -> EngineResult<Value> {
    let guard = entity.read()?;
    let mut map = Dto::new();
    map.insert(
        ID_KEY.to_string(),
        guard.id().map(Value::String).unwrap_or(Value::Null),
    );
    map.insert(IDENTIFIER_KEY.to_string(), Value::String(guard.identifier()));
    Ok(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use serde_json::json;

    #[test]
    fn test_identity_key_business_and_address() {
        let product = fixtures::product("P1", "A100");
        let key = IdentityKey::of(&product).unwrap();
        assert_eq!(key.identity, Identity::Business("P1".to_string()));
        assert_eq!(key.to_string(), "Product#P1");

        let a = fixtures::node("a");
        let b = fixtures::node("a");
        let key_a = IdentityKey::of(&a).unwrap();
        assert!(matches!(key_a.identity, Identity::Address(_)));
        assert_ne!(key_a, IdentityKey::of(&b).unwrap());
        assert_eq!(key_a, IdentityKey::of(&a.clone()).unwrap());
    }

    #[test]
    fn test_mark_visited_once() {
        let mut ctx = ConversionContext::new();
        let key = IdentityKey::of(&fixtures::product("P1", "A100")).unwrap();

        assert!(!ctx.is_visited(&key));
        assert!(ctx.mark_visited(key.clone()));
        assert!(!ctx.mark_visited(key.clone()));
        assert!(ctx.is_visited(&key));
        assert_eq!(ctx.visited_count(), 1);
        assert!(ctx.root_dto().is_none());
    }

    #[test]
    fn test_write_context_keeps_root() {
        let dto = json!({"sku": "A100"}).as_object().cloned().unwrap();
        let ctx = ConversionContext::for_write(dto);
        assert_eq!(ctx.root_dto().unwrap()["sku"], json!("A100"));
    }

    #[test]
    fn test_stub_shape() {
        let product = fixtures::product("P1", "A100");
        assert_eq!(stub(&product).unwrap(), json!({"id": "P1", "identifier": "A100"}));

        let node = fixtures::node("leaf");
        assert_eq!(stub(&node).unwrap(), json!({"id": null, "identifier": "leaf"}));
    }
}
