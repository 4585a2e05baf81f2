//! # Field Strategies
//!
//! One strategy per mapping kind. The engine resolves the strategy for each
//! field from a fixed table built once at construction, then delegates the
//! read or write of that single field to it.
//!
//! Strategies are stateless with respect to a conversion call: everything
//! call-specific travels in the [`ConversionContext`], everything shared
//! (collaborators, accessor tables, config) is reached through the engine.

pub mod constant;
pub mod custom;
pub mod direct;
pub mod path;
pub mod reference;

pub use constant::ConstantStrategy;
pub use custom::{CustomMappingRegistry, CustomReader, CustomStrategy, CustomWriter, Resolved};
pub use direct::DirectStrategy;
pub use path::PathStrategy;
pub use reference::ReferenceStrategy;

use crate::context::ConversionContext;
use crate::engine::ConversionEngine;
use metamorph_core::{EngineResult, EntityRef, MappingKind};
use metamorph_meta::{FieldMetadata, MetadataCatalog};
use serde_json::Value;
use std::collections::HashMap;

/// Reads and writes one field of a business object
pub trait FieldStrategy: Send + Sync {
    /// The mapping kind this strategy serves
    fn kind(&self) -> MappingKind;

    /// Produce the DTO value of the field
    fn read(
        &self,
        engine: &ConversionEngine,
        entity: &EntityRef,
        field: &FieldMetadata,
        ctx: &mut ConversionContext,
    ) -> EngineResult<Value>;

    /// Apply an incoming DTO value to the entity
    fn write(
        &self,
        engine: &ConversionEngine,
        entity: &EntityRef,
        value: &Value,
        field: &FieldMetadata,
        ctx: &mut ConversionContext,
    ) -> EngineResult<()>;
}

/// Mapping kind to strategy dispatch table
pub type StrategyTable = HashMap<MappingKind, Box<dyn FieldStrategy>>;

/// Build the dispatch table for every supported kind
pub fn strategy_table(catalog: &MetadataCatalog) -> StrategyTable {
    let strategies: Vec<Box<dyn FieldStrategy>> = vec![
        Box::new(DirectStrategy),
        Box::new(ConstantStrategy::new(MappingKind::ConstantValue)),
        Box::new(ConstantStrategy::new(MappingKind::ComputedConstant)),
        Box::new(ReferenceStrategy),
        Box::new(CustomStrategy),
        Box::new(PathStrategy::compile(catalog)),
    ];

    strategies
        .into_iter()
        .map(|strategy| (strategy.kind(), strategy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_table_covers_every_kind() {
        let table = strategy_table(&fixtures::catalog());
        assert_eq!(table.len(), MappingKind::all().len());
        for kind in MappingKind::all() {
            assert_eq!(&table[kind].kind(), kind);
        }
        assert!(!table.contains_key(&MappingKind::Unknown("Formula".to_string())));
    }
}
