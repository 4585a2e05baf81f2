//! # Metamorph Core
//!
//! Core types, traits, and error handling for Metamorph.
//!
//! This crate provides the foundational building blocks used throughout
//! the workspace, including:
//!
//! - **Types**: Mapping kinds, declared property types, runtime property values
//! - **Objects**: The `BusinessObject` trait and the shared `EntityRef` handle
//! - **Traits**: Common behaviors like `Validatable` and `Persistable`
//! - **Errors**: Unified error handling with `EngineError` and `EngineResult`
//!

pub mod error;
pub mod object;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{EngineError, EngineResult, ResultExt};
pub use object::{AsAny, BusinessObject, EntityRef};
pub use traits::{Named, Persistable, Validatable};
pub use types::{Dto, ID_KEY, IDENTIFIER_KEY, MappingKind, PropertyType, PropertyValue};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
