//! Business objects and shared handles
//!
//! Business objects are the persisted, in-memory side of a conversion. The
//! engine never knows their concrete types; it reaches their properties
//! through accessor tables and holds them through [`EntityRef`], a shared,
//! lockable handle that lets object graphs contain cycles.

use crate::error::{EngineError, EngineResult};
use std::any::Any;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ============================================================================
// AsAny
// ============================================================================

/// Upcast helper so typed accessors can downcast a `dyn BusinessObject`
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// BusinessObject
// ============================================================================

/// A persisted business object
///
/// # Example
///
/// ```rust,ignore
/// use metamorph_core::BusinessObject;
///
/// #[derive(Debug, Default)]
/// struct Product {
///     id: Option<String>,
///     sku: String,
/// }
///
/// impl BusinessObject for Product {
///     fn entity_name(&self) -> &str {
///         "Product"
///     }
///
///     fn id(&self) -> Option<String> {
///         self.id.clone()
///     }
///
///     fn set_id(&mut self, id: String) {
///         self.id = Some(id);
///     }
///
///     fn identifier(&self) -> String {
///         self.sku.clone()
///     }
/// }
/// ```
pub trait BusinessObject: AsAny + Send + Sync + std::fmt::Debug {
    /// Runtime type name, the key into the type registry
    fn entity_name(&self) -> &str;

    /// Stable business identifier, if the object has one yet
    fn id(&self) -> Option<String>;

    /// Assign the business identifier (used by persistence on create)
    fn set_id(&mut self, id: String);

    /// Display identifier shown in place of a related object
    fn identifier(&self) -> String {
        self.id().unwrap_or_default()
    }
}

// ============================================================================
// EntityRef
// ============================================================================

/// Shared handle to a business object
///
/// Equality is identity: two handles are equal when they point at the same
/// allocation.
#[derive(Clone)]
pub struct EntityRef(Arc<RwLock<dyn BusinessObject>>);

impl EntityRef {
    /// Wrap a business object in a new handle
    pub fn new<T: BusinessObject>(object: T) -> Self {
        let inner: Arc<RwLock<dyn BusinessObject>> = Arc::new(RwLock::new(object));
        Self(inner)
    }

    /// Acquire shared access to the object
    pub fn read(&self) -> EngineResult<RwLockReadGuard<'_, dyn BusinessObject>> {
        self.0
            .read()
            .map_err(|_| EngineError::internal("business object lock poisoned"))
    }

    /// Acquire exclusive access to the object
    pub fn write(&self) -> EngineResult<RwLockWriteGuard<'_, dyn BusinessObject>> {
        self.0
            .write()
            .map_err(|_| EngineError::internal("business object lock poisoned"))
    }

    /// Runtime type name of the object
    pub fn entity_name(&self) -> EngineResult<String> {
        Ok(self.read()?.entity_name().to_string())
    }

    /// Business identifier of the object
    pub fn id(&self) -> EngineResult<Option<String>> {
        Ok(self.read()?.id())
    }

    /// Display identifier of the object
    pub fn identifier(&self) -> EngineResult<String> {
        Ok(self.read()?.identifier())
    }

    /// Allocation address, the structural identity of the handle
    pub fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Check if two handles point at the same object
    pub fn ptr_eq(&self, other: &EntityRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Run a closure against the object downcast to its concrete type
    pub fn with<T: BusinessObject, R>(&self, f: impl FnOnce(&T) -> R) -> EngineResult<Option<R>> {
        let guard = self.read()?;
        Ok((*guard).as_any().downcast_ref::<T>().map(f))
    }

    /// Run a closure against the object downcast to its concrete type, mutably
    pub fn with_mut<T: BusinessObject, R>(
        &self,
        f: impl FnOnce(&mut T) -> R,
    ) -> EngineResult<Option<R>> {
        let mut guard = self.write()?;
        Ok((*guard).as_any_mut().downcast_mut::<T>().map(f))
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

// Cyclic graphs would recurse forever through the derived impl.
impl std::fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.try_read() {
            Ok(guard) => write!(
                f,
                "EntityRef({}#{})",
                guard.entity_name(),
                guard.id().unwrap_or_else(|| "-".to_string())
            ),
            Err(_) => write!(f, "EntityRef(<locked>)"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
