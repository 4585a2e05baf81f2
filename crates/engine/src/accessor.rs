//! # Accessor Tables
//!
//! Every business type the engine can touch is registered once at startup as
//! an [`EntityType`]: a constructor plus a table of typed getter/setter
//! closures keyed by property name. Closures are built through
//! [`EntityTypeBuilder`], which downcasts the `dyn BusinessObject` to the
//! concrete type inside each closure so callers never deal with `Any`.
//!
//! Property paths may be dotted (`category.name`). Reads treat a null
//! intermediate as a null result; writes through a null intermediate fail.

use crate::collaborators::TableTypeResolver;
use metamorph_core::{
    BusinessObject, EngineError, EngineResult, EntityRef, PropertyType, PropertyValue,
};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed read closure over a business object
pub type Getter = Arc<dyn Fn(&dyn BusinessObject) -> EngineResult<PropertyValue> + Send + Sync>;

/// Typed write closure over a business object
pub type Setter =
    Arc<dyn Fn(&mut dyn BusinessObject, PropertyValue) -> EngineResult<()> + Send + Sync>;

/// Creates a fresh, empty business object
pub type Constructor = Arc<dyn Fn() -> EntityRef + Send + Sync>;

// ============================================================================
// PropertyAccessor
// ============================================================================

/// Getter and optional setter for one property of a business type
#[derive(Clone)]
pub struct PropertyAccessor {
    /// Property name
    pub name: String,

    /// Declared type, used to coerce incoming values
    pub property_type: PropertyType,

    getter: Getter,
    setter: Option<Setter>,
}

impl PropertyAccessor {
    /// Check if the property accepts writes
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// Read the property
    pub fn get(&self, object: &dyn BusinessObject) -> EngineResult<PropertyValue> {
        (self.getter)(object)
    }

    /// Write the property
    pub fn set(&self, object: &mut dyn BusinessObject, value: PropertyValue) -> EngineResult<()> {
        match &self.setter {
            Some(setter) => setter(object, value),
            None => Err(EngineError::property_access(
                object.entity_name(),
                &self.name,
                "property is read-only",
            )),
        }
    }
}

impl std::fmt::Debug for PropertyAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyAccessor")
            .field("name", &self.name)
            .field("property_type", &self.property_type)
            .field("writable", &self.is_writable())
            .finish()
    }
}

// ============================================================================
// EntityType
// ============================================================================

/// A registered business type: constructor plus accessor table
#[derive(Clone)]
pub struct EntityType {
    /// Runtime type name, matches `BusinessObject::entity_name`
    pub name: String,

    /// Persistence table backing the type
    pub table_id: String,

    /// Whether the audit hook stamps this type on write
    pub auditable: bool,

    constructor: Constructor,
    properties: HashMap<String, PropertyAccessor>,
}

impl EntityType {
    /// Start building a type constructed through `Default`
    pub fn builder<T: BusinessObject + Default>(
        name: impl Into<String>,
        table_id: impl Into<String>,
    ) -> EntityTypeBuilder<T> {
        EntityTypeBuilder::new(name, table_id, T::default)
    }

    /// Create a fresh instance
    pub fn instantiate(&self) -> EntityRef {
        (self.constructor)()
    }

    /// Accessor for a property
    pub fn property(&self, name: &str) -> Option<&PropertyAccessor> {
        self.properties.get(name)
    }

    /// Check if the type declares a property
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Declared property names, sorted
    pub fn property_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.properties.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityType")
            .field("name", &self.name)
            .field("table_id", &self.table_id)
            .field("auditable", &self.auditable)
            .field("properties", &self.property_names())
            .finish()
    }
}

// ============================================================================
// EntityTypeBuilder
// ============================================================================

/// Typed builder for an [`EntityType`]
///
/// # Example
///
/// ```rust,ignore
/// let product = EntityType::builder::<Product>("Product", "208")
///     .auditable()
///     .property("sku", PropertyType::Text, |p| p.sku.clone().into(), |p, v| {
///         p.sku = v.text().unwrap_or_default().to_string();
///         Ok(())
///     })
///     .build();
/// ```
pub struct EntityTypeBuilder<T> {
    name: String,
    table_id: String,
    auditable: bool,
    constructor: Constructor,
    properties: HashMap<String, PropertyAccessor>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: BusinessObject> EntityTypeBuilder<T> {
    /// Start building a type with an explicit constructor
    pub fn new(
        name: impl Into<String>,
        table_id: impl Into<String>,
        make: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            table_id: table_id.into(),
            auditable: false,
            constructor: Arc::new(move || EntityRef::new(make())),
            properties: HashMap::new(),
            _marker: PhantomData,
        }
    }

    /// Mark the type as audited
    pub fn auditable(mut self) -> Self {
        self.auditable = true;
        self
    }

    /// Add a readable and writable property
    pub fn property(
        self,
        name: impl Into<String>,
        property_type: PropertyType,
        get: impl Fn(&T) -> PropertyValue + Send + Sync + 'static,
        set: impl Fn(&mut T, PropertyValue) -> EngineResult<()> + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        let type_name = self.name.clone();
        let property = name.clone();
        let setter: Setter = Arc::new(
            move |object: &mut dyn BusinessObject, value: PropertyValue| match object
                .as_any_mut()
                .downcast_mut::<T>()
            {
                Some(typed) => set(typed, value),
                None => Err(mismatched_object(&type_name, &property)),
            },
        );
        self.insert(name, property_type, get, Some(setter))
    }

    /// Add a property without a setter
    pub fn read_only(
        self,
        name: impl Into<String>,
        property_type: PropertyType,
        get: impl Fn(&T) -> PropertyValue + Send + Sync + 'static,
    ) -> Self {
        self.insert(name.into(), property_type, get, None)
    }

    fn insert(
        mut self,
        name: String,
        property_type: PropertyType,
        get: impl Fn(&T) -> PropertyValue + Send + Sync + 'static,
        setter: Option<Setter>,
    ) -> Self {
        let type_name = self.name.clone();
        let property = name.clone();
        let getter: Getter = Arc::new(move |object: &dyn BusinessObject| {
            object
                .as_any()
                .downcast_ref::<T>()
                .map(&get)
                .ok_or_else(|| mismatched_object(&type_name, &property))
        });

        self.properties.insert(
            name.clone(),
            PropertyAccessor {
                name,
                property_type,
                getter,
                setter,
            },
        );
        self
    }

    /// Finish the type
    pub fn build(self) -> EntityType {
        EntityType {
            name: self.name,
            table_id: self.table_id,
            auditable: self.auditable,
            constructor: self.constructor,
            properties: self.properties,
        }
    }
}

fn mismatched_object(type_name: &str, property: &str) -> EngineError {
    EngineError::property_access(
        type_name,
        property,
        "business object is not of the registered concrete type",
    )
}

// ============================================================================
// TypeRegistry
// ============================================================================

/// All registered business types, by name and by table
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, EntityType>,
    tables: HashMap<String, String>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type; names and tables must be unique
    pub fn register(&mut self, entity_type: EntityType) -> EngineResult<()> {
        if self.types.contains_key(&entity_type.name) {
            return Err(EngineError::DuplicateType(entity_type.name));
        }
        if self.tables.contains_key(&entity_type.table_id) {
            return Err(EngineError::DuplicateType(format!(
                "table {}",
                entity_type.table_id
            )));
        }

        tracing::debug!(
            type_name = %entity_type.name,
            table_id = %entity_type.table_id,
            properties = entity_type.properties.len(),
            "business type registered"
        );
        self.tables
            .insert(entity_type.table_id.clone(), entity_type.name.clone());
        self.types.insert(entity_type.name.clone(), entity_type);
        Ok(())
    }

    /// Register a type, builder style
    pub fn with_type(mut self, entity_type: EntityType) -> EngineResult<Self> {
        self.register(entity_type)?;
        Ok(self)
    }

    /// Type by runtime name
    pub fn get(&self, type_name: &str) -> Option<&EntityType> {
        self.types.get(type_name)
    }

    /// Type backing a table
    pub fn by_table(&self, table_id: &str) -> Option<&EntityType> {
        self.tables.get(table_id).and_then(|name| self.types.get(name))
    }

    /// Check if a type takes part in auditing
    pub fn is_auditable(&self, type_name: &str) -> bool {
        self.get(type_name).is_some_and(|t| t.auditable)
    }

    /// Check if a type declares a property
    pub fn has_property(&self, type_name: &str, property: &str) -> bool {
        self.get(type_name).is_some_and(|t| t.has_property(property))
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if no type is registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn accessor(&self, type_name: &str, property: &str) -> EngineResult<&PropertyAccessor> {
        let entity_type = self.get(type_name).ok_or_else(|| {
            EngineError::property_access(type_name, property, "type is not registered")
        })?;
        entity_type
            .property(property)
            .ok_or_else(|| EngineError::property_access(type_name, property, "unknown property"))
    }

    // ========================================================================
    // Property Access
    // ========================================================================

    /// Read one property; the entity lock is released before returning
    pub fn get_property(&self, entity: &EntityRef, property: &str) -> EngineResult<PropertyValue> {
        let guard = entity.read()?;
        let object: &dyn BusinessObject = &*guard;
        self.accessor(object.entity_name(), property)?.get(object)
    }

    /// Write one property
    pub fn set_property(
        &self,
        entity: &EntityRef,
        property: &str,
        value: PropertyValue,
    ) -> EngineResult<()> {
        let mut guard = entity.write()?;
        let type_name = guard.entity_name().to_string();
        let accessor = self.accessor(&type_name, property)?;
        accessor.set(&mut *guard, value)
    }

    /// Read a dotted property path, null-safe
    pub fn get_path(&self, entity: &EntityRef, path: &str) -> EngineResult<PropertyValue> {
        let segments: Vec<&str> = path.split('.').collect();
        let last = segments.len() - 1;
        let mut current = entity.clone();

        for (i, segment) in segments.iter().enumerate() {
            let value = self.get_property(&current, segment)?;
            if i == last {
                return Ok(value);
            }
            match value {
                PropertyValue::Reference(next) => current = next,
                PropertyValue::Null => return Ok(PropertyValue::Null),
                other => {
                    return Err(EngineError::property_access(
                        current.entity_name()?,
                        *segment,
                        format!("cannot traverse into a {} value", other.type_label()),
                    ));
                }
            }
        }
        Ok(PropertyValue::Null)
    }

    /// Write a dotted property path
    pub fn set_path(&self, entity: &EntityRef, path: &str, value: PropertyValue) -> EngineResult<()> {
        let Some((parent_path, property)) = path.rsplit_once('.') else {
            return self.set_property(entity, path, value);
        };

        match self.get_path(entity, parent_path)? {
            PropertyValue::Reference(target) => self.set_property(&target, property, value),
            // Nothing to clear below a null intermediate
            PropertyValue::Null if value.is_null() => Ok(()),
            PropertyValue::Null => Err(EngineError::property_access(
                entity.entity_name()?,
                path,
                format!("'{}' is null", parent_path),
            )),
            other => Err(EngineError::property_access(
                entity.entity_name()?,
                path,
                format!("'{}' is a {} value", parent_path, other.type_label()),
            )),
        }
    }

    /// Declared type at the end of a dotted path, starting from a type name
    pub fn declared_type(&self, type_name: &str, path: &str) -> EngineResult<PropertyType> {
        let mut current = type_name.to_string();
        let mut segments = path.split('.').peekable();

        while let Some(segment) = segments.next() {
            let accessor = self.accessor(&current, segment)?;
            if segments.peek().is_none() {
                return Ok(accessor.property_type.clone());
            }
            match &accessor.property_type {
                PropertyType::Reference(target) => current = target.clone(),
                other => {
                    return Err(EngineError::property_access(
                        &current,
                        segment,
                        format!("cannot traverse into a {} property", other),
                    ));
                }
            }
        }
        Err(EngineError::property_access(type_name, path, "empty property path"))
    }
}

impl TableTypeResolver for TypeRegistry {
    fn resolve_type_name(&self, table_id: &str) -> EngineResult<Option<String>> {
        Ok(self.tables.get(table_id).cloned())
    }
}

// ============================================================================
// Tests
// ============================================================================
