//! Sample business types, catalog and engine wiring shared by the tests

use crate::accessor::{EntityType, EntityTypeBuilder, TypeRegistry};
use crate::engine::ConversionEngine;
use crate::memory::{InMemoryConstants, InMemoryExternalIds, InMemoryPersistence, TimestampAudit};
use crate::strategies::CustomMappingRegistry;
use crate::EngineConfig;
use chrono::{NaiveDate, NaiveDateTime};
use metamorph_core::{BusinessObject, EntityRef, PropertyType, PropertyValue};
use metamorph_meta::{EntityMetadata, FieldMetadata, MetadataCatalog, ProjectionMetadata};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;

pub const PRODUCT_TABLE: &str = "208";
pub const CATEGORY_TABLE: &str = "209";
pub const NODE_TABLE: &str = "300";

// ============================================================================
// Business Types
// ============================================================================

#[derive(Debug, Default)]
pub struct Product {
    pub id: Option<String>,
    pub sku: String,
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i64>,
    pub active: bool,
    pub launch_date: Option<NaiveDate>,
    pub attributes: Option<String>,
    pub category: Option<EntityRef>,
    pub created: Option<NaiveDateTime>,
    pub created_by: Option<String>,
    pub updated: Option<NaiveDateTime>,
    pub updated_by: Option<String>,
}

impl BusinessObject for Product {
    fn entity_name(&self) -> &str {
        "Product"
    }

    fn id(&self) -> Option<String> {
        self.id.clone()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn identifier(&self) -> String {
        self.sku.clone()
    }
}

#[derive(Debug, Default)]
pub struct Category {
    pub id: Option<String>,
    pub name: Option<String>,
    pub parent: Option<EntityRef>,
    pub products: Vec<EntityRef>,
}

impl BusinessObject for Category {
    fn entity_name(&self) -> &str {
        "Category"
    }

    fn id(&self) -> Option<String> {
        self.id.clone()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn identifier(&self) -> String {
        self.name.clone().unwrap_or_default()
    }
}

/// Has no business id, so cycles are detected by address
#[derive(Debug, Default)]
pub struct Node {
    pub label: String,
    pub peer: Option<EntityRef>,
    pub children: Vec<EntityRef>,
}

impl BusinessObject for Node {
    fn entity_name(&self) -> &str {
        "Node"
    }

    fn id(&self) -> Option<String> {
        None
    }

    fn set_id(&mut self, _id: String) {}

    fn identifier(&self) -> String {
        self.label.clone()
    }
}

// ============================================================================
// Accessor Tables
// ============================================================================

pub fn product_type() -> EntityType {
    EntityType::builder::<Product>("Product", PRODUCT_TABLE)
        .auditable()
        .property("id", PropertyType::Text, |p| p.id.clone().into(), |p, v| {
            p.id = v.text().map(str::to_string);
            Ok(())
        })
        .property("sku", PropertyType::Text, |p| p.sku.as_str().into(), |p, v| {
            p.sku = v.text().unwrap_or_default().to_string();
            Ok(())
        })
        .property("name", PropertyType::Text, |p| p.name.clone().into(), |p, v| {
            p.name = v.text().map(str::to_string);
            Ok(())
        })
        .property("price", PropertyType::Decimal, |p| p.price.into(), |p, v| {
            p.price = v.decimal();
            Ok(())
        })
        .property("quantity", PropertyType::Integer, |p| p.quantity.into(), |p, v| {
            p.quantity = v.integer();
            Ok(())
        })
        .property("active", PropertyType::Boolean, |p| p.active.into(), |p, v| {
            p.active = v.boolean().unwrap_or(false);
            Ok(())
        })
        .property("launch_date", PropertyType::Date, |p| p.launch_date.into(), |p, v| {
            p.launch_date = v.date();
            Ok(())
        })
        .property(
            "attributes",
            PropertyType::Text,
            |p| p.attributes.clone().into(),
            |p, v| {
                p.attributes = v.text().map(str::to_string);
                Ok(())
            },
        )
        .property(
            "category",
            PropertyType::Reference("Category".to_string()),
            |p| p.category.clone().into(),
            |p, v| {
                p.category = v.reference().cloned();
                Ok(())
            },
        )
        .property("created", PropertyType::DateTime, |p| p.created.into(), |p, v| {
            p.created = v.datetime();
            Ok(())
        })
        .property("created_by", PropertyType::Text, |p| p.created_by.clone().into(), |p, v| {
            p.created_by = v.text().map(str::to_string);
            Ok(())
        })
        .property("updated", PropertyType::DateTime, |p| p.updated.into(), |p, v| {
            p.updated = v.datetime();
            Ok(())
        })
        .property("updated_by", PropertyType::Text, |p| p.updated_by.clone().into(), |p, v| {
            p.updated_by = v.text().map(str::to_string);
            Ok(())
        })
        .read_only("display_name", PropertyType::Text, |p| {
            format!("{} ({})", p.name.as_deref().unwrap_or("?"), p.sku).into()
        })
        .build()
}

pub fn category_type() -> EntityType {
    EntityType::builder::<Category>("Category", CATEGORY_TABLE)
        .property("id", PropertyType::Text, |c| c.id.clone().into(), |c, v| {
            c.id = v.text().map(str::to_string);
            Ok(())
        })
        .property("name", PropertyType::Text, |c| c.name.clone().into(), |c, v| {
            c.name = v.text().map(str::to_string);
            Ok(())
        })
        .property(
            "parent",
            PropertyType::Reference("Category".to_string()),
            |c| c.parent.clone().into(),
            |c, v| {
                c.parent = v.reference().cloned();
                Ok(())
            },
        )
        .property(
            "products",
            PropertyType::Collection("Product".to_string()),
            |c| c.products.clone().into(),
            |c, v| {
                c.products = v.references();
                Ok(())
            },
        )
        .build()
}

pub fn node_type() -> EntityType {
    EntityTypeBuilder::new("Node", NODE_TABLE, Node::default)
        .property("label", PropertyType::Text, |n| n.label.as_str().into(), |n, v| {
            n.label = v.text().unwrap_or_default().to_string();
            Ok(())
        })
        .property(
            "peer",
            PropertyType::Reference("Node".to_string()),
            |n| n.peer.clone().into(),
            |n, v| {
                n.peer = v.reference().cloned();
                Ok(())
            },
        )
        .property(
            "children",
            PropertyType::Collection("Node".to_string()),
            |n| n.children.clone().into(),
            |n, v| {
                n.children = v.references();
                Ok(())
            },
        )
        .build()
}

pub fn types() -> TypeRegistry {
    let mut types = TypeRegistry::new();
    for entity_type in [product_type(), category_type(), node_type()] {
        types
            .register(entity_type)
            .expect("fixture types are unique");
    }
    types
}

// ============================================================================
// Instances
// ============================================================================

pub fn product(id: &str, sku: &str) -> EntityRef {
    EntityRef::new(Product {
        id: Some(id.to_string()),
        sku: sku.to_string(),
        ..Default::default()
    })
}

pub fn category(id: &str, name: &str) -> EntityRef {
    EntityRef::new(Category {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        ..Default::default()
    })
}

pub fn node(label: &str) -> EntityRef {
    EntityRef::new(Node {
        label: label.to_string(),
        ..Default::default()
    })
}

// ============================================================================
// Catalog
// ============================================================================

pub fn product_metadata() -> EntityMetadata {
    EntityMetadata::new("PRD", "Product", PRODUCT_TABLE)
        .with_field(FieldMetadata::direct("id", "id"))
        .with_field(FieldMetadata::direct("sku", "sku").mandatory())
        .with_field(FieldMetadata::direct("name", "name"))
        .with_field(FieldMetadata::direct("price", "price"))
        .with_field(FieldMetadata::direct("quantity", "quantity"))
        .with_field(FieldMetadata::direct("active", "active"))
        .with_field(FieldMetadata::direct("launchDate", "launch_date"))
        .with_field(FieldMetadata::reference("category", "category", "CAT"))
        .with_field(FieldMetadata::direct("categoryName", "category.name"))
        .with_field(FieldMetadata::constant("currency", "CURRENCY").mandatory())
        .with_field(FieldMetadata::path("color", "attributes", "$.color"))
}

pub fn category_metadata() -> EntityMetadata {
    EntityMetadata::new("CAT", "Category", CATEGORY_TABLE)
        .with_field(FieldMetadata::direct("id", "id"))
        .with_field(FieldMetadata::direct("name", "name").mandatory())
        .with_field(FieldMetadata::reference("parent", "parent", "CAT"))
        .with_field(FieldMetadata::reference("products", "products", "PRD"))
}

pub fn node_metadata() -> EntityMetadata {
    EntityMetadata::new("NODE", "Node", NODE_TABLE)
        .with_field(FieldMetadata::direct("label", "label"))
        .with_field(FieldMetadata::reference("peer", "peer", "NODE"))
        .with_field(FieldMetadata::reference("children", "children", "NODE"))
        .without_endpoint()
}

pub fn catalog() -> MetadataCatalog {
    MetadataCatalog::new(vec![
        ProjectionMetadata::new("P-SALES", "sales")
            .with_entity(product_metadata())
            .with_entity(category_metadata()),
        ProjectionMetadata::new("P-GRAPH", "graph").with_entity(node_metadata()),
    ])
    .expect("fixture catalog is consistent")
}

// ============================================================================
// Engine Wiring
// ============================================================================

/// Engine plus handles on its in-memory collaborators
pub struct Harness {
    pub engine: Arc<ConversionEngine>,
    pub persistence: Arc<InMemoryPersistence>,
    pub external_ids: Arc<InMemoryExternalIds>,
    pub types: Arc<TypeRegistry>,
}

pub fn harness() -> Harness {
    harness_with(EngineConfig::default(), CustomMappingRegistry::new())
}

pub fn harness_with(config: EngineConfig, custom: CustomMappingRegistry) -> Harness {
    let types = Arc::new(types());
    let persistence = Arc::new(InMemoryPersistence::new());
    let external_ids = Arc::new(InMemoryExternalIds::new());
    let constants = InMemoryConstants::new().with_constant("CURRENCY", json!("EUR"));
    let audit = TimestampAudit::new(types.clone(), config.audit_user.clone());

    let engine = ConversionEngine::builder(Arc::new(catalog()), types.clone())
        .with_config(config)
        .with_persistence(persistence.clone())
        .with_external_ids(external_ids.clone())
        .with_constants(Arc::new(constants))
        .with_custom_mappings(custom)
        .with_audit(Arc::new(audit))
        .build()
        .expect("fixture engine builds");

    Harness {
        engine: Arc::new(engine),
        persistence,
        external_ids,
        types,
    }
}

/// Shorthand for building a DTO from a `json!` object literal
pub fn dto(value: serde_json::Value) -> metamorph_core::Dto {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

pub fn set(entity: &EntityRef, types: &TypeRegistry, path: &str, value: impl Into<PropertyValue>) {
    types
        .set_path(entity, path, value.into())
        .expect("fixture property write");
}
