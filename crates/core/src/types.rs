//! Core types used throughout Metamorph
//!
//! This module contains the value and type model shared by the metadata
//! layer and the conversion engine: the field mapping kinds, the declared
//! property types of business objects, and the runtime property values the
//! accessor tables produce and consume.

use crate::object::EntityRef;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// DTO
// ============================================================================

/// Ordered field-name → value map exchanged with the outside world.
///
/// `serde_json` is built with `preserve_order`, so iteration order is
/// insertion order.
pub type Dto = serde_json::Map<String, serde_json::Value>;

/// DTO key holding the record identifier
pub const ID_KEY: &str = "id";

/// DTO key holding the display identifier of a stub
pub const IDENTIFIER_KEY: &str = "identifier";

// ============================================================================
// Mapping Kinds
// ============================================================================

/// Strategy tag selecting how a single field is read and written
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MappingKind {
    /// Plain property read/write with type coercion
    Direct,
    /// Fixed value looked up by constant id
    ConstantValue,
    /// Same behavior as `ConstantValue`, distinct tag for metadata clarity
    ComputedConstant,
    /// Related business object, converted recursively
    EntityReference,
    /// Externally registered reader/writer pair
    CustomMapping,
    /// Sub-value extracted from structured text by a path expression
    PathExtraction,
    /// Anything the catalog declared that no strategy understands
    Unknown(String),
}

impl MappingKind {
    /// Every supported kind, in declaration order
    pub fn all() -> &'static [MappingKind] {
        &[
            MappingKind::Direct,
            MappingKind::ConstantValue,
            MappingKind::ComputedConstant,
            MappingKind::EntityReference,
            MappingKind::CustomMapping,
            MappingKind::PathExtraction,
        ]
    }

    /// Canonical name as written in catalog files
    pub fn as_str(&self) -> &str {
        match self {
            MappingKind::Direct => "Direct",
            MappingKind::ConstantValue => "ConstantValue",
            MappingKind::ComputedConstant => "ComputedConstant",
            MappingKind::EntityReference => "EntityReference",
            MappingKind::CustomMapping => "CustomMapping",
            MappingKind::PathExtraction => "PathExtraction",
            MappingKind::Unknown(raw) => raw,
        }
    }

    /// Constant kinds ignore writes and are exempt from mandatory checks
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            MappingKind::ConstantValue | MappingKind::ComputedConstant
        )
    }

    /// Kinds that never accept writes
    pub fn is_read_only(&self) -> bool {
        self.is_constant() || matches!(self, MappingKind::PathExtraction)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, MappingKind::Unknown(_))
    }
}

impl From<String> for MappingKind {
    fn from(raw: String) -> Self {
        let normalized: String = raw
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "direct" => MappingKind::Direct,
            "constantvalue" => MappingKind::ConstantValue,
            "computedconstant" => MappingKind::ComputedConstant,
            "entityreference" => MappingKind::EntityReference,
            "custommapping" => MappingKind::CustomMapping,
            "pathextraction" => MappingKind::PathExtraction,
            _ => MappingKind::Unknown(raw),
        }
    }
}

impl From<&str> for MappingKind {
    fn from(raw: &str) -> Self {
        MappingKind::from(raw.to_string())
    }
}

impl From<MappingKind> for String {
    fn from(kind: MappingKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for MappingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Property Types
// ============================================================================

/// Declared type of a business-object property
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params")]
pub enum PropertyType {
    /// Free text
    Text,
    /// 64-bit signed integer
    Integer,
    /// Arbitrary precision decimal (amounts, quantities)
    Decimal,
    /// Boolean flag
    Boolean,
    /// Date without time
    Date,
    /// Date and time without timezone
    DateTime,
    /// Structured JSON document
    Json,
    /// Single related business object of the named type
    Reference(String),
    /// Collection of related business objects of the named type
    Collection(String),
}

impl PropertyType {
    /// Check if the property holds related business objects
    pub fn is_relation(&self) -> bool {
        matches!(self, PropertyType::Reference(_) | PropertyType::Collection(_))
    }

    /// Check if the property holds a temporal value
    pub fn is_temporal(&self) -> bool {
        matches!(self, PropertyType::Date | PropertyType::DateTime)
    }

    /// Human-readable name used in error messages
    pub fn display_name(&self) -> String {
        match self {
            PropertyType::Text => "text".to_string(),
            PropertyType::Integer => "integer".to_string(),
            PropertyType::Decimal => "decimal".to_string(),
            PropertyType::Boolean => "boolean".to_string(),
            PropertyType::Date => "date".to_string(),
            PropertyType::DateTime => "datetime".to_string(),
            PropertyType::Json => "json".to_string(),
            PropertyType::Reference(target) => format!("reference<{}>", target),
            PropertyType::Collection(target) => format!("collection<{}>", target),
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Property Values
// ============================================================================

/// Runtime value of a business-object property
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PropertyValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Json(serde_json::Value),
    /// Handle to a related business object
    Reference(EntityRef),
    /// Collection-valued property
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Short label of the variant, used in error messages
    pub fn type_label(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Bool(_) => "boolean",
            PropertyValue::Integer(_) => "integer",
            PropertyValue::Decimal(_) => "decimal",
            PropertyValue::Text(_) => "text",
            PropertyValue::Date(_) => "date",
            PropertyValue::DateTime(_) => "datetime",
            PropertyValue::Json(_) => "json",
            PropertyValue::Reference(_) => "reference",
            PropertyValue::List(_) => "list",
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Decimal view; integers widen losslessly
    pub fn decimal(&self) -> Option<Decimal> {
        match self {
            PropertyValue::Decimal(d) => Some(*d),
            PropertyValue::Integer(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }

    pub fn boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            PropertyValue::Date(d) => Some(*d),
            PropertyValue::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }

    pub fn datetime(&self) -> Option<NaiveDateTime> {
        match self {
            PropertyValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn json(&self) -> Option<&serde_json::Value> {
        match self {
            PropertyValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn reference(&self) -> Option<&EntityRef> {
        match self {
            PropertyValue::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub fn list(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// All entity handles held by this value (single or collection)
    pub fn references(&self) -> Vec<EntityRef> {
        match self {
            PropertyValue::Reference(r) => vec![r.clone()],
            PropertyValue::List(items) => items
                .iter()
                .filter_map(|item| item.reference().cloned())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<Decimal> for PropertyValue {
    fn from(value: Decimal) -> Self {
        PropertyValue::Decimal(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<NaiveDate> for PropertyValue {
    fn from(value: NaiveDate) -> Self {
        PropertyValue::Date(value)
    }
}

impl From<NaiveDateTime> for PropertyValue {
    fn from(value: NaiveDateTime) -> Self {
        PropertyValue::DateTime(value)
    }
}

impl From<EntityRef> for PropertyValue {
    fn from(value: EntityRef) -> Self {
        PropertyValue::Reference(value)
    }
}

impl From<Vec<EntityRef>> for PropertyValue {
    fn from(values: Vec<EntityRef>) -> Self {
        PropertyValue::List(values.into_iter().map(PropertyValue::Reference).collect())
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PropertyValue::Null)
    }
}

impl FromStr for PropertyType {
    type Err = crate::error::EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "text" | "string" => Ok(PropertyType::Text),
            "integer" | "int" | "long" => Ok(PropertyType::Integer),
            "decimal" | "number" | "amount" => Ok(PropertyType::Decimal),
            "boolean" | "bool" => Ok(PropertyType::Boolean),
            "date" => Ok(PropertyType::Date),
            "datetime" | "timestamp" => Ok(PropertyType::DateTime),
            "json" => Ok(PropertyType::Json),
            _ => Err(crate::error::EngineError::InvalidConfig(format!(
                "Unknown property type '{}'",
                s
            ))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
