//! Direct mapping: a property read or written as-is, with type coercion

use super::FieldStrategy;
use crate::context::ConversionContext;
use crate::engine::ConversionEngine;
use crate::EngineConfig;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use metamorph_core::{EngineError, EngineResult, EntityRef, MappingKind, PropertyType, PropertyValue};
use metamorph_meta::FieldMetadata;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use std::str::FromStr;

/// Strategy for `Direct` fields
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectStrategy;

impl FieldStrategy for DirectStrategy {
    fn kind(&self) -> MappingKind {
        MappingKind::Direct
    }

    fn read(
        &self,
        engine: &ConversionEngine,
        entity: &EntityRef,
        field: &FieldMetadata,
        _ctx: &mut ConversionContext,
    ) -> EngineResult<Value> {
        let value = engine.types().get_path(entity, &field.property)?;
        render(value, engine.config())
    }

    fn write(
        &self,
        engine: &ConversionEngine,
        entity: &EntityRef,
        value: &Value,
        field: &FieldMetadata,
        _ctx: &mut ConversionContext,
    ) -> EngineResult<()> {
        let type_name = entity.entity_name()?;
        let target = engine.types().declared_type(&type_name, &field.property)?;
        let coerced = coerce(value, &target, &field.property, engine.config())?;
        engine.types().set_path(entity, &field.property, coerced)
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Turn a property value into its DTO form
///
/// Related objects collapse to their display identifier, temporal values are
/// formatted with the configured patterns.
pub fn render(value: PropertyValue, config: &EngineConfig) -> EngineResult<Value> {
    Ok(match value {
        PropertyValue::Null => Value::Null,
        PropertyValue::Bool(b) => Value::Bool(b),
        PropertyValue::Integer(i) => Value::Number(i.into()),
        PropertyValue::Decimal(d) => render_decimal(d),
        PropertyValue::Text(s) => Value::String(s),
        PropertyValue::Date(d) => Value::String(d.format(&config.date_format).to_string()),
        PropertyValue::DateTime(dt) => {
            Value::String(dt.format(&config.datetime_format).to_string())
        }
        PropertyValue::Json(v) => v,
        PropertyValue::Reference(related) => Value::String(related.identifier()?),
        PropertyValue::List(items) => Value::Array(
            items
                .into_iter()
                .map(|item| render(item, config))
                .collect::<EngineResult<Vec<_>>>()?,
        ),
    })
}

/// A JSON number when f64 holds the value exactly, the decimal text otherwise
fn render_decimal(d: Decimal) -> Value {
    d.to_f64()
        .filter(|f| Decimal::from_f64(*f) == Some(d))
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(d.to_string()))
}

// ============================================================================
// Coercion
// ============================================================================

/// Convert an incoming DTO value to the declared type of a property
pub fn coerce(
    value: &Value,
    target: &PropertyType,
    property: &str,
    config: &EngineConfig,
) -> EngineResult<PropertyValue> {
    if value.is_null() {
        return Ok(PropertyValue::Null);
    }

    let coerced = match target {
        PropertyType::Text => match value {
            Value::String(s) => Some(PropertyValue::Text(s.clone())),
            Value::Number(n) => Some(PropertyValue::Text(n.to_string())),
            Value::Bool(b) => Some(PropertyValue::Text(b.to_string())),
            _ => None,
        },
        PropertyType::Integer => coerce_integer(value).map(PropertyValue::Integer),
        PropertyType::Decimal => coerce_decimal(value).map(PropertyValue::Decimal),
        PropertyType::Boolean => coerce_boolean(value).map(PropertyValue::Bool),
        PropertyType::Date => value
            .as_str()
            .and_then(|s| parse_date(s.trim(), config))
            .map(PropertyValue::Date),
        PropertyType::DateTime => value
            .as_str()
            .and_then(|s| parse_datetime(s.trim(), config))
            .map(PropertyValue::DateTime),
        PropertyType::Json => Some(PropertyValue::Json(value.clone())),
        PropertyType::Reference(_) | PropertyType::Collection(_) => None,
    };

    coerced.ok_or_else(|| EngineError::type_mismatch(property, target.display_name(), describe(value)))
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            // i64::MAX as f64 rounds up to 2^63, which is already out of range
            (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                let d = parse_decimal(s)?;
                d.fract().is_zero().then(|| d.to_i64()).flatten()
            })
        }
        _ => None,
    }
}

fn coerce_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Decimal::from(i)),
            None => parse_decimal(&n.to_string()),
        },
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn coerce_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "y" => Some(true),
            "false" | "n" => Some(false),
            _ => None,
        },
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    }
}

fn parse_date(s: &str, config: &EngineConfig) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, &config.date_format)
        .ok()
        .or_else(|| parse_datetime(s, config).map(|dt| dt.date()))
}

fn parse_datetime(s: &str, config: &EngineConfig) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, &config.datetime_format)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
        .or_else(|| {
            NaiveDate::parse_from_str(s, &config.date_format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string \"{}\"", s),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_render_scalars() {
        let cfg = config();
        assert_eq!(render(PropertyValue::Null, &cfg).unwrap(), Value::Null);
        assert_eq!(render(42i64.into(), &cfg).unwrap(), json!(42));
        assert_eq!(render(Decimal::new(1250, 2).into(), &cfg).unwrap(), json!(12.5));
        assert_eq!(render(Decimal::from(5).into(), &cfg).unwrap(), json!(5.0));
        assert_eq!(render(true.into(), &cfg).unwrap(), json!(true));
    }

    #[test]
    fn test_render_temporal_with_config() {
        let day = date(2024, 3, 9);
        assert_eq!(render(day.into(), &config()).unwrap(), json!("2024-03-09"));

        let cfg = config().with_date_format("%d/%m/%Y");
        assert_eq!(render(day.into(), &cfg).unwrap(), json!("09/03/2024"));

        let at = day.and_hms_opt(8, 30, 0).unwrap();
        assert_eq!(render(at.into(), &config()).unwrap(), json!("2024-03-09T08:30:00"));
    }

    #[test]
    fn test_render_references_collapse_to_identifier() {
        let category = fixtures::category("C1", "Tools");
        assert_eq!(render(category.clone().into(), &config()).unwrap(), json!("Tools"));

        let list = PropertyValue::from(vec![category, fixtures::category("C2", "Garden")]);
        assert_eq!(render(list, &config()).unwrap(), json!(["Tools", "Garden"]));
    }

    #[test]
    fn test_coerce_text_and_integer() {
        let cfg = config();
        assert_eq!(
            coerce(&json!(12), &PropertyType::Text, "name", &cfg).unwrap(),
            PropertyValue::Text("12".to_string())
        );
        assert_eq!(
            coerce(&json!(7.0), &PropertyType::Integer, "quantity", &cfg).unwrap(),
            PropertyValue::Integer(7)
        );
        assert_eq!(
            coerce(&json!(" 9 "), &PropertyType::Integer, "quantity", &cfg).unwrap(),
            PropertyValue::Integer(9)
        );

        let err = coerce(&json!(7.5), &PropertyType::Integer, "quantity", &cfg).unwrap_err();
        assert!(matches!(err, EngineError::TypeMismatch { ref property, .. } if property == "quantity"));
    }

    #[test]
    fn test_coerce_integer_out_of_range() {
        let cfg = config();
        let too_big = json!(i64::MAX as u64 + 1);
        let err = coerce(&too_big, &PropertyType::Integer, "quantity", &cfg).unwrap_err();
        assert!(matches!(err, EngineError::TypeMismatch { .. }));

        assert!(coerce(&json!(1e19), &PropertyType::Integer, "quantity", &cfg).is_err());
        assert_eq!(
            coerce(&json!(i64::MAX), &PropertyType::Integer, "quantity", &cfg).unwrap(),
            PropertyValue::Integer(i64::MAX)
        );
        assert_eq!(
            coerce(&json!(i64::MIN), &PropertyType::Integer, "quantity", &cfg).unwrap(),
            PropertyValue::Integer(i64::MIN)
        );
    }

    #[test]
    fn test_coerce_decimal_widens() {
        let cfg = config();
        assert_eq!(
            coerce(&json!(5), &PropertyType::Decimal, "price", &cfg).unwrap(),
            PropertyValue::Decimal(Decimal::from(5))
        );
        assert_eq!(
            coerce(&json!("19.99"), &PropertyType::Decimal, "price", &cfg).unwrap(),
            PropertyValue::Decimal(Decimal::new(1999, 2))
        );
        assert!(coerce(&json!("cheap"), &PropertyType::Decimal, "price", &cfg).is_err());
    }

    #[test]
    fn test_coerce_boolean_forms() {
        let cfg = config();
        for (input, expected) in [
            (json!(true), true),
            (json!("Y"), true),
            (json!("n"), false),
            (json!("false"), false),
            (json!(1), true),
            (json!(0), false),
        ] {
            assert_eq!(
                coerce(&input, &PropertyType::Boolean, "active", &cfg).unwrap(),
                PropertyValue::Bool(expected)
            );
        }
        assert!(coerce(&json!(2), &PropertyType::Boolean, "active", &cfg).is_err());
    }

    #[test]
    fn test_coerce_temporal() {
        let cfg = config();
        assert_eq!(
            coerce(&json!("2024-03-09"), &PropertyType::Date, "launch_date", &cfg).unwrap(),
            PropertyValue::Date(date(2024, 3, 9))
        );
        assert_eq!(
            coerce(&json!("2024-03-09T10:00:00"), &PropertyType::Date, "launch_date", &cfg)
                .unwrap(),
            PropertyValue::Date(date(2024, 3, 9))
        );
        assert_eq!(
            coerce(&json!("2024-03-09T10:00:00+02:00"), &PropertyType::DateTime, "created", &cfg)
                .unwrap(),
            PropertyValue::DateTime(date(2024, 3, 9).and_hms_opt(8, 0, 0).unwrap())
        );
        assert_eq!(
            coerce(&json!("2024-03-09"), &PropertyType::DateTime, "created", &cfg).unwrap(),
            PropertyValue::DateTime(date(2024, 3, 9).and_hms_opt(0, 0, 0).unwrap())
        );
        assert!(coerce(&json!("tomorrow"), &PropertyType::Date, "launch_date", &cfg).is_err());
    }

    #[test]
    fn test_coerce_null_and_relations() {
        let cfg = config();
        assert_eq!(
            coerce(&Value::Null, &PropertyType::Integer, "quantity", &cfg).unwrap(),
            PropertyValue::Null
        );
        let err = coerce(
            &json!("C1"),
            &PropertyType::Reference("Category".to_string()),
            "category",
            &cfg,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Type mismatch for 'category': expected reference<Category>, found string \"C1\""
        );
    }

    #[test]
    fn test_direct_round_trip_through_engine() {
        let h = fixtures::harness();
        let product = fixtures::product("P1", "A100");
        fixtures::set(&product, &h.types, "price", Decimal::from(5));
        let field = FieldMetadata::direct("price", "price");

        let mut ctx = ConversionContext::new();
        let value = DirectStrategy.read(&h.engine, &product, &field, &mut ctx).unwrap();
        assert_eq!(value, json!(5.0));

        let copy = fixtures::product("P2", "B200");
        DirectStrategy
            .write(&h.engine, &copy, &value, &field, &mut ctx)
            .unwrap();
        assert_eq!(
            h.types.get_path(&copy, "price").unwrap(),
            PropertyValue::Decimal(Decimal::from(5))
        );
    }

    #[test]
    fn test_high_precision_decimal_round_trip() {
        let h = fixtures::harness();
        let exact = Decimal::from_str("12345678901234567.89").unwrap();
        let product = fixtures::product("P1", "A100");
        fixtures::set(&product, &h.types, "price", exact);
        let field = FieldMetadata::direct("price", "price");

        let mut ctx = ConversionContext::new();
        let value = DirectStrategy.read(&h.engine, &product, &field, &mut ctx).unwrap();
        assert_eq!(value, json!("12345678901234567.89"));

        let copy = fixtures::product("P2", "B200");
        DirectStrategy
            .write(&h.engine, &copy, &value, &field, &mut ctx)
            .unwrap();
        assert_eq!(h.types.get_path(&copy, "price").unwrap(), PropertyValue::Decimal(exact));
    }
}
