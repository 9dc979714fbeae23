//! Text-to-JSON conversion of shell parameter values.
//!
//! Everything typed at the prompt is text; the resource's declared
//! attribute types decide what JSON value a `name=value` pair becomes.

use cloudsite_link::statement::ParamName;
use cloudsite_link::{DataType, Resource};
use serde_json::Value as JsonValue;

use crate::error::{CLIError, Result};

/// Literal that sends an explicit JSON `null`
pub const NULL_LITERAL: &str = "null";

/// Convert the text of one parameter into the JSON value sent with the
/// statement.
///
/// Names the resource does not declare (read options such as `_limit`,
/// indexed collection elements) are passed through [`coerce_untyped`]; the
/// statement itself decides whether the name is acceptable.
pub fn coerce(resource: &Resource, name: &str, raw: &str) -> Result<JsonValue> {
    let param = ParamName::parse(name);
    if param.indexed {
        return Ok(coerce_untyped(raw));
    }
    match resource.get_attribute(param.base) {
        Some(attribute) => coerce_typed(attribute.data_type, name, raw),
        None => Ok(coerce_untyped(raw)),
    }
}

/// Convert text for a column of a known type.
pub fn coerce_typed(data_type: DataType, name: &str, raw: &str) -> Result<JsonValue> {
    if raw == NULL_LITERAL {
        return Ok(JsonValue::Null);
    }
    let cast_error = || CLIError::ValueError {
        attribute: name.to_string(),
        value: raw.to_string(),
        expected: data_type.wire_name().to_string(),
    };

    let value = match data_type {
        DataType::Text
        | DataType::Timestamp
        | DataType::Date
        | DataType::Time
        | DataType::Uuid
        | DataType::TimeUuid
        | DataType::Binary => JsonValue::String(raw.to_string()),
        DataType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" => JsonValue::Bool(true),
            "false" => JsonValue::Bool(false),
            _ => return Err(cast_error()),
        },
        DataType::Integer => {
            let n: i32 = raw.trim().parse().map_err(|_| cast_error())?;
            JsonValue::from(n)
        }
        DataType::BigInteger => {
            let n: i64 = raw.trim().parse().map_err(|_| cast_error())?;
            JsonValue::from(n)
        }
        DataType::Decimal => {
            let n: f64 = raw.trim().parse().map_err(|_| cast_error())?;
            serde_json::Number::from_f64(n)
                .map(JsonValue::Number)
                .ok_or_else(cast_error)?
        }
        // A bare id, or a JSON object carrying the related entity's keys
        DataType::Relation => {
            if raw.trim_start().starts_with('{') {
                let value: JsonValue = serde_json::from_str(raw).map_err(|_| cast_error())?;
                if !value.is_object() {
                    return Err(cast_error());
                }
                value
            } else {
                JsonValue::String(raw.to_string())
            }
        }
        DataType::Set | DataType::List | DataType::Tuple => {
            let value: JsonValue = serde_json::from_str(raw).map_err(|_| cast_error())?;
            if !value.is_array() {
                return Err(cast_error());
            }
            value
        }
        DataType::Map => {
            let value: JsonValue = serde_json::from_str(raw).map_err(|_| cast_error())?;
            if !value.is_object() {
                return Err(cast_error());
            }
            value
        }
        DataType::Expand | DataType::Undefined => coerce_untyped(raw),
    };
    Ok(value)
}

/// Best-effort conversion: JSON literals (numbers, booleans, arrays,
/// objects, null) are parsed, anything else stays a string.
pub fn coerce_untyped(raw: &str) -> JsonValue {
    match serde_json::from_str::<JsonValue>(raw) {
        Ok(JsonValue::String(_)) | Err(_) => JsonValue::String(raw.to_string()),
        Ok(value) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_stays_text() {
        assert_eq!(
            coerce_typed(DataType::Text, "firstName", "42").unwrap(),
            json!("42")
        );
        assert_eq!(
            coerce_typed(DataType::Text, "firstName", "Ann Lee").unwrap(),
            json!("Ann Lee")
        );
    }

    #[test]
    fn test_boolean_only_true_false() {
        assert_eq!(coerce_typed(DataType::Boolean, "ok", "TRUE").unwrap(), json!(true));
        assert_eq!(coerce_typed(DataType::Boolean, "ok", "false").unwrap(), json!(false));

        let err = coerce_typed(DataType::Boolean, "ok", "yes").unwrap_err();
        assert_eq!(
            err.to_string(),
            "'yes' can't be cast to type 'BOOLEAN' for attribute 'ok'"
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(coerce_typed(DataType::Integer, "age", "30").unwrap(), json!(30));
        assert!(coerce_typed(DataType::Integer, "age", "3000000000").is_err());
        assert_eq!(
            coerce_typed(DataType::BigInteger, "views", "3000000000").unwrap(),
            json!(3_000_000_000_i64)
        );
        assert_eq!(coerce_typed(DataType::Decimal, "price", "9.5").unwrap(), json!(9.5));
        assert!(coerce_typed(DataType::Decimal, "price", "cheap").is_err());
    }

    #[test]
    fn test_relation_and_collections() {
        assert_eq!(
            coerce_typed(DataType::Relation, "owner", r#"{"pk":"A"}"#).unwrap(),
            json!({"pk": "A"})
        );
        assert_eq!(
            coerce_typed(DataType::Relation, "owner", "7b1e2d3c-4f5a-4b6c-8d7e-9f0a1b2c3d4e")
                .unwrap(),
            json!("7b1e2d3c-4f5a-4b6c-8d7e-9f0a1b2c3d4e")
        );
        assert!(coerce_typed(DataType::Relation, "owner", "{broken").is_err());

        assert_eq!(
            coerce_typed(DataType::List, "tags", r#"["a","b"]"#).unwrap(),
            json!(["a", "b"])
        );
        assert!(coerce_typed(DataType::Set, "tags", r#"{"a":1}"#).is_err());
        assert_eq!(
            coerce_typed(DataType::Map, "attrs", r#"{"a":1}"#).unwrap(),
            json!({"a": 1})
        );
    }

    #[test]
    fn test_null_literal() {
        assert_eq!(coerce_typed(DataType::Integer, "age", "null").unwrap(), JsonValue::Null);
    }

    #[test]
    fn test_untyped() {
        assert_eq!(coerce_untyped("10"), json!(10));
        assert_eq!(coerce_untyped("true"), json!(true));
        assert_eq!(coerce_untyped("abc"), json!("abc"));
        assert_eq!(coerce_untyped("\"quoted\""), json!("\"quoted\""));
    }
}
