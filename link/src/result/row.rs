use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use uuid::Uuid;

use super::metadata::{ColumnMetadata, Columns};
use crate::error::{LinkError, Result};
use crate::models::Accessor;

/// One decoded entity.
///
/// Values are kept as received; each typed accessor checks the column's
/// declared type and converts on demand. A `null` value reads as `Ok(None)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Map<String, JsonValue>,
    columns: Arc<Columns>,
}

impl Row {
    pub(crate) fn new(values: Map<String, JsonValue>, columns: Arc<Columns>) -> Self {
        Self { values, columns }
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.names()
    }

    /// Raw value of a column, without type checks
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_null(&self, name: &str) -> bool {
        self.values.get(name).map_or(true, JsonValue::is_null)
    }

    pub fn get_bool(&self, name: &str) -> Result<Option<bool>> {
        let Some((column, value)) = self.checked(name, Accessor::Bool)? else {
            return Ok(None);
        };
        match value {
            JsonValue::Bool(b) => Ok(Some(*b)),
            JsonValue::String(s) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
            JsonValue::String(s) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
            _ => Err(mismatch(column, Accessor::Bool)),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<Option<i32>> {
        let Some((column, value)) = self.checked(name, Accessor::Int)? else {
            return Ok(None);
        };
        let wide = integral(column, value, Accessor::Int)?;
        i32::try_from(wide)
            .map(Some)
            .map_err(|_| overflow(column, value, "a 32-bit integer"))
    }

    pub fn get_long(&self, name: &str) -> Result<Option<i64>> {
        let Some((column, value)) = self.checked(name, Accessor::Long)? else {
            return Ok(None);
        };
        integral(column, value, Accessor::Long).map(Some)
    }

    pub fn get_double(&self, name: &str) -> Result<Option<f64>> {
        let Some((column, value)) = self.checked(name, Accessor::Double)? else {
            return Ok(None);
        };
        let number = match value {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match number {
            Some(n) if n.is_finite() => Ok(Some(n)),
            Some(_) => Err(overflow(column, value, "a 64-bit float")),
            None => Err(mismatch(column, Accessor::Double)),
        }
    }

    pub fn get_string(&self, name: &str) -> Result<Option<String>> {
        let Some((column, value)) = self.checked(name, Accessor::String)? else {
            return Ok(None);
        };
        match value {
            JsonValue::String(s) => Ok(Some(s.clone())),
            _ => Err(mismatch(column, Accessor::String)),
        }
    }

    /// TIMESTAMP columns arrive as RFC 3339 text or epoch milliseconds.
    pub fn get_timestamp(&self, name: &str) -> Result<Option<DateTime<Utc>>> {
        let Some((column, value)) = self.checked(name, Accessor::Timestamp)? else {
            return Ok(None);
        };
        let parsed = match value {
            JsonValue::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            JsonValue::Number(n) => n
                .as_i64()
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| mismatch(column, Accessor::Timestamp))
    }

    pub fn get_date(&self, name: &str) -> Result<Option<NaiveDate>> {
        let Some((column, value)) = self.checked(name, Accessor::Date)? else {
            return Ok(None);
        };
        value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
            .map(Some)
            .ok_or_else(|| mismatch(column, Accessor::Date))
    }

    pub fn get_time(&self, name: &str) -> Result<Option<NaiveTime>> {
        let Some((column, value)) = self.checked(name, Accessor::Time)? else {
            return Ok(None);
        };
        value
            .as_str()
            .and_then(|s| {
                NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
                    .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M"))
                    .ok()
            })
            .map(Some)
            .ok_or_else(|| mismatch(column, Accessor::Time))
    }

    pub fn get_uuid(&self, name: &str) -> Result<Option<Uuid>> {
        let Some((column, value)) = self.checked(name, Accessor::Uuid)? else {
            return Ok(None);
        };
        value
            .as_str()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .map(Some)
            .ok_or_else(|| mismatch(column, Accessor::Uuid))
    }

    /// Primary key mapping of the related entity. A bare id reads as
    /// `{"eid": <id>}`.
    pub fn get_relation(&self, name: &str) -> Result<Option<Map<String, JsonValue>>> {
        let Some((column, value)) = self.checked(name, Accessor::Relation)? else {
            return Ok(None);
        };
        match value {
            JsonValue::Object(key) => Ok(Some(key.clone())),
            JsonValue::String(id) => {
                let mut key = Map::new();
                key.insert("eid".to_string(), JsonValue::String(id.clone()));
                Ok(Some(key))
            }
            _ => Err(mismatch(column, Accessor::Relation)),
        }
    }

    /// BINARY columns are base64 on the wire.
    pub fn get_bytes(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let Some((column, value)) = self.checked(name, Accessor::Bytes)? else {
            return Ok(None);
        };
        value
            .as_str()
            .and_then(|s| general_purpose::STANDARD.decode(s.trim()).ok())
            .map(Some)
            .ok_or_else(|| mismatch(column, Accessor::Bytes))
    }

    pub fn get_set(&self, name: &str) -> Result<Option<Vec<JsonValue>>> {
        self.array(name, Accessor::Set)
    }

    pub fn get_list(&self, name: &str) -> Result<Option<Vec<JsonValue>>> {
        self.array(name, Accessor::List)
    }

    pub fn get_tuple(&self, name: &str) -> Result<Option<Vec<JsonValue>>> {
        self.array(name, Accessor::Tuple)
    }

    pub fn get_map(&self, name: &str) -> Result<Option<Map<String, JsonValue>>> {
        let Some((column, value)) = self.checked(name, Accessor::Map)? else {
            return Ok(None);
        };
        match value {
            JsonValue::Object(map) => Ok(Some(map.clone())),
            _ => Err(mismatch(column, Accessor::Map)),
        }
    }

    /// Entities inlined into an expand column. A single object reads as a
    /// one-element list.
    pub fn get_expanded(&self, name: &str) -> Result<Option<Vec<Map<String, JsonValue>>>> {
        let Some((column, value)) = self.checked(name, Accessor::Expanded)? else {
            return Ok(None);
        };
        match value {
            JsonValue::Object(entity) => Ok(Some(vec![entity.clone()])),
            JsonValue::Array(items) => items
                .iter()
                .map(|item| match item {
                    JsonValue::Object(entity) => Ok(entity.clone()),
                    _ => Err(mismatch(column, Accessor::Expanded)),
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            _ => Err(mismatch(column, Accessor::Expanded)),
        }
    }

    /// Settable schema columns with a value, ready to feed into
    /// `with_params` of a save statement.
    pub fn as_params(&self) -> IndexMap<String, JsonValue> {
        self.columns
            .iter()
            .filter(|c| c.is_settable())
            .filter_map(|c| {
                self.values
                    .get(c.name())
                    .filter(|v| !v.is_null())
                    .map(|v| (c.name().to_string(), v.clone()))
            })
            .collect()
    }

    /// All raw values
    pub fn values(&self) -> &Map<String, JsonValue> {
        &self.values
    }

    fn array(&self, name: &str, accessor: Accessor) -> Result<Option<Vec<JsonValue>>> {
        let Some((column, value)) = self.checked(name, accessor)? else {
            return Ok(None);
        };
        match value {
            JsonValue::Array(items) => Ok(Some(items.clone())),
            _ => Err(mismatch(column, accessor)),
        }
    }

    /// Column lookup plus declared-type check. `None` for a null or absent value.
    fn checked(
        &self,
        name: &str,
        accessor: Accessor,
    ) -> Result<Option<(&ColumnMetadata, &JsonValue)>> {
        let column = self
            .columns
            .get(name)
            .ok_or_else(|| LinkError::UnknownColumn(name.to_string()))?;
        if !column.data_type().supports(accessor) {
            return Err(mismatch(column, accessor));
        }
        Ok(self
            .values
            .get(name)
            .filter(|v| !v.is_null())
            .map(|v| (column, v)))
    }
}

fn mismatch(column: &ColumnMetadata, accessor: Accessor) -> LinkError {
    LinkError::DataTypeMismatch {
        column: column.name().to_string(),
        declared: column.data_type().to_string(),
        requested: accessor.to_string(),
    }
}

fn overflow(column: &ColumnMetadata, value: &JsonValue, target: &'static str) -> LinkError {
    LinkError::NumericOverflow {
        column: column.name().to_string(),
        value: value.to_string(),
        target,
    }
}

/// Lossless integer read. Accepts JSON integers, integral floats (`30.0`)
/// and numeric strings; values past `i64` overflow, fractions mismatch.
fn integral(column: &ColumnMetadata, value: &JsonValue, accessor: Accessor) -> Result<i64> {
    let from_float = |f: f64| -> Result<i64> {
        if !f.is_finite() || f.fract() != 0.0 {
            return Err(mismatch(column, accessor));
        }
        if f < i64::MIN as f64 || f >= i64::MAX as f64 {
            return Err(overflow(column, value, "a 64-bit integer"));
        }
        Ok(f as i64)
    };
    match value {
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if n.is_u64() {
                Err(overflow(column, value, "a 64-bit integer"))
            } else {
                n.as_f64()
                    .ok_or_else(|| mismatch(column, accessor))
                    .and_then(from_float)
            }
        }
        JsonValue::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(i);
            }
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit() || b == b'-' || b == b'+') {
                return Err(overflow(column, value, "a 64-bit integer"));
            }
            s.parse::<f64>()
                .map_err(|_| mismatch(column, accessor))
                .and_then(from_float)
        }
        _ => Err(mismatch(column, accessor)),
    }
}
