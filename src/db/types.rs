//! MySQL type mappings.
//!
//! Converts `MySqlRow` values into JSON maps for the tool layer. Conversion
//! uses a two-phase approach: `TypeCategory` classifies the column type, then
//! a category-specific decoder extracts the value.

use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Column, Decode, Row, Type, TypeInfo};

/// Logical category for MySQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Unknown,
}

/// Classify a MySQL type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric - check first as it overlaps with float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        return TypeCategory::Decimal;
    }

    if lower.contains("int") || lower.contains("serial") || lower.contains("tiny") {
        return TypeCategory::Integer;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    if lower == "json" {
        return TypeCategory::Json;
    }

    if lower.contains("blob") || lower.contains("binary") {
        return TypeCategory::Binary;
    }

    if lower.contains("char") || lower.contains("text") {
        return TypeCategory::Text;
    }

    // Dates, times, enums and everything else decode as text.
    TypeCategory::Unknown
}

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

/// Decode binary data to a JSON value: UTF-8 text when possible, base64
/// otherwise.
pub fn decode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue>;
}

impl RowToJson for MySqlRow {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name);
                let value = decode_column(self, idx, type_name, category);
                (col.name().to_string(), value)
            })
            .collect()
    }
}

fn decode_column(row: &MySqlRow, idx: usize, type_name: &str, category: TypeCategory) -> JsonValue {
    match category {
        TypeCategory::Decimal => decode_decimal(row, idx),
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Boolean => decode_boolean(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Binary => decode_binary_col(row, idx),
        TypeCategory::Json => decode_json(row, idx),
        _ => decode_text(row, idx, type_name),
    }
}

fn decode_decimal(row: &MySqlRow, idx: usize) -> JsonValue {
    match row.try_get::<Option<RawDecimal>, _>(idx) {
        Ok(Some(v)) => JsonValue::String(v.0),
        Ok(None) => JsonValue::Null,
        Err(e) => {
            tracing::error!("Failed to decode DECIMAL: {:?}", e);
            JsonValue::Null
        }
    }
}

fn decode_integer(row: &MySqlRow, idx: usize) -> JsonValue {
    // Check NULL first
    if let Ok(None) = row.try_get::<Option<i64>, _>(idx) {
        return JsonValue::Null;
    }
    // Try signed types
    if let Ok(Some(v)) = row.try_get::<Option<i8>, _>(idx) {
        return JsonValue::Number(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
        return JsonValue::Number(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
        return JsonValue::Number(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
        return JsonValue::Number(v.into());
    }
    // Try unsigned types
    if let Ok(Some(v)) = row.try_get::<Option<u8>, _>(idx) {
        return JsonValue::Number(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<u16>, _>(idx) {
        return JsonValue::Number(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<u32>, _>(idx) {
        return JsonValue::Number(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(idx) {
        return JsonValue::Number(v.into());
    }
    JsonValue::Null
}

fn decode_boolean(row: &MySqlRow, idx: usize) -> JsonValue {
    row.try_get::<Option<bool>, _>(idx)
        .ok()
        .flatten()
        .map(JsonValue::Bool)
        .unwrap_or(JsonValue::Null)
}

fn decode_float(row: &MySqlRow, idx: usize) -> JsonValue {
    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
        return serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string()));
    }
    if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
        return serde_json::Number::from_f64(v as f64)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string()));
    }
    JsonValue::Null
}

fn decode_binary_col(row: &MySqlRow, idx: usize) -> JsonValue {
    row.try_get::<Option<Vec<u8>>, _>(idx)
        .ok()
        .flatten()
        .map(|v| decode_binary_value(&v))
        .unwrap_or(JsonValue::Null)
}

fn decode_json(row: &MySqlRow, idx: usize) -> JsonValue {
    // MySQL JSON type decodes as serde_json::Value directly
    row.try_get::<Option<serde_json::Value>, _>(idx)
        .ok()
        .flatten()
        .unwrap_or(JsonValue::Null)
}

fn decode_text(row: &MySqlRow, idx: usize, type_name: &str) -> JsonValue {
    if let Ok(Some(v)) = row.try_get::<Option<String>, _>(idx) {
        // Check if this might be JSON
        if type_name.to_lowercase().contains("json") {
            if let Ok(json) = serde_json::from_str::<JsonValue>(&v) {
                return json;
            }
        }
        return JsonValue::String(v);
    }
    // DATETIME/TIMESTAMP/DATE/TIME columns decode via chrono
    if let Ok(Some(v)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return JsonValue::String(v.to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return JsonValue::String(v.to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<chrono::NaiveTime>, _>(idx) {
        return JsonValue::String(v.to_string());
    }
    JsonValue::Null
}
