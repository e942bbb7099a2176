//! Conversion of caller data into the platform's write format.
//!
//! The platform wants every written field wrapped in a one-key envelope,
//! `{"value": V}`, with the encoding of `V` depending on the field's
//! declared type. Three write intents exist per field:
//!
//! - key absent from the wire record → the remote keeps the current value
//! - `{"value": null}` → the remote clears the field
//! - `{"value": v}` → the remote sets the field to `v`
//!
//! [`convert_record`] walks a form's declared fields (never the caller's
//! keys, so unknown keys are dropped), applies the per-type converter and
//! collects per-field failures instead of propagating them: one malformed
//! field must not abort the rest of the record.

use crate::field::{FieldDescriptor, FieldType};
use crate::value::{Address, Attachment, DeptRef, Location, PhoneValue, UserRef};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::warn;

/// Errors produced while converting a single field value.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The field type requires a JSON array.
    #[error("expected an array value, got {0}")]
    ExpectedArray(&'static str),

    /// Numeric text that does not parse as a decimal.
    #[error("invalid number: {0:?}")]
    InvalidNumber(String),

    /// Datetime input that is neither an ISO-8601 instant nor a 10/13-digit
    /// epoch timestamp.
    #[error("invalid datetime: {0}")]
    InvalidDatetime(String),

    /// A structured value that does not match the shape its field requires.
    #[error("malformed {kind} value: {detail}")]
    Malformed {
        kind: &'static str,
        detail: String,
    },
}

pub type ConversionResult<T> = Result<T, ConversionError>;

/// Outcome of converting one field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Converted {
    /// Write `{"value": v}`.
    Set(Value),
    /// Write the clear envelope so the remote erases the field.
    Clear,
    /// Emit nothing; the remote keeps the field's current value.
    Keep,
}

/// Converter function for one field type.
pub type Convert = fn(&Value, &FieldDescriptor) -> ConversionResult<Converted>;

/// Looks up the converter for a field type.
///
/// Read-only types (serial, lookup, aggregation, link data, signature)
/// have no converter; the record converter leaves such fields untouched.
pub fn converter_for(field_type: FieldType) -> Option<Convert> {
    match field_type {
        FieldType::Text | FieldType::Textarea | FieldType::Radio | FieldType::Combo => {
            Some(convert_text)
        }
        FieldType::Number => Some(convert_number),
        FieldType::Datetime => Some(convert_datetime),
        FieldType::CheckboxGroup | FieldType::ComboCheck => Some(convert_string_array),
        FieldType::Address => Some(convert_address),
        FieldType::Location => Some(convert_location),
        FieldType::Image | FieldType::Upload => Some(convert_attachments),
        FieldType::Subform => Some(convert_subform),
        FieldType::User => Some(convert_user),
        FieldType::UserGroup => Some(convert_user_group),
        FieldType::Dept => Some(convert_dept),
        FieldType::DeptGroup => Some(convert_dept_group),
        FieldType::Phone => Some(convert_phone),
        FieldType::Serial
        | FieldType::LinkData
        | FieldType::Signature
        | FieldType::Lookup
        | FieldType::Aggregation => None,
    }
}

/// Converts one raw value for the given field.
///
/// A JSON null always clears, regardless of field type. Fields without a
/// converter are kept untouched.
pub fn convert_value(raw: &Value, field: &FieldDescriptor) -> ConversionResult<Converted> {
    if raw.is_null() {
        return Ok(Converted::Clear);
    }
    match converter_for(field.field_type) {
        Some(convert) => convert(raw, field),
        None => Ok(Converted::Keep),
    }
}

/// The envelope written for a set field.
pub fn envelope(value: Value) -> Value {
    json!({ "value": value })
}

/// The envelope that clears a field on the remote side.
pub fn clear_envelope() -> Value {
    json!({ "value": null })
}

/// A field that was skipped because its value failed conversion.
#[derive(Debug)]
pub struct SkippedField {
    pub field: String,
    pub error: ConversionError,
}

/// Result of converting a full record.
#[derive(Debug, Default)]
pub struct Conversion {
    /// The wire record, keyed by field name, values wrapped in envelopes.
    pub record: Map<String, Value>,
    /// Fields dropped because conversion failed, with the reason.
    pub skipped: Vec<SkippedField>,
}

impl Conversion {
    pub fn into_value(self) -> Value {
        Value::Object(self.record)
    }
}

/// Converts a caller record into the wire format for the given form fields.
///
/// Iterates the declared fields, not the caller's keys: keys the form does
/// not declare never reach the wire. A field absent from `raw` is emitted
/// as nothing (the remote keeps its value); a field whose conversion fails
/// is skipped and reported in [`Conversion::skipped`].
pub fn convert_record(raw: &Map<String, Value>, fields: &[FieldDescriptor]) -> Conversion {
    let mut out = Conversion::default();
    for field in fields {
        let Some(value) = raw.get(&field.name) else {
            continue;
        };
        match convert_value(value, field) {
            Ok(Converted::Set(v)) => {
                out.record.insert(field.name.clone(), envelope(v));
            }
            Ok(Converted::Clear) => {
                out.record.insert(field.name.clone(), clear_envelope());
            }
            Ok(Converted::Keep) => {}
            Err(error) => {
                warn!(field = %field.name, %error, "skipping field that failed conversion");
                out.skipped.push(SkippedField {
                    field: field.name.clone(),
                    error,
                });
            }
        }
    }
    out
}

/// Removes clear envelopes from a wire record.
///
/// Used by updates in ignore-null mode: fields the caller set to null (or
/// that converted to a clear) are dropped so the remote keeps their values.
pub fn drop_clear_envelopes(record: &mut Map<String, Value>) {
    let clear = clear_envelope();
    record.retain(|_, v| *v != clear && *v != Value::Object(Map::new()));
}

/// Natural text rendering of a scalar; non-strings become compact JSON.
fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn convert_text(raw: &Value, _field: &FieldDescriptor) -> ConversionResult<Converted> {
    Ok(Converted::Set(Value::String(coerce_text(raw))))
}

fn convert_number(raw: &Value, _field: &FieldDescriptor) -> ConversionResult<Converted> {
    match raw {
        Value::Number(n) => Ok(Converted::Set(Value::Number(n.clone()))),
        Value::String(s) => {
            let trimmed = s.trim();
            // The remote treats an empty numeric field as cleared.
            if trimmed.is_empty() {
                return Ok(Converted::Clear);
            }
            if let Ok(int) = trimmed.parse::<i64>() {
                return Ok(Converted::Set(Value::Number(int.into())));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(|n| Converted::Set(Value::Number(n)))
                .ok_or_else(|| ConversionError::InvalidNumber(s.clone()))
        }
        other => Err(ConversionError::InvalidNumber(other.to_string())),
    }
}

fn format_instant(instant: DateTime<Utc>) -> Value {
    Value::String(instant.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn convert_datetime(raw: &Value, _field: &FieldDescriptor) -> ConversionResult<Converted> {
    match raw {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Converted::Set(format_instant(dt.with_timezone(&Utc))))
            .map_err(|e| ConversionError::InvalidDatetime(format!("{s:?}: {e}"))),
        Value::Number(n) => {
            let Some(ts) = n.as_i64() else {
                return Err(ConversionError::InvalidDatetime(n.to_string()));
            };
            // Digit count decides the unit: 10 → seconds, 13 → milliseconds.
            let instant = match ts.unsigned_abs().to_string().len() {
                10 => DateTime::from_timestamp(ts, 0),
                13 => DateTime::from_timestamp_millis(ts),
                _ => None,
            };
            instant
                .map(|dt| Converted::Set(format_instant(dt)))
                .ok_or_else(|| ConversionError::InvalidDatetime(ts.to_string()))
        }
        other => Err(ConversionError::InvalidDatetime(other.to_string())),
    }
}

fn convert_string_array(raw: &Value, _field: &FieldDescriptor) -> ConversionResult<Converted> {
    let Value::Array(items) = raw else {
        return Err(ConversionError::ExpectedArray("choice group"));
    };
    let strings = items
        .iter()
        .map(|v| Value::String(coerce_text(v)))
        .collect();
    Ok(Converted::Set(Value::Array(strings)))
}

fn convert_address(raw: &Value, _field: &FieldDescriptor) -> ConversionResult<Converted> {
    // Validate the shape, then pass the caller's value through unchanged.
    serde_json::from_value::<Address>(raw.clone()).map_err(|e| ConversionError::Malformed {
        kind: "address",
        detail: e.to_string(),
    })?;
    Ok(Converted::Set(raw.clone()))
}

fn convert_location(raw: &Value, _field: &FieldDescriptor) -> ConversionResult<Converted> {
    serde_json::from_value::<Location>(raw.clone()).map_err(|e| ConversionError::Malformed {
        kind: "location",
        detail: e.to_string(),
    })?;
    Ok(Converted::Set(raw.clone()))
}

fn convert_attachments(raw: &Value, _field: &FieldDescriptor) -> ConversionResult<Converted> {
    let attachments: Vec<Attachment> =
        serde_json::from_value(raw.clone()).map_err(|e| ConversionError::Malformed {
            kind: "attachment list",
            detail: e.to_string(),
        })?;

    let mut keys = BTreeSet::new();
    let mut has_blank_key = false;
    for attachment in &attachments {
        match attachment.key.as_deref() {
            Some(key) if !key.trim().is_empty() => {
                keys.insert(key.to_string());
            }
            Some(_) => has_blank_key = true,
            None => {}
        }
    }

    if !keys.is_empty() {
        Ok(Converted::Set(Value::Array(
            keys.into_iter().map(Value::String).collect(),
        )))
    } else if has_blank_key {
        // The explicit blank key is the caller's opt-in to erase existing
        // attachments.
        Ok(Converted::Clear)
    } else {
        // No keys at all must NOT erase what is already attached remotely;
        // partial updates routinely echo back key-less read results.
        Ok(Converted::Keep)
    }
}

fn convert_user(raw: &Value, _field: &FieldDescriptor) -> ConversionResult<Converted> {
    let user: UserRef = serde_json::from_value(raw.clone()).map_err(|e| ConversionError::Malformed {
        kind: "user",
        detail: e.to_string(),
    })?;
    match user.username.filter(|u| !u.trim().is_empty()) {
        Some(username) => Ok(Converted::Set(Value::String(username))),
        None => Ok(Converted::Clear),
    }
}

fn convert_user_group(raw: &Value, _field: &FieldDescriptor) -> ConversionResult<Converted> {
    if !raw.is_array() {
        return Err(ConversionError::ExpectedArray("user group"));
    }
    let users: Vec<UserRef> =
        serde_json::from_value(raw.clone()).map_err(|e| ConversionError::Malformed {
            kind: "user group",
            detail: e.to_string(),
        })?;
    let usernames: BTreeSet<String> = users
        .into_iter()
        .filter_map(|u| u.username)
        .filter(|u| !u.trim().is_empty())
        .collect();
    Ok(Converted::Set(Value::Array(
        usernames.into_iter().map(Value::String).collect(),
    )))
}

fn convert_dept(raw: &Value, _field: &FieldDescriptor) -> ConversionResult<Converted> {
    let dept: DeptRef = serde_json::from_value(raw.clone()).map_err(|e| ConversionError::Malformed {
        kind: "department",
        detail: e.to_string(),
    })?;
    match dept.dept_no {
        Some(no) => Ok(Converted::Set(Value::Number(no.into()))),
        None => Ok(Converted::Clear),
    }
}

fn convert_dept_group(raw: &Value, _field: &FieldDescriptor) -> ConversionResult<Converted> {
    if !raw.is_array() {
        return Err(ConversionError::ExpectedArray("department group"));
    }
    let depts: Vec<DeptRef> =
        serde_json::from_value(raw.clone()).map_err(|e| ConversionError::Malformed {
            kind: "department group",
            detail: e.to_string(),
        })?;
    let numbers: BTreeSet<i64> = depts.into_iter().filter_map(|d| d.dept_no).collect();
    Ok(Converted::Set(Value::Array(
        numbers.into_iter().map(|n| Value::Number(n.into())).collect(),
    )))
}

fn convert_phone(raw: &Value, _field: &FieldDescriptor) -> ConversionResult<Converted> {
    let phone: PhoneValue =
        serde_json::from_value(raw.clone()).map_err(|e| ConversionError::Malformed {
            kind: "phone",
            detail: e.to_string(),
        })?;
    match phone.phone.filter(|p| !p.trim().is_empty()) {
        Some(number) => Ok(Converted::Set(Value::String(number))),
        None => Ok(Converted::Clear),
    }
}

fn convert_subform(raw: &Value, field: &FieldDescriptor) -> ConversionResult<Converted> {
    let Value::Array(rows) = raw else {
        return Err(ConversionError::ExpectedArray("subform"));
    };
    if field.items.is_empty() {
        return Ok(Converted::Set(Value::Array(Vec::new())));
    }

    let mut converted_rows = Vec::with_capacity(rows.len());
    for row in rows {
        let Value::Object(row) = row else {
            return Err(ConversionError::Malformed {
                kind: "subform row",
                detail: format!("expected an object, got {row}"),
            });
        };
        converted_rows.push(Value::Object(convert_subform_row(row, &field.items)?));
    }
    Ok(Converted::Set(Value::Array(converted_rows)))
}

/// Converts one subform row strictly: any field failure fails the row, and
/// with it the whole subform field, which the record converter then skips.
fn convert_subform_row(
    row: &Map<String, Value>,
    items: &[FieldDescriptor],
) -> ConversionResult<Map<String, Value>> {
    let mut out = Map::new();

    // Rows carrying a `_id` are matched in place by the remote; rows
    // without one are inserted as new.
    if let Some(id) = row.get("_id") {
        out.insert("_id".to_string(), envelope(Value::String(coerce_text(id))));
    }

    for field in items {
        let Some(value) = row.get(&field.name) else {
            continue;
        };
        match convert_value(value, field)? {
            Converted::Set(v) => {
                out.insert(field.name.clone(), envelope(v));
            }
            Converted::Clear => {
                out.insert(field.name.clone(), clear_envelope());
            }
            Converted::Keep => {}
        }
    }
    Ok(out)
}
