//! Form field schema types.
//!
//! A form on the platform is described by a list of [`FieldDescriptor`]s
//! fetched from the field-listing endpoint. Subform fields nest their own
//! descriptor list under `items`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The declared type of a form field.
///
/// This is a closed set: the write path only converts the types it knows,
/// and the read-only types (lookup, aggregation, signature, serial, link
/// data) are never written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "textarea")]
    Textarea,
    /// Serial number, generated by the platform.
    #[serde(rename = "sn")]
    Serial,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "datetime")]
    Datetime,
    #[serde(rename = "radiogroup")]
    Radio,
    #[serde(rename = "checkboxgroup")]
    CheckboxGroup,
    #[serde(rename = "combo")]
    Combo,
    #[serde(rename = "combocheck")]
    ComboCheck,
    #[serde(rename = "address")]
    Address,
    #[serde(rename = "location")]
    Location,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "upload")]
    Upload,
    #[serde(rename = "subform")]
    Subform,
    /// Reference to a row of another form.
    #[serde(rename = "linkdata")]
    LinkData,
    #[serde(rename = "signature")]
    Signature,
    #[serde(rename = "user")]
    User,
    #[serde(rename = "usergroup")]
    UserGroup,
    #[serde(rename = "dept")]
    Dept,
    #[serde(rename = "deptgroup")]
    DeptGroup,
    #[serde(rename = "phone")]
    Phone,
    /// Mirrors a field of a linked row; read-only.
    #[serde(rename = "lookup")]
    Lookup,
    /// Computed over linked rows; read-only.
    #[serde(rename = "aggregation")]
    Aggregation,
}

impl FieldType {
    /// The tag used for this type on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Serial => "sn",
            FieldType::Number => "number",
            FieldType::Datetime => "datetime",
            FieldType::Radio => "radiogroup",
            FieldType::CheckboxGroup => "checkboxgroup",
            FieldType::Combo => "combo",
            FieldType::ComboCheck => "combocheck",
            FieldType::Address => "address",
            FieldType::Location => "location",
            FieldType::Image => "image",
            FieldType::Upload => "upload",
            FieldType::Subform => "subform",
            FieldType::LinkData => "linkdata",
            FieldType::Signature => "signature",
            FieldType::User => "user",
            FieldType::UserGroup => "usergroup",
            FieldType::Dept => "dept",
            FieldType::DeptGroup => "deptgroup",
            FieldType::Phone => "phone",
            FieldType::Lookup => "lookup",
            FieldType::Aggregation => "aggregation",
        }
    }
}

/// Schema metadata for one form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Human-readable label shown in the form designer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// The field name used as the key in data rows (e.g. `_widget_16153...`).
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Nested descriptors; only populated when `field_type` is `Subform`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<FieldDescriptor>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            label: None,
            name: name.into(),
            field_type,
            items: Vec::new(),
        }
    }

    /// Builds a subform descriptor with its nested fields.
    pub fn subform(name: impl Into<String>, items: Vec<FieldDescriptor>) -> Self {
        Self {
            label: None,
            name: name.into(),
            field_type: FieldType::Subform,
            items,
        }
    }
}

/// Indexes descriptors by field name, dropping entries with a blank name.
pub fn descriptor_map(fields: &[FieldDescriptor]) -> HashMap<&str, &FieldDescriptor> {
    fields
        .iter()
        .filter(|f| !f.name.trim().is_empty())
        .map(|f| (f.name.as_str(), f))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_wire_tags_round_trip() {
        for ty in [
            FieldType::Text,
            FieldType::Serial,
            FieldType::Radio,
            FieldType::CheckboxGroup,
            FieldType::ComboCheck,
            FieldType::DeptGroup,
            FieldType::Aggregation,
        ] {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
            let back: FieldType = serde_json::from_str(&json).unwrap();
            assert_eq!(back, ty);
        }
    }

    #[test]
    fn descriptor_deserializes_from_wire_shape() {
        let json = r#"{
            "label": "订单明细",
            "name": "_widget_1729599225116",
            "type": "subform",
            "items": [{"name": "_widget_1729599225144", "type": "text"}]
        }"#;
        let field: FieldDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(field.field_type, FieldType::Subform);
        assert_eq!(field.items.len(), 1);
        assert_eq!(field.items[0].field_type, FieldType::Text);
    }

    #[test]
    fn descriptor_map_skips_blank_names() {
        let fields = vec![
            FieldDescriptor::new("a", FieldType::Text),
            FieldDescriptor::new("  ", FieldType::Number),
        ];
        let map = descriptor_map(&fields);
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("a"));
    }
}
