//! Structured value types carried inside data rows.
//!
//! These mirror the JSON shapes the platform uses for the non-scalar field
//! types (address, location, attachments, members, departments, phone) plus
//! the per-row system metadata.

use serde::{Deserialize, Serialize};

/// Value of an address field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Value of a location field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lng: f64,
    pub lat: f64,
}

/// One attachment entry of an image or upload field.
///
/// On reads every entry carries the download `url`; on writes only `key`
/// matters (it is the handle returned by the file-upload endpoint).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl Attachment {
    /// An entry carrying only an upload key, as produced by the upload flow.
    pub fn from_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }
}

/// A platform member, as stored in user fields and row metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A department, addressed by its number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeptRef {
    #[serde(rename = "deptNo", alias = "dept_no", default, skip_serializing_if = "Option::is_none")]
    pub dept_no: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Value of a phone field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhoneValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

/// System metadata present on every data row returned by the platform.
///
/// Deserialize a row into this to get at the identifiers without caring
/// about the business fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordMeta {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub data_id: Option<String>,
    #[serde(rename = "appId", default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(rename = "entryId", default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    #[serde(rename = "createTime", default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(rename = "updateTime", default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updater: Option<UserRef>,
    /// 1 when the row is in an active approval flow.
    #[serde(rename = "flowState", default, skip_serializing_if = "Option::is_none")]
    pub flow_state: Option<i32>,
}
