//! Data-row operations: get, list, create, update, delete.
//!
//! Writes run caller records through the typed-field converter against the
//! form's (cached) schema, so the wire only ever carries declared fields in
//! the platform's envelope format. Reads return raw `serde_json::Value`
//! rows plus `_as` variants that deserialize into caller types.
//!
//! Listing drives the cursor protocol: rows come back in ascending `_id`
//! order, and each page resumes after the previous page's last row. The
//! cursor is always taken from the received rows themselves; a
//! client-side offset would double-count or skip under concurrent writes.

use crate::client::{decode_field, Tenant};
use crate::endpoint::Endpoint;
use crate::error::{ClientError, ClientResult};
use jdy_types::{
    convert_record, descriptor_map, drop_clear_envelopes, Condition, FieldDescriptor, FieldType,
    Filter,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// The remote's hard cap on rows per page and on batch chunk sizes.
const MAX_PAGE: u32 = 100;
/// The remote rejects set conditions with more operands than this.
const MAX_OPERANDS: usize = 200;

/// Error type page callbacks may return; a failing callback excludes that
/// page's rows but never aborts the remaining pages.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A query against one form's rows.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub app_id: String,
    pub entry_id: String,
    /// Field projection; empty means all fields.
    pub fields: Vec<String>,
    pub filter: Filter,
    /// Total row budget; `None` fetches until the remote is exhausted.
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn new(app_id: impl Into<String>, entry_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            entry_id: entry_id.into(),
            fields: Vec::new(),
            filter: Filter::default(),
            limit: None,
        }
    }

    /// Restricts the returned fields.
    pub fn select<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Caps the total number of rows fetched across all pages.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Create one row.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub app_id: String,
    pub entry_id: String,
    /// Raw caller record; converted against the form schema before sending.
    pub data: Value,
    /// Username recorded as the row's creator.
    pub data_creator: Option<String>,
    pub start_workflow: bool,
    pub start_trigger: bool,
    /// Groups this write with previously uploaded files.
    pub transaction_id: Option<String>,
}

impl CreateRequest {
    pub fn new(app_id: impl Into<String>, entry_id: impl Into<String>, data: Value) -> Self {
        Self {
            app_id: app_id.into(),
            entry_id: entry_id.into(),
            data,
            data_creator: None,
            start_workflow: true,
            start_trigger: true,
            transaction_id: None,
        }
    }

    pub fn transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn data_creator(mut self, username: impl Into<String>) -> Self {
        self.data_creator = Some(username.into());
        self
    }
}

/// Create up to thousands of rows; chunked into batches of 100 on the wire.
#[derive(Debug, Clone)]
pub struct CreateBatchRequest {
    pub app_id: String,
    pub entry_id: String,
    pub rows: Vec<Value>,
    pub start_workflow: bool,
    pub transaction_id: Option<String>,
}

impl CreateBatchRequest {
    pub fn new(
        app_id: impl Into<String>,
        entry_id: impl Into<String>,
        rows: Vec<Value>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            entry_id: entry_id.into(),
            rows,
            start_workflow: true,
            transaction_id: None,
        }
    }
}

/// Update one row.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub app_id: String,
    pub entry_id: String,
    pub data_id: String,
    pub data: Value,
    /// When set, fields the caller left null keep their remote values
    /// instead of being cleared.
    pub ignore_null: bool,
    pub transaction_id: Option<String>,
}

impl UpdateRequest {
    pub fn new(
        app_id: impl Into<String>,
        entry_id: impl Into<String>,
        data_id: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            entry_id: entry_id.into(),
            data_id: data_id.into(),
            data,
            ignore_null: false,
            transaction_id: None,
        }
    }

    pub fn ignore_null(mut self) -> Self {
        self.ignore_null = true;
        self
    }
}

/// Apply the same field changes to many rows.
#[derive(Debug, Clone)]
pub struct UpdateBatchRequest {
    pub app_id: String,
    pub entry_id: String,
    pub data_ids: Vec<String>,
    pub data: Value,
    pub ignore_null: bool,
}

impl UpdateBatchRequest {
    pub fn new(
        app_id: impl Into<String>,
        entry_id: impl Into<String>,
        data_ids: Vec<String>,
        data: Value,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            entry_id: entry_id.into(),
            data_ids,
            data,
            ignore_null: false,
        }
    }
}

// ── wire request bodies ─────────────────────────────────────────

#[derive(Serialize)]
struct GetBody<'a> {
    app_id: &'a str,
    entry_id: &'a str,
    data_id: &'a str,
}

#[derive(Serialize)]
struct ListBody<'a> {
    app_id: &'a str,
    entry_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [String]>,
    filter: &'a Filter,
    limit: u32,
}

#[derive(Serialize)]
struct CreateBody<'a> {
    app_id: &'a str,
    entry_id: &'a str,
    data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_creator: Option<&'a str>,
    is_start_workflow: bool,
    is_start_trigger: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction_id: Option<&'a str>,
}

#[derive(Serialize)]
struct CreateBatchBody<'a> {
    app_id: &'a str,
    entry_id: &'a str,
    data_list: &'a [Value],
    is_start_workflow: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction_id: Option<&'a str>,
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    app_id: &'a str,
    entry_id: &'a str,
    data_id: &'a str,
    data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction_id: Option<&'a str>,
}

#[derive(Serialize)]
struct UpdateBatchBody<'a> {
    app_id: &'a str,
    entry_id: &'a str,
    data_ids: &'a [String],
    data: &'a Value,
}

#[derive(Serialize)]
struct DeleteBody<'a> {
    app_id: &'a str,
    entry_id: &'a str,
    data_id: &'a str,
}

#[derive(Serialize)]
struct DeleteBatchBody<'a> {
    app_id: &'a str,
    entry_id: &'a str,
    data_ids: &'a [String],
}

impl Tenant {
    /// Fetches a single row; `Ok(None)` when the row does not exist.
    pub async fn get_data(
        &self,
        app_id: &str,
        entry_id: &str,
        data_id: &str,
    ) -> ClientResult<Option<Value>> {
        let body = GetBody {
            app_id,
            entry_id,
            data_id,
        };
        let response = self.call(Endpoint::DataGet, &body).await?;
        match response.get("data") {
            None | Some(Value::Null) => Ok(None),
            Some(row) => Ok(Some(row.clone())),
        }
    }

    /// [`Tenant::get_data`], deserialized into a caller type.
    pub async fn get_data_as<T: DeserializeOwned>(
        &self,
        app_id: &str,
        entry_id: &str,
        data_id: &str,
    ) -> ClientResult<Option<T>> {
        match self.get_data(app_id, entry_id, data_id).await? {
            None => Ok(None),
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
        }
    }

    /// Fetches every row matching the query, in ascending `_id` order.
    pub async fn list_data(&self, query: &ListQuery) -> ClientResult<Vec<Value>> {
        self.list_data_with(query, |_| Ok(true)).await
    }

    /// [`Tenant::list_data`], deserialized into caller types.
    pub async fn list_data_as<T: DeserializeOwned>(
        &self,
        query: &ListQuery,
    ) -> ClientResult<Vec<T>> {
        self.list_data(query)
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(Into::into))
            .collect()
    }

    /// Fetches rows page by page, letting `on_page` inspect each page as it
    /// arrives. Returning `Ok(false)` drops that page's rows from the
    /// result; returning `Err` drops them too, but the listing continues:
    /// a misbehaving callback must not block the remaining pages.
    pub async fn list_data_with<F>(
        &self,
        query: &ListQuery,
        mut on_page: F,
    ) -> ClientResult<Vec<Value>>
    where
        F: FnMut(&[Value]) -> Result<bool, CallbackError>,
    {
        // Condition types depend on the form schema and cannot change
        // mid-query, so resolve them once before the first page.
        let filter = if query.filter.is_empty() {
            query.filter.clone()
        } else {
            let fields = self.form_fields(&query.app_id, &query.entry_id).await?;
            resolve_filter(&query.filter, &descriptor_map(&fields))?
        };

        let mut rows: Vec<Value> = Vec::new();
        let mut remaining = query.limit.map(u64::from);
        let mut cursor: Option<String> = None;

        loop {
            let page_size = match remaining {
                Some(0) => break,
                Some(r) => r.min(u64::from(MAX_PAGE)) as u32,
                None => MAX_PAGE,
            };

            let body = ListBody {
                app_id: &query.app_id,
                entry_id: &query.entry_id,
                data_id: cursor.as_deref(),
                fields: (!query.fields.is_empty()).then_some(query.fields.as_slice()),
                filter: &filter,
                limit: page_size,
            };
            let response = self.call(Endpoint::DataList, &body).await?;
            let page: Vec<Value> = decode_field(&response, "data")?;
            let returned = page.len() as u32;

            // The sort guarantee makes the last row's id a safe resume
            // point; without one there is nothing to resume from.
            let next_cursor = page
                .last()
                .and_then(|row| row.get("_id"))
                .and_then(Value::as_str)
                .map(str::to_string);

            match on_page(&page) {
                Ok(true) => rows.extend(page),
                Ok(false) => {}
                Err(error) => {
                    warn!(%error, "page callback failed; excluding page from results");
                }
            }

            remaining = remaining.map(|r| r.saturating_sub(u64::from(returned)));
            if returned < page_size || returned == 0 || next_cursor.is_none() {
                break;
            }
            cursor = next_cursor;
        }

        Ok(rows)
    }

    /// Creates one row and returns it as stored by the platform.
    pub async fn create_data(&self, request: CreateRequest) -> ClientResult<Value> {
        let fields = self.form_fields(&request.app_id, &request.entry_id).await?;
        let data = convert_for_wire(&request.data, &fields, false)?;
        let body = CreateBody {
            app_id: &request.app_id,
            entry_id: &request.entry_id,
            data,
            data_creator: request.data_creator.as_deref(),
            is_start_workflow: request.start_workflow,
            is_start_trigger: request.start_trigger,
            transaction_id: request.transaction_id.as_deref(),
        };
        let response = self.call(Endpoint::DataCreate, &body).await?;
        decode_field(&response, "data")
    }

    /// Creates many rows, 100 per request, returning the ids of the rows
    /// the platform accepted.
    pub async fn create_batch(&self, request: CreateBatchRequest) -> ClientResult<Vec<String>> {
        let fields = self.form_fields(&request.app_id, &request.entry_id).await?;
        let converted: Vec<Value> = request
            .rows
            .iter()
            .map(|row| convert_for_wire(row, &fields, false))
            .collect::<ClientResult<_>>()?;

        let mut created: Vec<String> = Vec::new();
        for chunk in converted.chunks(MAX_PAGE as usize) {
            let body = CreateBatchBody {
                app_id: &request.app_id,
                entry_id: &request.entry_id,
                data_list: chunk,
                is_start_workflow: request.start_workflow,
                transaction_id: request.transaction_id.as_deref(),
            };
            let response = self.call(Endpoint::DataBatchCreate, &body).await?;
            let ids: Vec<String> = decode_field(&response, "success_ids")?;
            created.extend(ids);
        }
        Ok(created)
    }

    /// Updates one row and returns its new state.
    pub async fn update_data(&self, request: UpdateRequest) -> ClientResult<Value> {
        let fields = self.form_fields(&request.app_id, &request.entry_id).await?;
        let data = convert_for_wire(&request.data, &fields, request.ignore_null)?;
        let body = UpdateBody {
            app_id: &request.app_id,
            entry_id: &request.entry_id,
            data_id: &request.data_id,
            data,
            transaction_id: request.transaction_id.as_deref(),
        };
        let response = self.call(Endpoint::DataUpdate, &body).await?;
        decode_field(&response, "data")
    }

    /// Applies the same changes to many rows, 100 ids per request;
    /// returns how many rows the platform reports as updated.
    pub async fn update_batch(&self, request: UpdateBatchRequest) -> ClientResult<u64> {
        let fields = self.form_fields(&request.app_id, &request.entry_id).await?;
        let data = convert_for_wire(&request.data, &fields, request.ignore_null)?;

        let ids = dedup_ids(&request.data_ids);
        let mut updated = 0u64;
        for chunk in ids.chunks(MAX_PAGE as usize) {
            let body = UpdateBatchBody {
                app_id: &request.app_id,
                entry_id: &request.entry_id,
                data_ids: chunk,
                data: &data,
            };
            let response = self.call(Endpoint::DataBatchUpdate, &body).await?;
            let count: u64 = decode_field(&response, "success_count")?;
            updated += count;
        }
        Ok(updated)
    }

    /// Deletes one row.
    pub async fn delete_data(
        &self,
        app_id: &str,
        entry_id: &str,
        data_id: &str,
    ) -> ClientResult<bool> {
        let body = DeleteBody {
            app_id,
            entry_id,
            data_id,
        };
        let response = self.call(Endpoint::DataDelete, &body).await?;
        Ok(response.get("status").and_then(Value::as_str) == Some("success"))
    }

    /// Deletes many rows, 100 ids per request; returns how many rows the
    /// platform reports as deleted.
    pub async fn delete_batch(
        &self,
        app_id: &str,
        entry_id: &str,
        data_ids: &[String],
    ) -> ClientResult<u64> {
        let ids = dedup_ids(data_ids);
        let mut deleted = 0u64;
        for chunk in ids.chunks(MAX_PAGE as usize) {
            let body = DeleteBatchBody {
                app_id,
                entry_id,
                data_ids: chunk,
            };
            let response = self.call(Endpoint::DataBatchDelete, &body).await?;
            let count: u64 = decode_field(&response, "success_count")?;
            deleted += count;
        }
        Ok(deleted)
    }
}

/// Runs one caller record through the converter.
fn convert_for_wire(
    raw: &Value,
    fields: &[FieldDescriptor],
    ignore_null: bool,
) -> ClientResult<Value> {
    let Value::Object(raw) = raw else {
        return Err(ClientError::Data(format!(
            "record data must be a JSON object, got {raw}"
        )));
    };
    let conversion = convert_record(raw, fields);
    let mut record = conversion.record;
    if ignore_null {
        drop_clear_envelopes(&mut record);
    }
    Ok(Value::Object(record))
}

fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Resolves each condition's type from the form schema and re-encodes its
/// operands: numeric on number fields, string everywhere else. The remote
/// silently ignores conditions whose operand encoding mismatches the
/// field's declared type, so this has to be exact.
fn resolve_filter(
    filter: &Filter,
    fields: &HashMap<&str, &FieldDescriptor>,
) -> ClientResult<Filter> {
    let mut resolved = filter.clone();
    for condition in &mut resolved.conditions {
        condition.field_type = fields.get(condition.field.as_str()).map(|f| f.field_type);
        encode_operands(condition)?;
    }
    Ok(resolved)
}

fn encode_operands(condition: &mut Condition) -> ClientResult<()> {
    let Some(values) = &mut condition.value else {
        return Ok(());
    };
    if values.len() > MAX_OPERANDS {
        return Err(ClientError::Filter(format!(
            "condition on {:?} has {} operands; the platform allows at most {MAX_OPERANDS}",
            condition.field,
            values.len()
        )));
    }
    let numeric = condition.field_type == Some(FieldType::Number);
    for value in values.iter_mut() {
        *value = if numeric {
            encode_numeric(&condition.field, value)?
        } else {
            encode_string(&condition.field, value)?
        };
    }
    Ok(())
}

fn encode_numeric(field: &str, value: &Value) -> ClientResult<Value> {
    match value {
        // Open range bounds stay null.
        Value::Null => Ok(Value::Null),
        Value::Number(n) => Ok(Value::Number(n.clone())),
        Value::String(s) => {
            if let Ok(int) = s.trim().parse::<i64>() {
                return Ok(Value::Number(int.into()));
            }
            s.trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| {
                    ClientError::Filter(format!(
                        "condition on number field {field:?} has non-numeric operand {s:?}"
                    ))
                })
        }
        other => Err(ClientError::Filter(format!(
            "condition on number field {field:?} has non-numeric operand {other}"
        ))),
    }
}

fn encode_string(field: &str, value: &Value) -> ClientResult<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::String(_) => Ok(value.clone()),
        Value::Number(_) | Value::Bool(_) => Ok(Value::String(value.to_string())),
        other => Err(ClientError::Filter(format!(
            "condition on field {field:?} has non-scalar operand {other}"
        ))),
    }
}
