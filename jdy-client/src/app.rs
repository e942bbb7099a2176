//! App directory, form directory and field schema operations.

use crate::client::{decode_field, Tenant};
use crate::endpoint::Endpoint;
use crate::error::ClientResult;
use jdy_types::FieldDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Page size used by the "list all" drivers.
const DIRECTORY_PAGE: u32 = 100;

/// One app visible to the API key.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSummary {
    pub app_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// One form of an app.
#[derive(Debug, Clone, Deserialize)]
pub struct EntrySummary {
    pub entry_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Full field-listing response for a form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormSchema {
    /// The business fields; this is what conversion and filters use.
    #[serde(default)]
    pub widgets: Vec<FieldDescriptor>,
    /// System fields (`_id`, creator, flow state, ...), left opaque.
    #[serde(rename = "sysWidgets", default)]
    pub sys_widgets: Vec<Value>,
    /// Server-side timestamp of the last data change in this form.
    #[serde(rename = "dataModifyTime", default)]
    pub data_modify_time: Option<String>,
}

#[derive(Serialize)]
struct DirectoryRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    app_id: Option<&'a str>,
    limit: u32,
    skip: u32,
}

#[derive(Serialize)]
struct WidgetRequest<'a> {
    app_id: &'a str,
    entry_id: &'a str,
}

impl Tenant {
    /// Lists one page of apps (`skip`-based paging, newest platform order).
    pub async fn list_apps(&self, limit: u32, skip: u32) -> ClientResult<Vec<AppSummary>> {
        let body = DirectoryRequest {
            app_id: None,
            limit,
            skip,
        };
        let response = self.call(Endpoint::AppList, &body).await?;
        decode_field(&response, "apps")
    }

    /// Lists every app, paging until the directory is exhausted.
    pub async fn list_all_apps(&self) -> ClientResult<Vec<AppSummary>> {
        let mut apps: Vec<AppSummary> = Vec::new();
        loop {
            let page = self.list_apps(DIRECTORY_PAGE, apps.len() as u32).await?;
            let returned = page.len() as u32;
            apps.extend(page);
            if returned < DIRECTORY_PAGE {
                return Ok(apps);
            }
        }
    }

    /// Lists one page of an app's forms.
    pub async fn list_entries(
        &self,
        app_id: &str,
        limit: u32,
        skip: u32,
    ) -> ClientResult<Vec<EntrySummary>> {
        let body = DirectoryRequest {
            app_id: Some(app_id),
            limit,
            skip,
        };
        let response = self.call(Endpoint::EntryList, &body).await?;
        decode_field(&response, "forms")
    }

    /// Lists every form of an app.
    pub async fn list_all_entries(&self, app_id: &str) -> ClientResult<Vec<EntrySummary>> {
        let mut entries: Vec<EntrySummary> = Vec::new();
        loop {
            let page = self
                .list_entries(app_id, DIRECTORY_PAGE, entries.len() as u32)
                .await?;
            let returned = page.len() as u32;
            entries.extend(page);
            if returned < DIRECTORY_PAGE {
                return Ok(entries);
            }
        }
    }

    /// Fetches a form's full field listing, bypassing the schema cache.
    pub async fn list_fields(&self, app_id: &str, entry_id: &str) -> ClientResult<FormSchema> {
        let body = WidgetRequest { app_id, entry_id };
        let response = self.call(Endpoint::WidgetList, &body).await?;
        serde_json::from_value(response).map_err(Into::into)
    }

    /// A form's business-field descriptors, served from a short-lived
    /// cache (~30 s) since schemas are expensive to fetch and change
    /// rarely. Use [`Tenant::invalidate_schema`] after editing a form.
    pub async fn form_fields(
        &self,
        app_id: &str,
        entry_id: &str,
    ) -> ClientResult<Arc<Vec<FieldDescriptor>>> {
        if let Some(fields) = self.shared.schemas.get(app_id, entry_id) {
            return Ok(fields);
        }
        let schema = self.list_fields(app_id, entry_id).await?;
        Ok(self.shared.schemas.put(app_id, entry_id, schema.widgets))
    }

    /// Drops the cached schema for one form.
    pub fn invalidate_schema(&self, app_id: &str, entry_id: &str) {
        self.shared.schemas.invalidate(app_id, entry_id);
    }
}
