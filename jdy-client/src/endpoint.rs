//! The fixed v5 endpoint table.
//!
//! Endpoints are configuration data: path, verb and the platform's
//! documented per-endpoint rate budget. The scheme and host of the final
//! URL come from the tenant's `server_url`.

use crate::error::{ClientError, ClientResult};
use url::Url;

/// One of the platform's v5 API endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    AppList,
    EntryList,
    WidgetList,
    DataGet,
    DataList,
    DataCreate,
    DataBatchCreate,
    DataUpdate,
    DataBatchUpdate,
    DataDelete,
    DataBatchDelete,
    UploadToken,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::AppList => "/api/v5/app/list",
            Endpoint::EntryList => "/api/v5/app/entry/list",
            Endpoint::WidgetList => "/api/v5/app/entry/widget/list",
            Endpoint::DataGet => "/api/v5/app/entry/data/get",
            Endpoint::DataList => "/api/v5/app/entry/data/list",
            Endpoint::DataCreate => "/api/v5/app/entry/data/create",
            Endpoint::DataBatchCreate => "/api/v5/app/entry/data/batch_create",
            Endpoint::DataUpdate => "/api/v5/app/entry/data/update",
            Endpoint::DataBatchUpdate => "/api/v5/app/entry/data/batch_update",
            Endpoint::DataDelete => "/api/v5/app/entry/data/delete",
            Endpoint::DataBatchDelete => "/api/v5/app/entry/data/batch_delete",
            Endpoint::UploadToken => "/api/v5/app/entry/file/get_upload_token",
        }
    }

    /// The platform's documented requests-per-second budget for this
    /// endpoint. Informational; exceeding it is what produces the
    /// rate-limit responses the executor retries through.
    pub fn qps_budget(self) -> u32 {
        match self {
            Endpoint::AppList
            | Endpoint::EntryList
            | Endpoint::WidgetList
            | Endpoint::DataGet
            | Endpoint::DataList => 30,
            Endpoint::DataCreate
            | Endpoint::DataUpdate
            | Endpoint::DataDelete
            | Endpoint::UploadToken => 20,
            Endpoint::DataBatchCreate | Endpoint::DataBatchUpdate | Endpoint::DataBatchDelete => 10,
        }
    }

    /// Resolves the endpoint against a tenant's server: scheme, host and
    /// port come from `server_url`, the path from the endpoint table.
    pub(crate) fn url(self, server_url: &str) -> ClientResult<Url> {
        let mut url = Url::parse(server_url)
            .map_err(|e| ClientError::Config(format!("bad server url {server_url:?}: {e}")))?;
        if !url.has_host() {
            return Err(ClientError::Config(format!(
                "server url {server_url:?} has no host"
            )));
        }
        url.set_path(self.path());
        url.set_query(None);
        Ok(url)
    }
}
