//! File upload flow.
//!
//! Uploads are two-step: fetch single-use upload tokens for a form, then
//! multipart-POST each file to the URL its token came with. The platform
//! answers with an attachment `key`; keys go into image/upload fields via
//! the converter, tied to the same `transaction_id` as the write.

use crate::client::{decode_field, Tenant};
use crate::endpoint::Endpoint;
use crate::engine::HttpMethod;
use crate::error::{ClientError, ClientResult};
use jdy_types::Attachment;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::warn;
use url::Url;
use uuid::Uuid;

/// One single-use upload grant.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadToken {
    pub token: String,
    pub url: String,
}

/// A successfully uploaded file.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    /// The attachment key to write into an image/upload field.
    pub key: String,
}

/// Result of uploading a set of files.
#[derive(Debug)]
pub struct UploadOutcome {
    /// The transaction to pass along with the subsequent create/update.
    pub transaction_id: String,
    pub uploaded: Vec<UploadedFile>,
    /// Names of files whose upload failed (logged, not fatal).
    pub failed: Vec<String>,
}

impl UploadOutcome {
    /// The uploaded keys as attachment entries, ready for a record field.
    pub fn attachments(&self) -> Vec<Attachment> {
        self.uploaded
            .iter()
            .map(|f| Attachment::from_key(&f.key))
            .collect()
    }
}

#[derive(Serialize)]
struct TokenBody<'a> {
    app_id: &'a str,
    entry_id: &'a str,
    transaction_id: &'a str,
}

impl Tenant {
    /// Fetches a batch of upload tokens for a form under one transaction.
    pub async fn upload_tokens(
        &self,
        app_id: &str,
        entry_id: &str,
        transaction_id: &str,
    ) -> ClientResult<Vec<UploadToken>> {
        let body = TokenBody {
            app_id,
            entry_id,
            transaction_id,
        };
        let response = self.call(Endpoint::UploadToken, &body).await?;
        decode_field(&response, "token_and_url_list")
    }

    /// Uploads in-memory files, one token per file, under a fresh
    /// transaction id. Individual failures are logged and reported in
    /// [`UploadOutcome::failed`] without aborting the rest.
    pub async fn upload_files(
        &self,
        app_id: &str,
        entry_id: &str,
        files: Vec<(String, Vec<u8>)>,
    ) -> ClientResult<UploadOutcome> {
        let transaction_id = Uuid::new_v4().simple().to_string();
        let mut outcome = UploadOutcome {
            transaction_id: transaction_id.clone(),
            uploaded: Vec::new(),
            failed: Vec::new(),
        };
        if files.is_empty() {
            return Ok(outcome);
        }

        let mut tokens: Vec<UploadToken> = Vec::new();
        while tokens.len() < files.len() {
            let batch = self
                .upload_tokens(app_id, entry_id, &transaction_id)
                .await?;
            if batch.is_empty() {
                return Err(ClientError::Decode(
                    "upload token endpoint returned an empty batch".to_string(),
                ));
            }
            tokens.extend(batch);
        }

        for ((name, bytes), token) in files.into_iter().zip(tokens) {
            match self.upload_one(&token, &name, &bytes).await {
                Ok(key) => outcome.uploaded.push(UploadedFile { name, key }),
                Err(error) => {
                    warn!(file = %name, %error, "file upload failed; skipping");
                    outcome.failed.push(name);
                }
            }
        }
        Ok(outcome)
    }

    /// Reads files from disk and uploads them.
    pub async fn upload_paths(
        &self,
        app_id: &str,
        entry_id: &str,
        paths: &[impl AsRef<Path>],
    ) -> ClientResult<UploadOutcome> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let bytes = tokio::fs::read(path).await?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string());
            files.push((name, bytes));
        }
        self.upload_files(app_id, entry_id, files).await
    }

    /// Multipart-POSTs one file to its token's upload URL. The token URL
    /// is used as issued; it is not rewritten to the tenant server.
    async fn upload_one(
        &self,
        token: &UploadToken,
        file_name: &str,
        bytes: &[u8],
    ) -> ClientResult<String> {
        let url = Url::parse(&token.url)
            .map_err(|e| ClientError::Decode(format!("bad upload url {:?}: {e}", token.url)))?;

        let boundary = format!("jdy-upload-{}", Uuid::new_v4().simple());
        let body = multipart_body(&boundary, &token.token, file_name, bytes);
        let headers = vec![(
            "Content-Type".to_string(),
            format!("multipart/form-data; boundary={boundary}"),
        )];

        let text = self
            .shared
            .executor
            .send_raw(HttpMethod::Post, url, headers, Some(body))
            .await?;
        let tree: Value = serde_json::from_str(&text)
            .map_err(|e| ClientError::Decode(format!("upload response is not JSON: {e}")))?;
        decode_field(&tree, "key")
    }
}

/// Encodes the `token` field followed by the `file` part; the platform
/// requires the file to come last.
fn multipart_body(boundary: &str, token: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 512);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"token\"\r\n\r\n");
    body.extend_from_slice(token.as_bytes());
    body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name.replace('"', "_")
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
