//! Knowledge-base upload.
//!
//! Rows arrive already decoded (one JSON object per spreadsheet row).

use reqwest::Method;
use serde::Serialize;
use tracing::info;

use super::client::ApiClient;
use crate::error::ApiError;

/// One decoded spreadsheet row.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Body of `POST /knowledge-base/upload`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeUpload<'a> {
    pub company_id: &'a str,
    pub file_name: &'a str,
    pub namespace: &'a str,
    pub data: &'a [Row],
}

impl ApiClient {
    /// Upload rows into a company's knowledge-base namespace.
    ///
    /// An empty row set is rejected before any request is made.
    pub async fn upload_knowledge_base(
        &self,
        upload: &KnowledgeUpload<'_>,
    ) -> Result<serde_json::Value, ApiError> {
        if upload.data.is_empty() {
            return Err(ApiError::InvalidRequest(format!(
                "{} contains no rows",
                upload.file_name
            )));
        }

        info!(
            company_id = upload.company_id,
            file = upload.file_name,
            namespace = upload.namespace,
            rows = upload.data.len(),
            "Uploading knowledge base"
        );

        let path = "/knowledge-base/upload";
        let req = self.request(Method::POST, path).await?.json(upload);
        self.send_json(req, &Method::POST, path).await
    }
}
