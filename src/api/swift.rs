use reqwest::Method;

use super::client::{expect_success, send};
use crate::error::{DashboardError, Result};

pub const QUOTA_BYTES_HEADER: &str = "x-account-meta-quota-bytes";

/// Object storage account client. Disabled when no endpoint is configured.
#[derive(Clone)]
pub struct ObjectStoreClient {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl ObjectStoreClient {
    pub fn new(client: reqwest::Client, base_url: Option<&str>) -> Self {
        ObjectStoreClient {
            client,
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.base_url.is_some()
    }

    pub fn account_url(&self, project_id: &str) -> Option<String> {
        self.base_url
            .as_ref()
            .map(|base| format!("{}/AUTH_{}", base, project_id))
    }

    /// HEAD the project's account and return the quota header in bytes, if set.
    pub async fn account_quota_bytes(&self, token: &str, project_id: &str) -> Result<Option<i64>> {
        let url = match self.account_url(project_id) {
            Some(u) => u,
            None => return Ok(None),
        };
        let resp = send(&self.client, Method::HEAD, &url, Some(token), None, None).await?;
        let resp = expect_success("object-store", resp).await?;
        match resp.headers().get(QUOTA_BYTES_HEADER) {
            Some(value) => parse_quota_header(value.to_str().unwrap_or_default()).map(Some),
            None => Ok(None),
        }
    }
}

/// A quota header that is present must hold an integer byte count.
fn parse_quota_header(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| DashboardError::InvalidInput(format!("invalid {} header: {:?}", QUOTA_BYTES_HEADER, raw)))
}
