//! REST client for the Cloud SQL Admin (v1beta4) and IAM (v1) APIs

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::AdminApi;
use crate::config::AdminConfig;
use crate::error::{Error, Result};
use crate::models::{
    BackupOperation, BackupRun, BackupRunList, ServiceAccountKey, ServiceAccountKeyList,
    ServiceAccountList,
};

/// Google Cloud administrative API client
#[derive(Clone)]
pub struct GcpAdminClient {
    client: Client,
    sql_admin_url: Url,
    iam_url: Url,
    access_token: Option<String>,
}

impl GcpAdminClient {
    /// Create a client from configuration
    pub fn new(config: &AdminConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            sql_admin_url: parse_base(&config.sql_admin_url)?,
            iam_url: parse_base(&config.iam_url)?,
            access_token: config.access_token.clone(),
        })
    }

    fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::config(format!("{base} cannot be a base URL")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let request = match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %body, "Admin API error response");
            return Err(Error::api(status.as_u16(), error_message(&body)));
        }

        Ok(response.json().await?)
    }
}

fn parse_base(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::config(format!("invalid API URL `{raw}`: {e}")))
}

/// Pull `error.message` out of a Google API error body, falling back to the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl AdminApi for GcpAdminClient {
    async fn latest_backup(&self, project: &str, instance: &str) -> Result<Option<BackupRun>> {
        let url = Self::endpoint(
            &self.sql_admin_url,
            &["projects", project, "instances", instance, "backupRuns"],
        )?;

        let list: BackupRunList = self
            .send(self.client.get(url).query(&[("maxResults", "1")]))
            .await?;

        Ok(list.items.into_iter().next())
    }

    async fn insert_backup(&self, project: &str, instance: &str) -> Result<BackupOperation> {
        let url = Self::endpoint(
            &self.sql_admin_url,
            &["projects", project, "instances", instance, "backupRuns"],
        )?;

        self.send(self.client.post(url).json(&serde_json::json!({})))
            .await
    }

    async fn list_service_accounts(
        &self,
        project: &str,
        page_token: Option<&str>,
    ) -> Result<ServiceAccountList> {
        let url = Self::endpoint(&self.iam_url, &["projects", project, "serviceAccounts"])?;

        let mut request = self.client.get(url);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        self.send(request).await
    }

    async fn list_keys(&self, project: &str, email: &str) -> Result<Vec<ServiceAccountKey>> {
        let url = Self::endpoint(
            &self.iam_url,
            &["projects", project, "serviceAccounts", email, "keys"],
        )?;

        let list: ServiceAccountKeyList = self.send(self.client.get(url)).await?;
        Ok(list.keys)
    }
}
