//! Administrative API access
//!
//! [`AdminApi`] is the seam between the checks and Google Cloud. Each method
//! performs exactly one HTTP request so it can be wrapped by
//! [`RetryPolicy`](crate::retry::RetryPolicy) as a unit.

mod gcp;

pub use gcp::GcpAdminClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BackupOperation, BackupRun, ServiceAccountKey, ServiceAccountList};

/// Cloud SQL Admin and IAM operations the checks need
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// Most recent backup run of an instance, if it has any
    async fn latest_backup(&self, project: &str, instance: &str) -> Result<Option<BackupRun>>;

    /// Start an on-demand backup
    async fn insert_backup(&self, project: &str, instance: &str) -> Result<BackupOperation>;

    /// One page of the project's service accounts
    async fn list_service_accounts(
        &self,
        project: &str,
        page_token: Option<&str>,
    ) -> Result<ServiceAccountList>;

    /// All keys of one service account
    async fn list_keys(&self, project: &str, email: &str) -> Result<Vec<ServiceAccountKey>>;
}
