//! Retry-wrapped reads of remote resource state
//!
//! State is fetched fresh for every evaluation and never cached across runs.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::admin::AdminApi;
use crate::error::Result;
use crate::models::{BackupRun, BackupStatus, ServiceAccount, ServiceAccountKey};
use crate::retry::RetryPolicy;

/// Latest backup of an instance, as far as evaluation cares
#[derive(Debug, Clone, PartialEq)]
pub enum BackupState {
    /// The instance has never been backed up
    Missing,
    /// A backup is in progress
    Running(BackupRun),
    /// The most recent backup has finished, successfully or not
    Finished(BackupRun),
}

impl From<Option<BackupRun>> for BackupState {
    fn from(run: Option<BackupRun>) -> Self {
        match run {
            None => BackupState::Missing,
            Some(run) if run.status == BackupStatus::Running => BackupState::Running(run),
            Some(run) => BackupState::Finished(run),
        }
    }
}

/// Reads state for one project through the retry policy
#[derive(Clone, Copy)]
pub struct StateFetcher<'a> {
    admin: &'a dyn AdminApi,
    retry: &'a RetryPolicy,
    project: &'a str,
}

impl<'a> StateFetcher<'a> {
    /// Create a fetcher for `project`
    pub fn new(admin: &'a dyn AdminApi, retry: &'a RetryPolicy, project: &'a str) -> Self {
        Self {
            admin,
            retry,
            project,
        }
    }

    /// Latest backup of `instance`
    pub async fn latest_backup(&self, instance: &str) -> Result<BackupState> {
        info!(instance, "Fetching latest backup run");

        let run = self
            .retry
            .execute("backup_runs.list", || {
                self.admin.latest_backup(self.project, instance)
            })
            .await?;

        Ok(run.into())
    }

    /// Every service account in the project, following page tokens
    pub async fn service_accounts(&self) -> Result<Vec<ServiceAccount>> {
        info!(project = self.project, "Listing service accounts");

        let mut accounts = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let token = page_token.as_deref();
            let page = self
                .retry
                .execute("service_accounts.list", || {
                    self.admin.list_service_accounts(self.project, token)
                })
                .await?;

            accounts.extend(page.accounts);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) if !seen.insert(next.clone()) => {
                    warn!(
                        project = self.project,
                        page_token = %next,
                        "Page token repeated, listing stopped"
                    );
                    break;
                }
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(accounts)
    }

    /// User-managed keys of one account; system-managed keys are exempt
    pub async fn user_managed_keys(&self, email: &str) -> Result<Vec<ServiceAccountKey>> {
        info!(account = email, "Listing service account keys");

        let keys = self
            .retry
            .execute("service_account_keys.list", || {
                self.admin.list_keys(self.project, email)
            })
            .await?;

        Ok(keys.into_iter().filter(ServiceAccountKey::is_user_managed).collect())
    }
}
