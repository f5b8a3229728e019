//! Test doubles shared by unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use crate::admin::AdminApi;
use crate::alerting::{Channel, MessagingClient, MessagingConnector};
use crate::clock::FixedClock;
use crate::config::PacingConfig;
use crate::context::Services;
use crate::error::{Error, Result};
use crate::models::{
    BackupOperation, BackupRun, KeyType, RunMetadata, ServiceAccount, ServiceAccountKey,
    ServiceAccountList,
};
use crate::retry::RetryPolicy;

/// Instant every fake clock is pinned to
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
}

pub fn backup_run(id: &str, status: &str, end_time: Option<&str>) -> BackupRun {
    BackupRun {
        id: id.to_string(),
        status: status.to_string().into(),
        end_time: end_time.map(String::from),
        start_time: None,
        instance: None,
        backup_type: Some("ON_DEMAND".to_string()),
    }
}

/// A successful backup that ended `minutes` before [`now`]
pub fn finished_minutes_ago(minutes: i64) -> BackupRun {
    let ended = (now() - chrono::Duration::minutes(minutes))
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string();
    backup_run("100", "SUCCESSFUL", Some(&ended))
}

pub fn account(display_name: &str, email: &str) -> ServiceAccount {
    ServiceAccount {
        email: email.to_string(),
        display_name: Some(display_name.to_string()),
        name: Some(format!("projects/demo-project/serviceAccounts/{email}")),
        disabled: false,
    }
}

pub fn user_key(email: &str, id: &str, valid_after: &str) -> ServiceAccountKey {
    ServiceAccountKey {
        name: format!("projects/demo-project/serviceAccounts/{email}/keys/{id}"),
        key_type: KeyType::UserManaged,
        valid_after_time: Some(valid_after.to_string()),
        valid_before_time: None,
    }
}

pub fn system_key(email: &str, id: &str) -> ServiceAccountKey {
    ServiceAccountKey {
        name: format!("projects/demo-project/serviceAccounts/{email}/keys/{id}"),
        key_type: KeyType::SystemManaged,
        valid_after_time: Some("2000-01-01T00:00:00Z".to_string()),
        valid_before_time: None,
    }
}

pub fn metadata() -> RunMetadata {
    RunMetadata {
        channel: "ops-alerts".to_string(),
        project_id: "demo-project".to_string(),
        service_name: "freshness".to_string(),
        region: "us-central1".to_string(),
        token: "xoxb-test".to_string(),
    }
}

/// Services around the given fakes, with a clock pinned to [`now`] and the
/// production retry and pacing settings (use a paused tokio clock)
pub fn services(
    admin: Arc<FakeAdmin>,
    messenger: Arc<RecordingMessenger>,
) -> (Services, Arc<RecordingConnector>) {
    let connector = Arc::new(RecordingConnector {
        messenger,
        tokens: Mutex::new(Vec::new()),
    });

    let services = Services {
        admin,
        messaging: connector.clone(),
        retry: RetryPolicy::new(3, Duration::from_secs(5)),
        clock: Arc::new(FixedClock(now())),
        pacing: PacingConfig::default(),
    };

    (services, connector)
}

type Script<T> = Mutex<HashMap<String, VecDeque<Result<T>>>>;

/// Administrative API answering from per-resource scripts.
///
/// Unscripted backup reads fail, unscripted inserts succeed with a
/// `BACKUP_VOLUME` operation, unscripted key listings are empty.
#[derive(Default)]
pub struct FakeAdmin {
    backups: Script<Option<BackupRun>>,
    inserts: Script<BackupOperation>,
    account_pages: Mutex<VecDeque<Result<ServiceAccountList>>>,
    keys: Script<Vec<ServiceAccountKey>>,
    calls: Mutex<Vec<(&'static str, String)>>,
    page_tokens: Mutex<Vec<Option<String>>>,
}

impl FakeAdmin {
    pub fn push_backup(&self, instance: &str, result: Result<Option<BackupRun>>) {
        push(&self.backups, instance, result);
    }

    pub fn push_insert(&self, instance: &str, result: Result<BackupOperation>) {
        push(&self.inserts, instance, result);
    }

    pub fn push_accounts_page(&self, accounts: Vec<ServiceAccount>, next: Option<&str>) {
        self.account_pages.lock().push_back(Ok(ServiceAccountList {
            accounts,
            next_page_token: next.map(String::from),
        }));
    }

    pub fn push_accounts_error(&self, err: Error) {
        self.account_pages.lock().push_back(Err(err));
    }

    pub fn push_keys(&self, email: &str, result: Result<Vec<ServiceAccountKey>>) {
        push(&self.keys, email, result);
    }

    /// Number of calls made to `method`
    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|(m, _)| *m == method).count()
    }

    /// Resources `method` was called for, in call order
    pub fn targets(&self, method: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(m, _)| *m == method)
            .map(|(_, target)| target.clone())
            .collect()
    }

    pub fn page_tokens(&self) -> Vec<Option<String>> {
        self.page_tokens.lock().clone()
    }

    fn record(&self, method: &'static str, target: &str) {
        self.calls.lock().push((method, target.to_string()));
    }
}

fn push<T>(script: &Script<T>, key: &str, result: Result<T>) {
    script
        .lock()
        .entry(key.to_string())
        .or_default()
        .push_back(result);
}

fn pop<T>(script: &Script<T>, key: &str) -> Option<Result<T>> {
    script.lock().get_mut(key).and_then(VecDeque::pop_front)
}

#[async_trait]
impl AdminApi for FakeAdmin {
    async fn latest_backup(&self, _project: &str, instance: &str) -> Result<Option<BackupRun>> {
        self.record("latest_backup", instance);
        pop(&self.backups, instance)
            .unwrap_or_else(|| Err(Error::internal(format!("no scripted backup for {instance}"))))
    }

    async fn insert_backup(&self, project: &str, instance: &str) -> Result<BackupOperation> {
        self.record("insert_backup", instance);
        pop(&self.inserts, instance).unwrap_or_else(|| {
            Ok(BackupOperation {
                name: Some(format!("op-{instance}")),
                operation_type: Some("BACKUP_VOLUME".to_string()),
                target_project: Some(project.to_string()),
                target_id: Some(instance.to_string()),
                status: Some("PENDING".to_string()),
            })
        })
    }

    async fn list_service_accounts(
        &self,
        project: &str,
        page_token: Option<&str>,
    ) -> Result<ServiceAccountList> {
        self.record("list_service_accounts", project);
        self.page_tokens.lock().push(page_token.map(String::from));
        self.account_pages
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(ServiceAccountList::default()))
    }

    async fn list_keys(&self, _project: &str, email: &str) -> Result<Vec<ServiceAccountKey>> {
        self.record("list_keys", email);
        pop(&self.keys, email).unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Messaging client that records every post
#[derive(Default)]
pub struct RecordingMessenger {
    channels: Vec<Channel>,
    fail_posts: bool,
    posted: Mutex<Vec<(String, String)>>,
}

impl RecordingMessenger {
    pub fn with_channels(channels: &[(&str, &str)]) -> Self {
        Self {
            channels: channels
                .iter()
                .map(|(id, name)| Channel {
                    id: (*id).to_string(),
                    name: (*name).to_string(),
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing_posts(channels: &[(&str, &str)]) -> Self {
        Self {
            fail_posts: true,
            ..Self::with_channels(channels)
        }
    }

    /// `(channel id, text)` of every delivered post
    pub fn posted(&self) -> Vec<(String, String)> {
        self.posted.lock().clone()
    }

    /// Text of every delivered post
    pub fn texts(&self) -> Vec<String> {
        self.posted.lock().iter().map(|(_, text)| text.clone()).collect()
    }
}

#[async_trait]
impl MessagingClient for RecordingMessenger {
    async fn list_channels(&self) -> Result<Vec<Channel>> {
        Ok(self.channels.clone())
    }

    async fn post_message(&self, channel_id: &str, text: &str) -> Result<()> {
        if self.fail_posts {
            return Err(Error::Messaging("channel_not_found".to_string()));
        }
        self.posted
            .lock()
            .push((channel_id.to_string(), text.to_string()));
        Ok(())
    }
}

/// Hands out one [`RecordingMessenger`] and remembers the tokens asked for
pub struct RecordingConnector {
    messenger: Arc<RecordingMessenger>,
    tokens: Mutex<Vec<String>>,
}

impl RecordingConnector {
    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().clone()
    }
}

impl MessagingConnector for RecordingConnector {
    fn connect(&self, token: &str) -> Arc<dyn MessagingClient> {
        self.tokens.lock().push(token.to_string());
        self.messenger.clone()
    }
}
