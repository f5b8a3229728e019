//! Cloud SQL backup data model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a backup run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BackupStatus {
    /// Backup is being taken
    Running,
    /// Backup completed
    Successful,
    /// Backup failed
    Failed,
    /// Any other status reported by the API (ENQUEUED, SKIPPED, ...)
    Other(String),
}

impl BackupStatus {
    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            BackupStatus::Running => "RUNNING",
            BackupStatus::Successful => "SUCCESSFUL",
            BackupStatus::Failed => "FAILED",
            BackupStatus::Other(status) => status,
        }
    }
}

impl From<String> for BackupStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "RUNNING" => BackupStatus::Running,
            "SUCCESSFUL" => BackupStatus::Successful,
            "FAILED" => BackupStatus::Failed,
            _ => BackupStatus::Other(status),
        }
    }
}

impl From<BackupStatus> for String {
    fn from(status: BackupStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One backup run of an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRun {
    /// Backup identifier
    #[serde(default)]
    pub id: String,

    /// Current status
    pub status: BackupStatus,

    /// When the run finished, RFC 3339 with fractional seconds
    #[serde(default)]
    pub end_time: Option<String>,

    /// When the run started
    #[serde(default)]
    pub start_time: Option<String>,

    /// Instance the backup belongs to
    #[serde(default)]
    pub instance: Option<String>,

    /// AUTOMATED or ON_DEMAND
    #[serde(default, rename = "type")]
    pub backup_type: Option<String>,
}

/// `backupRuns.list` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupRunList {
    /// Most recent first
    #[serde(default)]
    pub items: Vec<BackupRun>,
}

/// Operation returned by `backupRuns.insert`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupOperation {
    /// Operation resource name
    #[serde(default)]
    pub name: Option<String>,

    /// Operation type, BACKUP_VOLUME for backups
    #[serde(default)]
    pub operation_type: Option<String>,

    /// Project the operation runs in
    #[serde(default)]
    pub target_project: Option<String>,

    /// Instance the operation targets
    #[serde(default)]
    pub target_id: Option<String>,

    /// PENDING, RUNNING or DONE
    #[serde(default)]
    pub status: Option<String>,
}

impl BackupOperation {
    /// Operation type, or "unknown"
    pub fn operation_type(&self) -> &str {
        self.operation_type.as_deref().unwrap_or("unknown")
    }

    /// Target project, or "unknown"
    pub fn target_project(&self) -> &str {
        self.target_project.as_deref().unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_backup_run_from_api() {
        let list: BackupRunList = serde_json::from_value(json!({
            "kind": "sql#backupRunsList",
            "items": [{
                "kind": "sql#backupRun",
                "status": "SUCCESSFUL",
                "id": "1704103200000",
                "endTime": "2024-01-01T10:00:00.123Z",
                "type": "AUTOMATED",
                "instance": "orders-db"
            }]
        }))
        .unwrap();

        let run = &list.items[0];
        assert_eq!(run.status, BackupStatus::Successful);
        assert_eq!(run.id, "1704103200000");
        assert_eq!(run.end_time.as_deref(), Some("2024-01-01T10:00:00.123Z"));
        assert_eq!(run.backup_type.as_deref(), Some("AUTOMATED"));
    }

    #[test]
    fn test_unknown_status_is_kept() {
        let status: BackupStatus = serde_json::from_value(json!("SKIPPED")).unwrap();
        assert_eq!(status, BackupStatus::Other("SKIPPED".into()));
        assert_eq!(status.to_string(), "SKIPPED");
    }

    #[test]
    fn test_empty_list() {
        let list: BackupRunList = serde_json::from_value(json!({"kind": "sql#backupRunsList"})).unwrap();
        assert!(list.items.is_empty());
    }

    #[test]
    fn test_operation_fallbacks() {
        let op = BackupOperation::default();
        assert_eq!(op.operation_type(), "unknown");
        assert_eq!(op.target_project(), "unknown");
    }
}
