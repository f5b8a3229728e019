//! Alert messages posted to the chat channel

use std::fmt;

use super::outcome::EvaluationOutcome;

/// Every message the checks can post. Rendered as Slack mrkdwn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    /// Last successful backup is older than the threshold
    StaleBackup {
        instance: String,
        threshold_minutes: i64,
        elapsed_minutes: i64,
    },
    /// Latest backup did not succeed
    UnsuccessfulBackup {
        instance: String,
        backup_id: String,
        status: String,
    },
    /// Instance has never been backed up
    NoBackupHistory { instance: String },
    /// On-demand backup accepted
    BackupInitiated {
        instance: String,
        operation_type: String,
        project: String,
    },
    /// Another backup operation is already running
    BackupInProgress { instance: String },
    /// Resource missing or not accessible
    InvalidResource { resource: String },
    /// A named service account does not exist in the project
    MissingServiceAccount { name: String },
    /// User-managed key older than its threshold
    KeyExpired { account: String, key_id: String },
    /// Request payload could not be used
    InvalidRequest,
    /// Unclassified failure
    Unexpected { detail: String },
}

impl Alert {
    /// Alert for a backup evaluation, if the outcome warrants one
    pub fn for_backup(instance: &str, outcome: &EvaluationOutcome) -> Option<Self> {
        let instance = instance.to_string();
        match outcome {
            EvaluationOutcome::StaleNeedsAlert { elapsed, threshold }
            | EvaluationOutcome::StaleNeedsRemediation { elapsed, threshold } => {
                Some(Alert::StaleBackup {
                    instance,
                    threshold_minutes: *threshold,
                    elapsed_minutes: *elapsed,
                })
            }
            EvaluationOutcome::UnsuccessfulBackup { backup_id, status } => {
                Some(Alert::UnsuccessfulBackup {
                    instance,
                    backup_id: backup_id.clone(),
                    status: status.clone(),
                })
            }
            EvaluationOutcome::NoBackupHistory => Some(Alert::NoBackupHistory { instance }),
            EvaluationOutcome::Compliant | EvaluationOutcome::RunningSkip => None,
        }
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Alert::StaleBackup { .. } => "stale_backup",
            Alert::UnsuccessfulBackup { .. } => "unsuccessful_backup",
            Alert::NoBackupHistory { .. } => "no_backup_history",
            Alert::BackupInitiated { .. } => "backup_initiated",
            Alert::BackupInProgress { .. } => "backup_in_progress",
            Alert::InvalidResource { .. } => "invalid_resource",
            Alert::MissingServiceAccount { .. } => "missing_service_account",
            Alert::KeyExpired { .. } => "key_expired",
            Alert::InvalidRequest => "invalid_request",
            Alert::Unexpected { .. } => "unexpected",
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alert::StaleBackup {
                instance,
                threshold_minutes,
                elapsed_minutes,
            } => write!(
                f,
                "Backup of instance is not taken \n `Instance Name: {instance}` \n \
                 `Threshold in minutes: {threshold_minutes}` \n \
                 `Time since last backup taken in minutes: {elapsed_minutes}`"
            ),
            Alert::UnsuccessfulBackup {
                instance,
                backup_id,
                status,
            } => write!(
                f,
                "Last backup details: \n `Instance name: {instance}` \n \
                 `Backup id: {backup_id}` \n `Backup Status: {status}`"
            ),
            Alert::NoBackupHistory { instance } => {
                write!(f, "No backup record found \n `Instance Name: {instance}`")
            }
            Alert::BackupInitiated {
                instance,
                operation_type,
                project,
            } => write!(
                f,
                "SQL instance backup processes initiated for: \n `Instance Name : {instance}` \n \
                 `OperationType: {operation_type}` \n `Project: {project}`"
            ),
            Alert::BackupInProgress { instance } => write!(
                f,
                "Operation failed because another backup operation was already in progress for \n \
                 `Instance Name: {instance}`"
            ),
            Alert::InvalidResource { resource } => write!(
                f,
                "Error: Invalid request. Please check if `{resource}` exists and is accessible."
            ),
            Alert::MissingServiceAccount { name } => write!(
                f,
                "Requested service account does not exist. \n `Service Account Name: {name}`"
            ),
            Alert::KeyExpired { account, key_id } => write!(
                f,
                "Key Expired. Please generate new key. \n `Service Account: {account}` \n \
                 `Key ID: {key_id}`"
            ),
            Alert::InvalidRequest => write!(f, "Invalid request: Please check your document syntax"),
            Alert::Unexpected { detail } => write!(f, "Error: {detail}"),
        }
    }
}
