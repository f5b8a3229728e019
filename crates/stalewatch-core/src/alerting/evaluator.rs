//! Threshold policy evaluation

use std::sync::Arc;

use tracing::debug;

use crate::clock::{elapsed_days, elapsed_minutes, Clock};
use crate::error::{Error, Result};
use crate::fetcher::BackupState;
use crate::models::{BackupStatus, EvaluationOutcome, ResourceKind, ServiceAccountKey};

/// Decides whether a resource has gone stale
#[derive(Clone)]
pub struct PolicyEvaluator {
    clock: Arc<dyn Clock>,
}

impl PolicyEvaluator {
    /// Create an evaluator reading time from `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Strictly greater than the threshold is stale; equal is compliant
    pub fn evaluate(elapsed: i64, threshold: i64) -> EvaluationOutcome {
        if elapsed > threshold {
            EvaluationOutcome::StaleNeedsAlert { elapsed, threshold }
        } else {
            EvaluationOutcome::Compliant
        }
    }

    /// Evaluate the latest backup of an instance against `threshold` minutes.
    ///
    /// A running backup is never compared against the threshold, and an
    /// instance without a threshold is only checked for backup health.
    pub fn evaluate_backup(
        &self,
        state: &BackupState,
        threshold: Option<i64>,
    ) -> Result<EvaluationOutcome> {
        let outcome = match state {
            BackupState::Missing => EvaluationOutcome::NoBackupHistory,
            BackupState::Running(_) => EvaluationOutcome::RunningSkip,
            BackupState::Finished(run) if run.status != BackupStatus::Successful => {
                EvaluationOutcome::UnsuccessfulBackup {
                    backup_id: run.id.clone(),
                    status: run.status.to_string(),
                }
            }
            BackupState::Finished(run) => match threshold {
                None => EvaluationOutcome::Compliant,
                Some(threshold) => {
                    let end_time = run.end_time.as_deref().ok_or_else(|| {
                        Error::MalformedTimestamp(format!("backup {} has no endTime", run.id))
                    })?;
                    let elapsed = elapsed_minutes(end_time, self.clock.now())?;
                    debug!(elapsed, threshold, "Backup age computed");
                    Self::evaluate(elapsed, threshold)
                }
            },
        };

        record(ResourceKind::Database, &outcome);
        Ok(outcome)
    }

    /// Evaluate a user-managed key against `threshold` days
    pub fn evaluate_key(
        &self,
        key: &ServiceAccountKey,
        threshold: i64,
    ) -> Result<EvaluationOutcome> {
        let created = key.valid_after_time.as_deref().ok_or_else(|| {
            Error::MalformedTimestamp(format!("key {} has no validAfterTime", key.key_id()))
        })?;

        let elapsed = elapsed_days(created, self.clock.today())?;
        debug!(key_id = key.key_id(), elapsed, threshold, "Key age computed");

        let outcome = Self::evaluate(elapsed, threshold);
        record(ResourceKind::CredentialKey, &outcome);
        Ok(outcome)
    }
}

fn record(kind: ResourceKind, outcome: &EvaluationOutcome) {
    metrics::counter!(
        "stalewatch_evaluations_total",
        "kind" => kind.to_string(),
        "outcome" => outcome.label()
    )
    .increment(1);
}
