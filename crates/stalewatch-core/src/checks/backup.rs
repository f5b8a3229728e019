//! Database backup freshness and remediation

use std::collections::{BTreeMap, HashSet};

use tracing::info;

use super::BackupMode;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::models::{
    Alert, BackupBatch, EvaluationOutcome, MonitoredResource, ResourceKind, RunReport, Threshold,
};

/// A validated backup batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPlan {
    /// Instances to check (check-only) or to back up (remediate)
    pub instances: Vec<String>,
    /// Instance to threshold
    pub thresholds: BTreeMap<String, Threshold>,
}

impl BackupPlan {
    /// Validate a batch for `mode`. Repeated instance names collapse to
    /// their first occurrence.
    pub fn new(batch: BackupBatch, mode: BackupMode) -> Result<Self> {
        let mut instances = batch
            .instances
            .ok_or_else(|| Error::bad_request("`instances` is required"))?;
        let mut seen = HashSet::new();
        instances.retain(|instance| seen.insert(instance.clone()));

        let thresholds = match (batch.threshold, mode) {
            (Some(thresholds), _) => thresholds,
            (None, BackupMode::CheckOnly) => BTreeMap::new(),
            (None, BackupMode::CheckAndRemediate) => {
                return Err(Error::bad_request("`threshold` is required"));
            }
        };

        Ok(Self {
            instances,
            thresholds,
        })
    }

    /// Threshold in minutes for `instance`, if one is configured
    pub fn threshold_for(&self, instance: &str) -> Option<i64> {
        self.thresholds
            .get(instance)
            .map(|t| t.resolve(ResourceKind::Database))
    }
}

/// One backup run
pub struct BackupCheck<'a> {
    ctx: &'a RunContext,
    mode: BackupMode,
}

impl<'a> BackupCheck<'a> {
    /// Create a check for the run in `ctx`
    pub fn new(ctx: &'a RunContext, mode: BackupMode) -> Self {
        Self { ctx, mode }
    }

    /// Carry out the plan; per-instance failures never stop the batch
    pub async fn run(&self, plan: BackupPlan) -> RunReport {
        let mut report = RunReport::default();

        info!(
            mode = ?self.mode,
            instances = plan.instances.len(),
            thresholds = plan.thresholds.len(),
            "Starting backup run"
        );

        match self.mode {
            BackupMode::CheckOnly => {
                for instance in &plan.instances {
                    self.check_instance(instance, plan.threshold_for(instance), false, &mut report)
                        .await;
                    self.ctx.pause(self.ctx.pacing().resource_delay).await;
                }
            }
            BackupMode::CheckAndRemediate => {
                for instance in plan.thresholds.keys() {
                    let scheduled = plan.instances.contains(instance);
                    self.check_instance(
                        instance,
                        plan.threshold_for(instance),
                        scheduled,
                        &mut report,
                    )
                    .await;
                    self.ctx.pause(self.ctx.pacing().resource_delay).await;
                }

                self.remediate(&plan.instances, &mut report).await;
            }
        }

        report.alerts_sent = self.ctx.alerts_sent();
        info!(
            evaluated = report.outcomes.len(),
            failed = report.failures.len(),
            backups = report.backups_initiated.len(),
            "Backup run finished"
        );
        report
    }

    /// Evaluate one instance, alert if needed and record the outcome.
    ///
    /// A stale instance that will be backed up later in the same run is
    /// reported as needing remediation.
    pub async fn check_instance(
        &self,
        instance: &str,
        threshold: Option<i64>,
        scheduled_for_backup: bool,
        report: &mut RunReport,
    ) {
        let outcome = match self.evaluate_instance(instance, threshold).await {
            Ok(outcome) if scheduled_for_backup => outcome.escalate_to_remediation(),
            Ok(outcome) => outcome,
            Err(err) => {
                let classification = self.ctx.classify(&err, instance);
                report.record_failure(self.ctx.report_failure(instance, classification).await);
                return;
            }
        };

        info!(instance, outcome = outcome.label(), "Instance evaluated");

        if let Some(alert) = Alert::for_backup(instance, &outcome) {
            self.ctx.alert(alert).await;
        }
        report.record_outcome(MonitoredResource::database(self.ctx.project(), instance), outcome);
    }

    /// Fetch and evaluate the latest backup of `instance`
    pub async fn evaluate_instance(
        &self,
        instance: &str,
        threshold: Option<i64>,
    ) -> Result<EvaluationOutcome> {
        let state = self.ctx.fetcher().latest_backup(instance).await?;
        self.ctx.evaluator().evaluate_backup(&state, threshold)
    }

    /// Back up every listed instance
    pub async fn remediate(&self, instances: &[String], report: &mut RunReport) {
        for instance in instances {
            match self.initiate_backup(instance).await {
                Ok(()) => report.backups_initiated.push(instance.clone()),
                Err(err) => {
                    let classification = self.ctx.classify(&err, instance);
                    report.record_failure(self.ctx.report_failure(instance, classification).await);
                }
            }
            self.ctx.pause(self.ctx.pacing().resource_delay).await;
        }
    }

    /// Issue a backup, wait for it to settle and announce it
    pub async fn initiate_backup(&self, instance: &str) -> Result<()> {
        info!(instance, "Initiating backup");

        let project = self.ctx.project();
        let operation = self
            .ctx
            .retry()
            .execute("backup_runs.insert", || {
                self.ctx.admin().insert_backup(project, instance)
            })
            .await?;

        self.ctx.pause(self.ctx.pacing().settle_interval).await;

        info!(
            instance,
            operation = operation.name.as_deref().unwrap_or("unknown"),
            operation_type = operation.operation_type(),
            "Backup initiated"
        );

        self.ctx
            .alert(Alert::BackupInitiated {
                instance: instance.to_string(),
                operation_type: operation.operation_type().to_string(),
                project: operation.target_project().to_string(),
            })
            .await;

        Ok(())
    }
}
