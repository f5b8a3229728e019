//! Service-account key age

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::context::RunContext;
use crate::models::{
    Alert, FailureRecord, KeyBatch, MonitoredResource, ResourceKind, RunReport, ServiceAccount,
    Threshold, DEFAULT_THRESHOLD_DAYS,
};

/// Accounts to evaluate and the names that matched nothing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountResolution {
    /// Account email to threshold in days
    pub thresholds: BTreeMap<String, i64>,
    /// Threshold entries naming no existing account
    pub unresolved: Vec<String>,
}

/// Excluded names that match no listed account
pub fn missing_exclusions<'n>(exclude: &'n [String], accounts: &[ServiceAccount]) -> Vec<&'n str> {
    exclude
        .iter()
        .filter(|name| !accounts.iter().any(|a| a.matches(name)))
        .map(String::as_str)
        .collect()
}

/// Map every non-excluded account to its threshold.
///
/// Accounts the request does not name get the default; named accounts are
/// matched on display name or email and resolved to their email.
pub fn resolve_accounts(
    accounts: &[ServiceAccount],
    exclude: &[String],
    thresholds: &BTreeMap<String, Threshold>,
) -> AccountResolution {
    let excluded = |account: &ServiceAccount| exclude.iter().any(|name| account.matches(name));
    let mut resolution = AccountResolution::default();

    for account in accounts.iter().filter(|a| !excluded(*a)) {
        resolution
            .thresholds
            .insert(account.email.clone(), DEFAULT_THRESHOLD_DAYS);
    }

    for (name, threshold) in thresholds {
        match accounts.iter().find(|a| a.matches(name)) {
            None => resolution.unresolved.push(name.clone()),
            Some(account) if excluded(account) => {}
            Some(account) => {
                resolution.thresholds.insert(
                    account.email.clone(),
                    threshold.resolve(ResourceKind::CredentialKey),
                );
            }
        }
    }

    resolution
}

/// One credential-key run
pub struct KeyCheck<'a> {
    ctx: &'a RunContext,
}

impl<'a> KeyCheck<'a> {
    /// Create a check for the run in `ctx`
    pub fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    /// Carry out the batch.
    ///
    /// Failing to list the project's accounts aborts the run; any later
    /// failure only abandons the account it belongs to.
    pub async fn run(&self, batch: KeyBatch) -> Result<RunReport, FailureRecord> {
        let mut report = RunReport::default();
        let project = self.ctx.project();

        let accounts = match self.ctx.fetcher().service_accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                let classification = self.ctx.classify(&err, project);
                return Err(self.ctx.report_failure(project, classification).await);
            }
        };
        info!(accounts = accounts.len(), "Service accounts listed");

        for name in missing_exclusions(&batch.exclude, &accounts) {
            warn!(account = name, "Excluded service account does not exist");
            self.ctx
                .alert(Alert::MissingServiceAccount {
                    name: name.to_string(),
                })
                .await;
        }

        let resolution = resolve_accounts(&accounts, &batch.exclude, &batch.threshold);
        for name in resolution.unresolved {
            warn!(account = %name, "Monitored service account does not exist");
            self.ctx.alert(Alert::MissingServiceAccount { name }).await;
        }

        for (email, threshold) in &resolution.thresholds {
            self.check_account(email, *threshold, &mut report).await;
            self.ctx.pause(self.ctx.pacing().resource_delay).await;
        }

        report.alerts_sent = self.ctx.alerts_sent();
        info!(
            evaluated = report.outcomes.len(),
            failed = report.failures.len(),
            "Key run finished"
        );
        Ok(report)
    }

    /// Evaluate every user-managed key of one account
    pub async fn check_account(&self, email: &str, threshold: i64, report: &mut RunReport) {
        let keys = match self.ctx.fetcher().user_managed_keys(email).await {
            Ok(keys) => keys,
            Err(err) => {
                let classification = self.ctx.classify(&err, email);
                report.record_failure(self.ctx.report_failure(email, classification).await);
                return;
            }
        };

        let evaluator = self.ctx.evaluator();
        for key in keys {
            let outcome = match evaluator.evaluate_key(&key, threshold) {
                Ok(outcome) => outcome,
                Err(err) => {
                    let classification = self.ctx.classify(&err, &key.name);
                    report.record_failure(self.ctx.report_failure(&key.name, classification).await);
                    continue;
                }
            };

            info!(
                account = email,
                key_id = key.key_id(),
                outcome = outcome.label(),
                "Key evaluated"
            );

            if outcome.is_stale() {
                self.ctx
                    .alert(Alert::KeyExpired {
                        account: email.to_string(),
                        key_id: key.key_id().to_string(),
                    })
                    .await;
            }
            report.record_outcome(
                MonitoredResource::credential_key(self.ctx.project(), key.name),
                outcome,
            );
        }
    }
}
