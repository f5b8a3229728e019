//! Per-run report returned by both entry points

use serde::Serialize;

use super::outcome::{EvaluationOutcome, OutcomeKind};
use super::resource::MonitoredResource;

/// Outcome for one evaluated resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceOutcome {
    /// The evaluated instance or key
    pub resource: MonitoredResource,
    /// What the evaluation decided
    #[serde(flatten)]
    pub outcome: EvaluationOutcome,
}

/// A resource whose evaluation was abandoned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    /// Instance, account or key the failure belongs to
    pub resource: String,
    /// Classification
    pub kind: OutcomeKind,
    /// Status the classification maps to
    pub status: u16,
    /// Failure text
    pub message: String,
}

/// Everything one run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// One entry per evaluated resource
    pub outcomes: Vec<ResourceOutcome>,
    /// Resources abandoned after a failure
    pub failures: Vec<FailureRecord>,
    /// Instances a backup was issued for
    pub backups_initiated: Vec<String>,
    /// Alerts delivered to the channel
    pub alerts_sent: usize,
}

impl RunReport {
    /// Record an evaluation
    pub fn record_outcome(&mut self, resource: MonitoredResource, outcome: EvaluationOutcome) {
        self.outcomes.push(ResourceOutcome { resource, outcome });
    }

    /// Record an abandoned resource
    pub fn record_failure(&mut self, failure: FailureRecord) {
        self.failures.push(failure);
    }

    /// Outcome recorded for the resource identified by `identifier`, if any
    pub fn outcome_for(&self, identifier: &str) -> Option<&EvaluationOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.resource.identifier == identifier)
            .map(|o| &o.outcome)
    }
}
