//! Evaluation and failure outcomes

use serde::Serialize;

/// Result of evaluating one resource in one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    /// Within threshold
    Compliant,
    /// Older than threshold; alert only
    StaleNeedsAlert { elapsed: i64, threshold: i64 },
    /// Older than threshold and a backup is scheduled in this run
    StaleNeedsRemediation { elapsed: i64, threshold: i64 },
    /// A backup is in progress; not evaluated this pass
    RunningSkip,
    /// Latest backup finished in a state other than SUCCESSFUL
    UnsuccessfulBackup { backup_id: String, status: String },
    /// The instance has no backup runs at all
    NoBackupHistory,
}

impl EvaluationOutcome {
    /// Whether the threshold was exceeded
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            EvaluationOutcome::StaleNeedsAlert { .. } | EvaluationOutcome::StaleNeedsRemediation { .. }
        )
    }

    /// Mark a stale outcome as covered by a backup issued later in the run
    #[must_use]
    pub fn escalate_to_remediation(self) -> Self {
        match self {
            EvaluationOutcome::StaleNeedsAlert { elapsed, threshold } => {
                EvaluationOutcome::StaleNeedsRemediation { elapsed, threshold }
            }
            other => other,
        }
    }

    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            EvaluationOutcome::Compliant => "compliant",
            EvaluationOutcome::StaleNeedsAlert { .. } => "stale_needs_alert",
            EvaluationOutcome::StaleNeedsRemediation { .. } => "stale_needs_remediation",
            EvaluationOutcome::RunningSkip => "running_skip",
            EvaluationOutcome::UnsuccessfulBackup { .. } => "unsuccessful_backup",
            EvaluationOutcome::NoBackupHistory => "no_backup_history",
        }
    }
}

/// Classification of a failed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Another operation is already in progress on the resource
    Conflict,
    /// Resource is missing or not accessible
    InvalidResource,
    /// Any other API error response
    ApiError,
    /// Request payload malformed
    BadRequest,
    /// Anything else
    Unexpected,
}

impl OutcomeKind {
    /// HTTP status reported for this kind
    pub fn status(&self) -> u16 {
        match self {
            OutcomeKind::Conflict => 409,
            OutcomeKind::InvalidResource => 403,
            OutcomeKind::ApiError => 404,
            OutcomeKind::BadRequest => 400,
            OutcomeKind::Unexpected => 417,
        }
    }

    /// Whether a failure of this kind is announced on the channel
    pub fn sends_alert(&self) -> bool {
        !matches!(self, OutcomeKind::ApiError)
    }

    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeKind::Conflict => "conflict",
            OutcomeKind::InvalidResource => "invalid_resource",
            OutcomeKind::ApiError => "api_error",
            OutcomeKind::BadRequest => "bad_request",
            OutcomeKind::Unexpected => "unexpected",
        }
    }
}
