//! Failure classification
//!
//! Every failure that ends a resource's evaluation, or a whole run, is mapped
//! to exactly one [`OutcomeKind`] here. The match over [`Error`] has no
//! catch-all arm, so a new variant will not compile until it is classified.

use std::panic::Location;

use tracing::error;

use crate::error::Error;
use crate::models::{Alert, OutcomeKind};

/// How a failure is reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Failure class
    pub kind: OutcomeKind,
    /// HTTP status the class maps to
    pub status: u16,
    /// Failure text for logs and response bodies
    pub message: String,
    /// Alert to send, if the class is alerted
    pub alert: Option<Alert>,
}

/// Maps failures to outcome kinds, statuses and alerts
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify `err` raised while working on `resource`, logging it at ERROR
    /// with the caller's source location.
    #[track_caller]
    pub fn classify(err: &Error, resource: &str) -> Classification {
        let caller = Location::caller();
        let location = format!("{}:{}:{}", caller.file(), caller.line(), caller.column());
        let classification = Self::map(err, resource);

        error!(
            location = %location,
            resource,
            kind = classification.kind.label(),
            status = classification.status,
            error = %err,
            "Resource evaluation failed"
        );
        metrics::counter!(
            "stalewatch_failures_total",
            "kind" => classification.kind.label()
        )
        .increment(1);

        classification
    }

    /// The classification table itself, without side effects
    pub fn map(err: &Error, resource: &str) -> Classification {
        let kind = match err {
            Error::Api { status: 409, .. } => OutcomeKind::Conflict,
            Error::Api {
                status: 403 | 404, ..
            } => OutcomeKind::InvalidResource,
            Error::Api { .. } => OutcomeKind::ApiError,
            Error::BadRequest(_) => OutcomeKind::BadRequest,
            Error::Transient { .. }
            | Error::MalformedTimestamp(_)
            | Error::Messaging(_)
            | Error::Config(_)
            | Error::Internal(_)
            | Error::Io(_)
            | Error::Serialization(_) => OutcomeKind::Unexpected,
        };

        let message = match err {
            Error::Api { message, .. } => message.clone(),
            other => other.to_string(),
        };

        let alert = match kind {
            OutcomeKind::Conflict => Some(Alert::BackupInProgress {
                instance: resource.to_string(),
            }),
            OutcomeKind::InvalidResource => Some(Alert::InvalidResource {
                resource: resource.to_string(),
            }),
            OutcomeKind::ApiError => None,
            OutcomeKind::BadRequest => Some(Alert::InvalidRequest),
            OutcomeKind::Unexpected => Some(Alert::Unexpected {
                detail: message.clone(),
            }),
        };

        Classification {
            kind,
            status: kind.status(),
            message,
            alert,
        }
    }
}
