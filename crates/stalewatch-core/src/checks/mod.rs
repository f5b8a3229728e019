//! The two entry behaviours: backup freshness and credential-key age
//!
//! Both entries take the raw request body so that malformed input is reported
//! the same way whether the run came in over HTTP or from the CLI.

mod backup;
mod keys;

pub use backup::{BackupCheck, BackupPlan};
pub use keys::{missing_exclusions, resolve_accounts, AccountResolution, KeyCheck};

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{error, warn, Instrument};

use crate::alerting::ErrorClassifier;
use crate::context::{RunContext, Services};
use crate::error::Error;
use crate::models::{MetadataInput, RunReport};

/// Acknowledgement returned for every run that was carried out
pub const SUCCESS_MESSAGE: &str = "Processes successfully initiated.";

/// Which backup behaviour a request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupMode {
    /// Evaluate staleness only
    CheckOnly,
    /// Evaluate staleness, then back up every listed instance
    CheckAndRemediate,
}

/// Status and JSON body an entry answers with
#[derive(Debug, Clone, PartialEq)]
pub struct EntryResponse {
    /// HTTP status code
    pub status: u16,
    /// JSON body
    pub body: Value,
}

impl EntryResponse {
    /// Run completed; per-resource failures live in the report
    pub fn success(report: &RunReport) -> Self {
        Self {
            status: 200,
            body: json!({ "info": SUCCESS_MESSAGE, "report": report }),
        }
    }

    /// Run rejected or aborted
    pub fn failure(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Backup entry: `/` (check and remediate) and `/checkBackup` (check only)
pub async fn backup_entry(services: &Services, body: &[u8], mode: BackupMode) -> EntryResponse {
    let (ctx, request) = match open_run(services, body) {
        Ok(opened) => opened,
        Err(response) => return response,
    };
    let span = ctx.span().clone();

    async move {
        let plan = match parse_batch(&request).and_then(|batch| BackupPlan::new(batch, mode)) {
            Ok(plan) => plan,
            Err(err) => return reject_batch(&ctx, &err).await,
        };

        let report = BackupCheck::new(&ctx, mode).run(plan).await;
        EntryResponse::success(&report)
    }
    .instrument(span)
    .await
}

/// Credential-key entry: `/keys`
pub async fn key_entry(services: &Services, body: &[u8]) -> EntryResponse {
    let (ctx, request) = match open_run(services, body) {
        Ok(opened) => opened,
        Err(response) => return response,
    };
    let span = ctx.span().clone();

    async move {
        let batch = match parse_batch(&request) {
            Ok(batch) => batch,
            Err(err) => return reject_batch(&ctx, &err).await,
        };

        match KeyCheck::new(&ctx).run(batch).await {
            Ok(report) => EntryResponse::success(&report),
            Err(failure) => EntryResponse::failure(failure.status, failure.message),
        }
    }
    .instrument(span)
    .await
}

/// Parse the body and validate run metadata, producing the run's context.
///
/// Nothing can be alerted yet, so rejections here are only logged.
fn open_run(services: &Services, body: &[u8]) -> Result<(RunContext, Value), EntryResponse> {
    let request: Value = serde_json::from_slice(body).map_err(|e| {
        let c = ErrorClassifier::classify(&Error::bad_request(e.to_string()), "request");
        EntryResponse::failure(c.status, c.message)
    })?;

    if !request.is_object() {
        let c = ErrorClassifier::classify(
            &Error::bad_request("request body must be a JSON object"),
            "request",
        );
        return Err(EntryResponse::failure(c.status, c.message));
    }

    let metadata = serde_json::from_value::<MetadataInput>(request.clone())
        .map_err(|e| {
            let c = ErrorClassifier::classify(&Error::bad_request(e.to_string()), "request");
            EntryResponse::failure(c.status, c.message)
        })?
        .validate()
        .map_err(|missing| {
            warn!(field = missing.0, "Request rejected, metadata incomplete");
            EntryResponse::failure(403, missing.to_string())
        })?;

    Ok((RunContext::new(services, metadata), request))
}

fn parse_batch<T: DeserializeOwned>(request: &Value) -> Result<T, Error> {
    T::deserialize(request).map_err(|e| Error::bad_request(e.to_string()))
}

async fn reject_batch(ctx: &RunContext, err: &Error) -> EntryResponse {
    let classification = ctx.classify(err, "request");
    error!(error = %err, "Request batch rejected");
    let failure = ctx.report_failure("request", classification).await;
    EntryResponse::failure(failure.status, failure.message)
}
