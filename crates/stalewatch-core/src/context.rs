//! Process-wide services and per-run context
//!
//! [`Services`] is built once at start-up and shared by every run. A
//! [`RunContext`] is built per request from the services and the request's
//! [`RunMetadata`]; it owns the run's notification dispatcher and tracing span
//! and is passed explicitly to everything the run does.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info_span, Span};
use uuid::Uuid;

use crate::admin::{AdminApi, GcpAdminClient};
use crate::alerting::{
    Classification, ErrorClassifier, MessagingConnector, NotificationDispatcher, PolicyEvaluator,
    SlackConnector,
};
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, PacingConfig};
use crate::error::{Error, Result};
use crate::fetcher::StateFetcher;
use crate::models::{Alert, FailureRecord, RunMetadata};
use crate::retry::RetryPolicy;

/// Log label identifying the kind of workload that emits entries
pub const RESOURCE_TYPE: &str = "cloud_run_revision";

/// Shared collaborators
#[derive(Clone)]
pub struct Services {
    /// Administrative API client
    pub admin: Arc<dyn AdminApi>,
    /// Builds a messaging client per run token
    pub messaging: Arc<dyn MessagingConnector>,
    /// Wraps every remote call
    pub retry: RetryPolicy,
    /// Source of "now"
    pub clock: Arc<dyn Clock>,
    /// Waits between remote calls
    pub pacing: PacingConfig,
}

impl Services {
    /// Build the production services from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            admin: Arc::new(GcpAdminClient::new(&config.admin)?),
            messaging: Arc::new(SlackConnector::new(&config.messaging)?),
            retry: RetryPolicy::from_config(&config.retry),
            clock: Arc::new(SystemClock),
            pacing: config.pacing.clone(),
        })
    }
}

/// Everything one run needs
pub struct RunContext {
    services: Services,
    metadata: RunMetadata,
    dispatcher: NotificationDispatcher,
    span: Span,
    alerts_sent: AtomicUsize,
}

impl RunContext {
    /// Create the context for one run
    pub fn new(services: &Services, metadata: RunMetadata) -> Self {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "run",
            %run_id,
            project_id = %metadata.project_id,
            service_name = %metadata.service_name,
            region = %metadata.region,
            resource_type = RESOURCE_TYPE
        );

        let client = services.messaging.connect(&metadata.token);
        let dispatcher = NotificationDispatcher::new(client, metadata.channel.clone());

        Self {
            services: services.clone(),
            metadata,
            dispatcher,
            span,
            alerts_sent: AtomicUsize::new(0),
        }
    }

    /// Span every log line of the run belongs to
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Project under check
    pub fn project(&self) -> &str {
        &self.metadata.project_id
    }

    /// Administrative API client
    pub fn admin(&self) -> &dyn AdminApi {
        self.services.admin.as_ref()
    }

    /// Retry policy for remote calls
    pub fn retry(&self) -> &RetryPolicy {
        &self.services.retry
    }

    /// Pacing intervals
    pub fn pacing(&self) -> &PacingConfig {
        &self.services.pacing
    }

    /// State fetcher bound to this run's project
    pub fn fetcher(&self) -> StateFetcher<'_> {
        StateFetcher::new(self.admin(), self.retry(), self.project())
    }

    /// Evaluator reading this run's clock
    pub fn evaluator(&self) -> PolicyEvaluator {
        PolicyEvaluator::new(Arc::clone(&self.services.clock))
    }

    /// Classify and log a failure; the log carries the caller's location
    #[track_caller]
    pub fn classify(&self, err: &Error, resource: &str) -> Classification {
        ErrorClassifier::classify(err, resource)
    }

    /// Send the alert a classified failure calls for and turn it into a
    /// report entry
    pub async fn report_failure(
        &self,
        resource: &str,
        classification: Classification,
    ) -> FailureRecord {
        if let Some(alert) = classification.alert {
            self.alert(alert).await;
        }

        FailureRecord {
            resource: resource.to_string(),
            kind: classification.kind,
            status: classification.status,
            message: classification.message,
        }
    }

    /// Post an alert to the run's channel
    pub async fn alert(&self, alert: Alert) -> bool {
        let delivered = self.dispatcher.notify(&alert).await;
        if delivered {
            self.alerts_sent.fetch_add(1, Ordering::Relaxed);
        }
        delivered
    }

    /// Alerts delivered so far
    pub fn alerts_sent(&self) -> usize {
        self.alerts_sent.load(Ordering::Relaxed)
    }

    /// Wait between remote calls
    pub async fn pause(&self, interval: Duration) {
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }
}
