//! Alerting for Stalewatch
//!
//! Threshold evaluation, failure classification and notification delivery.

mod classifier;
mod evaluator;
mod notifier;

pub use classifier::{Classification, ErrorClassifier};
pub use evaluator::PolicyEvaluator;
pub use notifier::{
    Channel, MessagingClient, MessagingConnector, NotificationDispatcher, SlackClient,
    SlackConnector,
};
