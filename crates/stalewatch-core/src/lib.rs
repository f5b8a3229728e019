//! # Stalewatch
//!
//! Freshness checks for Google Cloud resources.
//!
//! Stalewatch verifies that Cloud SQL instances have a recent successful
//! backup and that user-managed service-account keys are younger than their
//! rotation threshold, and posts a chat alert for every violation.
//!
//! ## Architecture
//!
//! - **Fetcher**: retry-wrapped reads from the Cloud SQL Admin and IAM APIs
//! - **Alerting**: threshold evaluation, failure classification, Slack delivery
//! - **Checks**: the backup (check-only and check-and-remediate) and key entries
//! - **API**: HTTP front end for schedulers
//!
//! ## Quick Start
//!
//! ```bash
//! # Serve the HTTP entries
//! stalewatch serve
//!
//! # Run one backup check from a request file
//! stalewatch check-backups --request backups.json --check-only
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod admin;
pub mod alerting;
pub mod api;
pub mod checks;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod retry;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::admin::{AdminApi, GcpAdminClient};
    pub use crate::checks::{backup_entry, key_entry, BackupMode, EntryResponse};
    pub use crate::config::Config;
    pub use crate::context::{RunContext, Services};
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::retry::RetryPolicy;
}
