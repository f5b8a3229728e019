//! Monitored resources and their thresholds

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize};

/// Threshold used when the caller passes the "None" sentinel, in days
pub const DEFAULT_THRESHOLD_DAYS: i64 = 90;

/// Minutes in a day, for database thresholds
pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Kind of monitored resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Cloud SQL instance, checked on backup freshness (minutes)
    Database,
    /// Service-account key, checked on age (days)
    CredentialKey,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Database => write!(f, "database"),
            ResourceKind::CredentialKey => write!(f, "credential_key"),
        }
    }
}

/// A resource under policy for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitoredResource {
    /// Instance name or key resource name
    pub identifier: String,
    /// Kind of resource
    pub kind: ResourceKind,
    /// Owning project
    pub project: String,
}

impl MonitoredResource {
    /// A Cloud SQL instance
    pub fn database(project: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            identifier: instance.into(),
            kind: ResourceKind::Database,
            project: project.into(),
        }
    }

    /// A service-account key, identified by its full resource name
    pub fn credential_key(project: impl Into<String>, key_name: impl Into<String>) -> Self {
        Self {
            identifier: key_name.into(),
            kind: ResourceKind::CredentialKey,
            project: project.into(),
        }
    }
}

/// Threshold as supplied by the caller.
///
/// Accepts a non-negative integer, a numeric string, `"None"` or null. The
/// last two mean "use the default".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Threshold(Option<i64>);

impl Threshold {
    /// An explicit threshold
    pub fn new(value: i64) -> Self {
        Self(Some(value))
    }

    /// The "None" sentinel
    pub fn unset() -> Self {
        Self(None)
    }

    /// Explicit value, if any
    pub fn value(&self) -> Option<i64> {
        self.0
    }

    /// Threshold in the unit of `kind`, falling back to 90 days
    pub fn resolve(&self, kind: ResourceKind) -> i64 {
        self.0.unwrap_or(match kind {
            ResourceKind::Database => DEFAULT_THRESHOLD_DAYS * MINUTES_PER_DAY,
            ResourceKind::CredentialKey => DEFAULT_THRESHOLD_DAYS,
        })
    }
}

impl<'de> Deserialize<'de> for Threshold {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        let value = match Option::<Raw>::deserialize(deserializer)? {
            None => None,
            Some(Raw::Number(n)) => Some(n),
            Some(Raw::Text(text)) => match text.trim() {
                "" | "None" | "none" | "null" => None,
                digits => Some(digits.parse::<i64>().map_err(|_| {
                    de::Error::custom(format!("threshold `{text}` is not a whole number"))
                })?),
            },
        };

        match value {
            Some(n) if n < 0 => Err(de::Error::custom(format!(
                "threshold must not be negative, got {n}"
            ))),
            other => Ok(Threshold(other)),
        }
    }
}
