//! Request payloads for the two entry points

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use super::resource::Threshold;

/// Run metadata as it arrives; every field is required
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataInput {
    /// Channel alerts are posted to
    #[serde(rename = "slackChannelName")]
    pub channel: Option<String>,
    /// Project to check
    #[serde(rename = "projectID")]
    pub project_id: Option<String>,
    /// Service label attached to log entries
    #[serde(rename = "serviceName")]
    pub service_name: Option<String>,
    /// Region label attached to log entries
    pub region: Option<String>,
    /// Messaging API token
    #[serde(rename = "slackToken")]
    pub token: Option<String>,
}

/// A required metadata field was absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingField(pub &'static str);

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Please provide {}", self.0)
    }
}

impl std::error::Error for MissingField {}

impl MetadataInput {
    /// Check fields in the order callers have always been told about them
    pub fn validate(self) -> Result<RunMetadata, MissingField> {
        let project_id = self.project_id.ok_or(MissingField("projectID"))?;
        let service_name = self.service_name.ok_or(MissingField("serviceName"))?;
        let region = self.region.ok_or(MissingField("region"))?;
        let channel = self.channel.ok_or(MissingField("slackChannelName"))?;
        let token = self.token.ok_or(MissingField("slackToken"))?;

        Ok(RunMetadata {
            channel,
            project_id,
            service_name,
            region,
            token,
        })
    }
}

/// Validated per-run settings
#[derive(Clone, PartialEq, Eq)]
pub struct RunMetadata {
    /// Channel alerts are posted to
    pub channel: String,
    /// Project to check
    pub project_id: String,
    /// Service label attached to log entries
    pub service_name: String,
    /// Region label attached to log entries
    pub region: String,
    /// Messaging API token
    pub token: String,
}

impl fmt::Debug for RunMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunMetadata")
            .field("channel", &self.channel)
            .field("project_id", &self.project_id)
            .field("service_name", &self.service_name)
            .field("region", &self.region)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Backup batch section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupBatch {
    /// Instances to check (check-only) or to back up (remediate)
    #[serde(default)]
    pub instances: Option<Vec<String>>,
    /// Instance to threshold in minutes
    #[serde(default)]
    pub threshold: Option<BTreeMap<String, Threshold>>,
}

/// Credential-key batch section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyBatch {
    /// Accounts exempt from the age check
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Account (display name or email) to threshold in days
    #[serde(default)]
    pub threshold: BTreeMap<String, Threshold>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full() -> serde_json::Value {
        json!({
            "slackChannelName": "ops-alerts",
            "projectID": "demo-project",
            "serviceName": "db-backups",
            "region": "us-central1",
            "slackToken": "xoxb-secret"
        })
    }

    #[test]
    fn test_validate_full_metadata() {
        let input: MetadataInput = serde_json::from_value(full()).unwrap();
        let metadata = input.validate().unwrap();
        assert_eq!(metadata.project_id, "demo-project");
        assert_eq!(metadata.channel, "ops-alerts");
        assert!(!format!("{metadata:?}").contains("xoxb-secret"));
    }

    #[test]
    fn test_first_missing_field_wins() {
        let mut value = full();
        value.as_object_mut().unwrap().remove("region");
        value.as_object_mut().unwrap().remove("slackToken");

        let input: MetadataInput = serde_json::from_value(value).unwrap();
        let missing = input.validate().unwrap_err();
        assert_eq!(missing, MissingField("region"));
        assert_eq!(missing.to_string(), "Please provide region");
    }

    #[test]
    fn test_batches_ignore_metadata_fields() {
        let mut value = full();
        value["instances"] = json!(["orders-db"]);
        value["threshold"] = json!({"orders-db": 60});

        let batch: BackupBatch = serde_json::from_value(value).unwrap();
        assert_eq!(batch.instances.unwrap(), vec!["orders-db".to_string()]);
        assert_eq!(batch.threshold.unwrap()["orders-db"], Threshold::new(60));
    }

    #[test]
    fn test_key_batch_defaults() {
        let batch: KeyBatch = serde_json::from_value(full()).unwrap();
        assert!(batch.exclude.is_empty());
        assert!(batch.threshold.is_empty());
    }
}
