//! IAM service accounts and keys

use serde::{Deserialize, Serialize};

/// A service account in a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    /// Canonical email
    pub email: String,

    /// Human-readable name
    #[serde(default)]
    pub display_name: Option<String>,

    /// Full resource name
    #[serde(default)]
    pub name: Option<String>,

    /// Whether the account is disabled
    #[serde(default)]
    pub disabled: bool,
}

impl ServiceAccount {
    /// Whether `name` refers to this account, by display name or email
    pub fn matches(&self, name: &str) -> bool {
        self.email == name || self.display_name.as_deref() == Some(name)
    }
}

/// `serviceAccounts.list` response page
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountList {
    /// Accounts on this page
    #[serde(default)]
    pub accounts: Vec<ServiceAccount>,
    /// Token for the next page, absent on the last one
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Who manages a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyType {
    /// Created and rotated by a user; subject to the age policy
    UserManaged,
    /// Rotated by Google; exempt
    SystemManaged,
    /// Missing or unrecognised
    #[default]
    #[serde(other)]
    KeyTypeUnspecified,
}

/// A service-account key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountKey {
    /// `projects/{project}/serviceAccounts/{email}/keys/{key}`
    pub name: String,

    /// Key management type
    #[serde(default)]
    pub key_type: KeyType,

    /// Creation time
    #[serde(default)]
    pub valid_after_time: Option<String>,

    /// Expiry time, if any
    #[serde(default)]
    pub valid_before_time: Option<String>,
}

impl ServiceAccountKey {
    /// Trailing key id of the resource name
    pub fn key_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Whether the age policy applies
    pub fn is_user_managed(&self) -> bool {
        self.key_type == KeyType::UserManaged
    }
}

/// `serviceAccounts.keys.list` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceAccountKeyList {
    /// Every key of the account
    #[serde(default)]
    pub keys: Vec<ServiceAccountKey>,
}
