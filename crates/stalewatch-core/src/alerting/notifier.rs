//! Notification delivery for alerts

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::MessagingConfig;
use crate::error::{Error, Result};
use crate::models::Alert;

/// A channel visible to the messaging client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Channel {
    /// Channel id messages are posted to
    pub id: String,
    /// Channel name without the leading `#`
    #[serde(default)]
    pub name: String,
}

/// A messaging workspace, authenticated with one token
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Every channel the token can see
    async fn list_channels(&self) -> Result<Vec<Channel>>;

    /// Publish `text` to a channel as one formatted block
    async fn post_message(&self, channel_id: &str, text: &str) -> Result<()>;
}

/// Builds a messaging client for a per-run token
pub trait MessagingConnector: Send + Sync {
    /// Client authenticated with `token`
    fn connect(&self, token: &str) -> Arc<dyn MessagingClient>;
}

/// Slack Web API connector
#[derive(Clone)]
pub struct SlackConnector {
    client: Client,
    api_url: String,
}

impl SlackConnector {
    /// Create a connector from configuration
    pub fn new(config: &MessagingConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }
}

impl MessagingConnector for SlackConnector {
    fn connect(&self, token: &str) -> Arc<dyn MessagingClient> {
        Arc::new(SlackClient {
            client: self.client.clone(),
            api_url: self.api_url.clone(),
            token: token.to_string(),
        })
    }
}

/// Slack Web API client for one bot token
pub struct SlackClient {
    client: Client,
    api_url: String,
    token: String,
}

impl SlackClient {
    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.api_url, method)
    }
}

#[async_trait]
impl MessagingClient for SlackClient {
    async fn list_channels(&self) -> Result<Vec<Channel>> {
        let mut channels = Vec::new();
        let mut cursor = String::new();
        let mut seen = HashSet::new();

        loop {
            let mut query = vec![("limit", "1000")];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.as_str()));
            }

            let page: ConversationsList = self
                .client
                .get(self.method_url("conversations.list"))
                .bearer_auth(&self.token)
                .query(&query)
                .send()
                .await?
                .json()
                .await?;

            if !page.ok {
                return Err(Error::Messaging(
                    page.error.unwrap_or_else(|| "conversations.list failed".to_string()),
                ));
            }

            channels.extend(page.channels);

            match page.response_metadata.and_then(|m| m.next_cursor) {
                Some(next) if !next.is_empty() && seen.insert(next.clone()) => cursor = next,
                Some(next) if !next.is_empty() => {
                    warn!(cursor = %next, "Channel cursor repeated, listing stopped");
                    break;
                }
                _ => break,
            }
        }

        Ok(channels)
    }

    async fn post_message(&self, channel_id: &str, text: &str) -> Result<()> {
        let payload = SlackMessage {
            channel: channel_id,
            blocks: vec![SlackBlock {
                kind: "section",
                text: SlackText {
                    kind: "mrkdwn",
                    text,
                },
            }],
        };

        let response: SlackResponse = self
            .client
            .post(self.method_url("chat.postMessage"))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(Error::Messaging(
                response.error.unwrap_or_else(|| "chat.postMessage failed".to_string()),
            ));
        }

        Ok(())
    }
}

/// Posts alerts for one run to one named channel.
///
/// Delivery is best effort: an unknown channel, an empty channel list or a
/// failed post never surfaces as an error.
pub struct NotificationDispatcher {
    client: Arc<dyn MessagingClient>,
    channel_name: String,
}

impl NotificationDispatcher {
    /// Create a dispatcher posting to `channel_name`
    pub fn new(client: Arc<dyn MessagingClient>, channel_name: impl Into<String>) -> Self {
        Self {
            client,
            channel_name: channel_name.into(),
        }
    }

    /// Post `alert`; returns whether it was delivered
    pub async fn notify(&self, alert: &Alert) -> bool {
        info!(
            alert = alert.label(),
            channel = %self.channel_name,
            "Dispatching notification"
        );

        let delivered = match self.deliver(&alert.to_string()).await {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!(alert = alert.label(), error = %e, "Notification delivery failed");
                false
            }
        };

        metrics::counter!(
            "stalewatch_notifications_total",
            "delivered" => delivered.to_string()
        )
        .increment(1);

        delivered
    }

    async fn deliver(&self, text: &str) -> Result<bool> {
        let channels = match self.client.list_channels().await {
            Ok(channels) => channels,
            Err(e) => {
                debug!(error = %e, "Channel listing failed, dropping notification");
                return Ok(false);
            }
        };

        let Some(channel) = channels.iter().find(|c| c.name == self.channel_name) else {
            debug!(channel = %self.channel_name, "Channel not visible, dropping notification");
            return Ok(false);
        };

        self.client.post_message(&channel.id, text).await?;
        Ok(true)
    }
}

// Slack Web API payloads

#[derive(Debug, Deserialize)]
struct ConversationsList {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channels: Vec<Channel>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct SlackMessage<'a> {
    channel: &'a str,
    blocks: Vec<SlackBlock<'a>>,
}

#[derive(Debug, Serialize)]
struct SlackBlock<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: SlackText<'a>,
}

#[derive(Debug, Serialize)]
struct SlackText<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingMessenger;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn connector_for(server: &MockServer) -> SlackConnector {
        SlackConnector::new(&MessagingConfig {
            api_url: server.uri(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_slack_lists_channels_across_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.list"))
            .and(query_param("cursor", "next-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "channels": [{"id": "C2", "name": "ops-alerts"}],
                "response_metadata": {"next_cursor": ""}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/conversations.list"))
            .and(header("authorization", "Bearer xoxb-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "channels": [{"id": "C1", "name": "general"}],
                "response_metadata": {"next_cursor": "next-1"}
            })))
            .mount(&server)
            .await;

        let channels = connector_for(&server)
            .connect("xoxb-test")
            .list_channels()
            .await
            .unwrap();

        let names: Vec<_> = channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["general", "ops-alerts"]);
    }

    #[tokio::test]
    async fn test_slack_repeated_cursor_ends_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "channels": [{"id": "C1", "name": "general"}],
                "response_metadata": {"next_cursor": "same"}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let channels = connector_for(&server)
            .connect("xoxb-test")
            .list_channels()
            .await
            .unwrap();

        assert_eq!(channels.len(), 2);
    }

    #[tokio::test]
    async fn test_slack_posts_single_mrkdwn_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(body_json(json!({
                "channel": "C2",
                "blocks": [{
                    "type": "section",
                    "text": {"type": "mrkdwn", "text": "No backup record found"}
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        connector_for(&server)
            .connect("xoxb-test")
            .post_message("C2", "No backup record found")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_slack_error_reply_is_messaging_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": false, "error": "not_in_channel"})),
            )
            .mount(&server)
            .await;

        let err = connector_for(&server)
            .connect("xoxb-test")
            .post_message("C2", "hello")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Messaging(ref m) if m == "not_in_channel"));
    }

    #[tokio::test]
    async fn test_dispatch_to_named_channel() {
        let messenger = Arc::new(RecordingMessenger::with_channels(&[
            ("C1", "general"),
            ("C2", "ops-alerts"),
        ]));
        let dispatcher = NotificationDispatcher::new(messenger.clone(), "ops-alerts");

        let delivered = dispatcher.notify(&Alert::InvalidRequest).await;

        assert!(delivered);
        assert_eq!(
            messenger.posted(),
            vec![(
                "C2".to_string(),
                "Invalid request: Please check your document syntax".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_unknown_channel_is_silent_noop() {
        let messenger = Arc::new(RecordingMessenger::with_channels(&[("C1", "general")]));
        let dispatcher = NotificationDispatcher::new(messenger.clone(), "ops-alerts");

        assert!(!dispatcher.notify(&Alert::InvalidRequest).await);
        assert!(messenger.posted().is_empty());
    }

    #[tokio::test]
    async fn test_empty_channel_list_is_silent_noop() {
        let messenger = Arc::new(RecordingMessenger::with_channels(&[]));
        let dispatcher = NotificationDispatcher::new(messenger.clone(), "ops-alerts");

        assert!(!dispatcher.notify(&Alert::InvalidRequest).await);
        assert!(messenger.posted().is_empty());
    }

    #[tokio::test]
    async fn test_failed_post_is_swallowed() {
        let messenger = Arc::new(RecordingMessenger::failing_posts(&[("C2", "ops-alerts")]));
        let dispatcher = NotificationDispatcher::new(messenger.clone(), "ops-alerts");

        assert!(!dispatcher.notify(&Alert::InvalidRequest).await);
    }
}
