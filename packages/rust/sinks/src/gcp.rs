//! Google Cloud Pub/Sub sender.

use async_trait::async_trait;
use feedrelay_shared::config::QUEUE_PROVIDER_GCP;
use feedrelay_shared::{FeedRelayError, GcpQueueConfig, Result};
use google_cloud_googleapis::pubsub::v1::PubsubMessage;
use google_cloud_pubsub::client::google_cloud_auth::credentials::CredentialsFile;
use google_cloud_pubsub::client::{Client, ClientConfig};
use google_cloud_pubsub::publisher::Publisher;
use tracing::debug;

use crate::queue::{QueueMessage, QueueSender};

/// Publishes messages to one Pub/Sub topic and waits for the server ack.
pub struct GcpPubSubSender {
    topic: String,
    publisher: Publisher,
}

impl GcpPubSubSender {
    /// Authenticates with `credentials_file` when set, otherwise with
    /// application default credentials.
    pub async fn from_config(id: &str, config: &GcpQueueConfig) -> Result<Self> {
        let client_config = match config.credentials_file.as_deref() {
            Some(path) => {
                let credentials = CredentialsFile::new_from_file(path.to_string())
                    .await
                    .map_err(|e| {
                        FeedRelayError::sink_build(id, format!("read credentials {path}: {e}"))
                    })?;
                ClientConfig::default().with_credentials(credentials).await
            }
            None => ClientConfig::default().with_auth().await,
        };
        let mut client_config = client_config
            .map_err(|e| FeedRelayError::sink_build(id, format!("pubsub auth: {e}")))?;
        client_config.project_id = Some(config.project_id.clone());

        let client = Client::new(client_config)
            .await
            .map_err(|e| FeedRelayError::sink_build(id, format!("create pubsub client: {e}")))?;
        let publisher = client.topic(&config.topic).new_publisher(None);

        Ok(Self {
            topic: config.topic.clone(),
            publisher,
        })
    }
}

fn pubsub_message(message: QueueMessage) -> PubsubMessage {
    PubsubMessage {
        data: message.body,
        attributes: message.attributes.into_iter().collect(),
        ..Default::default()
    }
}

#[async_trait]
impl QueueSender for GcpPubSubSender {
    fn provider(&self) -> &'static str {
        QUEUE_PROVIDER_GCP
    }

    async fn send(&self, message: QueueMessage) -> Result<()> {
        let awaiter = self.publisher.publish(pubsub_message(message)).await;
        let message_id = awaiter.get().await.map_err(|status| {
            FeedRelayError::Network(format!("pubsub publish to {}: {status}", self.topic))
        })?;
        debug!(topic = %self.topic, %message_id, "pubsub message acknowledged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn message_carries_body_and_attributes() {
        let message = QueueMessage {
            body: br#"{"id":"x"}"#.to_vec(),
            attributes: BTreeMap::from([("provider_id".to_string(), "ndtv".to_string())]),
        };
        let pubsub = pubsub_message(message);
        assert_eq!(pubsub.data, br#"{"id":"x"}"#.to_vec());
        assert_eq!(pubsub.attributes["provider_id"], "ndtv");
        assert!(pubsub.ordering_key.is_empty());
    }

    #[tokio::test]
    async fn unreadable_credentials_file_fails_to_build() {
        let config = GcpQueueConfig {
            project_id: "feedrelay-test".into(),
            topic: "events".into(),
            credentials_file: Some("/nonexistent/feedrelay/credentials.json".into()),
        };
        let err = GcpPubSubSender::from_config("pubsub", &config)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, FeedRelayError::SinkBuild { ref sink, .. } if sink == "pubsub"));
        assert!(err.to_string().contains("credentials"));
    }
}
