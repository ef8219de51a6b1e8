//! AWS SQS and SNS senders.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::config::{Credentials, Region};
use feedrelay_shared::config::{QUEUE_PROVIDER_AWS_SNS, QUEUE_PROVIDER_AWS_SQS};
use feedrelay_shared::{AwsCredentials, FeedRelayError, Result, SnsConfig, SqsConfig};

use crate::queue::{QueueMessage, QueueSender};

/// Shared SDK config: explicit region, static keys when both are configured,
/// otherwise the default credential chain.
async fn sdk_config(region: &str, credentials: &AwsCredentials) -> aws_config::SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
    if let (Some(key), Some(secret)) = (&credentials.access_key_id, &credentials.secret_access_key) {
        loader = loader.credentials_provider(Credentials::new(
            key.clone(),
            secret.clone(),
            None,
            None,
            "feedrelay-config",
        ));
    }
    loader.load().await
}

fn string_body(message: &QueueMessage) -> String {
    String::from_utf8_lossy(&message.body).into_owned()
}

// ---------------------------------------------------------------------------
// SQS
// ---------------------------------------------------------------------------

/// Sends messages to one SQS queue.
pub struct SqsSender {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsSender {
    pub async fn from_config(config: &SqsConfig) -> Self {
        let sdk = sdk_config(&config.region, &config.credentials).await;
        Self {
            client: aws_sdk_sqs::Client::new(&sdk),
            queue_url: config.queue_url.clone(),
        }
    }
}

#[async_trait]
impl QueueSender for SqsSender {
    fn provider(&self) -> &'static str {
        QUEUE_PROVIDER_AWS_SQS
    }

    async fn send(&self, message: QueueMessage) -> Result<()> {
        let mut attributes = HashMap::new();
        for (name, value) in &message.attributes {
            let attr = aws_sdk_sqs::types::MessageAttributeValue::builder()
                .data_type("String")
                .string_value(value)
                .build()
                .map_err(|e| FeedRelayError::Network(format!("sqs attribute {name}: {e}")))?;
            attributes.insert(name.clone(), attr);
        }

        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(string_body(&message))
            .set_message_attributes(Some(attributes))
            .send()
            .await
            .map_err(|e| {
                FeedRelayError::Network(format!(
                    "sqs send_message: {}",
                    aws_sdk_sqs::error::DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SNS
// ---------------------------------------------------------------------------

/// Publishes messages to one SNS topic.
pub struct SnsSender {
    client: aws_sdk_sns::Client,
    topic_arn: String,
}

impl SnsSender {
    pub async fn from_config(config: &SnsConfig) -> Self {
        let sdk = sdk_config(&config.region, &config.credentials).await;
        Self {
            client: aws_sdk_sns::Client::new(&sdk),
            topic_arn: config.topic_arn.clone(),
        }
    }
}

#[async_trait]
impl QueueSender for SnsSender {
    fn provider(&self) -> &'static str {
        QUEUE_PROVIDER_AWS_SNS
    }

    async fn send(&self, message: QueueMessage) -> Result<()> {
        let mut attributes = HashMap::new();
        for (name, value) in &message.attributes {
            let attr = aws_sdk_sns::types::MessageAttributeValue::builder()
                .data_type("String")
                .string_value(value)
                .build()
                .map_err(|e| FeedRelayError::Network(format!("sns attribute {name}: {e}")))?;
            attributes.insert(name.clone(), attr);
        }

        self.client
            .publish()
            .topic_arn(&self.topic_arn)
            .message(string_body(&message))
            .set_message_attributes(Some(attributes))
            .send()
            .await
            .map_err(|e| {
                FeedRelayError::Network(format!(
                    "sns publish: {}",
                    aws_sdk_sns::error::DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }
}
