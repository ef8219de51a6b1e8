//! Message queue sink.
//!
//! The sink serializes events and hands them to a [`QueueSender`]; the
//! sender owns the provider SDK. Tests swap in a recording sender.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use feedrelay_shared::config::{
    QUEUE_PROVIDER_AWS_SNS, QUEUE_PROVIDER_AWS_SQS, QUEUE_PROVIDER_AZURE, QUEUE_PROVIDER_GCP,
    SINK_TYPE_QUEUE,
};
use feedrelay_shared::{Event, FeedRelayError, QueueSinkConfig, Result};
use tracing::debug;

use crate::Sink;

/// Message attribute carrying the originating provider id.
pub const PROVIDER_ID_ATTRIBUTE: &str = "provider_id";

/// One message ready for a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub body: Vec<u8>,
    pub attributes: BTreeMap<String, String>,
}

/// Provider-specific send capability.
#[async_trait]
pub trait QueueSender: Send + Sync {
    /// Provider name, e.g. `aws-sqs`.
    fn provider(&self) -> &'static str;

    async fn send(&self, message: QueueMessage) -> Result<()>;
}

/// Publishes events as JSON messages through a [`QueueSender`].
pub struct QueueSink {
    id: String,
    sender: Arc<dyn QueueSender>,
}

impl QueueSink {
    pub fn new(id: impl Into<String>, sender: Arc<dyn QueueSender>) -> Self {
        Self {
            id: id.into(),
            sender,
        }
    }

    /// Build the sender for `config.provider`.
    pub async fn from_config(id: &str, config: &QueueSinkConfig) -> Result<Self> {
        let sender: Arc<dyn QueueSender> = match config.provider.as_str() {
            QUEUE_PROVIDER_AWS_SQS | QUEUE_PROVIDER_AWS_SNS => aws_sender(id, config).await?,
            QUEUE_PROVIDER_GCP => gcp_sender(id, config).await?,
            QUEUE_PROVIDER_AZURE => {
                return Err(FeedRelayError::sink_build(
                    id,
                    format!("queue provider {:?} is not implemented", config.provider),
                ));
            }
            other => {
                return Err(FeedRelayError::sink_build(
                    id,
                    format!("unsupported queue provider {other:?}"),
                ));
            }
        };
        Ok(Self::new(id, sender))
    }
}

#[cfg(feature = "aws")]
async fn aws_sender(id: &str, config: &QueueSinkConfig) -> Result<Arc<dyn QueueSender>> {
    use crate::aws::{SnsSender, SqsSender};

    if config.provider == QUEUE_PROVIDER_AWS_SQS {
        let sqs = config
            .sqs
            .as_ref()
            .ok_or_else(|| FeedRelayError::sink_build(id, "queue.sqs table is missing"))?;
        Ok(Arc::new(SqsSender::from_config(sqs).await))
    } else {
        let sns = config
            .sns
            .as_ref()
            .ok_or_else(|| FeedRelayError::sink_build(id, "queue.sns table is missing"))?;
        Ok(Arc::new(SnsSender::from_config(sns).await))
    }
}

#[cfg(not(feature = "aws"))]
async fn aws_sender(id: &str, config: &QueueSinkConfig) -> Result<Arc<dyn QueueSender>> {
    Err(FeedRelayError::sink_build(
        id,
        format!(
            "queue provider {:?} requires the `aws` feature",
            config.provider
        ),
    ))
}

#[cfg(feature = "gcp")]
async fn gcp_sender(id: &str, config: &QueueSinkConfig) -> Result<Arc<dyn QueueSender>> {
    let gcp = config
        .gcp
        .as_ref()
        .ok_or_else(|| FeedRelayError::sink_build(id, "queue.gcp table is missing"))?;
    Ok(Arc::new(crate::gcp::GcpPubSubSender::from_config(id, gcp).await?))
}

#[cfg(not(feature = "gcp"))]
async fn gcp_sender(id: &str, config: &QueueSinkConfig) -> Result<Arc<dyn QueueSender>> {
    Err(FeedRelayError::sink_build(
        id,
        format!(
            "queue provider {:?} requires the `gcp` feature",
            config.provider
        ),
    ))
}

#[async_trait]
impl Sink for QueueSink {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        SINK_TYPE_QUEUE
    }

    async fn publish(&self, event: &Event) -> Result<()> {
        let body = serde_json::to_vec(event)
            .map_err(|e| FeedRelayError::delivery(&self.id, format!("failed to encode event: {e}")))?;
        let message = QueueMessage {
            body,
            attributes: BTreeMap::from([(
                PROVIDER_ID_ATTRIBUTE.to_string(),
                event.source_id.clone(),
            )]),
        };

        self.sender
            .send(message)
            .await
            .map_err(|e| match e {
                FeedRelayError::Delivery { .. } => e,
                other => FeedRelayError::delivery(&self.id, other.to_string()),
            })?;
        debug!(sink = %self.id, provider = self.sender.provider(), event = %event.id, "event enqueued");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use feedrelay_shared::Item;
    use std::sync::Mutex;

    /// Sender that records messages, optionally failing every send.
    #[derive(Default)]
    pub(crate) struct RecordingSender {
        pub sent: Mutex<Vec<QueueMessage>>,
        pub fail: bool,
    }

    #[async_trait]
    impl QueueSender for RecordingSender {
        fn provider(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, message: QueueMessage) -> Result<()> {
            if self.fail {
                return Err(FeedRelayError::Network("queue unavailable".into()));
            }
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn event() -> Event {
        let mut item = Item::new("ndtv", "https://news.example.com/a").unwrap();
        item.title = "Headline".into();
        Event::from(&item)
    }

    #[tokio::test]
    async fn publishes_json_with_provider_attribute() {
        let sender = Arc::new(RecordingSender::default());
        let sink = QueueSink::new("q", sender.clone());
        sink.publish(&event()).await.unwrap();

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].attributes[PROVIDER_ID_ATTRIBUTE], "ndtv");
        let decoded: Event = serde_json::from_slice(&sent[0].body).unwrap();
        assert_eq!(decoded, event());
    }

    #[tokio::test]
    async fn sender_failure_is_delivery_error() {
        let sender = Arc::new(RecordingSender {
            fail: true,
            ..Default::default()
        });
        let err = QueueSink::new("q", sender).publish(&event()).await.unwrap_err();
        assert!(matches!(err, FeedRelayError::Delivery { ref sink, .. } if sink == "q"));
    }

    #[tokio::test]
    async fn unimplemented_and_unknown_providers_fail_to_build() {
        for (provider, expected) in [
            ("azure", "not implemented"),
            ("kafka", "unsupported"),
        ] {
            let config = QueueSinkConfig {
                provider: provider.into(),
                sqs: None,
                sns: None,
                gcp: None,
                azure: None,
            };
            let err = QueueSink::from_config("q", &config).await.err().unwrap();
            assert!(matches!(err, FeedRelayError::SinkBuild { .. }));
            assert!(err.to_string().contains(expected), "{provider}: {err}");
        }
    }

    #[tokio::test]
    async fn missing_provider_table_fails_to_build() {
        for provider in ["aws-sqs", "aws-sns", "gcp"] {
            let config = QueueSinkConfig {
                provider: provider.into(),
                sqs: None,
                sns: None,
                gcp: None,
                azure: None,
            };
            let err = QueueSink::from_config("q", &config).await.err().unwrap();
            assert!(matches!(err, FeedRelayError::SinkBuild { .. }), "{provider}: {err}");
        }
    }
}
