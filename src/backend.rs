//! Queue backend abstraction.
//!
//! The polling core only needs four operations; [`QueueBackend`] keeps it unit-testable without a
//! running backend, and [`SqsQueueBackend`] implements it with `aws-sdk-sqs` pointed at a local
//! SQS-compatible endpoint (ElasticMQ, LocalStack, ...).

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::EmulatorConfig;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
/// One message attribute, carried through to the event payload unchanged.
pub struct MessageAttribute {
    pub data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
}

#[derive(Debug, Clone, Default)]
/// A received message, held only for the duration of one poll cycle.
pub struct QueueMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    pub attributes: HashMap<String, String>,
    pub message_attributes: HashMap<String, MessageAttribute>,
    pub md5_of_body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Id/receipt-handle pair for a batch delete.
pub struct DeleteEntry {
    pub id: String,
    pub receipt_handle: String,
}

impl DeleteEntry {
    pub fn for_message(msg: &QueueMessage) -> Self {
        Self {
            id: msg.message_id.clone(),
            receipt_handle: msg.receipt_handle.clone(),
        }
    }
}

#[async_trait]
/// The queue operations the emulator depends on. All calls are safe to issue concurrently.
pub trait QueueBackend: Send + Sync {
    /// Create a queue, returning its URL. Creating an existing queue by name is a backend-level
    /// no-op returning the existing URL, so this is safe to call unconditionally at startup.
    async fn create_queue(
        &self,
        queue_name: &str,
        attributes: HashMap<String, String>,
    ) -> anyhow::Result<String>;

    async fn get_queue_url(&self, queue_name: &str) -> anyhow::Result<String>;

    /// Receive up to `max_messages` messages, long-polling for up to `wait_seconds`.
    async fn receive_message(
        &self,
        queue_url: &str,
        max_messages: i32,
        wait_seconds: i32,
    ) -> anyhow::Result<Vec<QueueMessage>>;

    async fn delete_message_batch(
        &self,
        queue_url: &str,
        entries: &[DeleteEntry],
    ) -> anyhow::Result<()>;
}

/// `aws-sdk-sqs` implementation of [`QueueBackend`].
#[derive(Clone)]
pub struct SqsQueueBackend {
    client: aws_sdk_sqs::Client,
}

impl SqsQueueBackend {
    /// Build a client against the configured local endpoint. Local emulators accept any
    /// credentials, but the SDK still requires a provider, so a static dummy pair is used.
    pub async fn connect(cfg: &EmulatorConfig) -> Self {
        let credentials =
            aws_sdk_sqs::config::Credentials::new("sqs-offline", "sqs-offline", None, None, "static");
        let shared = aws_config::from_env()
            .region(aws_config::Region::new(cfg.region.clone()))
            .endpoint_url(&cfg.endpoint)
            .credentials_provider(credentials)
            .load()
            .await;
        Self {
            client: aws_sdk_sqs::Client::new(&shared),
        }
    }
}

#[async_trait]
impl QueueBackend for SqsQueueBackend {
    async fn create_queue(
        &self,
        queue_name: &str,
        attributes: HashMap<String, String>,
    ) -> anyhow::Result<String> {
        let mut req = self.client.create_queue().queue_name(queue_name);
        for (name, value) in attributes {
            req = req.attributes(aws_sdk_sqs::types::QueueAttributeName::from(name.as_str()), value);
        }
        let out = req.send().await?;
        out.queue_url()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("create_queue returned no url for {queue_name}"))
    }

    async fn get_queue_url(&self, queue_name: &str) -> anyhow::Result<String> {
        let out = self
            .client
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await?;
        out.queue_url()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("get_queue_url returned no url for {queue_name}"))
    }

    async fn receive_message(
        &self,
        queue_url: &str,
        max_messages: i32,
        wait_seconds: i32,
    ) -> anyhow::Result<Vec<QueueMessage>> {
        let out = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(max_messages.clamp(1, 10))
            .wait_time_seconds(wait_seconds.clamp(0, 20))
            .message_attribute_names("All")
            .message_system_attribute_names(aws_sdk_sqs::types::MessageSystemAttributeName::All)
            .send()
            .await?;

        Ok(out.messages().iter().map(to_queue_message).collect())
    }

    async fn delete_message_batch(
        &self,
        queue_url: &str,
        entries: &[DeleteEntry],
    ) -> anyhow::Result<()> {
        let mut req = self.client.delete_message_batch().queue_url(queue_url);
        for entry in entries {
            req = req.entries(
                aws_sdk_sqs::types::DeleteMessageBatchRequestEntry::builder()
                    .id(&entry.id)
                    .receipt_handle(&entry.receipt_handle)
                    .build()?,
            );
        }
        let out = req.send().await?;
        if !out.failed().is_empty() {
            anyhow::bail!(
                "{} of {} deletes failed for {queue_url}",
                out.failed().len(),
                entries.len()
            );
        }
        Ok(())
    }
}

fn to_queue_message(msg: &aws_sdk_sqs::types::Message) -> QueueMessage {
    let attributes = msg
        .attributes()
        .map(|attrs| {
            attrs
                .iter()
                .map(|(name, value)| (name.as_str().to_string(), value.clone()))
                .collect()
        })
        .unwrap_or_default();

    let message_attributes = msg
        .message_attributes()
        .map(|attrs| {
            attrs
                .iter()
                .map(|(name, value)| {
                    (
                        name.clone(),
                        MessageAttribute {
                            data_type: value.data_type().to_string(),
                            string_value: value.string_value().map(str::to_string),
                        },
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    QueueMessage {
        message_id: msg.message_id().unwrap_or_default().to_string(),
        receipt_handle: msg.receipt_handle().unwrap_or_default().to_string(),
        body: msg.body().unwrap_or_default().to_string(),
        attributes,
        message_attributes,
        md5_of_body: msg.md5_of_body().unwrap_or_default().to_string(),
    }
}
