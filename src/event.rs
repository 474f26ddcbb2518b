//! Mapping of a received batch into the SQS invocation event contract.
//!
//! The payload matches what deployed functions see from the real event source mapping, so handler
//! code runs unchanged against the emulator. The mapping is pure: record order is receive order,
//! nothing is deduplicated or dropped.

use std::collections::HashMap;

use serde::Serialize;

use crate::backend::{MessageAttribute, QueueMessage};

/// Constant event-source tag stamped on every record.
pub const EVENT_SOURCE: &str = "aws:sqs";

/// Synthesize the ARN identifying a queue in event records and provisioned attributes.
pub fn queue_arn(region: &str, account_id: &str, queue_name: &str) -> String {
    format!("arn:aws:sqs:{region}:{account_id}:{queue_name}")
}

#[derive(Debug, Serialize)]
/// The invocation event: one record per received message.
pub struct SqsEvent {
    #[serde(rename = "Records")]
    pub records: Vec<SqsRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
/// One message in the wire shape the handler contract expects.
pub struct SqsRecord {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    pub attributes: HashMap<String, String>,
    pub message_attributes: HashMap<String, MessageAttribute>,
    pub md5_of_body: String,
    pub event_source: &'static str,
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,
    pub aws_region: String,
}

/// Build the invocation event for one batch.
pub fn build_event(event_source_arn: &str, region: &str, messages: Vec<QueueMessage>) -> SqsEvent {
    let records = messages
        .into_iter()
        .map(|msg| SqsRecord {
            message_id: msg.message_id,
            receipt_handle: msg.receipt_handle,
            body: msg.body,
            attributes: msg.attributes,
            message_attributes: msg.message_attributes,
            md5_of_body: msg.md5_of_body,
            event_source: EVENT_SOURCE,
            event_source_arn: event_source_arn.to_string(),
            aws_region: region.to_string(),
        })
        .collect();
    SqsEvent { records }
}
