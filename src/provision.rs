//! Queue provisioning: declarative resource definition -> backend create-queue call.
//!
//! Attribute values in the manifest are YAML scalars or nested mappings; the backend wants a flat
//! string-to-string map. Scalars are stringified, nested mappings are resolved (cross-resource
//! `Fn::GetAtt` leaves become synthesized queue ARNs) and serialized to a single JSON string.

use std::collections::{BTreeMap, HashMap};

use serde_yaml::Value;

use crate::backend::QueueBackend;
use crate::error::Error;
use crate::event::queue_arn;
use crate::manifest::ResourceDefinition;

/// Create the queue described by `def`, returning its URL.
///
/// Creation is idempotent at the backend level, so this is called unconditionally at every
/// startup. A backend rejection is returned as [`Error::ProvisionFailure`]; the caller decides
/// to log and continue, leaving this queue absent.
pub async fn provision(
    backend: &dyn QueueBackend,
    queue_name: &str,
    def: &ResourceDefinition,
    catalog: &BTreeMap<&str, &ResourceDefinition>,
    region: &str,
    account_id: &str,
) -> Result<String, Error> {
    let attributes = normalize_attributes(def, catalog, region, account_id).map_err(|source| {
        Error::ProvisionFailure {
            queue: queue_name.to_string(),
            source,
        }
    })?;

    backend
        .create_queue(queue_name, attributes)
        .await
        .map_err(|source| Error::ProvisionFailure {
            queue: queue_name.to_string(),
            source,
        })
}

/// Flatten a resource definition's non-identity properties into backend attributes.
pub fn normalize_attributes(
    def: &ResourceDefinition,
    catalog: &BTreeMap<&str, &ResourceDefinition>,
    region: &str,
    account_id: &str,
) -> anyhow::Result<HashMap<String, String>> {
    let mut attributes = HashMap::new();
    for (key, value) in &def.properties {
        let Some(name) = value_as_key(key) else {
            continue;
        };
        // QueueName is the queue's identity, not an attribute.
        if name == "QueueName" {
            continue;
        }

        let rendered = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Mapping(_) | Value::Sequence(_) => {
                let resolved = resolve_nested(value, catalog, region, account_id)?;
                serde_json::to_string(&resolved)?
            }
            Value::Null | Value::Tagged(_) => continue,
        };
        attributes.insert(name.to_string(), rendered);
    }
    Ok(attributes)
}

fn value_as_key(key: &Value) -> Option<&str> {
    key.as_str()
}

/// Recursively turn a nested attribute value into JSON, stringifying scalar leaves and
/// replacing `Fn::GetAtt` references by the referenced queue's synthesized ARN (a queue
/// resource's only computed output).
fn resolve_nested(
    value: &Value,
    catalog: &BTreeMap<&str, &ResourceDefinition>,
    region: &str,
    account_id: &str,
) -> anyhow::Result<serde_json::Value> {
    match value {
        Value::String(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Number(n) => Ok(serde_json::Value::String(n.to_string())),
        Value::Bool(b) => Ok(serde_json::Value::String(b.to_string())),
        Value::Null => Ok(serde_json::Value::Null),
        Value::Sequence(seq) => seq
            .iter()
            .map(|v| resolve_nested(v, catalog, region, account_id))
            .collect::<anyhow::Result<Vec<_>>>()
            .map(serde_json::Value::Array),
        Value::Mapping(map) => {
            if let Some(reference) = get_att_reference(map) {
                let target = catalog
                    .get(reference)
                    .and_then(|def| def.queue_name())
                    .unwrap_or(reference);
                return Ok(serde_json::Value::String(queue_arn(
                    region, account_id, target,
                )));
            }
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, nested) in map {
                let Some(name) = value_as_key(key) else {
                    continue;
                };
                out.insert(
                    name.to_string(),
                    resolve_nested(nested, catalog, region, account_id)?,
                );
            }
            Ok(serde_json::Value::Object(out))
        }
        Value::Tagged(_) => anyhow::bail!("unsupported tagged value in queue attributes"),
    }
}

/// A mapping of the exact shape `{"Fn::GetAtt": [LogicalName, Attribute]}` is a cross-resource
/// reference; returns the logical resource name.
fn get_att_reference(map: &serde_yaml::Mapping) -> Option<&str> {
    if map.len() != 1 {
        return None;
    }
    map.get("Fn::GetAtt")
        .and_then(Value::as_sequence)
        .and_then(|seq| seq.first())
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DeleteEntry, QueueMessage};
    use crate::manifest::Manifest;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn manifest() -> Manifest {
        Manifest::from_yaml_bytes(
            br#"
resources:
  Resources:
    WorkQueue:
      Type: AWS::SQS::Queue
      Properties:
        QueueName: work-queue
        VisibilityTimeout: 30
        FifoQueue: false
        RedrivePolicy:
          maxReceiveCount: 5
          deadLetterTargetArn:
            Fn::GetAtt: [DeadLetterQueue, Arn]
    DeadLetterQueue:
      Type: AWS::SQS::Queue
      Properties:
        QueueName: work-dlq
"#,
        )
        .unwrap()
    }

    #[test]
    fn scalars_are_stringified_and_identity_is_excluded() {
        let manifest = manifest();
        let catalog = manifest.resource_catalog();
        let attrs =
            normalize_attributes(catalog["WorkQueue"], &catalog, "us-east-1", "000000000000")
                .unwrap();

        assert_eq!(attrs["VisibilityTimeout"], "30");
        assert_eq!(attrs["FifoQueue"], "false");
        assert!(!attrs.contains_key("QueueName"));
    }

    #[test]
    fn nested_mapping_becomes_one_json_string_with_resolved_reference() {
        let manifest = manifest();
        let catalog = manifest.resource_catalog();
        let attrs =
            normalize_attributes(catalog["WorkQueue"], &catalog, "us-east-1", "000000000000")
                .unwrap();

        let redrive: serde_json::Value = serde_json::from_str(&attrs["RedrivePolicy"]).unwrap();
        assert_eq!(redrive["maxReceiveCount"], "5");
        assert_eq!(
            redrive["deadLetterTargetArn"],
            "arn:aws:sqs:us-east-1:000000000000:work-dlq"
        );
    }

    struct RecordingBackend {
        created: Mutex<Vec<(String, HashMap<String, String>)>>,
    }

    impl RecordingBackend {
        fn new() -> Self {
            Self {
                created: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl QueueBackend for RecordingBackend {
        async fn create_queue(
            &self,
            queue_name: &str,
            attributes: HashMap<String, String>,
        ) -> anyhow::Result<String> {
            self.created
                .lock()
                .unwrap()
                .push((queue_name.to_string(), attributes));
            Ok(format!("http://localhost:9324/queue/{queue_name}"))
        }

        async fn get_queue_url(&self, queue_name: &str) -> anyhow::Result<String> {
            Ok(format!("http://localhost:9324/queue/{queue_name}"))
        }

        async fn receive_message(
            &self,
            _queue_url: &str,
            _max_messages: i32,
            _wait_seconds: i32,
        ) -> anyhow::Result<Vec<QueueMessage>> {
            Ok(vec![])
        }

        async fn delete_message_batch(
            &self,
            _queue_url: &str,
            _entries: &[DeleteEntry],
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn provision_is_safe_to_repeat() {
        let manifest = manifest();
        let catalog = manifest.resource_catalog();
        let backend = RecordingBackend::new();

        let url1 = provision(
            &backend,
            "work-queue",
            catalog["WorkQueue"],
            &catalog,
            "us-east-1",
            "000000000000",
        )
        .await
        .unwrap();
        let url2 = provision(
            &backend,
            "work-queue",
            catalog["WorkQueue"],
            &catalog,
            "us-east-1",
            "000000000000",
        )
        .await
        .unwrap();

        assert_eq!(url1, url2);
        assert_eq!(backend.created.lock().unwrap().len(), 2);
    }
}
