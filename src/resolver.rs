//! Queue-name resolution across the four trigger declaration shapes.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::manifest::{ArnValue, ResourceDefinition, SqsTrigger};

/// Derive the canonical queue name from a trigger declaration.
///
/// A plain-string trigger is a colon-delimited ARN whose sixth field is the queue name. For the
/// object form, a literal `queueName` wins; otherwise the `arn` field is parsed the same way when
/// it is a string, or chased through the resource catalog when it is an `Fn::GetAtt` reference
/// (the referenced resource's `QueueName` property). Anything else fails with
/// [`Error::QueueNameNotFound`].
pub fn resolve(
    trigger: &SqsTrigger,
    resources: &BTreeMap<&str, &ResourceDefinition>,
) -> Result<String, Error> {
    let resolved = match trigger {
        SqsTrigger::Arn(arn) => queue_name_from_arn(arn),
        SqsTrigger::Declaration(cfg) => {
            if let Some(queue_name) = &cfg.queue_name {
                Some(queue_name.clone())
            } else {
                match &cfg.arn {
                    Some(ArnValue::Literal(arn)) => queue_name_from_arn(arn),
                    Some(ArnValue::GetAtt(get_att)) => {
                        let (resource_name, _attribute) = &get_att.get_att;
                        resources
                            .get(resource_name.as_str())
                            .and_then(|def| def.queue_name())
                            .map(str::to_string)
                    }
                    None => None,
                }
            }
        }
    };

    resolved.ok_or_else(|| Error::QueueNameNotFound {
        trigger: format!("{trigger:?}"),
    })
}

fn queue_name_from_arn(arn: &str) -> Option<String> {
    arn.split(':').nth(5).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;

    fn manifest() -> Manifest {
        Manifest::from_yaml_bytes(
            br#"
resources:
  Resources:
    OrdersQueue:
      Type: AWS::SQS::Queue
      Properties:
        QueueName: orders-queue
    NamelessQueue:
      Type: AWS::SQS::Queue
"#,
        )
        .unwrap()
    }

    fn trigger(yaml: &str) -> SqsTrigger {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn plain_string_arn_uses_sixth_field() {
        let manifest = manifest();
        let t = trigger(r#""arn:aws:sqs:us-east-1:000000000000:orders-queue""#);
        assert_eq!(
            resolve(&t, &manifest.resource_catalog()).unwrap(),
            "orders-queue"
        );
    }

    #[test]
    fn string_arn_field_uses_sixth_field() {
        let manifest = manifest();
        let t = trigger("arn: arn:aws:sqs:us-east-1:000000000000:orders-queue\nbatchSize: 2");
        assert_eq!(
            resolve(&t, &manifest.resource_catalog()).unwrap(),
            "orders-queue"
        );
    }

    #[test]
    fn literal_queue_name_wins_over_arn() {
        let manifest = manifest();
        let t = trigger("queueName: literal-queue\narn: arn:aws:sqs:us-east-1:0:other-queue");
        assert_eq!(
            resolve(&t, &manifest.resource_catalog()).unwrap(),
            "literal-queue"
        );
    }

    #[test]
    fn get_att_reference_returns_referenced_queue_name() {
        let manifest = manifest();
        let t = trigger("arn:\n  Fn::GetAtt: [OrdersQueue, Arn]");
        assert_eq!(
            resolve(&t, &manifest.resource_catalog()).unwrap(),
            "orders-queue"
        );
    }

    #[test]
    fn unresolvable_shapes_fail() {
        let manifest = manifest();
        let catalog = manifest.resource_catalog();

        // Reference to a resource that doesn't exist.
        let t = trigger("arn:\n  Fn::GetAtt: [MissingQueue, Arn]");
        assert!(matches!(
            resolve(&t, &catalog),
            Err(Error::QueueNameNotFound { .. })
        ));

        // Referenced resource has no QueueName property.
        let t = trigger("arn:\n  Fn::GetAtt: [NamelessQueue, Arn]");
        assert!(matches!(
            resolve(&t, &catalog),
            Err(Error::QueueNameNotFound { .. })
        ));

        // Object with neither queueName nor arn.
        let t = trigger("batchSize: 4");
        assert!(matches!(
            resolve(&t, &catalog),
            Err(Error::QueueNameNotFound { .. })
        ));

        // ARN with too few fields.
        let t = trigger(r#""arn:aws:sqs""#);
        assert!(matches!(
            resolve(&t, &catalog),
            Err(Error::QueueNameNotFound { .. })
        ));
    }
}
