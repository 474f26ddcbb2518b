//! Deployment manifest (`serverless.yml`-shaped) parsing.
//!
//! The emulator only reads the parts of the manifest it needs: function definitions with their
//! SQS trigger declarations, CloudFormation-style queue resources, and the `custom` section that
//! carries emulator options. Everything else is preserved as opaque YAML and ignored.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_yaml::Value;

/// Resource type tag identifying a queue declaration among arbitrary resources.
pub const QUEUE_RESOURCE_TYPE: &str = "AWS::SQS::Queue";

fn default_batch_size() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
/// Top-level deployment manifest.
pub struct Manifest {
    #[serde(default)]
    pub service: Option<String>,

    #[serde(default)]
    pub provider: Provider,

    #[serde(default)]
    /// Function definitions keyed by their manifest name.
    pub functions: BTreeMap<String, FunctionConfig>,

    #[serde(default)]
    pub resources: Option<ResourcesSection>,

    #[serde(default)]
    /// Free-form plugin/tooling options; the emulator reads its own key from here.
    pub custom: BTreeMap<String, Value>,
}

impl Manifest {
    /// Parse a YAML manifest from bytes.
    pub fn from_yaml_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_slice(bytes)?)
    }

    /// Queue resource definitions, keyed by logical resource name.
    ///
    /// Filters the resource catalog down to entries whose type tag marks them as queues.
    pub fn queue_resources(&self) -> BTreeMap<&str, &ResourceDefinition> {
        self.resources
            .iter()
            .flat_map(|s| s.resources.iter())
            .filter(|(_, def)| def.is_queue())
            .map(|(name, def)| (name.as_str(), def))
            .collect()
    }

    /// All resource definitions (queue or not), for cross-resource reference lookups.
    pub fn resource_catalog(&self) -> BTreeMap<&str, &ResourceDefinition> {
        self.resources
            .iter()
            .flat_map(|s| s.resources.iter())
            .map(|(name, def)| (name.as_str(), def))
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
/// Provider block; only the region matters to the emulator.
pub struct Provider {
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
/// One function definition.
pub struct FunctionConfig {
    #[serde(default)]
    pub handler: Option<String>,

    #[serde(default)]
    /// Deployed function name override. When absent, the manifest key is used as the
    /// invocation target.
    pub name: Option<String>,

    #[serde(default)]
    pub events: Vec<EventConfig>,
}

impl FunctionConfig {
    /// The function's SQS trigger declarations, in manifest order.
    pub fn sqs_triggers(&self) -> impl Iterator<Item = &SqsTrigger> {
        self.events.iter().filter_map(|e| e.sqs.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
/// One entry under a function's `events` list. Non-SQS event kinds are retained but ignored.
pub struct EventConfig {
    #[serde(default)]
    pub sqs: Option<SqsTrigger>,

    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
/// An SQS trigger declaration in any of its manifest shapes.
pub enum SqsTrigger {
    /// `- sqs: arn:aws:sqs:us-east-1:000000000000:my-queue`
    Arn(String),
    /// `- sqs: { arn: ..., batchSize: ... }` or `- sqs: { queueName: ... }`
    Declaration(SqsTriggerConfig),
}

impl SqsTrigger {
    /// Requested receive batch size (defaults to the SQS receive cap of 10).
    pub fn batch_size(&self) -> u32 {
        match self {
            Self::Arn(_) => default_batch_size(),
            Self::Declaration(cfg) => cfg.batch_size,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Object form of an SQS trigger declaration.
pub struct SqsTriggerConfig {
    #[serde(default)]
    pub arn: Option<ArnValue>,

    #[serde(default)]
    /// Literal queue name; takes precedence over any `arn` field.
    pub queue_name: Option<String>,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
/// An `arn` field: either a literal ARN string or an intra-manifest reference.
pub enum ArnValue {
    Literal(String),
    GetAtt(GetAtt),
}

#[derive(Debug, Clone, Deserialize)]
/// CloudFormation `Fn::GetAtt` reference: `[LogicalResourceName, AttributeName]`.
pub struct GetAtt {
    #[serde(rename = "Fn::GetAtt")]
    pub get_att: (String, String),
}

#[derive(Debug, Clone, Deserialize)]
/// The `resources` section wrapping the CloudFormation-style resource map.
pub struct ResourcesSection {
    #[serde(rename = "Resources", default)]
    pub resources: BTreeMap<String, ResourceDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
/// One declared resource: a type tag plus a free-form properties bag.
pub struct ResourceDefinition {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(rename = "Properties", default)]
    pub properties: serde_yaml::Mapping,
}

impl ResourceDefinition {
    pub fn is_queue(&self) -> bool {
        self.resource_type == QUEUE_RESOURCE_TYPE
    }

    /// The `QueueName` property, when present and a string.
    pub fn queue_name(&self) -> Option<&str> {
        self.properties.get("QueueName").and_then(Value::as_str)
    }
}
