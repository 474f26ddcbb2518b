//! Emulator options, read from the manifest's `custom.sqs-offline` section.
//!
//! Everything defaults to values that work against a local ElasticMQ/LocalStack pair started on
//! the conventional ports, so a bare manifest is enough to get going.

use serde::Deserialize;

use crate::manifest::Manifest;

/// Key under the manifest `custom` section holding [`EmulatorConfig`].
pub const CUSTOM_SECTION: &str = "sqs-offline";

fn default_endpoint() -> String {
    "http://localhost:9324".to_string()
}

fn default_lambda_endpoint() -> String {
    "http://localhost:3002".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_account_id() -> String {
    "000000000000".to_string()
}

fn default_wait_time_seconds() -> i32 {
    5
}

fn default_empty_poll_delay_ms() -> u64 {
    250
}

fn default_retry_initial_ms() -> u64 {
    200
}

fn default_retry_max_ms() -> u64 {
    30_000
}

fn default_auto_create() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Tunables for the queue backend connection and the polling loops.
pub struct EmulatorConfig {
    #[serde(default = "default_endpoint")]
    /// SQS-compatible backend endpoint (ElasticMQ, LocalStack, ...).
    pub endpoint: String,

    #[serde(default = "default_lambda_endpoint")]
    /// Lambda Invoke API endpoint of the local handler sandbox.
    pub lambda_endpoint: String,

    #[serde(default = "default_region")]
    /// Region tag stamped onto event records and synthesized ARNs.
    pub region: String,

    #[serde(default = "default_account_id")]
    /// Account id used when synthesizing queue ARNs.
    pub account_id: String,

    #[serde(default = "default_wait_time_seconds")]
    /// Long-poll wait passed to every receive call (0-20 seconds).
    pub wait_time_seconds: i32,

    #[serde(default = "default_empty_poll_delay_ms")]
    /// Minimum delay after an empty poll when long polling is disabled, so an idle loop
    /// does not saturate the backend.
    pub empty_poll_delay_ms: u64,

    #[serde(default = "default_retry_initial_ms")]
    /// Initial backoff after a failed backend call.
    pub retry_initial_ms: u64,

    #[serde(default = "default_retry_max_ms")]
    /// Backoff cap; delay doubles per consecutive failure up to this value.
    pub retry_max_ms: u64,

    #[serde(default = "default_auto_create")]
    /// Whether to create manifest-declared queues at startup.
    pub auto_create: bool,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            lambda_endpoint: default_lambda_endpoint(),
            region: default_region(),
            account_id: default_account_id(),
            wait_time_seconds: default_wait_time_seconds(),
            empty_poll_delay_ms: default_empty_poll_delay_ms(),
            retry_initial_ms: default_retry_initial_ms(),
            retry_max_ms: default_retry_max_ms(),
            auto_create: default_auto_create(),
        }
    }
}

impl EmulatorConfig {
    /// Extract the emulator options from a manifest, falling back to defaults when the
    /// section is absent. The manifest `provider.region` wins over the default region but
    /// loses to an explicit `custom` entry.
    pub fn from_manifest(manifest: &Manifest) -> anyhow::Result<Self> {
        let mut cfg = match manifest.custom.get(CUSTOM_SECTION) {
            Some(value) => serde_yaml::from_value(value.clone())?,
            None => Self::default(),
        };
        if let Some(region) = &manifest.provider.region {
            let explicit = manifest
                .custom
                .get(CUSTOM_SECTION)
                .and_then(|v| v.get("region"))
                .is_some();
            if !explicit {
                cfg.region = region.clone();
            }
        }
        Ok(cfg)
    }
}
