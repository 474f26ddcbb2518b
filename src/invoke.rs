//! Handler invocation bridge.
//!
//! The emulator does not run handler code itself; it hands the built event to an external
//! sandbox that exposes the Lambda Invoke API. [`HandlerInvoker`] is the single normalized
//! contract the poller sees: one call, one completion signal, regardless of how the sandbox
//! surfaces handler results internally.

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::EmulatorConfig;

/// Completion signal of one invocation.
#[derive(Debug)]
pub enum InvokeOutcome {
    /// The handler ran to completion; carries its (possibly empty) result payload.
    Completed(Bytes),
    /// The handler raised or rejected. Carried as a value, not an `Err`: a failed invocation
    /// still acknowledges its batch.
    Failed { reason: String, payload: Bytes },
}

#[async_trait]
/// Abstract invocation target, so the polling core is testable without a sandbox.
pub trait HandlerInvoker: Send + Sync {
    /// Invoke `function_name` with the serialized event, awaiting completion.
    ///
    /// `Err` means the invocation could not be performed at all (transport failure);
    /// handler-level failures are reported through [`InvokeOutcome::Failed`].
    async fn invoke(&self, function_name: &str, payload: Bytes) -> anyhow::Result<InvokeOutcome>;
}

/// Lambda Invoke API implementation of [`HandlerInvoker`], pointed at a local sandbox.
#[derive(Clone)]
pub struct LambdaInvoker {
    client: aws_sdk_lambda::Client,
}

impl LambdaInvoker {
    pub async fn connect(cfg: &EmulatorConfig) -> Self {
        let credentials = aws_sdk_lambda::config::Credentials::new(
            "sqs-offline",
            "sqs-offline",
            None,
            None,
            "static",
        );
        let shared = aws_config::from_env()
            .region(aws_config::Region::new(cfg.region.clone()))
            .endpoint_url(&cfg.lambda_endpoint)
            .credentials_provider(credentials)
            .load()
            .await;
        Self {
            client: aws_sdk_lambda::Client::new(&shared),
        }
    }
}

#[async_trait]
impl HandlerInvoker for LambdaInvoker {
    async fn invoke(&self, function_name: &str, payload: Bytes) -> anyhow::Result<InvokeOutcome> {
        let out = self
            .client
            .invoke()
            .function_name(function_name)
            .payload(aws_sdk_lambda::primitives::Blob::new(payload))
            .send()
            .await?;

        let bytes = out
            .payload()
            .map(|b| Bytes::copy_from_slice(b.as_ref()))
            .unwrap_or_default();

        if let Some(function_error) = out.function_error() {
            return Ok(InvokeOutcome::Failed {
                reason: function_error.to_string(),
                payload: bytes,
            });
        }
        Ok(InvokeOutcome::Completed(bytes))
    }
}
