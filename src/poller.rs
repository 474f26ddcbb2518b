//! Per-trigger polling loop: receive -> invoke -> delete.
//!
//! Each (function, SQS trigger) pair gets one independent `QueuePoller` task. Within a poller the
//! cycle is strictly sequential and exactly one invocation is in flight at a time; across pollers
//! there is no coordination at all, so one stalled handler never delays another queue.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use bytes::Bytes;

use crate::backend::{DeleteEntry, QueueBackend};
use crate::config::EmulatorConfig;
use crate::error::Error;
use crate::event::{build_event, queue_arn};
use crate::invoke::{HandlerInvoker, InvokeOutcome};

const RESULT_SUMMARY_MAX: usize = 256;

/// How often a backoff sleep rechecks the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
/// Poll-loop tuning shared by every poller, derived from [`EmulatorConfig`].
pub struct PollerConfig {
    pub region: String,
    pub account_id: String,
    pub wait_time_seconds: i32,
    pub empty_poll_delay: Duration,
    pub retry_initial: Duration,
    pub retry_max: Duration,
}

impl From<&EmulatorConfig> for PollerConfig {
    fn from(cfg: &EmulatorConfig) -> Self {
        Self {
            region: cfg.region.clone(),
            account_id: cfg.account_id.clone(),
            wait_time_seconds: cfg.wait_time_seconds,
            empty_poll_delay: Duration::from_millis(cfg.empty_poll_delay_ms),
            retry_initial: Duration::from_millis(cfg.retry_initial_ms),
            retry_max: Duration::from_millis(cfg.retry_max_ms),
        }
    }
}

/// Bounded exponential backoff for steady-state backend failures: delay doubles per
/// consecutive failure up to the cap and resets on the first success.
struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            next: initial,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.next = self.initial;
    }
}

/// One polling loop bound to a resolved queue and an invocation target.
pub struct QueuePoller {
    function_name: String,
    queue_name: String,
    batch_size: u32,
    event_source_arn: String,
    cfg: PollerConfig,
    backend: Arc<dyn QueueBackend>,
    invoker: Arc<dyn HandlerInvoker>,
    shutdown: Arc<AtomicBool>,
}

impl QueuePoller {
    pub fn new(
        function_name: impl Into<String>,
        queue_name: impl Into<String>,
        batch_size: u32,
        cfg: PollerConfig,
        backend: Arc<dyn QueueBackend>,
        invoker: Arc<dyn HandlerInvoker>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let function_name = function_name.into();
        let queue_name = queue_name.into();
        let event_source_arn = queue_arn(&cfg.region, &cfg.account_id, &queue_name);
        Self {
            function_name,
            queue_name,
            batch_size: batch_size.max(1),
            event_source_arn,
            cfg,
            backend,
            invoker,
            shutdown,
        }
    }

    /// Run the loop until the shutdown flag is set. Never returns early on backend or
    /// invocation failures; those are logged and retried/acknowledged per policy.
    pub async fn run(self) {
        let Some(queue_url) = self.wait_for_queue_url().await else {
            return;
        };

        tracing::info!(
            function = %self.function_name,
            queue = %self.queue_name,
            batch_size = self.batch_size,
            "poller started"
        );

        let mut backoff = Backoff::new(self.cfg.retry_initial, self.cfg.retry_max);
        while !self.shutdown.load(Ordering::Relaxed) {
            let messages = match self
                .backend
                .receive_message(
                    &queue_url,
                    self.batch_size as i32,
                    self.cfg.wait_time_seconds,
                )
                .await
            {
                Ok(messages) => {
                    backoff.reset();
                    messages
                }
                Err(source) => {
                    let err = Error::ReceiveFailure {
                        queue: self.queue_name.clone(),
                        source,
                    };
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "receive failed, backing off"
                    );
                    self.backoff_sleep(delay).await;
                    continue;
                }
            };

            if messages.is_empty() {
                // The receive call already provides backpressure when long polling is on;
                // without it, an idle queue must not be hammered.
                if self.cfg.wait_time_seconds == 0 && !self.cfg.empty_poll_delay.is_zero() {
                    tokio::time::sleep(self.cfg.empty_poll_delay).await;
                }
                continue;
            }

            let entries: Vec<DeleteEntry> = messages.iter().map(DeleteEntry::for_message).collect();
            let event = build_event(&self.event_source_arn, &self.cfg.region, messages);
            let payload = match serde_json::to_vec(&event) {
                Ok(bytes) => Bytes::from(bytes),
                Err(err) => {
                    // Nothing was invoked, so the batch is left alone to be redelivered.
                    tracing::error!(
                        function = %self.function_name,
                        queue = %self.queue_name,
                        error = %err,
                        "failed to encode event"
                    );
                    continue;
                }
            };

            self.invoke_batch(payload, entries.len()).await;

            // The batch is acknowledged after the invocation completes, whatever its outcome.
            if let Err(source) = self.backend.delete_message_batch(&queue_url, &entries).await {
                let err = Error::DeleteFailure {
                    queue: self.queue_name.clone(),
                    source,
                };
                tracing::warn!(error = %err, "delete failed, batch may be redelivered");
            }
        }

        tracing::info!(function = %self.function_name, queue = %self.queue_name, "poller stopped");
    }

    /// Invoke the handler with one batch and log the completion. Handler failures and
    /// transport failures both complete the batch; neither stops the loop.
    async fn invoke_batch(&self, payload: Bytes, batch_len: usize) {
        match self.invoker.invoke(&self.function_name, payload).await {
            Ok(InvokeOutcome::Completed(result)) => {
                tracing::info!(
                    function = %self.function_name,
                    queue = %self.queue_name,
                    batch = batch_len,
                    result = %result_summary(&result),
                    "invocation succeeded"
                );
            }
            Ok(InvokeOutcome::Failed { reason, payload }) => {
                let err = Error::InvocationFailure {
                    function: self.function_name.clone(),
                    reason,
                };
                tracing::warn!(
                    error = %err,
                    queue = %self.queue_name,
                    batch = batch_len,
                    result = %result_summary(&payload),
                    "invocation failed"
                );
            }
            Err(source) => {
                let err = Error::InvocationFailure {
                    function: self.function_name.clone(),
                    reason: source.to_string(),
                };
                tracing::warn!(
                    error = %err,
                    queue = %self.queue_name,
                    batch = batch_len,
                    "invocation transport failed"
                );
            }
        }
    }

    /// Resolve the queue URL, retrying with backoff: the queue may not exist yet (provisioning
    /// failed or the backend is still starting). Returns `None` once shutdown is requested.
    async fn wait_for_queue_url(&self) -> Option<String> {
        let mut backoff = Backoff::new(self.cfg.retry_initial, self.cfg.retry_max);
        while !self.shutdown.load(Ordering::Relaxed) {
            match self.backend.get_queue_url(&self.queue_name).await {
                Ok(url) => return Some(url),
                Err(err) => {
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        queue = %self.queue_name,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "queue url lookup failed, retrying"
                    );
                    self.backoff_sleep(delay).await;
                }
            }
        }
        None
    }

    /// Sleep for `delay`, waking early once shutdown is requested. Backoff delays can reach
    /// the configured cap, which must not hold up process shutdown.
    async fn backoff_sleep(&self, delay: Duration) {
        let mut remaining = delay;
        while !remaining.is_zero() && !self.shutdown.load(Ordering::Relaxed) {
            let slice = remaining.min(SHUTDOWN_POLL);
            tokio::time::sleep(slice).await;
            remaining -= slice;
        }
    }
}

fn result_summary(bytes: &Bytes) -> String {
    let text = String::from_utf8_lossy(bytes);
    match text.char_indices().nth(RESULT_SUMMARY_MAX) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}
