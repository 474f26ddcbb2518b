//! Startup sequence: provision manifest-declared queues, then launch the pollers.

use std::sync::{atomic::AtomicBool, Arc};

use crate::backend::QueueBackend;
use crate::config::EmulatorConfig;
use crate::invoke::HandlerInvoker;
use crate::manifest::Manifest;
use crate::poller::{PollerConfig, QueuePoller};
use crate::resolver;

/// Provision every declared queue, then spawn one [`QueuePoller`] task per
/// (function, SQS trigger) pair.
///
/// Provisioning runs concurrently and settles completely before any poller starts; a single
/// failed create leaves that queue absent and does not block the others. Trigger declarations
/// that cannot be resolved to a queue name are reported once and skipped, without affecting
/// the remaining pollers. Returns once every poller task is launched, not once they reach
/// steady state.
pub async fn start(
    manifest: &Manifest,
    cfg: &EmulatorConfig,
    backend: Arc<dyn QueueBackend>,
    invoker: Arc<dyn HandlerInvoker>,
    shutdown: Arc<AtomicBool>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let catalog = manifest.resource_catalog();

    if cfg.auto_create {
        let creates = manifest.queue_resources().into_iter().map(|(name, def)| {
            let backend = backend.clone();
            let catalog = &catalog;
            let cfg = &cfg;
            async move {
                // A resource without an explicit QueueName falls back to its logical name.
                let queue_name = def.queue_name().unwrap_or(name);
                match crate::provision::provision(
                    backend.as_ref(),
                    queue_name,
                    def,
                    catalog,
                    &cfg.region,
                    &cfg.account_id,
                )
                .await
                {
                    Ok(url) => tracing::info!(queue = %queue_name, url = %url, "queue created"),
                    Err(err) => tracing::warn!(error = %err, "queue not created, continuing"),
                }
            }
        });
        futures::future::join_all(creates).await;
    }

    let poller_cfg = PollerConfig::from(cfg);
    let mut handles = Vec::new();
    for (key, function) in &manifest.functions {
        let target = function.name.as_deref().unwrap_or(key);
        for trigger in function.sqs_triggers() {
            let queue_name = match resolver::resolve(trigger, &catalog) {
                Ok(name) => name,
                Err(err) => {
                    tracing::error!(function = %target, error = %err, "skipping trigger");
                    continue;
                }
            };

            tracing::info!(function = %target, queue = %queue_name, "starting poller");
            let poller = QueuePoller::new(
                target,
                queue_name,
                trigger.batch_size(),
                poller_cfg.clone(),
                backend.clone(),
                invoker.clone(),
                shutdown.clone(),
            );
            handles.push(tokio::spawn(poller.run()));
        }
    }
    handles
}
