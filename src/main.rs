use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use clap::Parser;

use sqs_offline::backend::SqsQueueBackend;
use sqs_offline::bootstrap;
use sqs_offline::config::EmulatorConfig;
use sqs_offline::invoke::LambdaInvoker;
use sqs_offline::manifest::Manifest;

#[derive(Debug, Parser)]
struct Args {
    /// Path to the service manifest (serverless.yml).
    #[arg(long, default_value = "serverless.yml")]
    manifest: String,

    /// Override the SQS backend endpoint from the manifest.
    #[arg(long)]
    endpoint: Option<String>,

    /// Override the Lambda Invoke endpoint from the manifest.
    #[arg(long)]
    lambda_endpoint: Option<String>,

    /// Override the region from the manifest.
    #[arg(long)]
    region: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::info!(manifest = %args.manifest, "starting");

    let bytes = tokio::fs::read(&args.manifest).await?;
    let manifest = Manifest::from_yaml_bytes(&bytes)?;
    let mut cfg = EmulatorConfig::from_manifest(&manifest)?;
    if let Some(endpoint) = args.endpoint {
        cfg.endpoint = endpoint;
    }
    if let Some(lambda_endpoint) = args.lambda_endpoint {
        cfg.lambda_endpoint = lambda_endpoint;
    }
    if let Some(region) = args.region {
        cfg.region = region;
    }

    let backend = Arc::new(SqsQueueBackend::connect(&cfg).await);
    let invoker = Arc::new(LambdaInvoker::connect(&cfg).await);
    let shutdown = Arc::new(AtomicBool::new(false));

    let handles = bootstrap::start(&manifest, &cfg, backend, invoker, shutdown.clone()).await;
    if handles.is_empty() {
        tracing::warn!("no SQS triggers declared, nothing to poll");
        return Ok(());
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    shutdown.store(true, Ordering::Relaxed);
    for handle in handles {
        let _ = handle.await;
    }
    Ok(())
}
