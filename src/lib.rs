//! `sqs-offline` emulates an SQS event source for local development.
//!
//! Given a `serverless.yml`-shaped deployment manifest, the emulator creates the queues the
//! manifest declares, then runs one long-poll loop per (function, SQS trigger) pair: each loop
//! receives a batch of messages, invokes the function with a wire-compatible SQS event payload,
//! and deletes the batch once the invocation has completed.
//!
//! Core modules:
//! - [`manifest`]: deployment manifest types (functions, triggers, queue resources)
//! - [`config`]: emulator options from the manifest `custom` section
//! - [`resolver`]: queue-name resolution across the four trigger declaration shapes
//! - [`provision`]: queue creation with attribute normalization
//! - [`event`]: raw message batch -> SQS event payload mapping
//! - [`backend`]: queue backend trait + `aws-sdk-sqs` implementation
//! - [`invoke`]: handler invocation trait + Lambda Invoke API implementation
//! - [`poller`]: the receive/invoke/delete loop
//! - [`bootstrap`]: provisioning + poller startup

pub mod backend;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod event;
pub mod invoke;
pub mod manifest;
pub mod poller;
pub mod provision;
pub mod resolver;
