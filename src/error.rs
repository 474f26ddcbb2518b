//! Typed failures for the provisioning and polling core.
//!
//! Failures are returned to the caller (bootstrapper or poller loop) which owns the decision to
//! log and continue, keeping the core testable without capturing console output.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The trigger declaration matched none of the supported shapes, or its indirect
    /// reference did not lead to a named queue.
    #[error("unable to resolve a queue name from trigger declaration {trigger}")]
    QueueNameNotFound { trigger: String },

    /// The backend rejected a create-queue call. The queue is simply absent thereafter;
    /// its poller will fail at receive time.
    #[error("failed to create queue {queue}")]
    ProvisionFailure {
        queue: String,
        #[source]
        source: anyhow::Error,
    },

    /// A steady-state receive call failed; retried with backoff by the poller.
    #[error("failed to receive from queue {queue}")]
    ReceiveFailure {
        queue: String,
        #[source]
        source: anyhow::Error,
    },

    /// A batch delete failed; the batch may be redelivered.
    #[error("failed to delete batch from queue {queue}")]
    DeleteFailure {
        queue: String,
        #[source]
        source: anyhow::Error,
    },

    /// The handler raised or the invocation transport failed. Does not block deletion and
    /// does not stop the poller.
    #[error("invocation of {function} failed: {reason}")]
    InvocationFailure { function: String, reason: String },
}
