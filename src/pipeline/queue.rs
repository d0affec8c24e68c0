//! # Queue Publisher
//!
//! Ensures the prioritized job queue exists, bound to an ordered list of
//! compute environments, then blocks on a bounded poll until the queue
//! reports VALID. This is the only place the pipeline waits on external
//! asynchronous state: an explicit attempt budget, never an unbounded loop.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::PollPolicy;
use crate::error::{PipelineError, Result};
use crate::provider::{
    CloudBatchProvider, ComputeEnvironmentOrder, Ensured, JobQueueHandle, QueueRequest,
    QueueStatus,
};

pub struct QueuePublisher {
    provider: Arc<dyn CloudBatchProvider>,
}

impl QueuePublisher {
    pub fn new(provider: Arc<dyn CloudBatchProvider>) -> Self {
        Self { provider }
    }

    /// Request queue creation with explicit 0-based environment ordering in
    /// the caller-supplied precedence order.
    pub async fn ensure_queue(
        &self,
        name: &str,
        compute_environments: &[String],
        priority: i32,
    ) -> Result<JobQueueHandle> {
        let compute_environment_order = compute_environments
            .iter()
            .enumerate()
            .map(|(order, compute_environment)| ComputeEnvironmentOrder {
                order: order as u32,
                compute_environment: compute_environment.clone(),
            })
            .collect();
        let request = QueueRequest {
            name: name.to_string(),
            priority,
            compute_environment_order,
        };
        let handle = match self.provider.get_or_create_queue(&request).await? {
            Ensured::Created(handle) => {
                info!(name = %handle.name, arn = %handle.arn, "created job queue");
                handle
            }
            Ensured::Found(handle) => {
                info!(name = %handle.name, arn = %handle.arn, "job queue already exists");
                handle
            }
        };
        Ok(handle)
    }

    /// Poll queue status until VALID, at most `policy.max_attempts` checks
    /// spaced `policy.interval()` apart. Exhausting the budget is fatal.
    pub async fn wait_until_valid(&self, name: &str, policy: PollPolicy) -> Result<()> {
        for attempt in 1..=policy.max_attempts {
            let status = self.provider.get_queue_status(name).await?;
            if status == QueueStatus::Valid {
                info!(queue = %name, attempt, "job queue is VALID");
                return Ok(());
            }
            debug!(queue = %name, attempt, ?status, "waiting for job queue");
            if attempt < policy.max_attempts {
                tokio::time::sleep(policy.interval()).await;
            }
        }
        Err(PipelineError::QueueTimeout {
            queue: name.to_string(),
            attempts: policy.max_attempts,
        })
    }
}
