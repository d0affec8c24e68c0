//! # Job Fan-out Submitter
//!
//! Submits `count` structurally-identical jobs against one queue/spec pair,
//! each distinguished only by its shard index. Names are derived fresh from
//! the immutable base with a zero-padded index suffix; submission order is
//! index-ascending. The shared environment arrives as a flat alternating
//! NAME value token list and is validated before the first submission, since
//! a partial fan-out would leave inconsistent remote state.

use std::sync::Arc;

use tracing::info;

use crate::error::{PipelineError, Result};
use crate::naming::{index_width, shard_job_name};
use crate::provider::{CloudBatchProvider, EnvVar, JobSubmission};

/// One fan-out invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutRequest {
    /// Immutable base; each job name is this plus the padded index.
    pub job_name_base: String,
    pub queue_name: String,
    pub spec_name: String,
    pub count: u32,
    /// Flat alternating NAME value NAME value ... tokens.
    pub env_tokens: Vec<String>,
}

/// Pair a flat alternating token list into environment variables. Odd
/// cardinality is a configuration error, caught before any remote call.
pub fn pair_env_tokens(tokens: &[String]) -> Result<Vec<EnvVar>> {
    if tokens.len() % 2 != 0 {
        return Err(PipelineError::Configuration(format!(
            "environment variable list must alternate NAME value pairs, got {} tokens",
            tokens.len()
        )));
    }
    Ok(tokens
        .chunks_exact(2)
        .map(|pair| EnvVar {
            name: pair[0].clone(),
            value: pair[1].clone(),
        })
        .collect())
}

pub struct JobFanoutSubmitter {
    provider: Arc<dyn CloudBatchProvider>,
}

impl JobFanoutSubmitter {
    pub fn new(provider: Arc<dyn CloudBatchProvider>) -> Self {
        Self { provider }
    }

    /// Submit the fan-out, returning the provider-assigned job ids in
    /// submission (index-ascending) order. After acceptance the jobs are
    /// owned entirely by the remote scheduler; completion is never polled.
    pub async fn submit(&self, request: &FanoutRequest) -> Result<Vec<String>> {
        let environment = pair_env_tokens(&request.env_tokens)?;
        let width = index_width(request.count);

        let mut job_ids = Vec::with_capacity(request.count as usize);
        for index in 0..request.count {
            let submission = JobSubmission {
                name: shard_job_name(&request.job_name_base, index, width),
                queue_name: request.queue_name.clone(),
                spec_name: request.spec_name.clone(),
                command: vec!["--index".to_string(), index.to_string()],
                environment: environment.clone(),
            };
            let job_id = self.provider.submit_job(&submission).await?;
            info!(
                job = %submission.name,
                job_id = %job_id,
                queue = %submission.queue_name,
                spec = %submission.spec_name,
                "submitted shard job"
            );
            job_ids.push(job_id);
        }
        Ok(job_ids)
    }
}
