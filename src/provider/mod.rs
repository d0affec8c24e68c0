//! # Cloud Batch Provider Boundary
//!
//! ## Overview
//!
//! Every control-plane interaction in the pipeline goes through the
//! [`CloudBatchProvider`] capability trait: container registry, execution
//! roles, job specifications, job queues, and job submission. Publishers
//! receive the provider as an injected `Arc<dyn CloudBatchProvider>` rather
//! than reaching for an ambient client, so any conforming implementation
//! (a live cloud SDK adapter or the deterministic [`InMemoryProvider`]) is
//! substitutable without touching pipeline logic.
//!
//! ## Existence is not an error
//!
//! Get-or-create operations return [`Ensured`], a tagged outcome that records
//! whether the resource was created by this call or found pre-existing. The
//! ambiguity the taxonomy in [`crate::error`] would otherwise have to carry
//! (AlreadyExists-as-exception) is resolved at the type level.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

pub mod memory;

pub use memory::InMemoryProvider;

/// Outcome of an idempotent get-or-create operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ensured<T> {
    /// The resource did not exist and was created by this call.
    Created(T),
    /// The resource already existed; the existing one is returned unchanged.
    Found(T),
}

impl<T> Ensured<T> {
    /// Unwrap the resource regardless of how it was obtained.
    pub fn into_inner(self) -> T {
        match self {
            Ensured::Created(inner) | Ensured::Found(inner) => inner,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Ensured::Created(_))
    }
}

/// A container image repository. The uri is stable once the repository exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRepository {
    pub name: String,
    pub uri: String,
}

/// An execution role jobs run as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRole {
    pub name: String,
    pub arn: String,
}

/// One entry of the provider's access-policy listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySummary {
    pub name: String,
    pub arn: String,
}

/// Handle to a registered job specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpecHandle {
    pub name: String,
    pub arn: String,
}

/// Handle to a job queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobQueueHandle {
    pub name: String,
    pub arn: String,
}

/// Lifecycle states a job queue reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    Creating,
    Valid,
    Invalid,
    Deleting,
    Deleted,
}

/// One image build-and-push invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuildRequest {
    /// Absolute path to the build context directory.
    pub build_context: PathBuf,
    /// Absolute path to the dockerfile.
    pub dockerfile: PathBuf,
    /// Repository uri the image is tagged and pushed under.
    pub repository_uri: String,
    /// Never empty; the publisher substitutes `["latest"]` for an empty list.
    pub tags: Vec<String>,
    /// Stream build output to the operator.
    pub verbose: bool,
}

/// Parameters for registering a job specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpecRequest {
    pub name: String,
    pub role_arn: String,
    pub image_uri: String,
    pub vcpus: u32,
    pub memory_mib: u32,
    pub run_as_user: String,
    /// Provider-side retry count for a failed job instance. Always >= 1.
    pub retry_attempts: u32,
}

/// One (compute environment, order) pair of a queue's routing list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeEnvironmentOrder {
    /// 0-based; the remote scheduler tries lower orders first.
    pub order: u32,
    pub compute_environment: String,
}

/// Parameters for creating a job queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRequest {
    pub name: String,
    /// Ordering semantics across queues are provider-defined.
    pub priority: i32,
    pub compute_environment_order: Vec<ComputeEnvironmentOrder>,
}

/// An environment variable passed to a job's container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// One job submission against a queue/spec pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSubmission {
    pub name: String,
    pub queue_name: String,
    pub spec_name: String,
    pub command: Vec<String>,
    pub environment: Vec<EnvVar>,
}

/// Capability interface to the managed batch-compute control plane.
///
/// Implementations must be safe to share across publishers for the lifetime
/// of a pipeline run. The pipeline never retries a failed call; errors
/// propagate unchanged.
#[async_trait]
pub trait CloudBatchProvider: Send + Sync {
    /// Look up a repository by name, creating it when absent.
    async fn get_or_create_repository(
        &self,
        name: &str,
    ) -> Result<Ensured<ImageRepository>, ProviderError>;

    /// Build one image from the request's context and push it under every tag.
    async fn build_and_push(&self, request: &ImageBuildRequest) -> Result<(), ProviderError>;

    /// Look up an execution role by name, creating it when absent.
    async fn get_or_create_role(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Ensured<ExecutionRole>, ProviderError>;

    /// List the access policies available for attachment.
    async fn list_policies(&self) -> Result<Vec<PolicySummary>, ProviderError>;

    /// Attach a policy to a role. Attaching an already-attached policy is a
    /// no-op, not an error.
    async fn attach_policy(&self, role_name: &str, policy_arn: &str)
        -> Result<(), ProviderError>;

    /// Register a job specification. Always a create; re-registration under
    /// the same name yields a new revision per provider semantics.
    async fn register_job_spec(
        &self,
        request: &JobSpecRequest,
    ) -> Result<JobSpecHandle, ProviderError>;

    /// Look up a job queue by name, creating it when absent. A freshly
    /// created queue starts in CREATING and transitions asynchronously.
    async fn get_or_create_queue(
        &self,
        request: &QueueRequest,
    ) -> Result<Ensured<JobQueueHandle>, ProviderError>;

    /// Current lifecycle status of a queue.
    async fn get_queue_status(&self, name: &str) -> Result<QueueStatus, ProviderError>;

    /// Submit one job; returns the provider-assigned job id. After this call
    /// the job is owned entirely by the remote scheduler.
    async fn submit_job(&self, submission: &JobSubmission) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensured_into_inner_ignores_the_tag() {
        assert_eq!(Ensured::Created(7).into_inner(), 7);
        assert_eq!(Ensured::Found(7).into_inner(), 7);
    }

    #[test]
    fn test_ensured_was_created() {
        assert!(Ensured::Created(()).was_created());
        assert!(!Ensured::Found(()).was_created());
    }

    #[test]
    fn test_queue_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&QueueStatus::Valid).unwrap();
        assert_eq!(json, "\"VALID\"");
        let back: QueueStatus = serde_json::from_str("\"CREATING\"").unwrap();
        assert_eq!(back, QueueStatus::Creating);
    }
}
