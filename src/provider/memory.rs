//! Deterministic in-memory [`CloudBatchProvider`].
//!
//! Backs the test suite and the CLI's rehearsal mode: every control-plane
//! call mutates process-local state and returns uuid-derived identifiers, so
//! a full pipeline run is reproducible without a live cloud dependency. The
//! queue-status sequence is scriptable to exercise the bounded poll.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::ProviderError;
use crate::provider::{
    CloudBatchProvider, Ensured, ExecutionRole, ImageBuildRequest, ImageRepository,
    JobQueueHandle, JobSpecHandle, JobSpecRequest, JobSubmission, PolicySummary, QueueRequest,
    QueueStatus,
};

#[derive(Debug, Default)]
struct MemoryState {
    repositories: BTreeMap<String, ImageRepository>,
    builds: Vec<ImageBuildRequest>,
    roles: BTreeMap<String, ExecutionRole>,
    attached_policies: BTreeMap<String, BTreeSet<String>>,
    job_specs: Vec<JobSpecHandle>,
    queues: BTreeMap<String, JobQueueHandle>,
    queue_requests: Vec<QueueRequest>,
    status_plan: VecDeque<QueueStatus>,
    status_checks: usize,
    submitted: Vec<JobSubmission>,
}

/// In-memory provider double.
///
/// Queue status reporting follows a script: each `get_queue_status` call
/// consumes one entry of the plan, and once the plan holds a single entry it
/// repeats forever. The default plan is `[VALID]`, so a freshly created queue
/// is immediately usable.
pub struct InMemoryProvider {
    state: Mutex<MemoryState>,
    policies: Vec<PolicySummary>,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProvider {
    pub fn new() -> Self {
        let policies = ["AmazonS3FullAccess", "AmazonS3ReadOnlyAccess", "CloudWatchLogsFullAccess"]
            .into_iter()
            .map(|name| PolicySummary {
                name: name.to_string(),
                arn: format!("arn:memory:policy/{name}"),
            })
            .collect();
        let mut state = MemoryState::default();
        state.status_plan.push_back(QueueStatus::Valid);
        Self {
            state: Mutex::new(state),
            policies,
        }
    }

    /// Replace the advertised policy listing.
    pub fn with_policies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policies = names
            .into_iter()
            .map(Into::into)
            .map(|name| PolicySummary {
                arn: format!("arn:memory:policy/{name}"),
                name,
            })
            .collect();
        self
    }

    /// Script the queue-status sequence. The last entry repeats once the
    /// earlier ones are consumed, so `[CREATING]` models a queue that never
    /// becomes usable.
    pub fn with_status_plan<I>(self, plan: I) -> Self
    where
        I: IntoIterator<Item = QueueStatus>,
    {
        {
            let mut state = self.state.lock();
            state.status_plan = plan.into_iter().collect();
        }
        self
    }

    /// Jobs accepted so far, in submission order.
    pub fn submitted_jobs(&self) -> Vec<JobSubmission> {
        self.state.lock().submitted.clone()
    }

    /// Image builds requested so far.
    pub fn builds(&self) -> Vec<ImageBuildRequest> {
        self.state.lock().builds.clone()
    }

    /// Number of distinct roles that exist.
    pub fn role_count(&self) -> usize {
        self.state.lock().roles.len()
    }

    /// Number of status checks served.
    pub fn status_checks(&self) -> usize {
        self.state.lock().status_checks
    }

    /// Policy arns attached to a role, if any.
    pub fn policies_attached_to(&self, role_name: &str) -> Vec<String> {
        self.state
            .lock()
            .attached_policies
            .get(role_name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Job specs registered so far, in registration order.
    pub fn registered_specs(&self) -> Vec<JobSpecHandle> {
        self.state.lock().job_specs.clone()
    }

    /// Queue-creation requests received so far.
    pub fn queue_requests(&self) -> Vec<QueueRequest> {
        self.state.lock().queue_requests.clone()
    }
}

#[async_trait]
impl CloudBatchProvider for InMemoryProvider {
    async fn get_or_create_repository(
        &self,
        name: &str,
    ) -> Result<Ensured<ImageRepository>, ProviderError> {
        let mut state = self.state.lock();
        if let Some(existing) = state.repositories.get(name) {
            return Ok(Ensured::Found(existing.clone()));
        }
        let repository = ImageRepository {
            name: name.to_string(),
            uri: format!("registry.memory.local/{name}"),
        };
        state.repositories.insert(name.to_string(), repository.clone());
        Ok(Ensured::Created(repository))
    }

    async fn build_and_push(&self, request: &ImageBuildRequest) -> Result<(), ProviderError> {
        if request.tags.is_empty() {
            return Err(ProviderError::Remote(
                "refusing to push an image with no tags".to_string(),
            ));
        }
        debug!(
            uri = %request.repository_uri,
            tags = ?request.tags,
            "recorded image build"
        );
        self.state.lock().builds.push(request.clone());
        Ok(())
    }

    async fn get_or_create_role(
        &self,
        name: &str,
        _description: &str,
    ) -> Result<Ensured<ExecutionRole>, ProviderError> {
        let mut state = self.state.lock();
        if let Some(existing) = state.roles.get(name) {
            return Ok(Ensured::Found(existing.clone()));
        }
        let role = ExecutionRole {
            name: name.to_string(),
            arn: format!("arn:memory:role/{name}/{}", Uuid::new_v4()),
        };
        state.roles.insert(name.to_string(), role.clone());
        Ok(Ensured::Created(role))
    }

    async fn list_policies(&self) -> Result<Vec<PolicySummary>, ProviderError> {
        Ok(self.policies.clone())
    }

    async fn attach_policy(
        &self,
        role_name: &str,
        policy_arn: &str,
    ) -> Result<(), ProviderError> {
        let mut state = self.state.lock();
        if !state.roles.contains_key(role_name) {
            return Err(ProviderError::NotFound(format!("role '{role_name}'")));
        }
        // BTreeSet insert makes re-attachment a no-op.
        state
            .attached_policies
            .entry(role_name.to_string())
            .or_default()
            .insert(policy_arn.to_string());
        Ok(())
    }

    async fn register_job_spec(
        &self,
        request: &JobSpecRequest,
    ) -> Result<JobSpecHandle, ProviderError> {
        let mut state = self.state.lock();
        let revision = state
            .job_specs
            .iter()
            .filter(|spec| spec.name == request.name)
            .count()
            + 1;
        let handle = JobSpecHandle {
            name: request.name.clone(),
            arn: format!("arn:memory:job-spec/{}:{revision}", request.name),
        };
        state.job_specs.push(handle.clone());
        Ok(handle)
    }

    async fn get_or_create_queue(
        &self,
        request: &QueueRequest,
    ) -> Result<Ensured<JobQueueHandle>, ProviderError> {
        let mut state = self.state.lock();
        state.queue_requests.push(request.clone());
        if let Some(existing) = state.queues.get(&request.name) {
            return Ok(Ensured::Found(existing.clone()));
        }
        let handle = JobQueueHandle {
            name: request.name.clone(),
            arn: format!("arn:memory:job-queue/{}", request.name),
        };
        state.queues.insert(request.name.clone(), handle.clone());
        Ok(Ensured::Created(handle))
    }

    async fn get_queue_status(&self, name: &str) -> Result<QueueStatus, ProviderError> {
        let mut state = self.state.lock();
        if !state.queues.contains_key(name) {
            return Err(ProviderError::NotFound(format!("job queue '{name}'")));
        }
        state.status_checks += 1;
        let status = if state.status_plan.len() > 1 {
            state.status_plan.pop_front().unwrap_or(QueueStatus::Valid)
        } else {
            state.status_plan.front().copied().unwrap_or(QueueStatus::Valid)
        };
        Ok(status)
    }

    async fn submit_job(&self, submission: &JobSubmission) -> Result<String, ProviderError> {
        let mut state = self.state.lock();
        if !state.queues.contains_key(&submission.queue_name) {
            return Err(ProviderError::NotFound(format!(
                "job queue '{}'",
                submission.queue_name
            )));
        }
        state.submitted.push(submission.clone());
        Ok(format!("job-{}", Uuid::new_v4()))
    }
}
