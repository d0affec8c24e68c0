//! # Pipeline Orchestrator
//!
//! Composes the five publishers in strict dependency order: registry, role,
//! job spec, queue, fan-out. One timestamp suffix is
//! generated per run and shared by every derived resource name, so
//! concurrent runs never collide. On any stage failure nothing is rolled
//! back; the partially-provisioned state is reported to the operator through
//! the error and the logs already emitted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{BuildConfig, PipelineConfig};
use crate::error::Result;
use crate::logging::log_stage_operation;
use crate::naming::RunNames;
use crate::pipeline::{
    absolutize, FanoutRequest, ImageRegistryPublisher, JobFanoutSubmitter, JobSpecPublisher,
    QueuePublisher, RolePublisher,
};
use crate::provider::CloudBatchProvider;

/// Everything a completed run provisioned, serializable for operator output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRunReport {
    pub names: RunNames,
    pub repository_uri: String,
    pub role_arn: String,
    pub job_spec_arn: String,
    pub queue_arn: String,
    /// Provider-assigned ids, in submission order.
    pub job_ids: Vec<String>,
}

pub struct PipelineOrchestrator {
    provider: Arc<dyn CloudBatchProvider>,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    pub fn new(provider: Arc<dyn CloudBatchProvider>, config: PipelineConfig) -> Self {
        Self { provider, config }
    }

    /// Run the full pipeline with a timestamp taken now.
    pub async fn run(&self) -> Result<PipelineRunReport> {
        self.run_at(Utc::now()).await
    }

    /// Run the full pipeline with an explicit run timestamp. Split out so
    /// tests can pin the derived names.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<PipelineRunReport> {
        let names = RunNames::derive(&self.config.name_base, now);
        info!(run = %names.job_name_base, "starting pipeline run");

        // Later stages may run with a different working-directory assumption,
        // so relative paths are pinned before the first delegation.
        let build = self.absolute_build_config()?;

        let image = ImageRegistryPublisher::new(self.provider.clone());
        let repository = image.ensure_repository(&names.repository).await?;
        image.build_and_push(&build, &repository.uri).await?;
        log_stage_operation("registry", &repository.name, "published", Some(&repository.uri));

        let roles = RolePublisher::new(self.provider.clone());
        let role = roles.ensure_role(&names.role, &self.config.role.description).await?;
        roles.attach_policies(&role.name, &self.config.role.policies).await?;
        log_stage_operation("role", &role.name, "ready", Some(&role.arn));

        let specs = JobSpecPublisher::new(self.provider.clone());
        let job_spec = specs
            .register(&names.job_spec, &role.arn, &repository.uri, &self.config.spec)
            .await?;
        log_stage_operation("job-spec", &job_spec.name, "registered", Some(&job_spec.arn));

        let queues = QueuePublisher::new(self.provider.clone());
        let queue = queues
            .ensure_queue(
                &names.queue,
                &self.config.queue.compute_environments,
                self.config.queue.priority,
            )
            .await?;
        queues.wait_until_valid(&queue.name, self.config.queue.poll).await?;
        log_stage_operation("queue", &queue.name, "valid", Some(&queue.arn));

        let fanout = JobFanoutSubmitter::new(self.provider.clone());
        let job_ids = fanout
            .submit(&FanoutRequest {
                job_name_base: names.job_name_base.clone(),
                queue_name: queue.name.clone(),
                spec_name: job_spec.name.clone(),
                count: self.config.fanout.count,
                env_tokens: self.config.fanout.env_tokens.clone(),
            })
            .await?;
        log_stage_operation(
            "fan-out",
            &names.job_name_base,
            "submitted",
            Some(&format!("{} jobs", job_ids.len())),
        );

        Ok(PipelineRunReport {
            names,
            repository_uri: repository.uri,
            role_arn: role.arn,
            job_spec_arn: job_spec.arn,
            queue_arn: queue.arn,
            job_ids,
        })
    }

    fn absolute_build_config(&self) -> Result<BuildConfig> {
        let build = &self.config.build;
        Ok(BuildConfig {
            tags: build.tags.clone(),
            build_context: absolutize(&build.build_context)?,
            dockerfile: absolutize(&build.dockerfile)?,
            manifest: build
                .manifest
                .as_deref()
                .map(absolutize)
                .transpose()?,
            verbose: build.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_build_paths_are_made_absolute() {
        let provider = Arc::new(InMemoryProvider::new());
        let mut config = PipelineConfig::new("abs-test");
        config.fanout.count = 1;
        config.queue.poll = crate::config::PollPolicy::new(0, 3);
        let orchestrator = PipelineOrchestrator::new(provider.clone(), config);

        orchestrator.run().await.unwrap();
        let builds = provider.builds();
        assert_eq!(builds.len(), 1);
        assert!(builds[0].build_context.is_absolute());
        assert!(builds[0].dockerfile.is_absolute());
    }

    #[tokio::test]
    async fn test_run_names_are_pinned_by_the_injected_timestamp() {
        let provider = Arc::new(InMemoryProvider::new());
        let mut config = PipelineConfig::new("pin");
        config.fanout.count = 2;
        config.queue.poll = crate::config::PollPolicy::new(0, 3);
        let orchestrator = PipelineOrchestrator::new(provider, config);

        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let report = orchestrator.run_at(now).await.unwrap();
        assert_eq!(report.names.queue, "pin-job-queue-20260102-030405");
        assert_eq!(report.job_ids.len(), 2);
    }
}
