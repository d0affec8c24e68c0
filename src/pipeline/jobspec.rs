//! # Job Spec Publisher
//!
//! Registers the reusable job specification: image reference, resource
//! shape, run-as identity, and the provider-side retry policy. Registration
//! is always a create; names are timestamp-scoped per run, so a re-register
//! producing a new revision is acceptable.

use std::sync::Arc;

use tracing::info;

use crate::config::SpecConfig;
use crate::error::{PipelineError, Result};
use crate::provider::{CloudBatchProvider, JobSpecHandle, JobSpecRequest};

pub struct JobSpecPublisher {
    provider: Arc<dyn CloudBatchProvider>,
}

impl JobSpecPublisher {
    pub fn new(provider: Arc<dyn CloudBatchProvider>) -> Self {
        Self { provider }
    }

    /// Register a job spec. The provider's `retry_attempts` is the only
    /// automatic-retry mechanism in the whole system and must be >= 1.
    pub async fn register(
        &self,
        name: &str,
        role_arn: &str,
        image_uri: &str,
        config: &SpecConfig,
    ) -> Result<JobSpecHandle> {
        if config.retry_attempts < 1 {
            return Err(PipelineError::Configuration(
                "job spec retry_attempts must be at least 1".to_string(),
            ));
        }

        let request = JobSpecRequest {
            name: name.to_string(),
            role_arn: role_arn.to_string(),
            image_uri: image_uri.to_string(),
            vcpus: config.vcpus,
            memory_mib: config.memory_mib,
            run_as_user: config.run_as_user.clone(),
            retry_attempts: config.retry_attempts,
        };
        let handle = self.provider.register_job_spec(&request).await?;
        info!(name = %handle.name, arn = %handle.arn, "registered job spec");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;

    #[tokio::test]
    async fn test_zero_retry_attempts_is_a_configuration_error() {
        let provider = Arc::new(InMemoryProvider::new());
        let publisher = JobSpecPublisher::new(provider.clone());
        let config = SpecConfig {
            retry_attempts: 0,
            ..SpecConfig::default()
        };

        let err = publisher
            .register("spec", "arn:role", "registry/app:latest", &config)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(provider.registered_specs().is_empty());
    }

    #[tokio::test]
    async fn test_re_registration_creates_a_new_revision() {
        let provider = Arc::new(InMemoryProvider::new());
        let publisher = JobSpecPublisher::new(provider.clone());
        let config = SpecConfig::default();

        let first = publisher
            .register("spec", "arn:role", "registry/app:latest", &config)
            .await
            .unwrap();
        let second = publisher
            .register("spec", "arn:role", "registry/app:latest", &config)
            .await
            .unwrap();

        assert_eq!(first.name, second.name);
        assert_ne!(first.arn, second.arn);
        assert_eq!(provider.registered_specs().len(), 2);
    }
}
