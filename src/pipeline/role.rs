//! # Role Publisher
//!
//! Ensures the execution role exists and carries the required access
//! policies. A pre-existing role is not an error; attaching an
//! already-attached policy is a no-op. Policy names are human-readable and
//! resolved against the provider's listing; an unresolvable name is fatal.

use std::sync::Arc;

use tracing::info;

use crate::error::{PipelineError, Result};
use crate::provider::{CloudBatchProvider, Ensured, ExecutionRole};

pub struct RolePublisher {
    provider: Arc<dyn CloudBatchProvider>,
}

impl RolePublisher {
    pub fn new(provider: Arc<dyn CloudBatchProvider>) -> Self {
        Self { provider }
    }

    /// Idempotent get-or-create: a second call with the same name returns the
    /// same arn without creating anything.
    pub async fn ensure_role(&self, name: &str, description: &str) -> Result<ExecutionRole> {
        match self.provider.get_or_create_role(name, description).await? {
            Ensured::Created(role) => {
                info!(name = %role.name, arn = %role.arn, "created execution role");
                Ok(role)
            }
            Ensured::Found(role) => {
                info!(name = %role.name, arn = %role.arn, "execution role already exists");
                Ok(role)
            }
        }
    }

    /// Resolve each policy name and attach it to the role. All attachments
    /// must succeed; attachment order is not significant.
    pub async fn attach_policies(&self, role_name: &str, policy_names: &[String]) -> Result<()> {
        let available = self.provider.list_policies().await?;
        for policy_name in policy_names {
            let policy = available
                .iter()
                .find(|candidate| candidate.name == *policy_name)
                .ok_or_else(|| PipelineError::PolicyNotFound(policy_name.clone()))?;
            self.provider.attach_policy(role_name, &policy.arn).await?;
            info!(role = %role_name, policy = %policy.name, "attached policy");
        }
        Ok(())
    }
}
