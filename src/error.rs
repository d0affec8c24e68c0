//! # Structured Error Handling
//!
//! Error taxonomy for the provisioning pipeline. Provider-level failures are
//! kept separate from pipeline-level ones so that publishers can classify
//! control-plane responses (a missing policy is fatal, an already-existing
//! role is not) without string matching at the call site.

use thiserror::Error;

/// Errors surfaced by a [`CloudBatchProvider`](crate::provider::CloudBatchProvider)
/// implementation.
///
/// Existence of a resource is never an error: get-or-create operations report
/// it through [`Ensured::Found`](crate::provider::Ensured) instead.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A lookup by name matched nothing and no creation fallback applies.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Any other control-plane failure (build, push, malformed request).
    /// Propagates unchanged and aborts the pipeline at the current stage.
    #[error("provider request failed: {0}")]
    Remote(String),
}

/// Errors produced by the pipeline stages themselves.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed input detected before any remote call is made.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A human-readable policy name could not be resolved against the
    /// provider's policy listing.
    #[error("no policy named '{0}' is available from the provider")]
    PolicyNotFound(String),

    /// The job queue never reached VALID within the poll budget.
    #[error("job queue '{queue}' did not become VALID after {attempts} status checks")]
    QueueTimeout { queue: String, attempts: u32 },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Filesystem failures around the build context (manifest injection).
    #[error("build context i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_converts_into_pipeline_error() {
        let err: PipelineError = ProviderError::Remote("image push rejected".to_string()).into();
        assert!(matches!(err, PipelineError::Provider(_)));
        assert_eq!(err.to_string(), "provider request failed: image push rejected");
    }

    #[test]
    fn test_queue_timeout_display_names_the_queue() {
        let err = PipelineError::QueueTimeout {
            queue: "shardrun-job-queue".to_string(),
            attempts: 60,
        };
        assert!(err.to_string().contains("shardrun-job-queue"));
        assert!(err.to_string().contains("60"));
    }
}
