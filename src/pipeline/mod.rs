//! # Pipeline Stages
//!
//! One publisher per provisioning stage, composed by
//! [`PipelineOrchestrator`](orchestrator::PipelineOrchestrator) in strict
//! dependency order: registry, role, job spec, queue, fan-out. Each publisher
//! owns exactly one stage's semantics and talks to the control plane only
//! through the injected [`CloudBatchProvider`](crate::provider::CloudBatchProvider).

use std::io;
use std::path::{Path, PathBuf};

pub mod fanout;
pub mod image;
pub mod jobspec;
pub mod orchestrator;
pub mod queue;
pub mod role;

pub use fanout::{FanoutRequest, JobFanoutSubmitter};
pub use image::ImageRegistryPublisher;
pub use jobspec::JobSpecPublisher;
pub use orchestrator::{PipelineOrchestrator, PipelineRunReport};
pub use queue::QueuePublisher;
pub use role::RolePublisher;

/// Resolve a user-supplied path to an absolute one without requiring it to
/// exist yet. Later stages may run with a different working-directory
/// assumption, so relative paths are pinned down up front.
pub(crate) fn absolutize(path: &Path) -> io::Result<PathBuf> {
    std::path::absolute(path)
}
