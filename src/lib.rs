//! # Shardrun
//!
//! One-shot batch-compute provisioning and indexed shard fan-out on a managed
//! cloud scheduler.
//!
//! ## Overview
//!
//! A run publishes a container image, ensures an execution role, registers a
//! job specification, ensures a prioritized job queue, and submits N
//! independent jobs that each process one shard of work, distinguished only
//! by an integer index passed as `--index <n>`. Control flow is strictly
//! linear (registry, role, job spec, queue, fan-out) and every derived
//! resource name shares one timestamp suffix so concurrent runs never
//! collide.
//!
//! ## Architecture
//!
//! ```text
//! PipelineOrchestrator
//!   ├── ImageRegistryPublisher   ensure repository, build + push image
//!   ├── RolePublisher            ensure role, attach policies
//!   ├── JobSpecPublisher         register job specification
//!   ├── QueuePublisher           ensure queue, bounded poll until VALID
//!   └── JobFanoutSubmitter       submit N indexed shard jobs
//!                │
//!                ▼
//!        CloudBatchProvider      injected control-plane capability
//! ```
//!
//! All control-plane traffic goes through the injected
//! [`CloudBatchProvider`](provider::CloudBatchProvider); the crate ships a
//! deterministic [`InMemoryProvider`](provider::InMemoryProvider) double that
//! also backs the CLI's rehearsal mode. The only blocking point is the
//! bounded queue-readiness poll; jobs are never polled for completion, since
//! an accepted job belongs to the remote scheduler.
//!
//! ## Module Organization
//!
//! - [`pipeline`] - the five publishers and the orchestrator
//! - [`provider`] - the control-plane capability trait and the in-memory double
//! - [`config`] - per-stage configuration with CLI-matching defaults
//! - [`naming`] - run-scoped names and shard index padding
//! - [`error`] - pipeline and provider error taxonomy
//! - [`logging`] - tracing setup and stage-scoped logging

pub mod config;
pub mod error;
pub mod logging;
pub mod naming;
pub mod pipeline;
pub mod provider;

pub use config::{
    BuildConfig, FanoutConfig, PipelineConfig, PollPolicy, QueueConfig, RoleConfig, SpecConfig,
};
pub use error::{PipelineError, ProviderError, Result};
pub use naming::RunNames;
pub use pipeline::{
    FanoutRequest, ImageRegistryPublisher, JobFanoutSubmitter, JobSpecPublisher,
    PipelineOrchestrator, PipelineRunReport, QueuePublisher, RolePublisher,
};
pub use provider::{CloudBatchProvider, Ensured, InMemoryProvider, QueueStatus};
