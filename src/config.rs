//! Per-stage pipeline configuration.
//!
//! Plain serde-backed structs with the same defaults the CLI advertises, so a
//! composed run and the standalone stage subcommands agree on behavior.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Image build stage settings. The repository name itself is run-scoped and
/// supplied separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Image tags to build and push; an empty list means `["latest"]`.
    pub tags: Vec<String>,
    /// Build context directory, relative paths allowed.
    pub build_context: PathBuf,
    pub dockerfile: PathBuf,
    /// Optional dependency manifest copied into the build context for the
    /// duration of the build.
    pub manifest: Option<PathBuf>,
    /// Stream build output to the operator.
    pub verbose: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            tags: vec!["latest".to_string()],
            build_context: PathBuf::from("."),
            dockerfile: PathBuf::from("./Dockerfile"),
            manifest: None,
            verbose: false,
        }
    }
}

/// Execution role stage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    pub description: String,
    /// Human-readable policy names resolved against the provider's listing.
    pub policies: Vec<String>,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            description: "shardrun batch job role".to_string(),
            policies: vec!["AmazonS3FullAccess".to_string()],
        }
    }
}

/// Job specification stage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecConfig {
    pub vcpus: u32,
    pub memory_mib: u32,
    pub run_as_user: String,
    /// Provider-side retries for a failed job instance; must be >= 1.
    pub retry_attempts: u32,
}

impl Default for SpecConfig {
    fn default() -> Self {
        Self {
            vcpus: 1,
            memory_mib: 32000,
            run_as_user: "shard-user".to_string(),
            retry_attempts: 3,
        }
    }
}

/// Bounded poll budget for queue readiness. Interval zero lets tests walk
/// many iterations without elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub interval_seconds: u64,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval_seconds: u64, max_attempts: u32) -> Self {
        Self {
            interval_seconds,
            max_attempts,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        // 60 checks spaced 3 s apart bounds the wait at roughly 3 minutes.
        Self {
            interval_seconds: 3,
            max_attempts: 60,
        }
    }
}

/// Job queue stage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Ordering semantics across queues are provider-defined.
    pub priority: i32,
    /// Highest-precedence environment first.
    pub compute_environments: Vec<String>,
    pub poll: PollPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            priority: 1,
            compute_environments: vec!["first-run-compute-environment".to_string()],
            poll: PollPolicy::default(),
        }
    }
}

/// Fan-out stage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Number of indexed shard jobs to submit.
    pub count: u32,
    /// Flat alternating NAME value NAME value ... tokens; paired after the
    /// even-length precondition check.
    pub env_tokens: Vec<String>,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            count: 10,
            env_tokens: Vec::new(),
        }
    }
}

/// Everything one composed pipeline run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// Base string every run-scoped resource name is derived from.
    pub name_base: String,
    pub build: BuildConfig,
    pub role: RoleConfig,
    pub spec: SpecConfig,
    pub queue: QueueConfig,
    pub fanout: FanoutConfig,
}

impl PipelineConfig {
    pub fn new<S: Into<String>>(name_base: S) -> Self {
        Self {
            name_base: name_base.into(),
            ..Self::default()
        }
    }
}
