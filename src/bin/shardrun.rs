//! # Shardrun CLI
//!
//! Command-line pipeline for provisioning a one-shot batch-compute run and
//! fanning out indexed shard jobs. Each provisioning stage is exposed as a
//! standalone subcommand, and `run` composes all of them with run-scoped
//! resource names.
//!
//! The binary executes against the deterministic in-memory provider (a
//! rehearsal backend); wiring a live control-plane client happens behind the
//! `CloudBatchProvider` boundary and is outside this crate. Because the
//! rehearsal state lives in-process, resources provisioned by one invocation
//! are not visible to the next: the standalone stage subcommands compose only
//! inside a single `run`, which drives all five stages in one process.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing::error;

use shardrun::config::{
    BuildConfig, FanoutConfig, PipelineConfig, PollPolicy, QueueConfig, RoleConfig, SpecConfig,
};
use shardrun::pipeline::{
    FanoutRequest, ImageRegistryPublisher, JobFanoutSubmitter, JobSpecPublisher,
    PipelineOrchestrator, QueuePublisher, RolePublisher,
};
use shardrun::provider::{CloudBatchProvider, InMemoryProvider};
use shardrun::{logging, PipelineRunReport};

#[derive(Parser)]
#[command(name = "shardrun")]
#[command(about = "Provision a batch-compute run and fan out indexed shard jobs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(after_help = "Stages execute against an in-process rehearsal backend: resources \
provisioned by one invocation are not visible to the next, so the standalone stage \
subcommands only compose within a single `run`. A live control plane plugs in behind \
the CloudBatchProvider trait.")]
struct Cli {
    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format for the run report (text, json)
    #[arg(long, global = true, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ensure an image repository, build the worker image, and push it
    Build(BuildArgs),

    /// Ensure the execution role and attach its access policies
    Role(RoleArgs),

    /// Register a job specification
    JobSpec(JobSpecArgs),

    /// Ensure a job queue and wait until it is VALID
    Queue(QueueArgs),

    /// Submit a fan-out of indexed shard jobs
    Submit(SubmitArgs),

    /// Run the full pipeline: build, role, job spec, queue, fan-out
    Run(RunArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Repository name
    #[arg(short = 'n', long)]
    repo_name: String,

    #[command(flatten)]
    build: BuildFlags,
}

#[derive(Args)]
struct BuildFlags {
    /// Image tags (space separated)
    #[arg(short, long, num_args = 1..)]
    tags: Vec<String>,

    /// Build context directory
    #[arg(short = 'p', long, default_value = ".")]
    buildpath: PathBuf,

    /// Path to the dockerfile
    #[arg(short, long, default_value = "./Dockerfile")]
    dockerfile: PathBuf,

    /// Dependency manifest to inject into the build context
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Stream build output
    #[arg(long)]
    verbose_build: bool,
}

impl BuildFlags {
    fn into_config(self) -> BuildConfig {
        let defaults = BuildConfig::default();
        BuildConfig {
            tags: if self.tags.is_empty() { defaults.tags } else { self.tags },
            build_context: self.buildpath,
            dockerfile: self.dockerfile,
            manifest: self.manifest,
            verbose: self.verbose_build,
        }
    }
}

#[derive(Args)]
struct RoleArgs {
    /// Role name
    #[arg(short = 'n', long)]
    role_name: String,

    #[command(flatten)]
    role: RoleFlags,
}

#[derive(Args)]
struct RoleFlags {
    /// Role description
    #[arg(long, default_value = "shardrun batch job role")]
    description: String,

    /// Policy names to attach (space separated)
    #[arg(long, num_args = 1.., default_values_t = vec!["AmazonS3FullAccess".to_string()])]
    policies: Vec<String>,
}

#[derive(Args)]
#[command(group(ArgGroup::new("role_ref").required(true).args(["role_name", "role_arn"])))]
struct JobSpecArgs {
    /// Job spec name
    #[arg(long)]
    job_spec_name: String,

    /// Execution role name, resolved to its arn
    #[arg(long)]
    role_name: Option<String>,

    /// Execution role arn used directly
    #[arg(long)]
    role_arn: Option<String>,

    /// Container image uri
    #[arg(short = 'u', long)]
    container_uri: String,

    #[command(flatten)]
    spec: SpecFlags,
}

#[derive(Args)]
struct SpecFlags {
    /// Provider-side retries for a failed job instance
    #[arg(long, default_value_t = 3)]
    retries: u32,

    /// vCPUs per job
    #[arg(long, default_value_t = 1)]
    vcpus: u32,

    /// Memory (MiB) per job
    #[arg(long, default_value_t = 32000)]
    mem: u32,

    /// User the container runs as
    #[arg(long, default_value = "shard-user")]
    username: String,
}

impl SpecFlags {
    fn into_config(self) -> SpecConfig {
        SpecConfig {
            vcpus: self.vcpus,
            memory_mib: self.mem,
            run_as_user: self.username,
            retry_attempts: self.retries,
        }
    }
}

#[derive(Args)]
struct QueueArgs {
    /// Queue name
    #[arg(long)]
    queue_name: String,

    #[command(flatten)]
    queue: QueueFlags,
}

#[derive(Args)]
struct QueueFlags {
    /// Queue priority
    #[arg(long, default_value_t = 1)]
    priority: i32,

    /// Compute environments, highest precedence first
    #[arg(long, num_args = 1..,
          default_values_t = vec!["first-run-compute-environment".to_string()])]
    compute_environments: Vec<String>,

    /// Seconds between queue status checks
    #[arg(long, default_value_t = 3)]
    poll_interval: u64,

    /// Maximum number of status checks before giving up
    #[arg(long, default_value_t = 60)]
    poll_attempts: u32,
}

impl QueueFlags {
    fn into_config(self) -> QueueConfig {
        QueueConfig {
            priority: self.priority,
            compute_environments: self.compute_environments,
            poll: PollPolicy::new(self.poll_interval, self.poll_attempts),
        }
    }
}

#[derive(Args)]
struct SubmitArgs {
    /// Immutable job name base; the padded shard index is appended
    #[arg(long)]
    job_name_base: String,

    /// Queue to submit against
    #[arg(long)]
    queue_name: String,

    /// Job spec to submit against
    #[arg(long)]
    job_spec: String,

    #[command(flatten)]
    fanout: FanoutFlags,
}

#[derive(Args)]
struct FanoutFlags {
    /// Number of shard jobs
    #[arg(long, default_value_t = 10)]
    count: u32,

    /// Environment variables as alternating NAME value tokens
    #[arg(long, num_args = 1..)]
    env_vars: Vec<String>,
}

impl FanoutFlags {
    fn into_config(self) -> FanoutConfig {
        FanoutConfig {
            count: self.count,
            env_tokens: self.env_vars,
        }
    }
}

#[derive(Args)]
struct RunArgs {
    /// Base string every run-scoped resource name is derived from
    #[arg(long, default_value = "shardrun")]
    name_base: String,

    #[command(flatten)]
    build: BuildFlags,

    #[command(flatten)]
    role: RoleFlags,

    #[command(flatten)]
    spec: SpecFlags,

    #[command(flatten)]
    queue: QueueFlags,

    #[command(flatten)]
    fanout: FanoutFlags,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let format = cli.format.clone();
    if let Err(err) = dispatch(cli, &format).await {
        error!(error = %err, "pipeline stage failed");
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

async fn dispatch(cli: Cli, format: &str) -> anyhow::Result<()> {
    let provider: Arc<dyn CloudBatchProvider> = Arc::new(InMemoryProvider::new());

    match cli.command {
        Commands::Build(args) => build_stage(provider, args, format).await,
        Commands::Role(args) => role_stage(provider, args, format).await,
        Commands::JobSpec(args) => job_spec_stage(provider, args, format).await,
        Commands::Queue(args) => queue_stage(provider, args, format).await,
        Commands::Submit(args) => submit_stage(provider, args, format).await,
        Commands::Run(args) => run_pipeline(provider, args, format).await,
    }
}

/// Render a stage result as text or pretty JSON, per `--format`.
fn render<T: serde::Serialize>(value: &T, format: &str, text: String) -> anyhow::Result<String> {
    Ok(match format {
        "json" => serde_json::to_string_pretty(value)?,
        _ => text,
    })
}

async fn build_stage(
    provider: Arc<dyn CloudBatchProvider>,
    args: BuildArgs,
    format: &str,
) -> anyhow::Result<()> {
    let publisher = ImageRegistryPublisher::new(provider);
    let repository = publisher
        .ensure_repository(&args.repo_name)
        .await
        .context("ensuring image repository")?;
    publisher
        .build_and_push(&args.build.into_config(), &repository.uri)
        .await
        .context("building and pushing image")?;
    let text = format!("image pushed to {}", repository.uri);
    println!("{}", render(&repository, format, text)?);
    Ok(())
}

async fn role_stage(
    provider: Arc<dyn CloudBatchProvider>,
    args: RoleArgs,
    format: &str,
) -> anyhow::Result<()> {
    let publisher = RolePublisher::new(provider);
    let role = publisher
        .ensure_role(&args.role_name, &args.role.description)
        .await
        .context("ensuring execution role")?;
    publisher
        .attach_policies(&role.name, &args.role.policies)
        .await
        .context("attaching policies")?;
    let text = format!("role {} ready with arn {}", role.name, role.arn);
    println!("{}", render(&role, format, text)?);
    Ok(())
}

async fn job_spec_stage(
    provider: Arc<dyn CloudBatchProvider>,
    args: JobSpecArgs,
    format: &str,
) -> anyhow::Result<()> {
    // role_name and role_arn are mutually exclusive; exactly one is present.
    let role_arn = match (&args.role_name, &args.role_arn) {
        (_, Some(arn)) => arn.clone(),
        (Some(name), None) => {
            let roles = RolePublisher::new(provider.clone());
            roles
                .ensure_role(name, &RoleConfig::default().description)
                .await
                .context("resolving role name")?
                .arn
        }
        (None, None) => unreachable!("clap enforces the role_ref group"),
    };

    let publisher = JobSpecPublisher::new(provider);
    let handle = publisher
        .register(
            &args.job_spec_name,
            &role_arn,
            &args.container_uri,
            &args.spec.into_config(),
        )
        .await
        .context("registering job spec")?;
    let text = format!("job spec {} registered with arn {}", handle.name, handle.arn);
    println!("{}", render(&handle, format, text)?);
    Ok(())
}

async fn queue_stage(
    provider: Arc<dyn CloudBatchProvider>,
    args: QueueArgs,
    format: &str,
) -> anyhow::Result<()> {
    let config = args.queue.into_config();
    let publisher = QueuePublisher::new(provider);
    let handle = publisher
        .ensure_queue(&args.queue_name, &config.compute_environments, config.priority)
        .await
        .context("ensuring job queue")?;
    publisher
        .wait_until_valid(&handle.name, config.poll)
        .await
        .context("waiting for job queue")?;
    let text = format!("queue {} is VALID with arn {}", handle.name, handle.arn);
    println!("{}", render(&handle, format, text)?);
    Ok(())
}

async fn submit_stage(
    provider: Arc<dyn CloudBatchProvider>,
    args: SubmitArgs,
    format: &str,
) -> anyhow::Result<()> {
    let config = args.fanout.into_config();
    let submitter = JobFanoutSubmitter::new(provider);
    let job_ids = submitter
        .submit(&FanoutRequest {
            job_name_base: args.job_name_base,
            queue_name: args.queue_name,
            spec_name: args.job_spec,
            count: config.count,
            env_tokens: config.env_tokens,
        })
        .await
        .context("submitting shard jobs")?;
    let mut text = format!("submitted {} jobs", job_ids.len());
    for job_id in &job_ids {
        text.push_str(&format!("\n  {job_id}"));
    }
    println!("{}", render(&job_ids, format, text)?);
    Ok(())
}

async fn run_pipeline(
    provider: Arc<dyn CloudBatchProvider>,
    args: RunArgs,
    format: &str,
) -> anyhow::Result<()> {
    let config = PipelineConfig {
        name_base: args.name_base,
        build: args.build.into_config(),
        role: RoleConfig {
            description: args.role.description,
            policies: args.role.policies,
        },
        spec: args.spec.into_config(),
        queue: args.queue.into_config(),
        fanout: args.fanout.into_config(),
    };

    let orchestrator = PipelineOrchestrator::new(provider, config);
    let report = orchestrator.run().await.context("pipeline run failed")?;
    print_report(&report, format)
}

fn print_report(report: &PipelineRunReport, format: &str) -> anyhow::Result<()> {
    let mut text = String::from("pipeline run complete");
    text.push_str(&format!("\n  repository: {}", report.repository_uri));
    text.push_str(&format!("\n  role:       {}", report.role_arn));
    text.push_str(&format!("\n  job spec:   {}", report.job_spec_arn));
    text.push_str(&format!("\n  queue:      {}", report.queue_arn));
    text.push_str(&format!("\n  jobs:       {}", report.job_ids.len()));
    for job_id in &report.job_ids {
        text.push_str(&format!("\n    {job_id}"));
    }
    println!("{}", render(report, format, text)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use shardrun::provider::JobQueueHandle;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_explains_the_rehearsal_scope() {
        let command = Cli::command();
        let after_help = command
            .get_after_help()
            .map(ToString::to_string)
            .unwrap_or_default();
        assert!(after_help.contains("rehearsal"));
        assert!(after_help.contains("not visible to the next"));
    }

    #[test]
    fn test_render_honors_the_format_for_every_stage_result() {
        let handle = JobQueueHandle {
            name: "q".to_string(),
            arn: "arn:memory:job-queue/q".to_string(),
        };

        let text = render(&handle, "text", "queue q is VALID".to_string()).unwrap();
        assert_eq!(text, "queue q is VALID");

        let json = render(&handle, "json", String::new()).unwrap();
        assert!(json.contains("\"arn:memory:job-queue/q\""));

        let ids = vec!["job-1".to_string(), "job-2".to_string()];
        let json_ids = render(&ids, "json", String::new()).unwrap();
        assert!(json_ids.contains("job-2"));
    }
}
