//! End-to-end pipeline tests against the deterministic in-memory provider.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use shardrun::config::{PipelineConfig, PollPolicy};
use shardrun::provider::{InMemoryProvider, QueueStatus};
use shardrun::{PipelineError, PipelineOrchestrator};

fn fast_config(name_base: &str, count: u32) -> PipelineConfig {
    let mut config = PipelineConfig::new(name_base);
    config.fanout.count = count;
    config.queue.poll = PollPolicy::new(0, 5);
    config
}

#[tokio::test]
async fn full_run_submits_count_jobs_against_the_provisioned_queue_and_spec() {
    let provider = Arc::new(InMemoryProvider::new());
    let orchestrator = PipelineOrchestrator::new(provider.clone(), fast_config("e2e", 2));

    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.job_ids.len(), 2);
    let jobs = provider.submitted_jobs();
    assert_eq!(jobs.len(), 2);
    for job in &jobs {
        assert_eq!(job.queue_name, report.names.queue);
        assert_eq!(job.spec_name, report.names.job_spec);
    }
    // Index-ascending submission order, names derived from the same base.
    assert_eq!(jobs[0].name, format!("{}0", report.names.job_name_base));
    assert_eq!(jobs[1].name, format!("{}1", report.names.job_name_base));
}

#[tokio::test]
async fn every_resource_name_shares_the_run_timestamp() {
    let provider = Arc::new(InMemoryProvider::new());
    let orchestrator = PipelineOrchestrator::new(provider, fast_config("stamp", 1));

    let now = Utc.with_ymd_and_hms(2026, 5, 6, 7, 8, 9).unwrap();
    let report = orchestrator.run_at(now).await.unwrap();

    let suffix = "20260506-070809";
    assert!(report.names.repository.ends_with(suffix));
    assert!(report.names.role.ends_with(suffix));
    assert!(report.names.job_spec.ends_with(suffix));
    assert!(report.names.queue.ends_with(suffix));
    assert!(report.names.job_name_base.contains(suffix));
}

#[tokio::test]
async fn queue_that_never_validates_aborts_the_run_without_submitting() {
    let provider = Arc::new(InMemoryProvider::new().with_status_plan([QueueStatus::Creating]));
    let mut config = fast_config("stuck", 4);
    config.queue.poll = PollPolicy::new(0, 3);
    let orchestrator = PipelineOrchestrator::new(provider.clone(), config);

    let err = orchestrator.run().await.unwrap_err();
    assert!(matches!(err, PipelineError::QueueTimeout { attempts: 3, .. }));
    assert_eq!(provider.status_checks(), 3);
    assert!(provider.submitted_jobs().is_empty());

    // Earlier stages are not rolled back: the image build and the role
    // survive the aborted run.
    assert_eq!(provider.builds().len(), 1);
    assert_eq!(provider.role_count(), 1);
}

#[tokio::test]
async fn odd_env_token_list_fails_fast_after_provisioning() {
    let provider = Arc::new(InMemoryProvider::new());
    let mut config = fast_config("envcheck", 3);
    config.fanout.env_tokens = vec!["A".to_string(), "1".to_string(), "B".to_string()];
    let orchestrator = PipelineOrchestrator::new(provider.clone(), config);

    let err = orchestrator.run().await.unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
    assert!(provider.submitted_jobs().is_empty());
}

#[tokio::test]
async fn env_pairs_reach_every_submitted_job() {
    let provider = Arc::new(InMemoryProvider::new());
    let mut config = fast_config("env", 2);
    config.fanout.env_tokens = ["SUBJECT_LIST", "s3://bucket/subjects.txt", "LOG_LEVEL", "info"]
        .iter()
        .map(|token| token.to_string())
        .collect();
    let orchestrator = PipelineOrchestrator::new(provider.clone(), config);

    orchestrator.run().await.unwrap();

    for job in provider.submitted_jobs() {
        assert_eq!(job.environment.len(), 2);
        assert_eq!(job.environment[0].name, "SUBJECT_LIST");
        assert_eq!(job.environment[1].value, "info");
    }
}

#[tokio::test]
async fn unknown_policy_aborts_before_spec_registration() {
    let provider = Arc::new(InMemoryProvider::new().with_policies(["SomeOtherPolicy"]));
    let orchestrator = PipelineOrchestrator::new(provider.clone(), fast_config("badpolicy", 1));

    let err = orchestrator.run().await.unwrap_err();
    assert!(matches!(err, PipelineError::PolicyNotFound(_)));
    assert!(provider.registered_specs().is_empty());
    assert!(provider.submitted_jobs().is_empty());
}

#[tokio::test]
async fn rerunning_against_existing_resources_is_idempotent_at_the_provider() {
    // Two runs pinned to the same timestamp collide on every name; the
    // get-or-create stages tolerate that, and only create-only stages (job
    // spec) produce a second resource.
    let provider = Arc::new(InMemoryProvider::new());
    let now = Utc.with_ymd_and_hms(2026, 5, 6, 7, 8, 9).unwrap();

    let first = PipelineOrchestrator::new(provider.clone(), fast_config("twice", 1));
    let second = PipelineOrchestrator::new(provider.clone(), fast_config("twice", 1));
    let report_a = first.run_at(now).await.unwrap();
    let report_b = second.run_at(now).await.unwrap();

    assert_eq!(report_a.role_arn, report_b.role_arn);
    assert_eq!(report_a.queue_arn, report_b.queue_arn);
    assert_eq!(provider.role_count(), 1);
    assert_eq!(provider.registered_specs().len(), 2);
}
