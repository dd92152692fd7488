//! End-to-end tests for submitting, running and observing jobs.

mod common;

use std::sync::Arc;

use common::harness::collect_until_finished;
use common::TestHarness;

use clipflow::{
    Engine, EngineConfig, EngineError, JobEvent, JobStatus, MemoryStore, StageStatus,
};

const PROMPT: &str = "Make 3 clips with Arabic subtitles";

fn memory_engine() -> Engine {
    Engine::with_backend(&EngineConfig::default(), Arc::new(MemoryStore::new())).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_prompt_scenario_runs_to_completion() {
    let harness = TestHarness::new();
    let engine = harness.engine();

    let id = engine.submit_prompt(PROMPT).unwrap();
    let job = engine.get_job(&id).unwrap();
    assert_eq!(job.status, JobStatus::Idle);
    assert_eq!(job.stages.len(), 7);
    assert!(job.stages.iter().all(|s| s.status == StageStatus::Pending));
    assert_eq!(job.progress, 0);
    assert_eq!(job.eta_seconds, 47);

    let outcome = engine.start(&id, false).unwrap().wait().await.unwrap();
    assert_eq!(outcome.status, JobStatus::Completed);
    assert_eq!(outcome.message, "Job finished successfully");

    let job = engine.get_job(&id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert_eq!(job.eta_seconds, 0);
    assert!(job.stages.iter().all(|s| s.status == StageStatus::Done));
    assert!(!job.outputs.is_empty());
    assert_eq!(
        job.outputs[0].caption.as_deref(),
        Some("Sample Islamic reminder caption")
    );
    assert!(job.started_at.is_some());
    assert!(job.finished_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_observed_snapshots_are_monotonic() {
    let engine = memory_engine();
    let mut rx = engine.subscribe();

    let handle = engine.submit_and_run(PROMPT, true).unwrap();
    let id = handle.job_id().to_string();
    let (snapshots, outcome) = collect_until_finished(&mut rx, &id).await;

    assert_eq!(outcome.message, "Dry run complete");
    assert!(snapshots.len() > 90);

    let running: Vec<_> = snapshots
        .iter()
        .filter(|j| j.status == JobStatus::Running)
        .collect();
    for pair in running.windows(2) {
        assert!(pair[1].progress >= pair[0].progress);
        assert!(pair[1].eta_seconds <= pair[0].eta_seconds);
    }
    for job in &snapshots {
        assert!(job.stages_in_order(), "stage order broken: {:?}", job.stages);
        assert!(job.stages.iter().filter(|s| s.status == StageStatus::Running).count() <= 1);
    }

    let last = snapshots.last().unwrap();
    assert_eq!(last.status, JobStatus::Completed);
    assert_eq!(last.progress, 100);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_starts_only_one_wins() {
    let engine = memory_engine();
    let id = engine.submit_prompt(PROMPT).unwrap();
    let runtime = tokio::runtime::Handle::current();

    let results: Vec<_> = std::thread::scope(|scope| {
        let attempts: Vec<_> = (0..2)
            .map(|_| {
                let engine = engine.clone();
                let id = id.clone();
                let runtime = runtime.clone();
                scope.spawn(move || {
                    let _guard = runtime.enter();
                    engine.start(&id, false)
                })
            })
            .collect();
        attempts.into_iter().map(|t| t.join().unwrap()).collect()
    });

    let mut handles = Vec::new();
    let mut rejected = 0;
    for result in results {
        match result {
            Ok(handle) => handles.push(handle),
            Err(EngineError::AlreadyRunning { .. }) => rejected += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(handles.len(), 1);
    assert_eq!(rejected, 1);

    handles.pop().unwrap().wait().await.unwrap();
    let job = engine.get_job(&id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    for stage in &job.stages {
        assert_eq!(stage.log.len(), 2, "stage {} ran twice", stage.name);
    }
}

#[tokio::test]
async fn test_blank_prompt_creates_nothing() {
    let engine = memory_engine();
    for prompt in ["", "   ", "\n\t"] {
        assert!(matches!(
            engine.submit_and_run(prompt, false),
            Err(EngineError::InvalidInput(_))
        ));
    }
    assert!(engine.list_jobs().is_empty());
    assert!(engine.selected_job().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_new_jobs_listed_first_and_selected() {
    let engine = memory_engine();
    let first = engine.submit_and_run("first prompt", true).unwrap();
    let second = engine.submit_and_run("second prompt", true).unwrap();

    let jobs = engine.list_jobs();
    assert_eq!(jobs[0].id, second.job_id());
    assert_eq!(jobs[1].id, first.job_id());
    assert_eq!(engine.selected_job().unwrap().id, second.job_id());

    first.wait().await.unwrap();
    second.wait().await.unwrap();
    assert!(engine
        .list_jobs()
        .iter()
        .all(|j| j.status == JobStatus::Completed));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_through_engine() {
    let engine = memory_engine();
    let mut rx = engine.subscribe();
    let handle = engine.submit_and_run(PROMPT, false).unwrap();
    let id = handle.job_id().to_string();

    while let Ok(event) = rx.recv().await {
        if let JobEvent::Updated(job) = event {
            if job.progress >= 50 {
                break;
            }
        }
    }
    engine.cancel(&id).unwrap();
    let outcome = handle.wait().await.unwrap();
    assert_eq!(outcome.status, JobStatus::Cancelled);

    let job = engine.get_job(&id).unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert!(job.progress >= 50 && job.progress < 100);
    assert!(job.outputs.is_empty());
    assert!(!engine.is_running(&id));
    assert!(matches!(
        engine.start(&id, false),
        Err(EngineError::AlreadyRunning { .. })
    ));
}

#[tokio::test]
async fn test_cancel_idle_job_is_not_running() {
    let engine = memory_engine();
    let id = engine.submit_prompt(PROMPT).unwrap();
    assert!(matches!(engine.cancel(&id), Err(EngineError::NotRunning(_))));
    assert!(matches!(
        engine.cancel("no-such-job"),
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_run_timeout_from_config() {
    let config = EngineConfig {
        run_timeout_secs: Some(5),
        ..Default::default()
    };
    let engine = Engine::in_memory(&config).unwrap();

    let outcome = engine
        .submit_and_run(PROMPT, false)
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(outcome.status, JobStatus::Failed);

    let job = engine.get_job(&outcome.job_id).unwrap();
    assert_eq!(job.error.unwrap().kind, clipflow::FailureKind::Timeout);
}
