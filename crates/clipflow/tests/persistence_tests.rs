//! Tests for durable state across engine restarts.

mod common;

use common::TestHarness;

use clipflow::store::{JOBS_KEY, SETTINGS_KEY};
use clipflow::{FailureKind, JobFactory, JobStatus, StageStatus};

#[tokio::test(start_paused = true)]
async fn test_persist_then_reload_is_field_for_field_equal() {
    let harness = TestHarness::new();

    let before = {
        let engine = harness.engine();
        engine.submit_prompt("idle job").unwrap();
        engine
            .submit_and_run("finished job", true)
            .unwrap()
            .wait()
            .await
            .unwrap();
        engine.list_jobs()
    };

    let engine = harness.engine();
    assert_eq!(engine.list_jobs(), before);
    assert_eq!(before[0].prompt, "finished job");
    assert_eq!(before[0].status, JobStatus::Completed);
    assert!(before[0].dry_run);
}

#[test]
fn test_persisted_layout() {
    let harness = TestHarness::new();
    let engine = harness.engine();
    engine.submit_prompt("layout check").unwrap();
    engine
        .update_settings(|s| s.sub_langs = Some("Arabic, English".to_string()))
        .unwrap();

    let jobs: serde_json::Value = serde_json::from_str(&harness.raw(JOBS_KEY).unwrap()).unwrap();
    let job = &jobs.as_array().unwrap()[0];
    assert_eq!(job["prompt"], "layout check");
    assert_eq!(job["status"], "idle");
    assert_eq!(job["etaSeconds"], 47);
    assert_eq!(job["stages"][0]["expectedDuration"], 8.0);
    assert!(job["createdAt"].as_str().unwrap().contains('T'));

    let settings: serde_json::Value =
        serde_json::from_str(&harness.raw(SETTINGS_KEY).unwrap()).unwrap();
    assert_eq!(settings, serde_json::json!({"subLangs": "Arabic, English"}));
}

#[test]
fn test_malformed_jobs_value_loads_empty() {
    let harness = TestHarness::new();
    harness.seed_raw(JOBS_KEY, "this is not json [");
    harness.seed_raw(SETTINGS_KEY, "42");

    let engine = harness.engine();
    assert!(engine.list_jobs().is_empty());
    assert!(engine.selected_job().is_none());
    assert_eq!(engine.settings(), clipflow::Settings::default());

    engine.submit_prompt("fresh start").unwrap();
    assert_eq!(harness.engine().list_jobs().len(), 1);
}

#[test]
fn test_legacy_records_are_accepted() {
    let harness = TestHarness::new();
    harness.seed_raw(
        JOBS_KEY,
        r##"[{
            "id": "7d9f3c1e-legacy",
            "prompt": "Old job",
            "status": "completed",
            "progress": 100,
            "etaSeconds": 0,
            "steps": [
                {"name": "Ingest & Highlights Detection", "status": "done", "duration": 8, "log": ["Started Ingest & Highlights Detection"]}
            ],
            "createdAt": "2025-08-01T10:00:00.000Z",
            "outputs": [{"caption": "Sample Islamic reminder caption", "hashtags": ["#Islamic"]}]
        }]"##,
    );

    let engine = harness.engine();
    let job = engine.get_job("7d9f3c1e-legacy").unwrap();
    assert_eq!(job.stages[0].expected_duration, 8.0);
    assert_eq!(job.stages[0].status, StageStatus::Done);
    assert_eq!(job.outputs.len(), 1);
}

#[test]
fn test_running_jobs_are_marked_interrupted() {
    let harness = TestHarness::new();
    let mut job = serde_json::to_value(JobFactory::new().create("half done").unwrap()).unwrap();
    job["status"] = "running".into();
    job["progress"] = 30.into();
    job["stages"][0]["status"] = "done".into();
    job["stages"][1]["status"] = "running".into();
    let id = job["id"].as_str().unwrap().to_string();
    harness.seed_raw(JOBS_KEY, &serde_json::json!([job]).to_string());

    let engine = harness.engine();
    let job = engine.get_job(&id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.progress, 30);
    let failure = job.error.clone().unwrap();
    assert_eq!(failure.kind, FailureKind::Interrupted);
    assert_eq!(failure.stage.as_deref(), Some(job.stages[1].name.as_str()));

    let raw: serde_json::Value = serde_json::from_str(&harness.raw(JOBS_KEY).unwrap()).unwrap();
    assert_eq!(raw[0]["status"], "failed");
    assert_eq!(raw[0]["error"]["kind"], "interrupted");
}

#[test]
fn test_settings_survive_restart() {
    let harness = TestHarness::new();
    {
        let engine = harness.engine();
        engine
            .update_settings(|s| {
                s.slots = Some("08:00, 20:00".to_string());
                s.days = Some("Mon-Fri".to_string());
                s.nasheed = Some("nasheed.mp3".to_string());
            })
            .unwrap();
        engine
            .update_settings(|s| s.days = Some("Sat-Sun".to_string()))
            .unwrap();
    }

    let settings = harness.engine().settings();
    assert_eq!(settings.schedule_slots(), vec!["08:00", "20:00"]);
    assert_eq!(settings.days_or_default(), "Sat-Sun");
    assert_eq!(settings.nasheed.as_deref(), Some("nasheed.mp3"));
    assert_eq!(settings.sub_langs_or_default(), "Arabic, French");
}

#[test]
fn test_database_created_under_temp_dir() {
    let harness = TestHarness::new();
    let _engine = harness.engine();
    assert!(harness.database_path.exists());
    assert!(harness.database_path.starts_with(harness.temp_path()));
}
