//! End-to-end pipeline tests with scripted toolchain and in-memory store.

use apkwrap::config::BuildConfig;
use apkwrap::error::{BuildError, PipelineError, PublishError};
use apkwrap::notify::WebhookNotifier;
use apkwrap::orchestrator::{BuiltPackage, OrchestratorConfig, Toolchain};
use apkwrap::pipeline::{JobState, Pipeline};
use apkwrap::publisher::{ArtifactRef, ArtifactStore, ReleaseRef};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Toolchain that pops one scripted result per invocation.
struct ScriptedToolchain {
    script: Mutex<Vec<Result<(), BuildError>>>,
}

impl ScriptedToolchain {
    fn new(script: Vec<Result<(), BuildError>>) -> Self {
        ScriptedToolchain {
            script: Mutex::new(script),
        }
    }

    fn succeeding() -> Self {
        Self::new(vec![Ok(())])
    }
}

impl Toolchain for ScriptedToolchain {
    async fn build(&self, project_root: &Path) -> Result<BuiltPackage, BuildError> {
        let next = self.script.lock().expect("lock").remove(0);
        next?;

        // Drop a package where the real toolchain would.
        let out = project_root.join("app/build/outputs/apk/release");
        std::fs::create_dir_all(&out).map_err(|e| BuildError::Fatal {
            reason: e.to_string(),
        })?;
        let apk = out.join("app-release.apk");
        std::fs::write(&apk, b"apk bytes").map_err(|e| BuildError::Fatal {
            reason: e.to_string(),
        })?;
        Ok(BuiltPackage { apk_path: apk })
    }
}

#[derive(Default)]
struct MemoryStore {
    artifacts: Mutex<HashMap<Uuid, ArtifactRef>>,
    releases: Mutex<HashMap<String, ReleaseRef>>,
    uploads: Mutex<u32>,
    fail_releases: bool,
}

impl ArtifactStore for MemoryStore {
    async fn find_artifact(&self, job_id: Uuid) -> Result<Option<ArtifactRef>, PublishError> {
        Ok(self.artifacts.lock().expect("lock").get(&job_id).cloned())
    }

    async fn upload(
        &self,
        job_id: Uuid,
        name: &str,
        _path: &Path,
    ) -> Result<ArtifactRef, PublishError> {
        *self.uploads.lock().expect("lock") += 1;
        let artifact = ArtifactRef {
            id: name.to_string(),
            url: format!("mem://artifacts/{name}"),
        };
        self.artifacts
            .lock()
            .expect("lock")
            .insert(job_id, artifact.clone());
        Ok(artifact)
    }

    async fn find_release(&self, tag: &str) -> Result<Option<ReleaseRef>, PublishError> {
        Ok(self.releases.lock().expect("lock").get(tag).cloned())
    }

    async fn create_release(
        &self,
        tag: &str,
        _artifact: &ArtifactRef,
    ) -> Result<ReleaseRef, PublishError> {
        if self.fail_releases {
            return Err(PublishError::Release {
                tag: tag.to_string(),
                reason: "store rejected release".to_string(),
            });
        }
        let release = ReleaseRef {
            tag: tag.to_string(),
            url: format!("mem://releases/{tag}"),
        };
        self.releases
            .lock()
            .expect("lock")
            .insert(tag.to_string(), release.clone());
        Ok(release)
    }
}

fn payload() -> serde_json::Value {
    json!({
        "hostName": "com.example.myapp",
        "name": "My App",
        "launchUrl": "https://example.com",
        "repoName": "myapp-builds",
        "createRelease": true
    })
}

fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
        ..Default::default()
    }
}

fn pipeline<T: Toolchain, S: ArtifactStore>(toolchain: T, store: S) -> Pipeline<T, S> {
    Pipeline::new(toolchain, store, WebhookNotifier::disabled(), fast_config())
}

fn workdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("tempdir")
}

#[tokio::test]
async fn happy_path_completes_and_publishes() {
    let dir = workdir();
    let pipeline = pipeline(ScriptedToolchain::succeeding(), MemoryStore::default());

    let report = pipeline
        .run_job(payload(), dir.path())
        .await
        .expect("pipeline run");

    assert_eq!(report.state, JobState::Completed);
    assert_eq!(report.attempts, 1);
    assert!(report.content_hash.is_some());
    let artifact = report.artifact.expect("artifact");
    assert!(artifact.id.starts_with("com.example.myapp-"));
    let release = report.release.expect("release");
    assert!(release.tag.starts_with("myapp-builds-v"));
    assert!(report.release_error.is_none());
}

#[tokio::test]
async fn nested_payload_shape_is_accepted() {
    let dir = workdir();
    let pipeline = pipeline(ScriptedToolchain::succeeding(), MemoryStore::default());

    let report = pipeline
        .run_job(json!({ "buildConfig": payload() }), dir.path())
        .await
        .expect("pipeline run");
    assert_eq!(report.state, JobState::Completed);
}

#[tokio::test]
async fn validation_failure_reports_all_fields_and_skips_generation() {
    let dir = workdir();
    let toolchain = ScriptedToolchain::succeeding();
    let store = MemoryStore::default();
    let pipeline = Pipeline::new(toolchain, store, WebhookNotifier::disabled(), fast_config());

    let err = pipeline
        .run_job(json!({ "hostName": "not a domain" }), dir.path())
        .await
        .expect_err("must reject");

    match &err {
        PipelineError::Validation(v) => {
            assert_eq!(v.fields(), vec!["hostName", "name", "launchUrl"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn unknown_icon_never_reaches_the_toolchain() {
    let dir = workdir();
    let toolchain = ScriptedToolchain::succeeding();
    let store = MemoryStore::default();

    let mut bad = payload();
    bad["iconChoice"] = json!("unknown-icon");

    let pipeline = Pipeline::new(toolchain, store, WebhookNotifier::disabled(), fast_config());
    let err = pipeline
        .run_job(bad, dir.path())
        .await
        .expect_err("must reject");

    match &err {
        PipelineError::Validation(v) => assert_eq!(v.fields(), vec!["iconChoice"]),
        other => panic!("expected validation error, got {other:?}"),
    }
    // No generation happened, so no project tree was staged either.
    assert_eq!(std::fs::read_dir(dir.path()).expect("read dir").count(), 0);
}

#[tokio::test]
async fn transient_failures_exhaust_and_fail_the_job() {
    let dir = workdir();
    let transient = || BuildError::Transient {
        reason: "Could not resolve".to_string(),
    };
    let toolchain = ScriptedToolchain::new(vec![Err(transient()), Err(transient()), Err(transient())]);
    let pipeline = Pipeline::new(
        toolchain,
        MemoryStore::default(),
        WebhookNotifier::disabled(),
        fast_config(),
    );

    let report = pipeline
        .run_job(payload(), dir.path())
        .await
        .expect("pipeline run");

    assert_eq!(report.state, JobState::Failed);
    assert_eq!(report.reason.as_deref(), Some("build-exhausted-retries"));
    assert_eq!(report.attempts, 3);
    assert!(report.artifact.is_none());
}

#[tokio::test]
async fn fatal_failure_is_terminal_without_retry() {
    let dir = workdir();
    let toolchain = ScriptedToolchain::new(vec![Err(BuildError::Fatal {
        reason: "error: cannot find symbol".to_string(),
    })]);

    let pipeline = Pipeline::new(
        toolchain,
        MemoryStore::default(),
        WebhookNotifier::disabled(),
        fast_config(),
    );
    let report = pipeline
        .run_job(payload(), dir.path())
        .await
        .expect("pipeline run");

    assert_eq!(report.state, JobState::Failed);
    assert_eq!(report.reason.as_deref(), Some("build-fatal"));
    assert_eq!(report.attempts, 1);
}

#[tokio::test]
async fn build_recovers_within_the_retry_bound() {
    let dir = workdir();
    let toolchain = ScriptedToolchain::new(vec![
        Err(BuildError::Transient {
            reason: "Read timed out".to_string(),
        }),
        Ok(()),
    ]);

    let pipeline = Pipeline::new(
        toolchain,
        MemoryStore::default(),
        WebhookNotifier::disabled(),
        fast_config(),
    );
    let report = pipeline
        .run_job(payload(), dir.path())
        .await
        .expect("pipeline run");

    assert_eq!(report.state, JobState::Completed);
    assert_eq!(report.attempts, 2);
}

#[tokio::test]
async fn release_failure_leaves_job_completed_with_sub_status() {
    let dir = workdir();
    let store = MemoryStore {
        fail_releases: true,
        ..Default::default()
    };

    let pipeline = Pipeline::new(
        ScriptedToolchain::succeeding(),
        store,
        WebhookNotifier::disabled(),
        fast_config(),
    );
    let report = pipeline
        .run_job(payload(), dir.path())
        .await
        .expect("pipeline run");

    assert_eq!(report.state, JobState::Completed);
    assert!(report.artifact.is_some());
    assert!(report.release.is_none());
    assert!(report.release_error.is_some());
}

#[tokio::test]
async fn generated_tree_is_attributed_by_content_hash() {
    let dir = workdir();
    let pipeline = pipeline(ScriptedToolchain::succeeding(), MemoryStore::default());

    let report = pipeline
        .run_job(payload(), dir.path())
        .await
        .expect("pipeline run");

    let (_, tree) = apkwrap::pipeline::generate_tree(payload()).expect("generate");
    assert_eq!(report.content_hash.as_deref(), Some(tree.content_hash.as_str()));
}

#[tokio::test]
async fn staging_tree_is_discarded_at_terminal_state() {
    let dir = workdir();
    let pipeline = pipeline(ScriptedToolchain::succeeding(), MemoryStore::default());

    let report = pipeline
        .run_job(payload(), dir.path())
        .await
        .expect("pipeline run");
    assert_eq!(report.state, JobState::Completed);
    assert_eq!(std::fs::read_dir(dir.path()).expect("read dir").count(), 0);

    // Failed jobs clean up too.
    let failing = ScriptedToolchain::new(vec![Err(BuildError::Fatal {
        reason: "error: cannot find symbol".to_string(),
    })]);
    let pipeline = Pipeline::new(
        failing,
        MemoryStore::default(),
        WebhookNotifier::disabled(),
        fast_config(),
    );
    let report = pipeline
        .run_job(payload(), dir.path())
        .await
        .expect("pipeline run");
    assert_eq!(report.state, JobState::Failed);
    assert_eq!(std::fs::read_dir(dir.path()).expect("read dir").count(), 0);
}

#[tokio::test]
async fn unwritable_workdir_surfaces_as_io_error() {
    let dir = workdir();
    // A file where the workdir should be makes staging fail.
    let blocker = dir.path().join("workdir");
    std::fs::write(&blocker, b"not a directory").expect("write");

    let pipeline = pipeline(ScriptedToolchain::succeeding(), MemoryStore::default());
    let err = pipeline
        .run_job(payload(), &blocker)
        .await
        .expect_err("must fail");
    assert!(matches!(err, PipelineError::Io(_)));
    assert_eq!(err.exit_code(), 1);
}

/// Concurrent jobs share no state; both must complete independently.
#[tokio::test]
async fn independent_jobs_run_concurrently() {
    let dir_a = workdir();
    let dir_b = workdir();

    let pipeline_a = pipeline(ScriptedToolchain::succeeding(), MemoryStore::default());
    let pipeline_b = pipeline(ScriptedToolchain::succeeding(), MemoryStore::default());

    let mut other = payload();
    other["hostName"] = json!("com.example.other");

    let (a, b) = tokio::join!(
        pipeline_a.run_job(payload(), dir_a.path()),
        pipeline_b.run_job(other, dir_b.path()),
    );

    let a = a.expect("job a");
    let b = b.expect("job b");
    assert_eq!(a.state, JobState::Completed);
    assert_eq!(b.state, JobState::Completed);
    assert_ne!(a.job_id, b.job_id);
    assert_ne!(a.content_hash, b.content_hash);
}

/// Republishing the same job against the same store must not duplicate
/// artifacts or tags.
#[tokio::test]
async fn republish_against_shared_store_is_idempotent() {
    use apkwrap::publisher;
    use chrono::Utc;

    let store = MemoryStore::default();
    let config: BuildConfig = apkwrap::RawConfig::from_payload(payload())
        .expect("parse")
        .validate()
        .expect("valid");
    let job_id = Uuid::new_v4();
    let created_at = Utc::now();

    let first = publisher::publish(&store, &config, job_id, created_at, Path::new("app.apk"))
        .await
        .expect("publish");
    let second = publisher::publish(&store, &config, job_id, created_at, Path::new("app.apk"))
        .await
        .expect("republish");

    assert_eq!(first.artifact, second.artifact);
    assert_eq!(first.release, second.release);
    assert_eq!(*store.uploads.lock().expect("lock"), 1);
    assert_eq!(store.releases.lock().expect("lock").len(), 1);
}
