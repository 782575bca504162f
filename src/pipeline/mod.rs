//! End-to-end pipeline: dispatch payload in, job report out.
//!
//! Stage order is fixed: validate, generate, template, build, publish,
//! notify. Every stage consumes only validated or derived data; nothing
//! downstream of the validator ever sees the raw payload. One [`Pipeline`]
//! value serves many jobs; jobs share no mutable state and may run
//! concurrently.

use crate::config::{BuildConfig, RawConfig};
use crate::error::{PipelineError, Result};
use crate::generator;
use crate::notify::WebhookNotifier;
use crate::orchestrator::{self, BuildOutcome, OrchestratorConfig, Toolchain};
use crate::publisher::{self, ArtifactRef, ArtifactStore, ReleaseRef};
use crate::templater;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

/// Job lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobState {
    Validating,
    Generating,
    Building,
    Publishing,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Validating => "validating",
            JobState::Generating => "generating",
            JobState::Building => "building",
            JobState::Publishing => "publishing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

/// One build attempt for one dispatch event.
///
/// Owned exclusively by the pipeline; retry state and staging directories
/// are discarded once the job reaches a terminal state.
#[derive(Debug)]
pub struct BuildJob {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub state: JobState,
}

impl BuildJob {
    fn new() -> Self {
        BuildJob {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            state: JobState::Validating,
        }
    }

    fn advance(&mut self, to: JobState) {
        log::info!("job {} {} -> {}", self.id, self.state.as_str(), to.as_str());
        self.state = to;
    }
}

/// Terminal report for one job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub job_id: Uuid,
    pub state: JobState,
    /// Machine-readable failure reason, absent on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human-readable failure message, absent on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Content hash of the generated tree the result is attributed to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Toolchain invocations used
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<ReleaseRef>,
    /// Release sub-failure on an otherwise completed job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_error: Option<String>,
}

impl JobReport {
    #[cfg(test)]
    pub(crate) fn completed_for_test(job_id: Uuid) -> Self {
        JobReport {
            job_id,
            state: JobState::Completed,
            reason: None,
            message: None,
            content_hash: None,
            attempts: 1,
            artifact: None,
            release: None,
            release_error: None,
        }
    }
}

/// Reason string for a publish failure with no artifact produced.
pub const REASON_PUBLISH_FAILED: &str = "publish-failed";

/// The configuration-to-project pipeline.
pub struct Pipeline<T, S> {
    toolchain: T,
    store: S,
    notifier: WebhookNotifier,
    orchestrator: OrchestratorConfig,
}

impl<T: Toolchain, S: ArtifactStore> Pipeline<T, S> {
    pub fn new(
        toolchain: T,
        store: S,
        notifier: WebhookNotifier,
        orchestrator: OrchestratorConfig,
    ) -> Self {
        Pipeline {
            toolchain,
            store,
            notifier,
            orchestrator,
        }
    }

    /// Runs one job for a dispatch payload.
    ///
    /// Build and publish failures terminate the job and are reported in the
    /// returned [`JobReport`]; validation and generation problems surface as
    /// errors because no job state beyond `Validating`/`Generating` exists
    /// for them.
    pub async fn run_job(&self, payload: serde_json::Value, workdir: &Path) -> Result<JobReport> {
        let mut job = BuildJob::new();
        log::info!("job {} accepted", job.id);

        let config = match RawConfig::from_payload(payload) {
            Ok(raw) => match raw.validate() {
                Ok(config) => config,
                Err(e) => {
                    self.notify_failed(&job, "validation-failed", &e.to_string()).await;
                    return Err(e.into());
                }
            },
            Err(e) => {
                self.notify_failed(&job, "validation-failed", &e.to_string()).await;
                return Err(e.into());
            }
        };

        job.advance(JobState::Generating);
        let tree = match generator::generate(&config)
            .map_err(PipelineError::from)
            .and_then(|bundle| templater::render(&config, &bundle).map_err(PipelineError::from))
        {
            Ok(tree) => tree,
            Err(e) => {
                self.notify_failed(&job, "generation-failed", &e.to_string()).await;
                return Err(e);
            }
        };

        let project_root = workdir.join(format!("job-{}", job.id.simple()));
        if let Err(e) = tree.materialize(&project_root) {
            self.notify_failed(&job, "generation-failed", &e.to_string()).await;
            return Err(e.into());
        }
        log::info!(
            "job {} generated tree {} at {}",
            job.id,
            tree.content_hash,
            project_root.display()
        );

        job.advance(JobState::Building);
        let outcome = orchestrator::run_build(
            &self.toolchain,
            &project_root,
            &tree.content_hash,
            &self.orchestrator,
        )
        .await;

        let (package, attempts) = match outcome {
            BuildOutcome::Success {
                package, attempts, ..
            } => (package, attempts),
            BuildOutcome::Failure {
                reason,
                message,
                attempts,
            } => {
                job.advance(JobState::Failed);
                discard_staging(&job, &project_root);
                let report = JobReport {
                    job_id: job.id,
                    state: JobState::Failed,
                    reason: Some(reason.as_str().to_string()),
                    message: Some(message),
                    content_hash: Some(tree.content_hash),
                    attempts,
                    artifact: None,
                    release: None,
                    release_error: None,
                };
                self.notifier.notify(&report).await;
                return Ok(report);
            }
        };

        job.advance(JobState::Publishing);
        let report = match publisher::publish(
            &self.store,
            &config,
            job.id,
            job.created_at,
            &package.apk_path,
        )
        .await
        {
            Ok(published) => {
                job.advance(JobState::Completed);
                if let Some(release_error) = &published.release_error {
                    log::warn!(
                        "job {} completed with release sub-failure: {release_error}",
                        job.id
                    );
                }
                JobReport {
                    job_id: job.id,
                    state: JobState::Completed,
                    reason: None,
                    message: None,
                    content_hash: Some(tree.content_hash),
                    attempts,
                    artifact: Some(published.artifact),
                    release: published.release,
                    release_error: published.release_error,
                }
            }
            Err(e) => {
                // No artifact was ever stored; the job itself failed.
                job.advance(JobState::Failed);
                JobReport {
                    job_id: job.id,
                    state: JobState::Failed,
                    reason: Some(REASON_PUBLISH_FAILED.to_string()),
                    message: Some(e.to_string()),
                    content_hash: Some(tree.content_hash),
                    attempts,
                    artifact: None,
                    release: None,
                    release_error: None,
                }
            }
        };

        // The package has been published (or the job has failed); the staged
        // tree has served its purpose either way.
        discard_staging(&job, &project_root);

        self.notifier.notify(&report).await;
        Ok(report)
    }

    async fn notify_failed(&self, job: &BuildJob, reason: &str, message: &str) {
        let report = JobReport {
            job_id: job.id,
            state: JobState::Failed,
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
            content_hash: None,
            attempts: 0,
            artifact: None,
            release: None,
            release_error: None,
        };
        self.notifier.notify(&report).await;
    }
}

/// Removes a job's staging directory once it reaches a terminal state.
fn discard_staging(job: &BuildJob, project_root: &Path) {
    if let Err(e) = std::fs::remove_dir_all(project_root) {
        log::warn!(
            "job {} staging cleanup failed at {}: {e}",
            job.id,
            project_root.display()
        );
    }
}

/// Validates, generates, and templates without building.
///
/// Shared by the CLI's generate-only mode and callers that want the tree and
/// its hash for caching.
pub fn generate_tree(payload: serde_json::Value) -> Result<(BuildConfig, templater::ProjectTree)> {
    let config = RawConfig::from_payload(payload)?.validate()?;
    let bundle = generator::generate(&config)?;
    let tree = templater::render(&config, &bundle)?;
    Ok((config, tree))
}
