//! Artifact publishing and release creation.
//!
//! The store is an explicit capability ([`ArtifactStore`]) handed to the
//! publisher, never ambient state, so tests run against in-memory fakes.
//! Publishing is idempotent per job: existing artifacts and tags are
//! detected and reported as success without re-uploading or re-tagging.

pub mod http;
pub mod local;

use crate::config::BuildConfig;
use crate::error::PublishError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

/// Reference to a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRef {
    /// Store-assigned identifier
    pub id: String,
    /// Retrieval location
    pub url: String,
}

/// Reference to a created release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseRef {
    /// The release tag
    pub tag: String,
    /// Retrieval location
    pub url: String,
}

/// Artifact/release storage capability.
///
/// All operations must be safely retryable: the publisher calls the `find_*`
/// methods before the mutating ones and retries every failed call once.
#[allow(async_fn_in_trait)]
pub trait ArtifactStore {
    /// Looks up the artifact previously uploaded for this job, if any.
    async fn find_artifact(&self, job_id: Uuid) -> Result<Option<ArtifactRef>, PublishError>;

    /// Uploads the package at `path` under the job's identity.
    async fn upload(
        &self,
        job_id: Uuid,
        name: &str,
        path: &Path,
    ) -> Result<ArtifactRef, PublishError>;

    /// Looks up an existing release by tag.
    async fn find_release(&self, tag: &str) -> Result<Option<ReleaseRef>, PublishError>;

    /// Creates a tagged release carrying the given artifact.
    async fn create_release(
        &self,
        tag: &str,
        artifact: &ArtifactRef,
    ) -> Result<ReleaseRef, PublishError>;
}

/// Result of the publish phase for one job.
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    /// The uploaded (or already-present) artifact
    pub artifact: ArtifactRef,
    /// The created (or already-present) release, when one was requested
    pub release: Option<ReleaseRef>,
    /// Release sub-failure; the job still counts as completed because the
    /// artifact exists
    pub release_error: Option<String>,
}

/// Builds the release tag for a job.
///
/// The timestamp comes from the job's creation time, not the publish time,
/// so re-publishing the same job derives the same tag and the idempotence
/// check can find it. The short job id suffix avoids collisions between
/// jobs created in the same second.
pub fn release_tag(config: &BuildConfig, job_id: Uuid, created_at: DateTime<Utc>) -> String {
    let repo = config
        .repo_name
        .clone()
        .unwrap_or_else(|| config.host_name.replace('.', "-"));
    let short_id = &job_id.simple().to_string()[..8];
    format!("{repo}-v{}-{short_id}", created_at.format("%Y%m%d%H%M%S"))
}

/// Artifact file name within the store.
pub fn artifact_name(config: &BuildConfig, job_id: Uuid) -> String {
    let short_id = &job_id.simple().to_string()[..8];
    format!("{}-{short_id}.apk", config.host_name)
}

/// Publishes the built package for one job.
///
/// Always uploads the artifact; additionally creates a tagged release when
/// `config.create_release` is set. A release failure after a successful
/// upload is reported in [`PublishOutcome::release_error`] rather than as an
/// error, because the primary artifact already exists.
pub async fn publish<S: ArtifactStore>(
    store: &S,
    config: &BuildConfig,
    job_id: Uuid,
    created_at: DateTime<Utc>,
    apk_path: &Path,
) -> Result<PublishOutcome, PublishError> {
    let existing = match store.find_artifact(job_id).await {
        Ok(found) => found,
        Err(first) => {
            log::warn!("artifact lookup failed ({first}), retrying once");
            store.find_artifact(job_id).await?
        }
    };

    let artifact = match existing {
        Some(existing) => {
            log::info!("artifact for job {job_id} already uploaded ({}), skipping", existing.id);
            existing
        }
        None => {
            let name = artifact_name(config, job_id);
            match store.upload(job_id, &name, apk_path).await {
                Ok(artifact) => artifact,
                Err(first) => {
                    log::warn!("upload failed ({first}), retrying once");
                    store.upload(job_id, &name, apk_path).await?
                }
            }
        }
    };

    if !config.create_release {
        return Ok(PublishOutcome {
            artifact,
            release: None,
            release_error: None,
        });
    }

    let tag = release_tag(config, job_id, created_at);
    let found = match store.find_release(&tag).await {
        Ok(found) => Ok(found),
        Err(first) => {
            log::warn!("release lookup failed ({first}), retrying once");
            store.find_release(&tag).await
        }
    };
    let (release, release_error) = match found {
        Ok(Some(existing)) => {
            log::info!("release {tag} already exists, skipping");
            (Some(existing), None)
        }
        Ok(None) => match create_with_retry(store, &tag, &artifact).await {
            Ok(release) => (Some(release), None),
            Err(e) => (None, Some(e.to_string())),
        },
        Err(e) => (None, Some(e.to_string())),
    };

    Ok(PublishOutcome {
        artifact,
        release,
        release_error,
    })
}

async fn create_with_retry<S: ArtifactStore>(
    store: &S,
    tag: &str,
    artifact: &ArtifactRef,
) -> Result<ReleaseRef, PublishError> {
    match store.create_release(tag, artifact).await {
        Ok(release) => Ok(release),
        Err(first) => {
            log::warn!("release creation failed ({first}), retrying once");
            store.create_release(tag, artifact).await
        }
    }
}
