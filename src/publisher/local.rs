//! Filesystem-backed artifact store for local and manual invocations.
//!
//! Artifacts land under `<root>/artifacts/<job>/`, releases are recorded as
//! JSON manifests under `<root>/releases/`. The layout doubles as the
//! idempotence record: presence on disk means already published.

use super::{ArtifactRef, ArtifactStore, ReleaseRef};
use crate::error::PublishError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Store rooted at a local output directory.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct ReleaseManifest {
    tag: String,
    artifact_id: String,
    artifact_url: String,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalArtifactStore { root: root.into() }
    }

    fn job_dir(&self, job_id: Uuid) -> PathBuf {
        self.root.join("artifacts").join(job_id.simple().to_string())
    }

    fn release_path(&self, tag: &str) -> PathBuf {
        self.root.join("releases").join(format!("{tag}.json"))
    }
}

impl ArtifactStore for LocalArtifactStore {
    async fn find_artifact(&self, job_id: Uuid) -> Result<Option<ArtifactRef>, PublishError> {
        let dir = self.job_dir(job_id);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PublishError::Lookup {
                    reason: format!("reading {}: {e}", dir.display()),
                });
            }
        };

        while let Some(entry) = entries.next_entry().await.map_err(|e| PublishError::Lookup {
            reason: format!("reading {}: {e}", dir.display()),
        })? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "apk") {
                return Ok(Some(ArtifactRef {
                    id: entry.file_name().to_string_lossy().into_owned(),
                    url: format!("file://{}", path.display()),
                }));
            }
        }
        Ok(None)
    }

    async fn upload(
        &self,
        job_id: Uuid,
        name: &str,
        path: &Path,
    ) -> Result<ArtifactRef, PublishError> {
        let dir = self.job_dir(job_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PublishError::Upload {
                reason: format!("creating {}: {e}", dir.display()),
            })?;

        let dest = dir.join(name);
        tokio::fs::copy(path, &dest)
            .await
            .map_err(|e| PublishError::Upload {
                reason: format!("copying {} to {}: {e}", path.display(), dest.display()),
            })?;

        Ok(ArtifactRef {
            id: name.to_string(),
            url: format!("file://{}", dest.display()),
        })
    }

    async fn find_release(&self, tag: &str) -> Result<Option<ReleaseRef>, PublishError> {
        let path = self.release_path(tag);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PublishError::Lookup {
                    reason: format!("reading {}: {e}", path.display()),
                });
            }
        };
        let manifest: ReleaseManifest =
            serde_json::from_slice(&raw).map_err(|e| PublishError::Lookup {
                reason: format!("parsing {}: {e}", path.display()),
            })?;
        Ok(Some(ReleaseRef {
            tag: manifest.tag,
            url: format!("file://{}", path.display()),
        }))
    }

    async fn create_release(
        &self,
        tag: &str,
        artifact: &ArtifactRef,
    ) -> Result<ReleaseRef, PublishError> {
        let path = self.release_path(tag);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PublishError::Release {
                    tag: tag.to_string(),
                    reason: format!("creating {}: {e}", parent.display()),
                })?;
        }

        let manifest = ReleaseManifest {
            tag: tag.to_string(),
            artifact_id: artifact.id.clone(),
            artifact_url: artifact.url.clone(),
        };
        let raw = serde_json::to_vec_pretty(&manifest).map_err(|e| PublishError::Release {
            tag: tag.to_string(),
            reason: format!("encoding manifest: {e}"),
        })?;
        tokio::fs::write(&path, raw)
            .await
            .map_err(|e| PublishError::Release {
                tag: tag.to_string(),
                reason: format!("writing {}: {e}", path.display()),
            })?;

        Ok(ReleaseRef {
            tag: tag.to_string(),
            url: format!("file://{}", path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_find_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalArtifactStore::new(dir.path());
        let job_id = Uuid::new_v4();

        assert!(store.find_artifact(job_id).await.expect("find").is_none());

        let apk = dir.path().join("app.apk");
        std::fs::write(&apk, b"apk bytes").expect("write");

        let uploaded = store
            .upload(job_id, "com.example-1234.apk", &apk)
            .await
            .expect("upload");
        let found = store
            .find_artifact(job_id)
            .await
            .expect("find")
            .expect("present");
        assert_eq!(uploaded.id, found.id);
    }

    #[tokio::test]
    async fn release_manifest_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalArtifactStore::new(dir.path());

        assert!(store.find_release("tag-1").await.expect("find").is_none());

        let artifact = ArtifactRef {
            id: "a".to_string(),
            url: "file:///a".to_string(),
        };
        let created = store
            .create_release("tag-1", &artifact)
            .await
            .expect("create");
        let found = store
            .find_release("tag-1")
            .await
            .expect("find")
            .expect("present");
        assert_eq!(created.tag, found.tag);
    }
}
