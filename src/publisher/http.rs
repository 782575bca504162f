//! HTTP client for a remote artifact/release API.
//!
//! Endpoints:
//!   GET  /artifacts/{job_id}     -> 200 artifact | 404
//!   POST /artifacts/{job_id}     -> 200 artifact   (body: package bytes)
//!   GET  /releases/{tag}         -> 200 release  | 404
//!   POST /releases               -> 200 release    (body: tag + artifact id)
//!
//! Lookup-before-mutate on the publisher side plus these semantics make
//! every call safely retryable.

use super::{ArtifactRef, ArtifactStore, ReleaseRef};
use crate::error::PublishError;
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// Remote store client.
#[derive(Debug, Clone)]
pub struct HttpArtifactStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct ArtifactResponse {
    id: String,
    url: String,
}

#[derive(Deserialize)]
struct ReleaseResponse {
    tag: String,
    url: String,
}

impl HttpArtifactStore {
    /// Creates a client against `base_url`, optionally authenticating with a
    /// bearer token.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| PublishError::Lookup {
                reason: format!("building HTTP client: {e}"),
            })?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(HttpArtifactStore {
            client,
            base_url,
            token,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, format!("{}{path}", self.base_url));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

impl ArtifactStore for HttpArtifactStore {
    async fn find_artifact(&self, job_id: Uuid) -> Result<Option<ArtifactRef>, PublishError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/artifacts/{job_id}"))
            .send()
            .await
            .map_err(|e| PublishError::Lookup {
                reason: format!("GET /artifacts/{job_id}: {e}"),
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: ArtifactResponse =
                    response.json().await.map_err(|e| PublishError::Lookup {
                        reason: format!("decoding artifact response: {e}"),
                    })?;
                Ok(Some(ArtifactRef {
                    id: body.id,
                    url: body.url,
                }))
            }
            status => Err(PublishError::Lookup {
                reason: format!("GET /artifacts/{job_id} returned {status}"),
            }),
        }
    }

    async fn upload(
        &self,
        job_id: Uuid,
        name: &str,
        path: &Path,
    ) -> Result<ArtifactRef, PublishError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| PublishError::Upload {
            reason: format!("reading {}: {e}", path.display()),
        })?;

        let response = self
            .request(reqwest::Method::POST, &format!("/artifacts/{job_id}"))
            .query(&[("name", name)])
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/vnd.android.package-archive",
            )
            .body(bytes)
            .send()
            .await
            .map_err(|e| PublishError::Upload {
                reason: format!("POST /artifacts/{job_id}: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(PublishError::Upload {
                reason: format!("POST /artifacts/{job_id} returned {}", response.status()),
            });
        }

        let body: ArtifactResponse = response.json().await.map_err(|e| PublishError::Upload {
            reason: format!("decoding upload response: {e}"),
        })?;
        Ok(ArtifactRef {
            id: body.id,
            url: body.url,
        })
    }

    async fn find_release(&self, tag: &str) -> Result<Option<ReleaseRef>, PublishError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/releases/{tag}"))
            .send()
            .await
            .map_err(|e| PublishError::Lookup {
                reason: format!("GET /releases/{tag}: {e}"),
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: ReleaseResponse =
                    response.json().await.map_err(|e| PublishError::Lookup {
                        reason: format!("decoding release response: {e}"),
                    })?;
                Ok(Some(ReleaseRef {
                    tag: body.tag,
                    url: body.url,
                }))
            }
            status => Err(PublishError::Lookup {
                reason: format!("GET /releases/{tag} returned {status}"),
            }),
        }
    }

    async fn create_release(
        &self,
        tag: &str,
        artifact: &ArtifactRef,
    ) -> Result<ReleaseRef, PublishError> {
        let response = self
            .request(reqwest::Method::POST, "/releases")
            .json(&serde_json::json!({
                "tag": tag,
                "artifactId": artifact.id,
            }))
            .send()
            .await
            .map_err(|e| PublishError::Release {
                tag: tag.to_string(),
                reason: format!("POST /releases: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(PublishError::Release {
                tag: tag.to_string(),
                reason: format!("POST /releases returned {}", response.status()),
            });
        }

        let body: ReleaseResponse = response.json().await.map_err(|e| PublishError::Release {
            tag: tag.to_string(),
            reason: format!("decoding release response: {e}"),
        })?;
        Ok(ReleaseRef {
            tag: body.tag,
            url: body.url,
        })
    }
}
