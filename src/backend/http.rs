//! HTTP implementation of the collaborator backend

use super::types::{ActivityEntry, PublishBody, PublishedStatus, VectorizeResponse};
use super::Backend;
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::model::{ArtifactId, Session, SessionId};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Collaborator backend reached over HTTP
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend client from configuration.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Latest-content response payload
#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Backend for HttpBackend {
    async fn start_processing(&self, artifact_id: &ArtifactId) -> Result<()> {
        let url = self.url(&format!("/artifacts/{}/process", artifact_id));
        self.client
            .post(&url)
            .json(&serde_json::json!({ "priority": "medium" }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                Error::RequestFailed(format!("process request for {}: {}", artifact_id, e))
            })?;
        Ok(())
    }

    async fn latest_content(&self, artifact_id: &ArtifactId) -> Result<Option<String>> {
        let url = self.url(&format!("/artifacts/updates/latest/{}", artifact_id));
        let response = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<ContentResponse>()
            .await?;
        Ok(response.content.filter(|c| !c.is_empty()))
    }

    async fn published_status(&self, artifact_id: &ArtifactId) -> Result<PublishedStatus> {
        let url = self.url(&format!("/artifacts/{}/published-status", artifact_id));
        let status = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<PublishedStatus>()
            .await?;
        Ok(status)
    }

    async fn publish_session(&self, session_id: &SessionId, body: &PublishBody) -> Result<()> {
        let url = self.url(&format!("/sessions/{}/publish", session_id));
        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                Error::RequestFailed(format!("publish request for session {}: {}", session_id, e))
            })?;
        Ok(())
    }

    async fn publish_artifact(&self, artifact_id: &ArtifactId, body: &PublishBody) -> Result<()> {
        let url = self.url(&format!("/artifacts/{}/publish", artifact_id));
        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                Error::RequestFailed(format!("publish request for artifact {}: {}", artifact_id, e))
            })?;
        Ok(())
    }

    async fn vectorize_artifact(
        &self,
        session_id: &SessionId,
        artifact_id: &ArtifactId,
    ) -> Result<VectorizeResponse> {
        let url = self.url(&format!("/sessions/{}/vectorize/{}", session_id, artifact_id));
        let response = self
            .client
            .post(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<VectorizeResponse>()
            .await?;
        Ok(response)
    }

    async fn fetch_session(&self, session_id: &SessionId) -> Result<Session> {
        let url = self.url(&format!("/sessions/{}", session_id));
        let session = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Session>()
            .await?;
        Ok(session)
    }

    async fn log_activity(&self, entry: &ActivityEntry) -> Result<()> {
        let url = self.url("/activities");
        self.client
            .post(&url)
            .json(entry)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
