//! Scripted in-memory backend for tests and offline harnesses

use super::types::{ActivityEntry, PublishBody, PublishedStatus, VectorizeResponse};
use super::Backend;
use crate::error::{Error, Result};
use crate::model::{ArtifactId, Session, SessionId, VectorizedArtifact};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// How a scripted latest-content fetch behaves
#[derive(Debug, Clone)]
enum ContentScript {
    /// Content is available immediately
    Ready(String),
    /// Content appears only after this many more fetches return empty
    AfterFetches { text: String, remaining: usize },
    /// Every fetch fails (transient error)
    Fail,
}

#[derive(Default)]
struct MockState {
    contents: HashMap<ArtifactId, ContentScript>,
    content_latency: HashMap<ArtifactId, Duration>,
    sessions: HashMap<SessionId, Session>,
    published: HashMap<ArtifactId, PublishedStatus>,
    fail_processing: HashSet<ArtifactId>,
    fail_publish: bool,
    fail_vectorize: HashSet<ArtifactId>,
    already_vectorized: HashSet<ArtifactId>,
    fail_activity: bool,
    activities: Vec<ActivityEntry>,
}

/// Call counters, one per endpoint
#[derive(Default)]
pub struct MockCounters {
    /// start_processing calls
    pub process: AtomicUsize,
    /// latest_content calls
    pub content: AtomicUsize,
    /// publish_session calls
    pub publish_session: AtomicUsize,
    /// publish_artifact calls
    pub publish_artifact: AtomicUsize,
    /// vectorize_artifact calls
    pub vectorize: AtomicUsize,
    /// fetch_session calls
    pub fetch_session: AtomicUsize,
    /// log_activity calls
    pub activity: AtomicUsize,
}

/// Scripted backend double.
///
/// Responses are keyed by artifact/session id; unscripted ids behave like a
/// backend that knows nothing about them (no content, empty session lookup
/// failure, successful vectorization).
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
    /// Per-endpoint call counters
    pub counters: MockCounters,
}

impl MockBackend {
    /// Create an unscripted mock
    pub fn new() -> Self {
        Self::default()
    }

    /// Script immediate content for an artifact
    pub fn set_content(&self, artifact_id: &ArtifactId, text: impl Into<String>) {
        let mut state = self.state.lock().unwrap();
        state
            .contents
            .insert(artifact_id.clone(), ContentScript::Ready(text.into()));
    }

    /// Script content that becomes available only after `empty_fetches`
    /// fetches have returned empty
    pub fn set_content_after(
        &self,
        artifact_id: &ArtifactId,
        text: impl Into<String>,
        empty_fetches: usize,
    ) {
        let mut state = self.state.lock().unwrap();
        state.contents.insert(
            artifact_id.clone(),
            ContentScript::AfterFetches {
                text: text.into(),
                remaining: empty_fetches,
            },
        );
    }

    /// Make every latest-content fetch for an artifact fail
    pub fn fail_content(&self, artifact_id: &ArtifactId) {
        let mut state = self.state.lock().unwrap();
        state
            .contents
            .insert(artifact_id.clone(), ContentScript::Fail);
    }

    /// Delay latest-content fetches for an artifact
    pub fn set_content_latency(&self, artifact_id: &ArtifactId, latency: Duration) {
        let mut state = self.state.lock().unwrap();
        state.content_latency.insert(artifact_id.clone(), latency);
    }

    /// Make start_processing fail for an artifact
    pub fn fail_processing(&self, artifact_id: &ArtifactId) {
        let mut state = self.state.lock().unwrap();
        state.fail_processing.insert(artifact_id.clone());
    }

    /// Make every primary publish request fail
    pub fn fail_publish(&self) {
        self.state.lock().unwrap().fail_publish = true;
    }

    /// Make vectorization fail for an artifact
    pub fn fail_vectorize(&self, artifact_id: &ArtifactId) {
        let mut state = self.state.lock().unwrap();
        state.fail_vectorize.insert(artifact_id.clone());
    }

    /// Report an artifact as already vectorized
    pub fn set_already_vectorized(&self, artifact_id: &ArtifactId) {
        let mut state = self.state.lock().unwrap();
        state.already_vectorized.insert(artifact_id.clone());
    }

    /// Make activity logging fail
    pub fn fail_activity(&self) {
        self.state.lock().unwrap().fail_activity = true;
    }

    /// Store a session for fetch_session lookups
    pub fn set_session(&self, session: Session) {
        let mut state = self.state.lock().unwrap();
        state.sessions.insert(session.id.clone(), session);
    }

    /// Script the per-artifact published/vectorized hint
    pub fn set_published_status(&self, artifact_id: &ArtifactId, status: PublishedStatus) {
        let mut state = self.state.lock().unwrap();
        state.published.insert(artifact_id.clone(), status);
    }

    /// Recorded activity entries, oldest first
    pub fn activities(&self) -> Vec<ActivityEntry> {
        self.state.lock().unwrap().activities.clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn start_processing(&self, artifact_id: &ArtifactId) -> Result<()> {
        self.counters.process.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.fail_processing.contains(artifact_id) {
            return Err(Error::RequestFailed(format!(
                "process request for {}: scripted failure",
                artifact_id
            )));
        }
        Ok(())
    }

    async fn latest_content(&self, artifact_id: &ArtifactId) -> Result<Option<String>> {
        self.counters.content.fetch_add(1, Ordering::SeqCst);
        let (result, latency) = {
            let mut state = self.state.lock().unwrap();
            let latency = state.content_latency.get(artifact_id).copied();
            let result = match state.contents.get_mut(artifact_id) {
                Some(ContentScript::Ready(text)) => Ok(Some(text.clone())),
                Some(ContentScript::AfterFetches { text, remaining }) => {
                    if *remaining == 0 {
                        Ok(Some(text.clone()))
                    } else {
                        *remaining -= 1;
                        Ok(None)
                    }
                }
                Some(ContentScript::Fail) => Err(Error::Backend(format!(
                    "content fetch for {}: scripted failure",
                    artifact_id
                ))),
                None => Ok(None),
            };
            (result, latency)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        result
    }

    async fn published_status(&self, artifact_id: &ArtifactId) -> Result<PublishedStatus> {
        let state = self.state.lock().unwrap();
        Ok(state.published.get(artifact_id).copied().unwrap_or_default())
    }

    async fn publish_session(&self, _session_id: &SessionId, _body: &PublishBody) -> Result<()> {
        self.counters.publish_session.fetch_add(1, Ordering::SeqCst);
        if self.state.lock().unwrap().fail_publish {
            return Err(Error::RequestFailed(
                "publish request: scripted failure".to_string(),
            ));
        }
        Ok(())
    }

    async fn publish_artifact(&self, _artifact_id: &ArtifactId, _body: &PublishBody) -> Result<()> {
        self.counters.publish_artifact.fetch_add(1, Ordering::SeqCst);
        if self.state.lock().unwrap().fail_publish {
            return Err(Error::RequestFailed(
                "publish request: scripted failure".to_string(),
            ));
        }
        Ok(())
    }

    async fn vectorize_artifact(
        &self,
        session_id: &SessionId,
        artifact_id: &ArtifactId,
    ) -> Result<VectorizeResponse> {
        self.counters.vectorize.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if state.fail_vectorize.contains(artifact_id) {
            return Err(Error::Backend(format!(
                "vectorize for {}: scripted failure",
                artifact_id
            )));
        }
        let status = if state.already_vectorized.contains(artifact_id) {
            "already_vectorized"
        } else {
            // Mirror the backend: a successful vectorization shows up in the
            // session's vectorized_artifacts on the next fetch
            if let Some(session) = state.sessions.get_mut(session_id) {
                if !session.is_vectorized(artifact_id) {
                    session.vectorized_artifacts.push(VectorizedArtifact {
                        artifact_id: artifact_id.clone(),
                        status: "success".to_string(),
                        vectorized_at: Some(chrono::Utc::now()),
                    });
                }
            }
            "success"
        };
        Ok(VectorizeResponse {
            status: status.to_string(),
            message: None,
        })
    }

    async fn fetch_session(&self, session_id: &SessionId) -> Result<Session> {
        self.counters.fetch_session.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        state
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::Backend(format!("session {} not found", session_id)))
    }

    async fn log_activity(&self, entry: &ActivityEntry) -> Result<()> {
        self.counters.activity.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if state.fail_activity {
            return Err(Error::Backend("activity log: scripted failure".to_string()));
        }
        state.activities.push(entry.clone());
        Ok(())
    }
}
