//! Session view model
//!
//! The in-memory representation consumed by the interface layer. It is
//! mutated only at commit points (end of a reconcile pass, end of a poll's
//! terminal transition, end of a publish outcome); no partial fan-out result
//! is ever visible to a reader. Readers take cloned snapshots.

use crate::model::{ArtifactId, ArtifactStatus, Session};
use crate::status::{classify, SessionProgress, StatusSets};
use std::sync::Arc;
use tokio::sync::RwLock;

/// One consistent snapshot of session state
#[derive(Debug, Clone)]
pub struct SessionView {
    /// The session as last fetched from the backend
    pub session: Session,
    /// Derived sets from the last completed reconcile pass
    pub sets: StatusSets,
    /// Progress percentages derived alongside the sets
    pub progress: SessionProgress,
    /// Combined transcript from the last completed Describe, if any
    pub transcript: Option<String>,
    /// Commit counter; bumped exactly once per commit
    pub revision: u64,
}

impl SessionView {
    /// Status badge for one artifact
    pub fn status_of(&self, artifact_id: &ArtifactId) -> ArtifactStatus {
        classify(artifact_id, &self.sets)
    }
}

/// Shared, commit-only mutable session state
#[derive(Clone, Default)]
pub struct SessionViewModel {
    inner: Arc<RwLock<Option<SessionView>>>,
}

impl SessionViewModel {
    /// Create an empty view model (no session loaded)
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current view, if a session is loaded.
    pub async fn snapshot(&self) -> Option<SessionView> {
        self.inner.read().await.clone()
    }

    /// Current commit counter; 0 when nothing is loaded.
    pub async fn revision(&self) -> u64 {
        self.inner.read().await.as_ref().map(|v| v.revision).unwrap_or(0)
    }

    /// Commit a freshly loaded session. Derived sets start empty until the
    /// first reconcile pass commits.
    pub async fn commit_session(&self, session: Session) {
        let mut inner = self.inner.write().await;
        let revision = inner.as_ref().map(|v| v.revision).unwrap_or(0) + 1;
        let sets = StatusSets::default();
        let progress = SessionProgress::derive(&session, &sets);
        *inner = Some(SessionView {
            session,
            sets,
            progress,
            transcript: None,
            revision,
        });
    }

    /// Commit the result of a completed reconcile pass.
    pub async fn commit_reconcile(&self, sets: StatusSets) {
        let mut inner = self.inner.write().await;
        if let Some(view) = inner.as_mut() {
            view.progress = SessionProgress::derive(&view.session, &sets);
            view.sets = sets;
            view.revision += 1;
        }
    }

    /// Commit a refreshed session together with its reconciled sets, as a
    /// single commit.
    pub async fn commit_refresh(&self, session: Session, sets: StatusSets) {
        let mut inner = self.inner.write().await;
        if let Some(view) = inner.as_mut() {
            view.progress = SessionProgress::derive(&session, &sets);
            view.session = session;
            view.sets = sets;
            view.revision += 1;
        }
    }

    /// Commit a completed transcript.
    pub async fn commit_transcript(&self, transcript: String) {
        let mut inner = self.inner.write().await;
        if let Some(view) = inner.as_mut() {
            view.transcript = Some(transcript);
            view.revision += 1;
        }
    }

    /// Reflect an external artifact deletion: drop the artifact from the
    /// session and from all derived sets.
    pub async fn remove_artifact(&self, artifact_id: &ArtifactId) {
        let mut inner = self.inner.write().await;
        if let Some(view) = inner.as_mut() {
            view.session.artifacts.retain(|a| &a.id != artifact_id);
            view.session
                .vectorized_artifacts
                .retain(|v| &v.artifact_id != artifact_id);
            view.sets.remove(artifact_id);
            view.progress = SessionProgress::derive(&view.session, &view.sets);
            view.revision += 1;
        }
    }
}
