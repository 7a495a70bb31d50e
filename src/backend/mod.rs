//! Collaborator backend seam
//!
//! The core never owns wire formats; every payload shape here is dictated by
//! the collaborator API. The [`Backend`] trait is the single seam through
//! which the poller, reconciler, and publisher reach the network, which also
//! makes them testable against [`mock::MockBackend`].

mod http;
#[cfg(any(test, feature = "mock-backend"))]
pub mod mock;
mod types;

pub use http::HttpBackend;
pub use types::{ActivityEntry, PublishBody, PublishedStatus, VectorizeResponse};

use crate::error::Result;
use crate::model::{ArtifactId, Session, SessionId};
use async_trait::async_trait;

/// Operations the collaborator backend exposes to the core.
///
/// Error semantics differ per method and the callers depend on them:
/// `start_processing` and the publish calls are fatal on failure, while a
/// `latest_content` failure is transient and swallowed by the caller.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Start asynchronous processing of an artifact (fire-and-forget).
    async fn start_processing(&self, artifact_id: &ArtifactId) -> Result<()>;

    /// Fetch the latest processed content for an artifact.
    ///
    /// Returns `None` when no content exists yet; empty text counts as
    /// "not yet processed".
    async fn latest_content(&self, artifact_id: &ArtifactId) -> Result<Option<String>>;

    /// Fetch the per-artifact published/vectorized hint.
    ///
    /// This is a secondary signal only; the authoritative published
    /// determination is the session-status/vectorized-list rule.
    async fn published_status(&self, artifact_id: &ArtifactId) -> Result<PublishedStatus>;

    /// Record publish intent for a session scope.
    async fn publish_session(&self, session_id: &SessionId, body: &PublishBody) -> Result<()>;

    /// Record publish intent for a single artifact.
    async fn publish_artifact(&self, artifact_id: &ArtifactId, body: &PublishBody) -> Result<()>;

    /// Index one artifact's text into the chatbot retrieval store.
    async fn vectorize_artifact(
        &self,
        session_id: &SessionId,
        artifact_id: &ArtifactId,
    ) -> Result<VectorizeResponse>;

    /// Fetch a session with its embedded artifacts and vectorization records.
    async fn fetch_session(&self, session_id: &SessionId) -> Result<Session>;

    /// Append an entry to the activity log. Callers swallow failures.
    async fn log_activity(&self, entry: &ActivityEntry) -> Result<()>;
}
