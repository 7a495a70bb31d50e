//! Publish orchestrator
//!
//! Fans a single publish action out to up to two destinations. The primary
//! publish request records intent server-side and is fatal on failure; the
//! per-artifact vectorization that follows a chatbot publish is an
//! enhancement on top of that record, so its failures are tolerated and
//! reported as a partial success rather than an overall failure.

use crate::backend::{ActivityEntry, Backend, PublishBody};
use crate::error::{Error, Result};
use crate::model::{ArtifactId, Session, SessionId};
use crate::reconcile::Reconciler;
use crate::status::StatusSets;
use std::sync::Arc;

/// Which downstream systems a publish targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishDestinations {
    /// Index artifact text into the chatbot retrieval store
    pub chatbot: bool,
    /// Feed the blog-generation pipeline
    pub blog: bool,
}

impl PublishDestinations {
    /// Whether no destination is selected
    pub fn is_empty(&self) -> bool {
        !self.chatbot && !self.blog
    }

    fn describe(&self, scope_noun: &str) -> String {
        match (self.chatbot, self.blog) {
            (true, true) => format!("{} published to both chatbot and blog", scope_noun),
            (true, false) => format!("{} published to chatbot", scope_noun),
            (false, true) => format!("{} published to blog", scope_noun),
            (false, false) => format!("{} published", scope_noun),
        }
    }
}

/// What a publish covers
#[derive(Debug, Clone)]
pub enum PublishScope {
    /// A session with an explicit artifact selection
    Session {
        /// Session being published
        session_id: SessionId,
        /// Artifacts covered by this publish
        selected: Vec<ArtifactId>,
    },
    /// A single artifact
    Artifact {
        /// Session the artifact belongs to (vectorization is session-scoped)
        session_id: SessionId,
        /// The artifact being published
        artifact_id: ArtifactId,
    },
}

impl PublishScope {
    fn session_id(&self) -> &SessionId {
        match self {
            PublishScope::Session { session_id, .. } => session_id,
            PublishScope::Artifact { session_id, .. } => session_id,
        }
    }

    fn targets(&self) -> Vec<ArtifactId> {
        match self {
            PublishScope::Session { selected, .. } => selected.clone(),
            PublishScope::Artifact { artifact_id, .. } => vec![artifact_id.clone()],
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            PublishScope::Session { .. } => "Session",
            PublishScope::Artifact { .. } => "Artifact",
        }
    }

    fn activity_type(&self) -> &'static str {
        match self {
            PublishScope::Session { .. } => "session_published",
            PublishScope::Artifact { .. } => "artifact_published",
        }
    }
}

/// Result of a publish, including the refreshed derived state.
///
/// A publish with `vectorize_failures` is still an overall success; the
/// primary request already recorded intent. Callers must keep "fully
/// published" and "published, indexing failed" distinguishable.
#[derive(Debug)]
pub struct PublishOutcome {
    /// Destinations that were attempted
    pub destinations: PublishDestinations,
    /// Artifacts whose vectorization failed
    pub vectorize_failures: Vec<ArtifactId>,
    /// Session state re-fetched after the publish settled
    pub session: Session,
    /// Derived sets reconciled from the refreshed session
    pub sets: StatusSets,
}

impl PublishOutcome {
    /// Whether the chatbot indexing step failed for any artifact
    pub fn is_partial(&self) -> bool {
        !self.vectorize_failures.is_empty()
    }
}

/// Executes publish requests against the chosen destinations
pub struct Publisher {
    backend: Arc<dyn Backend>,
    reconciler: Arc<Reconciler>,
}

impl Publisher {
    /// Create a publisher over the given backend and reconciler.
    pub fn new(backend: Arc<dyn Backend>, reconciler: Arc<Reconciler>) -> Self {
        Self {
            backend,
            reconciler,
        }
    }

    /// Publish a scope to the selected destinations.
    ///
    /// The primary publish request is fatal on failure and nothing further
    /// is attempted. Vectorization requests follow for a chatbot publish,
    /// one per targeted artifact, with failures collected into the outcome.
    /// Once both steps settle the session is re-fetched and reconciled.
    /// No retry and no queueing; the caller guards against concurrent
    /// publishes of the same scope.
    pub async fn publish(
        &self,
        scope: PublishScope,
        destinations: PublishDestinations,
    ) -> Result<PublishOutcome> {
        if destinations.is_empty() {
            return Err(Error::InvalidPublish(
                "at least one of chatbot/blog must be selected".to_string(),
            ));
        }

        let targets = scope.targets();
        let body = PublishBody {
            publish_to_chatbot: destinations.chatbot,
            publish_to_blog: destinations.blog,
            selected_artifact_ids: targets.clone(),
        };

        // Primary publish: records intent server-side, fatal on failure
        match &scope {
            PublishScope::Session { session_id, .. } => {
                self.backend.publish_session(session_id, &body).await?;
            }
            PublishScope::Artifact { artifact_id, .. } => {
                self.backend.publish_artifact(artifact_id, &body).await?;
            }
        }
        tracing::info!(
            session = %scope.session_id(),
            targets = targets.len(),
            chatbot = destinations.chatbot,
            blog = destinations.blog,
            "Publish intent recorded"
        );

        // Secondary vectorization: tolerated failures, collected per artifact
        let mut vectorize_failures = Vec::new();
        if destinations.chatbot {
            for artifact_id in &targets {
                let ok = match self
                    .backend
                    .vectorize_artifact(scope.session_id(), artifact_id)
                    .await
                {
                    Ok(response) if response.is_success() => true,
                    Ok(response) => {
                        tracing::warn!(
                            artifact = %artifact_id,
                            status = %response.status,
                            "Vectorization rejected"
                        );
                        false
                    }
                    Err(e) => {
                        tracing::warn!(artifact = %artifact_id, error = %e, "Vectorization failed");
                        false
                    }
                };
                if !ok {
                    vectorize_failures.push(artifact_id.clone());
                }
            }
        }

        self.record_activity(&scope, &destinations).await;

        // Refresh derived state regardless of the secondary outcome
        let session = self.backend.fetch_session(scope.session_id()).await?;
        let sets = self.reconciler.reconcile(&session).await;

        Ok(PublishOutcome {
            destinations,
            vectorize_failures,
            session,
            sets,
        })
    }

    /// Best-effort activity log entry for a completed publish.
    async fn record_activity(&self, scope: &PublishScope, destinations: &PublishDestinations) {
        let entry = ActivityEntry::new(
            scope.activity_type(),
            destinations.describe(scope.noun()),
            scope.session_id().clone(),
        )
        .with_metadata("publishToChatbot", serde_json::json!(destinations.chatbot))
        .with_metadata("publishToBlog", serde_json::json!(destinations.blog));

        if let Err(e) = self.backend.log_activity(&entry).await {
            tracing::warn!(error = %e, "Failed to log publish activity");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::config::ReconcileConfig;
    use crate::status::classify;
    use crate::model::ArtifactStatus;
    use std::sync::atomic::Ordering;

    fn session_json(status: &str, artifact_ids: &[&str]) -> Session {
        let artifacts: Vec<serde_json::Value> = artifact_ids
            .iter()
            .map(|id| serde_json::json!({ "_id": id, "captureType": "audio" }))
            .collect();
        serde_json::from_value(serde_json::json!({
            "_id": "sess",
            "status": status,
            "artifacts": artifacts,
        }))
        .unwrap()
    }

    fn publisher(mock: Arc<MockBackend>) -> Publisher {
        let reconciler = Arc::new(Reconciler::new(
            mock.clone(),
            &ReconcileConfig { max_concurrency: 8 },
        ));
        Publisher::new(mock, reconciler)
    }

    fn session_scope(ids: &[&str]) -> PublishScope {
        PublishScope::Session {
            session_id: SessionId::from("sess"),
            selected: ids.iter().map(|id| ArtifactId::from(*id)).collect(),
        }
    }

    #[tokio::test]
    async fn test_empty_destinations_rejected() {
        let mock = Arc::new(MockBackend::new());
        let publisher = publisher(mock.clone());

        let err = publisher
            .publish(
                session_scope(&["a"]),
                PublishDestinations {
                    chatbot: false,
                    blog: false,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPublish(_)));
        // Nothing was attempted
        assert_eq!(mock.counters.publish_session.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_primary_failure_is_fatal() {
        let mock = Arc::new(MockBackend::new());
        mock.fail_publish();
        let publisher = publisher(mock.clone());

        let err = publisher
            .publish(
                session_scope(&["a", "b"]),
                PublishDestinations {
                    chatbot: true,
                    blog: true,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RequestFailed(_)));
        // Vectorization is never attempted after a failed primary
        assert_eq!(mock.counters.vectorize.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blog_only_skips_vectorization() {
        let mock = Arc::new(MockBackend::new());
        mock.set_session(session_json("draft", &["a"]));
        let publisher = publisher(mock.clone());

        let outcome = publisher
            .publish(
                session_scope(&["a"]),
                PublishDestinations {
                    chatbot: false,
                    blog: true,
                },
            )
            .await
            .unwrap();
        assert!(!outcome.is_partial());
        assert_eq!(mock.counters.vectorize.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_partial_vectorization_failure_still_succeeds() {
        let mock = Arc::new(MockBackend::new());
        mock.set_session(session_json("draft", &["a", "b", "c"]));
        mock.set_content(&ArtifactId::from("b"), "text of b");
        mock.fail_vectorize(&ArtifactId::from("b"));
        let publisher = publisher(mock.clone());

        let outcome = publisher
            .publish(
                session_scope(&["a", "b", "c"]),
                PublishDestinations {
                    chatbot: true,
                    blog: false,
                },
            )
            .await
            .unwrap();

        assert!(outcome.is_partial());
        assert_eq!(outcome.vectorize_failures, vec![ArtifactId::from("b")]);

        // The refreshed reconcile shows the two indexed artifacts as
        // Published; the failed one only reaches Processed
        assert_eq!(
            classify(&ArtifactId::from("a"), &outcome.sets),
            ArtifactStatus::Published
        );
        assert_eq!(
            classify(&ArtifactId::from("c"), &outcome.sets),
            ArtifactStatus::Published
        );
        assert_eq!(
            classify(&ArtifactId::from("b"), &outcome.sets),
            ArtifactStatus::Processed
        );
    }

    #[tokio::test]
    async fn test_already_vectorized_counts_as_success() {
        let mock = Arc::new(MockBackend::new());
        mock.set_session(session_json("draft", &["a"]));
        mock.set_already_vectorized(&ArtifactId::from("a"));
        let publisher = publisher(mock.clone());

        let outcome = publisher
            .publish(
                session_scope(&["a"]),
                PublishDestinations {
                    chatbot: true,
                    blog: false,
                },
            )
            .await
            .unwrap();
        assert!(!outcome.is_partial());
    }

    #[tokio::test]
    async fn test_single_artifact_scope() {
        let mock = Arc::new(MockBackend::new());
        mock.set_session(session_json("draft", &["a", "b"]));
        let publisher = publisher(mock.clone());

        let outcome = publisher
            .publish(
                PublishScope::Artifact {
                    session_id: SessionId::from("sess"),
                    artifact_id: ArtifactId::from("a"),
                },
                PublishDestinations {
                    chatbot: true,
                    blog: false,
                },
            )
            .await
            .unwrap();

        assert_eq!(mock.counters.publish_artifact.load(Ordering::SeqCst), 1);
        assert_eq!(mock.counters.vectorize.load(Ordering::SeqCst), 1);
        assert_eq!(
            classify(&ArtifactId::from("a"), &outcome.sets),
            ArtifactStatus::Published
        );
        assert_eq!(
            classify(&ArtifactId::from("b"), &outcome.sets),
            ArtifactStatus::Draft
        );
    }

    #[tokio::test]
    async fn test_activity_logged_with_destination_description() {
        let mock = Arc::new(MockBackend::new());
        mock.set_session(session_json("draft", &["a"]));
        let publisher = publisher(mock.clone());

        publisher
            .publish(
                session_scope(&["a"]),
                PublishDestinations {
                    chatbot: true,
                    blog: true,
                },
            )
            .await
            .unwrap();

        let activities = mock.activities();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].activity_type, "session_published");
        assert_eq!(
            activities[0].description,
            "Session published to both chatbot and blog"
        );
    }

    #[tokio::test]
    async fn test_activity_failure_is_swallowed() {
        let mock = Arc::new(MockBackend::new());
        mock.set_session(session_json("draft", &["a"]));
        mock.fail_activity();
        let publisher = publisher(mock.clone());

        let outcome = publisher
            .publish(
                session_scope(&["a"]),
                PublishDestinations {
                    chatbot: false,
                    blog: true,
                },
            )
            .await
            .unwrap();
        assert!(!outcome.is_partial());
    }
}
