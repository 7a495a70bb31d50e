//! Session controller
//!
//! Wires the poller, reconciler, and publisher around one view model and
//! exposes the imperative entry points the interface layer calls. Every
//! entry point ends with a reconcile pass so derived status is refreshed
//! after any state-changing operation.

use crate::backend::{ActivityEntry, Backend};
use crate::config::ScribeflowConfig;
use crate::error::{Error, Result};
use crate::model::{ArtifactId, SessionId};
use crate::poller::{PollOutcome, Poller};
use crate::publish::{PublishDestinations, PublishOutcome, PublishScope, Publisher};
use crate::reconcile::Reconciler;
use crate::transcript::{compose_transcript, TranscriptSegment};
use crate::view::SessionViewModel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How a Describe ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescribeOutcome {
    /// Processing completed; carries the committed transcript
    Completed(String),
    /// A newer Describe superseded this one; nothing was committed
    Superseded,
}

/// Releases the in-flight publish flag when the publish settles
struct PublishGuard<'a>(&'a AtomicBool);

impl Drop for PublishGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Facade over the processing/publication core for one session at a time
pub struct SessionController {
    backend: Arc<dyn Backend>,
    poller: Poller,
    reconciler: Arc<Reconciler>,
    publisher: Publisher,
    view: SessionViewModel,
    publish_in_flight: AtomicBool,
}

impl SessionController {
    /// Build a controller over the given backend.
    pub fn new(backend: Arc<dyn Backend>, config: &ScribeflowConfig) -> Self {
        let poller = Poller::new(backend.clone(), &config.poll);
        let reconciler = Arc::new(Reconciler::new(backend.clone(), &config.reconcile));
        let publisher = Publisher::new(backend.clone(), reconciler.clone());
        Self {
            backend,
            poller,
            reconciler,
            publisher,
            view: SessionViewModel::new(),
            publish_in_flight: AtomicBool::new(false),
        }
    }

    /// The view model consumed by the interface layer.
    pub fn view(&self) -> &SessionViewModel {
        &self.view
    }

    /// Load a session and run the initial reconcile pass.
    pub async fn load(&self, session_id: &SessionId) -> Result<()> {
        let session = self.backend.fetch_session(session_id).await?;
        self.view.commit_session(session.clone()).await;
        let sets = self.reconciler.reconcile(&session).await;
        self.view.commit_reconcile(sets).await;
        tracing::info!(session = %session_id, "Session loaded");
        Ok(())
    }

    async fn current_session_id(&self) -> Result<SessionId> {
        self.view
            .snapshot()
            .await
            .map(|v| v.session.id)
            .ok_or(Error::NoSession)
    }

    /// Re-fetch the session and re-derive status, committing once.
    pub async fn reconcile(&self) -> Result<()> {
        let session_id = self.current_session_id().await?;
        let session = self.backend.fetch_session(&session_id).await?;
        let sets = self.reconciler.reconcile(&session).await;
        self.view.commit_refresh(session, sets).await;
        Ok(())
    }

    /// Describe one artifact: start processing and await its completion.
    ///
    /// An initial request failure or a poll timeout leaves the artifact at
    /// its pre-attempt status. A Describe superseded by a newer one for the
    /// same artifact commits nothing.
    pub async fn describe(&self, artifact_id: &ArtifactId) -> Result<DescribeOutcome> {
        let handle = self.poller.start(artifact_id).await?;
        let epoch = handle.epoch();

        match handle.outcome().await {
            PollOutcome::Succeeded(text) => {
                // Apply only if this Describe is still the current one
                if self.poller.current_epoch(artifact_id) != Some(epoch) {
                    return Ok(DescribeOutcome::Superseded);
                }
                self.view.commit_transcript(text.clone()).await;
                self.reconcile().await?;
                Ok(DescribeOutcome::Completed(text))
            }
            PollOutcome::TimedOut => Err(Error::PollTimeout {
                artifact_id: artifact_id.to_string(),
                waited_secs: self.poller.ceiling().as_secs(),
            }),
            PollOutcome::Cancelled => Ok(DescribeOutcome::Superseded),
        }
    }

    /// Describe a selection of artifacts and commit one combined transcript.
    ///
    /// All selected artifacts are processed and polled; segments are labeled
    /// by kind and position. Any initial request failure or timeout fails
    /// the whole selection (remaining polls are cancelled).
    pub async fn describe_selection(&self, artifact_ids: &[ArtifactId]) -> Result<DescribeOutcome> {
        let session_id = self.current_session_id().await?;
        let view = self.view.snapshot().await.ok_or(Error::NoSession)?;

        let mut targets = Vec::new();
        for id in artifact_ids {
            match view.session.artifact(id) {
                Some(artifact) => targets.push((id.clone(), artifact.capture_type)),
                None => {
                    tracing::warn!(artifact = %id, "Selected artifact not in session; skipping")
                }
            }
        }
        if targets.is_empty() {
            return Ok(DescribeOutcome::Completed(String::new()));
        }

        let mut handles = Vec::with_capacity(targets.len());
        for (id, _) in &targets {
            match self.poller.start(id).await {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    for handle in &handles {
                        handle.cancel();
                    }
                    return Err(e);
                }
            }
        }

        let mut segments = Vec::with_capacity(targets.len());
        let mut pending: std::collections::VecDeque<_> = handles.into();
        for (id, kind) in &targets {
            let Some(handle) = pending.pop_front() else { break };
            match handle.outcome().await {
                PollOutcome::Succeeded(text) => segments.push(TranscriptSegment::new(*kind, text)),
                PollOutcome::TimedOut => {
                    for handle in pending {
                        handle.cancel();
                    }
                    return Err(Error::PollTimeout {
                        artifact_id: id.to_string(),
                        waited_secs: self.poller.ceiling().as_secs(),
                    });
                }
                PollOutcome::Cancelled => {
                    for handle in pending {
                        handle.cancel();
                    }
                    return Ok(DescribeOutcome::Superseded);
                }
            }
        }

        let transcript = compose_transcript(&segments);
        self.view.commit_transcript(transcript.clone()).await;
        self.record_describe_activity(&session_id, targets.len()).await;
        self.reconcile().await?;
        Ok(DescribeOutcome::Completed(transcript))
    }

    /// Publish the loaded session to the selected destinations.
    ///
    /// `selected` limits the publish to those artifacts; `None` covers the
    /// whole session. Rejected while another publish is in flight.
    pub async fn publish(
        &self,
        destinations: PublishDestinations,
        selected: Option<Vec<ArtifactId>>,
    ) -> Result<PublishOutcome> {
        let _guard = self.acquire_publish_slot()?;
        let session_id = self.current_session_id().await?;
        let view = self.view.snapshot().await.ok_or(Error::NoSession)?;

        let selected = selected
            .unwrap_or_else(|| view.session.artifacts.iter().map(|a| a.id.clone()).collect());
        let outcome = self
            .publisher
            .publish(
                PublishScope::Session {
                    session_id,
                    selected,
                },
                destinations,
            )
            .await?;
        self.view
            .commit_refresh(outcome.session.clone(), outcome.sets.clone())
            .await;
        Ok(outcome)
    }

    /// Publish a single artifact of the loaded session.
    pub async fn publish_artifact(
        &self,
        artifact_id: &ArtifactId,
        destinations: PublishDestinations,
    ) -> Result<PublishOutcome> {
        let _guard = self.acquire_publish_slot()?;
        let session_id = self.current_session_id().await?;

        let outcome = self
            .publisher
            .publish(
                PublishScope::Artifact {
                    session_id,
                    artifact_id: artifact_id.clone(),
                },
                destinations,
            )
            .await?;
        self.view
            .commit_refresh(outcome.session.clone(), outcome.sets.clone())
            .await;
        Ok(outcome)
    }

    /// Reflect an external artifact deletion in the view model.
    pub async fn remove_artifact(&self, artifact_id: &ArtifactId) {
        self.poller.cancel(artifact_id);
        self.view.remove_artifact(artifact_id).await;
    }

    fn acquire_publish_slot(&self) -> Result<PublishGuard<'_>> {
        if self.publish_in_flight.swap(true, Ordering::SeqCst) {
            return Err(Error::PublishInFlight);
        }
        Ok(PublishGuard(&self.publish_in_flight))
    }

    async fn record_describe_activity(&self, session_id: &SessionId, count: usize) {
        let entry = ActivityEntry::new(
            "session_processed",
            "Session described",
            session_id.clone(),
        )
        .with_metadata("artifacts", serde_json::json!(count));
        if let Err(e) = self.backend.log_activity(&entry).await {
            tracing::warn!(error = %e, "Failed to log describe activity");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::model::{ArtifactStatus, Session};
    use std::time::Duration;

    fn sample_session(status: &str) -> Session {
        serde_json::from_value(serde_json::json!({
            "_id": "sess",
            "status": status,
            "artifacts": [
                { "_id": "a", "captureType": "audio" },
                { "_id": "b", "captureType": "screenshot" },
            ],
        }))
        .unwrap()
    }

    fn controller(mock: Arc<MockBackend>) -> SessionController {
        SessionController::new(mock, &ScribeflowConfig::default())
    }

    #[tokio::test]
    async fn test_load_runs_initial_reconcile() {
        let mock = Arc::new(MockBackend::new());
        mock.set_session(sample_session("draft"));
        mock.set_content(&ArtifactId::from("a"), "hello");

        let controller = controller(mock);
        controller.load(&SessionId::from("sess")).await.unwrap();

        let view = controller.view().snapshot().await.unwrap();
        assert_eq!(view.status_of(&ArtifactId::from("a")), ArtifactStatus::Processed);
        assert_eq!(view.status_of(&ArtifactId::from("b")), ArtifactStatus::Draft);
        assert_eq!(view.progress.processed, 50);
    }

    #[tokio::test]
    async fn test_operations_require_loaded_session() {
        let mock = Arc::new(MockBackend::new());
        let controller = controller(mock);
        assert!(matches!(
            controller.reconcile().await.unwrap_err(),
            Error::NoSession
        ));
        assert!(matches!(
            controller
                .publish(
                    PublishDestinations {
                        chatbot: true,
                        blog: false
                    },
                    None
                )
                .await
                .unwrap_err(),
            Error::NoSession
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_describe_commits_transcript_and_reconciles() {
        let mock = Arc::new(MockBackend::new());
        mock.set_session(sample_session("draft"));
        mock.set_content_after(&ArtifactId::from("a"), "spoken words", 1);

        let controller = controller(mock);
        controller.load(&SessionId::from("sess")).await.unwrap();

        let outcome = controller.describe(&ArtifactId::from("a")).await.unwrap();
        assert_eq!(outcome, DescribeOutcome::Completed("spoken words".to_string()));

        let view = controller.view().snapshot().await.unwrap();
        assert_eq!(view.transcript.as_deref(), Some("spoken words"));
        assert_eq!(view.status_of(&ArtifactId::from("a")), ArtifactStatus::Processed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_describe_timeout_leaves_view_untouched() {
        let mock = Arc::new(MockBackend::new());
        mock.set_session(sample_session("draft"));
        // "a" never produces content

        let controller = controller(mock);
        controller.load(&SessionId::from("sess")).await.unwrap();
        let revision_before = controller.view().revision().await;

        let err = controller.describe(&ArtifactId::from("a")).await.unwrap_err();
        assert!(matches!(err, Error::PollTimeout { .. }));
        assert_eq!(controller.view().revision().await, revision_before);

        let view = controller.view().snapshot().await.unwrap();
        assert_eq!(view.status_of(&ArtifactId::from("a")), ArtifactStatus::Draft);
        assert!(view.transcript.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_describe_supersedes_first() {
        let mock = Arc::new(MockBackend::new());
        mock.set_session(sample_session("draft"));
        mock.set_content_after(&ArtifactId::from("a"), "stale", 1000);

        let controller = Arc::new(controller(mock.clone()));
        controller.load(&SessionId::from("sess")).await.unwrap();

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.describe(&ArtifactId::from("a")).await })
        };
        // Let the first poll get under way
        tokio::time::sleep(Duration::from_secs(3)).await;

        mock.set_content(&ArtifactId::from("a"), "fresh");
        let second = controller.describe(&ArtifactId::from("a")).await.unwrap();
        assert_eq!(second, DescribeOutcome::Completed("fresh".to_string()));

        let first = first.await.unwrap().unwrap();
        assert_eq!(first, DescribeOutcome::Superseded);

        // The committed transcript is the fresh one
        let view = controller.view().snapshot().await.unwrap();
        assert_eq!(view.transcript.as_deref(), Some("fresh"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_describe_selection_composes_labeled_transcript() {
        let mock = Arc::new(MockBackend::new());
        mock.set_session(sample_session("draft"));
        mock.set_content_after(&ArtifactId::from("a"), "we shipped it", 1);
        mock.set_content_after(&ArtifactId::from("b"), "a release dashboard", 2);

        let controller = controller(mock.clone());
        controller.load(&SessionId::from("sess")).await.unwrap();

        let outcome = controller
            .describe_selection(&[ArtifactId::from("a"), ArtifactId::from("b")])
            .await
            .unwrap();
        assert_eq!(
            outcome,
            DescribeOutcome::Completed(
                "Audio 1:\nwe shipped it\n\nImage 2:\na release dashboard".to_string()
            )
        );

        let activities = mock.activities();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].activity_type, "session_processed");
    }

    #[tokio::test]
    async fn test_describe_selection_empty_is_noop() {
        let mock = Arc::new(MockBackend::new());
        mock.set_session(sample_session("draft"));

        let controller = controller(mock.clone());
        controller.load(&SessionId::from("sess")).await.unwrap();

        let outcome = controller.describe_selection(&[]).await.unwrap();
        assert_eq!(outcome, DescribeOutcome::Completed(String::new()));
        assert_eq!(
            mock.counters
                .process
                .load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }

    #[tokio::test]
    async fn test_publish_updates_view_with_refreshed_state() {
        let mock = Arc::new(MockBackend::new());
        mock.set_session(sample_session("draft"));

        let controller = controller(mock);
        controller.load(&SessionId::from("sess")).await.unwrap();

        let outcome = controller
            .publish(
                PublishDestinations {
                    chatbot: true,
                    blog: false,
                },
                None,
            )
            .await
            .unwrap();
        assert!(!outcome.is_partial());

        let view = controller.view().snapshot().await.unwrap();
        assert_eq!(view.status_of(&ArtifactId::from("a")), ArtifactStatus::Published);
        assert_eq!(view.status_of(&ArtifactId::from("b")), ArtifactStatus::Published);
        assert_eq!(view.progress.published, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_publish_rejected() {
        let mock = Arc::new(MockBackend::new());
        mock.set_session(sample_session("draft"));
        // Slow down the refresh inside the first publish
        mock.set_content_latency(&ArtifactId::from("a"), Duration::from_secs(10));

        let controller = Arc::new(controller(mock));
        controller.load(&SessionId::from("sess")).await.unwrap();

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller
                    .publish(
                        PublishDestinations {
                            chatbot: false,
                            blog: true,
                        },
                        None,
                    )
                    .await
            })
        };
        tokio::task::yield_now().await;

        let err = controller
            .publish(
                PublishDestinations {
                    chatbot: false,
                    blog: true,
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PublishInFlight));

        // Once the first settles, publishing is possible again
        first.await.unwrap().unwrap();
        controller
            .publish(
                PublishDestinations {
                    chatbot: false,
                    blog: true,
                },
                None,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_remove_artifact_reflected_locally() {
        let mock = Arc::new(MockBackend::new());
        mock.set_session(sample_session("published"));

        let controller = controller(mock);
        controller.load(&SessionId::from("sess")).await.unwrap();

        controller.remove_artifact(&ArtifactId::from("a")).await;
        let view = controller.view().snapshot().await.unwrap();
        assert_eq!(view.session.artifacts.len(), 1);
        assert_eq!(view.progress.published, 100);
        assert!(!view.sets.published.contains(&ArtifactId::from("a")));
    }
}
