//! Processing poller
//!
//! Turns a fire-and-forget "process this artifact" request into an awaited,
//! bounded completion signal. The poll loop is timer-driven: one content
//! fetch per tick, a hard ceiling on total duration, and an epoch counter
//! per artifact so that starting a new Describe implicitly cancels any
//! in-flight poll for the same artifact. A stale loop stops issuing fetches
//! at its next tick boundary and never commits a late result.

use crate::backend::Backend;
use crate::config::PollConfig;
use crate::error::Result;
use crate::model::ArtifactId;
use futures::{Stream, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::time::Instant;

/// Observable state of one poll loop.
///
/// `Requesting -> Polling -> {Succeeded | TimedOut}`; a failed initial
/// request never reaches `Polling` and surfaces as an error from
/// [`Poller::start`] instead. Only a fresh start leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Initial process request in flight
    Requesting,
    /// Waiting for processed content, one fetch per tick
    Polling,
    /// Processed content arrived
    Succeeded,
    /// The ceiling elapsed without content
    TimedOut,
    /// A newer poll for the same artifact superseded this one
    Cancelled,
}

/// Terminal outcome of a poll loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Processing completed; carries the processed text
    Succeeded(String),
    /// The ceiling elapsed without content
    TimedOut,
    /// Superseded by a newer poll for the same artifact
    Cancelled,
}

/// One observation made by the poll loop at a tick
enum PollAttempt {
    Content(String),
    Empty,
    TransientError(String),
}

/// Handle to an in-flight poll loop
#[derive(Debug)]
pub struct PollHandle {
    artifact_id: ArtifactId,
    epoch: u64,
    epochs: Arc<Mutex<HashMap<ArtifactId, u64>>>,
    outcome_rx: oneshot::Receiver<PollOutcome>,
    state_rx: watch::Receiver<PollState>,
}

impl PollHandle {
    /// The artifact this poll belongs to
    pub fn artifact_id(&self) -> &ArtifactId {
        &self.artifact_id
    }

    /// The epoch this poll runs under
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Current loop state
    pub fn state(&self) -> PollState {
        *self.state_rx.borrow()
    }

    /// Cancel this poll if it is still the current one for its artifact.
    /// The loop stops at its next tick boundary.
    pub fn cancel(&self) {
        let mut epochs = self.epochs.lock().unwrap();
        if epochs.get(&self.artifact_id) == Some(&self.epoch) {
            epochs.insert(self.artifact_id.clone(), self.epoch + 1);
        }
    }

    /// Wait for the loop to reach a terminal state.
    pub async fn outcome(self) -> PollOutcome {
        self.outcome_rx.await.unwrap_or(PollOutcome::Cancelled)
    }
}

/// Drives asynchronous artifact processing to completion
pub struct Poller {
    backend: Arc<dyn Backend>,
    interval: Duration,
    ceiling: Duration,
    epochs: Arc<Mutex<HashMap<ArtifactId, u64>>>,
}

impl Poller {
    /// Create a poller over the given backend.
    pub fn new(backend: Arc<dyn Backend>, config: &PollConfig) -> Self {
        Self {
            backend,
            interval: config.interval(),
            ceiling: config.ceiling(),
            epochs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Total poll duration before a loop gives up
    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    fn bump_epoch(&self, artifact_id: &ArtifactId) -> u64 {
        let mut epochs = self.epochs.lock().unwrap();
        let counter = epochs.entry(artifact_id.clone()).or_insert(0);
        *counter += 1;
        *counter
    }

    fn is_current(
        epochs: &Mutex<HashMap<ArtifactId, u64>>,
        artifact_id: &ArtifactId,
        epoch: u64,
    ) -> bool {
        epochs.lock().unwrap().get(artifact_id) == Some(&epoch)
    }

    /// Start processing an artifact and poll for its completion.
    ///
    /// The initial process request is fire-and-forget; its failure is
    /// terminal and reported immediately, without retry. On success a poll
    /// loop is spawned and a handle to it returned. Starting a new poll for
    /// an artifact supersedes any earlier one for the same artifact.
    pub async fn start(&self, artifact_id: &ArtifactId) -> Result<PollHandle> {
        let epoch = self.bump_epoch(artifact_id);
        let (state_tx, state_rx) = watch::channel(PollState::Requesting);
        let (outcome_tx, outcome_rx) = oneshot::channel();

        tracing::debug!(artifact = %artifact_id, epoch, "Requesting artifact processing");
        self.backend.start_processing(artifact_id).await?;

        let _ = state_tx.send(PollState::Polling);
        let backend = self.backend.clone();
        let epochs = self.epochs.clone();
        let id = artifact_id.clone();
        let interval = self.interval;
        let ceiling = self.ceiling;

        tokio::spawn(async move {
            let attempts = poll_attempts(backend, id.clone(), epochs.clone(), epoch, interval, ceiling);
            futures::pin_mut!(attempts);

            loop {
                match attempts.next().await {
                    Some(PollAttempt::Content(text)) => {
                        if Self::is_current(&epochs, &id, epoch) {
                            tracing::info!(artifact = %id, epoch, "Artifact processing completed");
                            let _ = state_tx.send(PollState::Succeeded);
                            let _ = outcome_tx.send(PollOutcome::Succeeded(text));
                        } else {
                            let _ = state_tx.send(PollState::Cancelled);
                            let _ = outcome_tx.send(PollOutcome::Cancelled);
                        }
                        return;
                    }
                    Some(PollAttempt::Empty) => continue,
                    Some(PollAttempt::TransientError(e)) => {
                        // Transient fetch errors are retried at the next tick
                        tracing::warn!(artifact = %id, epoch, error = %e, "Content check failed; will retry");
                        continue;
                    }
                    None => {
                        // The stream ends on ceiling breach or cancellation
                        if Self::is_current(&epochs, &id, epoch) {
                            tracing::warn!(
                                artifact = %id,
                                epoch,
                                ceiling_secs = ceiling.as_secs(),
                                "Artifact processing timed out"
                            );
                            let _ = state_tx.send(PollState::TimedOut);
                            let _ = outcome_tx.send(PollOutcome::TimedOut);
                        } else {
                            tracing::debug!(artifact = %id, epoch, "Poll superseded; dropping loop");
                            let _ = state_tx.send(PollState::Cancelled);
                            let _ = outcome_tx.send(PollOutcome::Cancelled);
                        }
                        return;
                    }
                }
            }
        });

        Ok(PollHandle {
            artifact_id: artifact_id.clone(),
            epoch,
            epochs: self.epochs.clone(),
            outcome_rx,
            state_rx,
        })
    }

    /// The epoch of the current poll for an artifact, if any was ever started.
    ///
    /// Callers use this to discard results whose epoch has gone stale.
    pub fn current_epoch(&self, artifact_id: &ArtifactId) -> Option<u64> {
        self.epochs.lock().unwrap().get(artifact_id).copied()
    }

    /// Cancel any in-flight poll for an artifact.
    pub fn cancel(&self, artifact_id: &ArtifactId) {
        let mut epochs = self.epochs.lock().unwrap();
        if let Some(counter) = epochs.get_mut(artifact_id) {
            *counter += 1;
        }
    }
}

/// The poll loop as an explicit stream of attempts.
///
/// One attempt per tick. The stream terminates (yielding nothing further)
/// when the ceiling elapses or the epoch goes stale, so no fetch is ever
/// issued after cancellation or a terminal state.
fn poll_attempts(
    backend: Arc<dyn Backend>,
    artifact_id: ArtifactId,
    epochs: Arc<Mutex<HashMap<ArtifactId, u64>>>,
    epoch: u64,
    interval: Duration,
    ceiling: Duration,
) -> impl Stream<Item = PollAttempt> {
    async_stream::stream! {
        let started = Instant::now();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first interval tick completes immediately; consume it so the
        // first fetch happens one full interval after start.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if !Poller::is_current(&epochs, &artifact_id, epoch) {
                break;
            }
            if started.elapsed() >= ceiling {
                break;
            }
            match backend.latest_content(&artifact_id).await {
                Ok(Some(text)) => {
                    yield PollAttempt::Content(text);
                    break;
                }
                Ok(None) => yield PollAttempt::Empty,
                Err(e) => yield PollAttempt::TransientError(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::error::Error;
    use std::sync::atomic::Ordering;

    fn poller_with(mock: Arc<MockBackend>) -> Poller {
        Poller::new(
            mock,
            &PollConfig {
                interval_secs: 2,
                ceiling_secs: 300,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_succeeds_when_content_appears() {
        let mock = Arc::new(MockBackend::new());
        let id = ArtifactId::from("a1");
        mock.set_content_after(&id, "transcribed text", 2);

        let poller = poller_with(mock.clone());
        let handle = poller.start(&id).await.unwrap();
        assert_eq!(handle.state(), PollState::Polling);

        let outcome = handle.outcome().await;
        assert_eq!(outcome, PollOutcome::Succeeded("transcribed text".to_string()));
        // Two empty fetches, then the successful one
        assert_eq!(mock.counters.content.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_request_failure_is_fatal() {
        let mock = Arc::new(MockBackend::new());
        let id = ArtifactId::from("a1");
        mock.fail_processing(&id);

        let poller = poller_with(mock.clone());
        let err = poller.start(&id).await.unwrap_err();
        assert!(matches!(err, Error::RequestFailed(_)));
        // No content fetch is ever attempted
        assert_eq!(mock.counters.content.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_fetch_errors_are_retried() {
        let mock = Arc::new(MockBackend::new());
        let id = ArtifactId::from("a1");
        mock.fail_content(&id);

        let poller = poller_with(mock.clone());
        let handle = poller.start(&id).await.unwrap();

        // Let a few ticks elapse, then make content available
        tokio::time::sleep(Duration::from_secs(7)).await;
        mock.set_content(&id, "late but fine");

        let outcome = handle.outcome().await;
        assert_eq!(outcome, PollOutcome::Succeeded("late but fine".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out_at_ceiling() {
        let mock = Arc::new(MockBackend::new());
        let id = ArtifactId::from("a1");
        // Never returns content

        let poller = poller_with(mock.clone());
        let started = Instant::now();
        let handle = poller.start(&id).await.unwrap();
        let outcome = handle.outcome().await;

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(started.elapsed(), Duration::from_secs(300));
        // Fetches at t=2..=298; the t=300 tick hits the ceiling first
        let fetches = mock.counters.content.load(Ordering::SeqCst);
        assert_eq!(fetches, 149);

        // No further fetches after the terminal state
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(mock.counters.content.load(Ordering::SeqCst), fetches);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_start_supersedes_old_poll() {
        let mock = Arc::new(MockBackend::new());
        let id = ArtifactId::from("a1");
        // First poll would only complete far in the future
        mock.set_content_after(&id, "stale result", 1000);

        let poller = poller_with(mock.clone());
        let first = poller.start(&id).await.unwrap();

        // Second Describe for the same artifact; content is available now
        mock.set_content(&id, "fresh result");
        let second = poller.start(&id).await.unwrap();

        let second_outcome = second.outcome().await;
        assert_eq!(
            second_outcome,
            PollOutcome::Succeeded("fresh result".to_string())
        );

        // The first loop ends cancelled and must not surface a result
        let first_outcome = first.outcome().await;
        assert_eq!(first_outcome, PollOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_cancel_stops_fetching() {
        let mock = Arc::new(MockBackend::new());
        let id = ArtifactId::from("a1");

        let poller = poller_with(mock.clone());
        let handle = poller.start(&id).await.unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        handle.cancel();
        let fetched_before = mock.counters.content.load(Ordering::SeqCst);

        // Wait past several would-be ticks; the loop must have stopped
        tokio::time::sleep(Duration::from_secs(10)).await;
        let fetched_after = mock.counters.content.load(Ordering::SeqCst);
        assert!(fetched_after <= fetched_before + 1);

        let outcome = handle.outcome().await;
        assert_eq!(outcome, PollOutcome::Cancelled);
    }
}
