//! Status reconciler
//!
//! Recomputes the derived processed/published sets for a whole session from
//! source-of-truth signals: the session lifecycle status, the vectorization
//! records, and per-artifact latest-content fetches. Per-artifact checks run
//! concurrently under a bound, and results are committed only once all of
//! them settle, so readers never observe a partially reconciled session.

use crate::backend::Backend;
use crate::config::ReconcileConfig;
use crate::model::{ArtifactId, Session};
use crate::status::StatusSets;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// Outcome of one per-artifact check
enum ArtifactMark {
    Published(ArtifactId),
    Processed(ArtifactId),
    Draft,
}

/// Derives processed/published sets for a session
pub struct Reconciler {
    backend: Arc<dyn Backend>,
    max_concurrency: usize,
}

impl Reconciler {
    /// Create a reconciler over the given backend.
    pub fn new(backend: Arc<dyn Backend>, config: &ReconcileConfig) -> Self {
        Self {
            backend,
            max_concurrency: config.max_concurrency,
        }
    }

    /// Recompute the derived sets for a session, from scratch.
    ///
    /// Idempotent and side-effect free; safe to re-run redundantly. A failed
    /// content fetch for one artifact is logged and treated as "not
    /// processed" without aborting the rest of the batch.
    pub async fn reconcile(&self, session: &Session) -> StatusSets {
        let session_published = session.is_published();

        // Built eagerly into a Vec: a closure returning an async block over a
        // borrowed `&Artifact` defeats the compiler's higher-ranked `Send`
        // inference, which callers need to spawn futures that reconcile.
        let checks: Vec<_> = session
            .artifacts
            .iter()
            .map(|artifact| {
                let id = artifact.id.clone();
                let vectorized = session.is_vectorized(&id);
                let backend = self.backend.clone();
                async move {
                    if session_published || vectorized {
                        return ArtifactMark::Published(id);
                    }
                    match backend.latest_content(&id).await {
                        Ok(Some(_)) => ArtifactMark::Processed(id),
                        Ok(None) => ArtifactMark::Draft,
                        Err(e) => {
                            tracing::warn!(
                                artifact = %id,
                                error = %e,
                                "Content check failed during reconcile; treating as not processed"
                            );
                            ArtifactMark::Draft
                        }
                    }
                }
            })
            .collect();

        let marks = stream::iter(checks)
        .buffer_unordered(self.max_concurrency)
        // Barrier: every per-artifact check settles before any result is used
        .collect::<Vec<_>>()
        .await;

        let mut sets = StatusSets::default();
        for mark in marks {
            match mark {
                ArtifactMark::Published(id) => {
                    sets.published.insert(id);
                }
                ArtifactMark::Processed(id) => {
                    sets.processed.insert(id);
                }
                ArtifactMark::Draft => {}
            }
        }

        tracing::debug!(
            session = %session.id,
            artifacts = session.artifacts.len(),
            processed = sets.processed.len(),
            published = sets.published.len(),
            "Reconciled session status"
        );
        sets
    }
}
