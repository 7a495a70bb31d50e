//! Status classification and progress derivation
//!
//! The classifier is pure: it looks only at the derived processed/published
//! sets produced by a reconciler pass and returns exactly one label per
//! artifact, with precedence Published > Processed > Draft.

use crate::model::{ArtifactId, ArtifactStatus, Session};
use std::collections::HashSet;

/// Derived processed/published sets for one session, produced by a single
/// reconciler pass. Never cached beyond that pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSets {
    /// Artifacts whose latest-content fetch returned non-empty text
    pub processed: HashSet<ArtifactId>,
    /// Artifacts covered by the session-wide override or a vectorization record
    pub published: HashSet<ArtifactId>,
}

impl StatusSets {
    /// Remove an artifact from both sets (mirrors an external delete)
    pub fn remove(&mut self, artifact_id: &ArtifactId) {
        self.processed.remove(artifact_id);
        self.published.remove(artifact_id);
    }
}

/// Classify one artifact against the derived sets.
///
/// Pure, total, idempotent, order-independent. Published takes precedence
/// over Processed; an artifact in neither set is a Draft.
pub fn classify(artifact_id: &ArtifactId, sets: &StatusSets) -> ArtifactStatus {
    if sets.published.contains(artifact_id) {
        ArtifactStatus::Published
    } else if sets.processed.contains(artifact_id) {
        ArtifactStatus::Processed
    } else {
        ArtifactStatus::Draft
    }
}

/// Session progress percentages per status label.
///
/// Each artifact is counted under exactly one label, using the classifier's
/// precedence. All three are 0 for an empty session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionProgress {
    /// Percentage of artifacts still in draft
    pub draft: u8,
    /// Percentage of artifacts processed but not published
    pub processed: u8,
    /// Percentage of artifacts published
    pub published: u8,
}

impl SessionProgress {
    /// Derive progress for a session from its artifacts and the derived sets.
    pub fn derive(session: &Session, sets: &StatusSets) -> Self {
        let total = session.artifacts.len();
        if total == 0 {
            return Self::default();
        }

        let mut draft = 0usize;
        let mut processed = 0usize;
        let mut published = 0usize;
        for artifact in &session.artifacts {
            match classify(&artifact.id, sets) {
                ArtifactStatus::Draft => draft += 1,
                ArtifactStatus::Processed => processed += 1,
                ArtifactStatus::Published => published += 1,
            }
        }

        let pct = |count: usize| ((count as f64 / total as f64) * 100.0).round() as u8;
        Self {
            draft: pct(draft),
            processed: pct(processed),
            published: pct(published),
        }
    }
}
