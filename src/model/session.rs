//! Session data types

use super::artifact::{Artifact, ArtifactId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque backend-issued session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a backend-issued id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Session lifecycle status supplied by the collaborator backend.
///
/// Unknown strings are preserved verbatim for display but are treated as
/// non-published everywhere it matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SessionStatus {
    /// Freshly captured, not yet processed
    Draft,
    /// Processing completed
    Processed,
    /// Published; every artifact in the session counts as published
    Published,
    /// Any other lifecycle string the backend emits
    Other(String),
}

impl From<String> for SessionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "draft" => SessionStatus::Draft,
            "processed" => SessionStatus::Processed,
            "published" => SessionStatus::Published,
            _ => SessionStatus::Other(s),
        }
    }
}

impl From<SessionStatus> for String {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Draft => "draft".to_string(),
            SessionStatus::Processed => "processed".to_string(),
            SessionStatus::Published => "published".to_string(),
            SessionStatus::Other(s) => s,
        }
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Draft
    }
}

/// A chatbot-publish completion record for one artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizedArtifact {
    /// Artifact this record belongs to
    pub artifact_id: ArtifactId,
    /// Backend-reported vectorization status
    #[serde(default)]
    pub status: String,
    /// When vectorization completed
    #[serde(default)]
    pub vectorized_at: Option<DateTime<Utc>>,
}

/// A named collection of artifacts with its own lifecycle status.
///
/// Displayed progress is always recomputed from the artifacts; artifacts can
/// be individually reprocessed or republished out of band, so the session's
/// own aggregate is never trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Backend-issued identifier
    #[serde(rename = "_id")]
    pub id: SessionId,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Lifecycle status string from the backend
    #[serde(default)]
    pub status: SessionStatus,

    /// Ordered artifacts belonging to this session
    #[serde(default)]
    pub artifacts: Vec<Artifact>,

    /// Chatbot-publish completion records
    #[serde(default)]
    pub vectorized_artifacts: Vec<VectorizedArtifact>,

    /// Creation timestamp
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether the session-wide published override is in effect
    pub fn is_published(&self) -> bool {
        self.status == SessionStatus::Published
    }

    /// Whether an artifact has a vectorization record in this session
    pub fn is_vectorized(&self, artifact_id: &ArtifactId) -> bool {
        self.vectorized_artifacts
            .iter()
            .any(|v| &v.artifact_id == artifact_id)
    }

    /// Look up an artifact by id
    pub fn artifact(&self, artifact_id: &ArtifactId) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| &a.id == artifact_id)
    }
}
