//! Artifact data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque backend-issued artifact identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Wrap a backend-issued id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArtifactId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// What kind of capture an artifact holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureKind {
    /// An audio recording
    Audio,
    /// A screen capture
    Screenshot,
}

impl CaptureKind {
    /// Transcript segment label prefix for this kind ("Audio" / "Image")
    pub fn segment_label(&self) -> &'static str {
        match self {
            CaptureKind::Audio => "Audio",
            CaptureKind::Screenshot => "Image",
        }
    }
}

/// Derived per-artifact status.
///
/// A strict three-way partition with precedence Published > Processed > Draft;
/// an artifact carries exactly one label at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    /// Neither processed nor published
    Draft,
    /// Latest content fetch returned non-empty text
    Processed,
    /// Session-wide published override or per-artifact vectorization record
    Published,
}

/// One captured unit (audio recording or screenshot) belonging to a session.
///
/// Created by the external capture pipeline and deleted via an external
/// endpoint; the core never constructs these except when deserializing a
/// session payload. Field casing follows the backend wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Backend-issued identifier
    #[serde(rename = "_id")]
    pub id: ArtifactId,

    /// Display name of the capture
    #[serde(default)]
    pub capture_name: String,

    /// Capture kind
    pub capture_type: CaptureKind,

    /// Source media reference
    #[serde(default)]
    pub url: Option<String>,

    /// Processed-text payload produced by the backend, if any
    #[serde(default)]
    pub processed_text: Option<String>,

    /// Creation timestamp
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Media size in bytes, when known
    #[serde(default)]
    pub file_size: Option<u64>,

    /// Audio duration in seconds, when known
    #[serde(default)]
    pub duration: Option<f64>,
}
