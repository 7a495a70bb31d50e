//! Wire payload types for the collaborator API

use crate::model::{ArtifactId, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Body of a primary publish request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishBody {
    /// Mark chatbot intent server-side
    pub publish_to_chatbot: bool,
    /// Mark blog intent server-side
    pub publish_to_blog: bool,
    /// Artifacts covered by this publish
    pub selected_artifact_ids: Vec<ArtifactId>,
}

/// Per-artifact published/vectorized hint
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PublishedStatus {
    /// Whether the backend considers the artifact published
    pub is_published: bool,
    /// Whether the artifact has been vectorized
    pub is_vectorized: bool,
}

/// Response of a vectorization request
#[derive(Debug, Clone, Deserialize)]
pub struct VectorizeResponse {
    /// Backend status string ("success", "already_vectorized", ...)
    #[serde(default)]
    pub status: String,
    /// Optional human-readable detail
    #[serde(default)]
    pub message: Option<String>,
}

impl VectorizeResponse {
    /// An already-indexed artifact counts as a successful vectorization.
    pub fn is_success(&self) -> bool {
        matches!(self.status.as_str(), "success" | "already_vectorized")
    }
}

/// One activity-log entry. Logging is best-effort; failures never surface.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    /// Kind of activity ("session_published", "session_processed", ...)
    pub activity_type: String,
    /// Human-readable description
    pub description: String,
    /// Session the activity belongs to
    pub session_id: SessionId,
    /// Arbitrary extra fields
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ActivityEntry {
    /// Create an entry with no metadata
    pub fn new(
        activity_type: impl Into<String>,
        description: impl Into<String>,
        session_id: SessionId,
    ) -> Self {
        Self {
            activity_type: activity_type.into(),
            description: description.into(),
            session_id,
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata field
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_body_wire_casing() {
        let body = PublishBody {
            publish_to_chatbot: true,
            publish_to_blog: false,
            selected_artifact_ids: vec![ArtifactId::from("a1")],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["publishToChatbot"], true);
        assert_eq!(json["publishToBlog"], false);
        assert_eq!(json["selectedArtifactIds"][0], "a1");
    }

    #[test]
    fn test_vectorize_already_vectorized_is_success() {
        let resp: VectorizeResponse =
            serde_json::from_value(serde_json::json!({ "status": "already_vectorized" })).unwrap();
        assert!(resp.is_success());

        let resp: VectorizeResponse = serde_json::from_value(
            serde_json::json!({ "status": "failed", "message": "no text" }),
        )
        .unwrap();
        assert!(!resp.is_success());
    }

    #[test]
    fn test_activity_entry_metadata() {
        let entry = ActivityEntry::new(
            "session_published",
            "Session published to chatbot",
            SessionId::from("s1"),
        )
        .with_metadata("publishToChatbot", serde_json::json!(true));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["activity_type"], "session_published");
        assert_eq!(json["metadata"]["publishToChatbot"], true);
    }
}
