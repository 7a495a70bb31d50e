//! Labeled transcript composition for multi-artifact Describe

use crate::model::CaptureKind;

/// One processed segment of a combined transcript
#[derive(Debug, Clone)]
pub struct TranscriptSegment {
    /// Kind of the artifact that produced the text
    pub kind: CaptureKind,
    /// Processed text for that artifact
    pub text: String,
}

impl TranscriptSegment {
    /// Create a segment
    pub fn new(kind: CaptureKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Compose a combined transcript from processed segments.
///
/// Each segment is prefixed with a label derived from its kind and its
/// position in the selection ("Audio 1:", "Image 2:", ...), and segments are
/// separated by a blank line. The position counts across the whole
/// selection, not per kind.
pub fn compose_transcript(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            format!("{} {}:\n{}", segment.kind.segment_label(), index + 1, segment.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
