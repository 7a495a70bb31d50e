//! Session and artifact data model
//!
//! Sessions and artifacts are created and destroyed by external collaborators;
//! the core only reads their state and requests transitions. All ids are
//! backend-issued opaque strings.

mod artifact;
mod session;

pub use artifact::{Artifact, ArtifactId, ArtifactStatus, CaptureKind};
pub use session::{Session, SessionId, SessionStatus, VectorizedArtifact};
