//! Face Recognition Port
//!
//! Boundary trait for the cloud face recognition capability. The engine only
//! ever talks to this trait, so tests inject in-memory fakes and the cloud
//! client stays swappable.

use async_trait::async_trait;
use rollcall_common::api::BoundingBox;
use thiserror::Error;

pub mod cloud;

pub use cloud::CloudFaceClient;

/// Face recognition failures, split by engine recovery policy
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// Indexing a photo failed (malformed image, API error).
    /// Degrades that photo to zero faces.
    #[error("Face detection failed: {0}")]
    Detection(String),

    /// Similarity search failed for one face.
    /// Degrades that face to "no detection".
    #[error("Similarity search failed: {0}")]
    Search(String),

    /// Temporary face deletion failed. Logged only, never surfaced.
    #[error("Gallery cleanup failed: {0}")]
    Cleanup(String),
}

/// One face registered in the gallery by an indexing call
#[derive(Debug, Clone)]
pub struct IndexedFace {
    /// Opaque gallery reference for this face
    pub face_ref: String,
    /// Face location within the photo
    pub bounding_box: BoundingBox,
    /// Detector confidence that this is a face (percent)
    pub detector_confidence: f32,
}

/// One similarity hit returned by a search
#[derive(Debug, Clone)]
pub struct SimilarFace {
    pub face_ref: String,
    /// Similarity percent, 0.0..=100.0
    pub similarity: f32,
}

/// Boundary contract for the face recognition capability
///
/// The gallery behind this port is shared with the enrollment flow: searches
/// run against previously registered faces, and faces indexed with a
/// temporary label must be deleted before a resolution call returns.
#[async_trait]
pub trait FaceRecognitionPort: Send + Sync {
    /// Index all faces found in one photo, tagged with `temp_label`
    ///
    /// The label is session-and-photo scoped, never an identity. Every
    /// returned `face_ref` becomes a cleanup obligation for the caller.
    async fn index_faces(
        &self,
        image: &[u8],
        temp_label: &str,
    ) -> Result<Vec<IndexedFace>, RecognitionError>;

    /// Search the gallery for faces similar to `face_ref`
    ///
    /// `threshold` is the minimum similarity percent; `max_results` caps the
    /// hit list. The probe face matches itself at 100%, so callers filter
    /// self-matches.
    async fn search_similar(
        &self,
        face_ref: &str,
        threshold: f32,
        max_results: u32,
    ) -> Result<Vec<SimilarFace>, RecognitionError>;

    /// Delete faces from the gallery, returning the count deleted
    ///
    /// Best-effort: callers log failures and continue.
    async fn delete_faces(&self, face_refs: &[String]) -> Result<usize, RecognitionError>;
}
