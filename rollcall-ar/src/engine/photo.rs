//! Per-photo processing: face extraction, identity search, mandatory cleanup
//!
//! Each photo is an isolation boundary. Indexing failure degrades the photo
//! to zero faces; a failed search degrades that face to "no detection";
//! neither aborts the session. Every temporary registration made here is
//! deleted before the photo's outcome is returned.

use std::collections::HashMap;

use rollcall_common::api::{AcceptedMatch, FaceTrace, PhotoTrace};
use uuid::Uuid;

use super::matching::{self, MatchOutcome};
use super::models::{CandidateMatch, StudentDetection};
use super::ResolutionEngine;
use crate::recognition::IndexedFace;

/// Result of processing one photo, ready for the aggregation merge
#[derive(Debug)]
pub(crate) struct PhotoOutcome {
    /// 1-based position within the batch
    pub photo_index: u32,
    /// Faces indexed in this photo (0 when indexing failed)
    pub face_count: usize,
    /// Accepted detections from this photo
    pub detections: Vec<StudentDetection>,
    /// Diagnostic trace, populated only when diagnostics are enabled
    pub trace: Option<PhotoTrace>,
}

impl ResolutionEngine {
    /// Process one photo end to end
    ///
    /// Indexes all faces under a session-and-photo-scoped temporary label,
    /// searches each against the gallery, and unconditionally deletes the
    /// temporary registrations before returning. Never fails: all errors are
    /// absorbed into the outcome.
    pub(crate) async fn process_photo(
        &self,
        session_id: Uuid,
        photo_index: u32,
        image: &[u8],
        roster_names: &HashMap<Uuid, String>,
        match_threshold: f32,
        diagnostics: bool,
    ) -> PhotoOutcome {
        // Scoped to the (session, photo) pair, never an identity
        let temp_label = format!("session-{}-photo-{}", session_id, photo_index);

        let faces = match self.port.index_faces(image, &temp_label).await {
            Ok(faces) => faces,
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    photo_index,
                    error = %e,
                    "Photo indexing failed, recording zero faces"
                );
                return PhotoOutcome {
                    photo_index,
                    face_count: 0,
                    detections: Vec::new(),
                    trace: diagnostics.then(|| PhotoTrace {
                        photo_index,
                        face_count: 0,
                        error: Some(e.to_string()),
                        faces: Vec::new(),
                    }),
                };
            }
        };

        // Cleanup obligation for this photo: every face_ref indexed above
        let temp_refs: Vec<String> = faces.iter().map(|f| f.face_ref.clone()).collect();

        tracing::debug!(
            session_id = %session_id,
            photo_index,
            faces = faces.len(),
            "Photo indexed"
        );

        // The search phase absorbs per-face failures, so control always
        // reaches the deletion below.
        let (detections, face_traces) = self
            .search_photo_faces(session_id, &faces, roster_names, match_threshold, diagnostics)
            .await;

        // Mandatory cleanup: the gallery's steady-state content must be
        // unchanged once this call completes. Failure here is operational,
        // not correctness-blocking; log and move on.
        match self.port.delete_faces(&temp_refs).await {
            Ok(deleted) => {
                tracing::debug!(
                    session_id = %session_id,
                    photo_index,
                    deleted,
                    "Temporary faces deleted"
                );
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    photo_index,
                    refs = temp_refs.len(),
                    error = %e,
                    "Temporary face cleanup failed, registrations may be leaked"
                );
            }
        }

        PhotoOutcome {
            photo_index,
            face_count: faces.len(),
            detections,
            trace: diagnostics.then(|| PhotoTrace {
                photo_index,
                face_count: faces.len(),
                error: None,
                faces: face_traces,
            }),
        }
    }

    /// Search every detected face against the gallery and apply the match policy
    async fn search_photo_faces(
        &self,
        session_id: Uuid,
        faces: &[IndexedFace],
        roster_names: &HashMap<Uuid, String>,
        match_threshold: f32,
        diagnostics: bool,
    ) -> (Vec<StudentDetection>, Vec<FaceTrace>) {
        let mut detections = Vec::new();
        let mut face_traces = Vec::new();

        for face in faces {
            // Low threshold on purpose: the trace should show near-misses;
            // the accept decision happens in the match policy, not here.
            // A caller threshold below the floor lowers it further, so no
            // acceptable hit is ever filtered out before the policy runs.
            let search_threshold = self.config.search_floor.min(match_threshold);
            let similar = match self
                .port
                .search_similar(
                    &face.face_ref,
                    search_threshold,
                    self.config.search_max_results,
                )
                .await
            {
                Ok(similar) => similar,
                Err(e) => {
                    tracing::warn!(
                        session_id = %session_id,
                        face_ref = %face.face_ref,
                        error = %e,
                        "Face search failed, treating as no detection"
                    );
                    if diagnostics {
                        face_traces.push(FaceTrace {
                            face_ref: face.face_ref.clone(),
                            bounding_box: face.bounding_box,
                            detector_confidence: face.detector_confidence,
                            accepted: None,
                            candidates: Vec::new(),
                            rejection: Some(format!("Search failed: {}", e)),
                        });
                    }
                    continue;
                }
            };

            let foreign = matching::exclude_self(similar, &face.face_ref);
            let candidates = self.resolve_candidates(session_id, foreign, roster_names).await;
            let candidates = matching::rank(candidates);
            let outcome = matching::select_best(&candidates, match_threshold);

            let (accepted, rejection) = match &outcome {
                MatchOutcome::Accepted(best) => {
                    detections.push(StudentDetection {
                        student_id: best.student_id,
                        confidence: best.similarity,
                        evidence_face_ref: face.face_ref.clone(),
                        bounding_box: face.bounding_box,
                    });
                    (
                        Some(AcceptedMatch {
                            student_id: best.student_id,
                            similarity: best.similarity,
                        }),
                        None,
                    )
                }
                MatchOutcome::Rejected(reason) => (None, Some(reason.to_string())),
            };

            if diagnostics {
                face_traces.push(FaceTrace {
                    face_ref: face.face_ref.clone(),
                    bounding_box: face.bounding_box,
                    detector_confidence: face.detector_confidence,
                    accepted,
                    candidates: matching::top_candidates(&candidates),
                    rejection,
                });
            }
        }

        (detections, face_traces)
    }

    /// Map similarity hits to roster candidates via the gallery index
    ///
    /// Hits the index cannot resolve are dropped: that covers unenrolled
    /// faces and this session's own temporary registrations alike. Resolved
    /// students not on this class's roster are dropped too.
    async fn resolve_candidates(
        &self,
        session_id: Uuid,
        hits: Vec<crate::recognition::SimilarFace>,
        roster_names: &HashMap<Uuid, String>,
    ) -> Vec<CandidateMatch> {
        let mut candidates = Vec::new();

        for hit in hits {
            match self.gallery.resolve_student(&hit.face_ref).await {
                Ok(Some(student_id)) => {
                    if let Some(name) = roster_names.get(&student_id) {
                        candidates.push(CandidateMatch {
                            student_id,
                            name: name.clone(),
                            similarity: hit.similarity,
                            face_ref: hit.face_ref,
                        });
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        session_id = %session_id,
                        face_ref = %hit.face_ref,
                        error = %e,
                        "Gallery index lookup failed, dropping hit"
                    );
                }
            }
        }

        candidates
    }
}
