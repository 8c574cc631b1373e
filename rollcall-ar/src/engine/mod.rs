//! Attendance Resolution Engine
//!
//! Turns a photo batch plus a class roster into one attendance decision per
//! enrolled student. Photos fan out with bounded concurrency; outcomes merge
//! at a single point under the max-confidence dedup rule, so results do not
//! depend on photo order. Only a missing roster (or total infrastructure
//! failure) fails the call; everything else degrades gracefully.

pub mod matching;
pub mod models;
mod photo;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use thiserror::Error;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::recognition::FaceRecognitionPort;
use crate::roster::{GalleryIndex, RosterError, RosterProvider};
use models::{AttendanceSession, ResolutionState, StudentDetection};
use photo::PhotoOutcome;
use rollcall_common::api::{AttendanceDecision, AttendanceStatus, PhotoTrace};

/// Resolution failures that surface to the caller
///
/// Per-photo and per-face errors never appear here; they are absorbed into
/// the outcome as fewer detections.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Class does not exist; aborts before any photo is touched
    #[error("Class roster not found: {0}")]
    RosterNotFound(Uuid),

    /// Roster or index infrastructure unavailable
    #[error("Infrastructure failure: {0}")]
    Infrastructure(String),
}

impl From<RosterError> for EngineError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::NotFound(class_id) => EngineError::RosterNotFound(class_id),
            other => EngineError::Infrastructure(other.to_string()),
        }
    }
}

/// One resolution request, photos already decoded
#[derive(Debug)]
pub struct ResolutionRequest {
    pub class_id: Uuid,
    pub teacher_id: Uuid,
    pub photos: Vec<Vec<u8>>,
    pub taken_at: DateTime<Utc>,
    /// Accept threshold (percent similarity)
    pub match_threshold: f32,
    pub diagnostics: bool,
}

/// Completed resolution: the record set to persist plus summary counts
#[derive(Debug)]
pub struct ResolutionOutcome {
    pub session: AttendanceSession,
    /// Exactly one decision per roster student, roster order
    pub decisions: Vec<AttendanceDecision>,
    pub present_count: usize,
    pub absent_count: usize,
    /// Faces found across all successfully indexed photos
    pub total_faces_detected: usize,
    pub trace: Option<Vec<PhotoTrace>>,
}

/// The engine: Face Recognition Port + roster + gallery index + limits
pub struct ResolutionEngine {
    pub(crate) port: Arc<dyn FaceRecognitionPort>,
    pub(crate) gallery: Arc<dyn GalleryIndex>,
    roster: Arc<dyn RosterProvider>,
    pub(crate) config: EngineConfig,
}

impl ResolutionEngine {
    pub fn new(
        port: Arc<dyn FaceRecognitionPort>,
        gallery: Arc<dyn GalleryIndex>,
        roster: Arc<dyn RosterProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            port,
            gallery,
            roster,
            config,
        }
    }

    /// Resolve attendance for one photo batch
    pub async fn resolve(
        &self,
        request: ResolutionRequest,
    ) -> Result<ResolutionOutcome, EngineError> {
        // Roster snapshot first: an unknown class fails the call before any
        // photo is indexed, leaving nothing to clean up.
        let students = self.roster.enrolled_students(request.class_id).await?;
        let roster_names: HashMap<Uuid, String> = students
            .iter()
            .map(|s| (s.student_id, s.name.clone()))
            .collect();

        let mut session = AttendanceSession::new(
            request.class_id,
            request.teacher_id,
            request.taken_at,
            request.photos.len(),
            students.len(),
        );

        tracing::info!(
            session_id = %session.session_id,
            class_id = %request.class_id,
            photos = request.photos.len(),
            expected = students.len(),
            threshold = request.match_threshold,
            "Starting attendance resolution"
        );

        session.transition_to(ResolutionState::ProcessingPhotos);

        // Bounded fan-out. Each photo owns its temporary registrations and
        // cleans them up independently; outcomes carry no shared state.
        let session_id = session.session_id;
        let concurrency = self.config.max_concurrent_photos.max(1);
        let photo_futures: Vec<_> = request
            .photos
            .iter()
            .enumerate()
            .map(|(i, image)| {
                self.process_photo(
                    session_id,
                    i as u32 + 1,
                    image,
                    &roster_names,
                    request.match_threshold,
                    request.diagnostics,
                )
            })
            .collect();
        let outcomes: Vec<PhotoOutcome> = stream::iter(photo_futures)
            .buffer_unordered(concurrency)
            .collect()
            .await;

        session.transition_to(ResolutionState::Aggregating);

        // Single merge point: max-confidence wins per student
        let mut detections: HashMap<Uuid, StudentDetection> = HashMap::new();
        let mut total_faces_detected = 0;
        let mut traces = Vec::new();

        for outcome in outcomes {
            total_faces_detected += outcome.face_count;
            for detection in outcome.detections {
                matching::merge_detection(&mut detections, detection);
            }
            if let Some(trace) = outcome.trace {
                traces.push(trace);
            }
        }

        // buffer_unordered yields in completion order; the trace reads per photo
        traces.sort_by_key(|t| t.photo_index);

        // Roster completion: every enrolled student gets exactly one decision
        let decisions: Vec<AttendanceDecision> = students
            .iter()
            .map(|student| match detections.get(&student.student_id) {
                Some(detection) => AttendanceDecision {
                    student_id: student.student_id,
                    status: AttendanceStatus::Present,
                    confidence: Some(detection.confidence),
                    evidence_face_ref: Some(detection.evidence_face_ref.clone()),
                },
                None => AttendanceDecision {
                    student_id: student.student_id,
                    status: AttendanceStatus::Absent,
                    confidence: None,
                    evidence_face_ref: None,
                },
            })
            .collect();

        let present_count = detections.len();
        let absent_count = students.len() - present_count;

        session.transition_to(ResolutionState::Completed);

        tracing::info!(
            session_id = %session.session_id,
            expected = students.len(),
            present = present_count,
            absent = absent_count,
            faces = total_faces_detected,
            "Attendance resolution completed"
        );

        Ok(ResolutionOutcome {
            session,
            decisions,
            present_count,
            absent_count,
            total_faces_detected,
            trace: request.diagnostics.then_some(traces),
        })
    }
}
