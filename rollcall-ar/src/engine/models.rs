//! Attendance session state machine and in-flight detection types
//!
//! A resolution call progresses through 4 states:
//! STARTED -> PROCESSINGPHOTOS -> AGGREGATING -> COMPLETED
//!
//! There is no terminal error state: partial photo/face failures degrade the
//! result, they never abort the session.

use chrono::{DateTime, Utc};
use rollcall_common::api::BoundingBox;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resolution call state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResolutionState {
    /// Session created, roster loaded
    Started,
    /// Per-photo indexing, search, and cleanup
    ProcessingPhotos,
    /// Cross-photo merge and roster completion
    Aggregating,
    /// Decisions assembled
    Completed,
}

/// One attendance-taking event: one class, one timestamp, one photo batch
///
/// Immutable once persisted; owns the resulting attendance records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceSession {
    pub session_id: Uuid,
    pub class_id: Uuid,
    pub teacher_id: Uuid,
    /// When attendance was taken (caller-supplied or session creation time)
    pub taken_at: DateTime<Utc>,
    pub state: ResolutionState,
    /// Photos in the batch
    pub photo_count: usize,
    /// Roster size at resolution time
    pub expected_count: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AttendanceSession {
    pub fn new(
        class_id: Uuid,
        teacher_id: Uuid,
        taken_at: DateTime<Utc>,
        photo_count: usize,
        expected_count: usize,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            class_id,
            teacher_id,
            taken_at,
            state: ResolutionState::Started,
            photo_count,
            expected_count,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Transition to a new state, stamping completion time on the terminal state
    pub fn transition_to(&mut self, new_state: ResolutionState) {
        tracing::debug!(
            session_id = %self.session_id,
            old_state = ?self.state,
            new_state = ?new_state,
            "Session state transition"
        );
        self.state = new_state;

        if new_state == ResolutionState::Completed {
            self.completed_at = Some(Utc::now());
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state == ResolutionState::Completed
    }
}

/// Gallery hit for one detected face, already filtered to the roster
///
/// Ephemeral: used only to pick the best match for one face.
#[derive(Debug, Clone)]
pub struct CandidateMatch {
    pub student_id: Uuid,
    /// Roster name, carried for the diagnostic trace
    pub name: String,
    /// Similarity percent, 0.0..=100.0
    pub similarity: f32,
    /// The persistent gallery face that produced this hit
    pub face_ref: String,
}

/// Best evidence for one student across the whole photo batch
///
/// Superseded whenever a higher-similarity detection for the same student
/// appears in a later photo or face.
#[derive(Debug, Clone)]
pub struct StudentDetection {
    pub student_id: Uuid,
    /// Max similarity seen for this student (percent)
    pub confidence: f32,
    /// The detected face that supplied the evidence (session-temporary ref;
    /// correlates with the diagnostic trace, not a live gallery entry)
    pub evidence_face_ref: String,
    pub bounding_box: BoundingBox,
}
