//! Shared API request/response types
//!
//! Wire types for the attendance resolution call, used by the attendance
//! service and by portal-side callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for `POST /attendance/resolve`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveAttendanceRequest {
    /// Class whose roster is being resolved
    pub class_id: Uuid,

    /// Teacher submitting the photo batch
    pub teacher_id: Uuid,

    /// Classroom photographs, base64-encoded (1..=configured maximum)
    pub photos: Vec<String>,

    /// Session timestamp; defaults to now when absent
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    /// Accept threshold (percent similarity); service default when absent
    #[serde(default)]
    pub match_threshold: Option<f32>,

    /// Include the per-photo diagnostic trace in the response
    #[serde(default)]
    pub diagnostics: bool,
}

/// Response body for `POST /attendance/resolve`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveAttendanceResponse {
    pub session_id: Uuid,

    /// Roster size at resolution time
    pub expected_count: usize,

    /// Students with an accepted detection
    pub present_count: usize,

    /// `expected_count - present_count`
    pub absent_count: usize,

    /// Faces found across all successfully indexed photos
    pub total_faces_detected: usize,

    /// Exactly one decision per roster student
    pub decisions: Vec<AttendanceDecision>,

    /// Per-photo diagnostic trace, present only when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<PhotoTrace>>,
}

/// Attendance status for one student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

/// Final per-student decision
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDecision {
    pub student_id: Uuid,

    pub status: AttendanceStatus,

    /// Best similarity seen across the batch; None when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    /// Gallery face that supplied the winning match; None when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_face_ref: Option<String>,
}

/// Diagnostic trace for one photo
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoTrace {
    /// 1-based photo position within the batch
    pub photo_index: u32,

    /// Faces found in this photo (0 when indexing failed)
    pub face_count: usize,

    /// Indexing error for this photo, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub faces: Vec<FaceTrace>,
}

/// Diagnostic trace for one detected face
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceTrace {
    /// Temporary gallery reference (deleted before the call returns)
    pub face_ref: String,

    pub bounding_box: BoundingBox,

    /// Detector confidence for the face itself, not an identity match
    pub detector_confidence: f32,

    /// Accepted match, if this face produced a detection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted: Option<AcceptedMatch>,

    /// Top candidates considered (at most 3), best first
    pub candidates: Vec<RankedCandidate>,

    /// Human-readable reason when no detection was accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
}

/// Accepted identity match in the trace
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedMatch {
    pub student_id: Uuid,
    pub similarity: f32,
}

/// Ranked candidate in the trace (roster students only)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub student_id: Uuid,
    pub name: String,
    pub similarity: f32,
}

/// Face location within a photo, normalized 0.0..=1.0 coordinates
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}
