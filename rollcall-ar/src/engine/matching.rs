//! Match filtering, threshold, and dedup policy
//!
//! Pure decision logic: no I/O, no clock. The per-photo pipeline feeds it
//! similarity hits and already-resolved roster candidates; this module picks
//! winners and explains rejections.

use std::collections::HashMap;
use std::fmt;

use rollcall_common::api::RankedCandidate;
use uuid::Uuid;

use super::models::{CandidateMatch, StudentDetection};
use crate::recognition::SimilarFace;

/// Candidates shown in the trace per face
pub const TRACE_CANDIDATE_LIMIT: usize = 3;

/// Why a face produced no detection
///
/// Language-neutral data; the human-readable sentence is the `Display` impl,
/// rendered only when the trace is assembled.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    /// No gallery hit mapped to an enrolled student
    NoEnrolledMatch,
    /// Best roster candidate fell short of the accept threshold
    BelowThreshold {
        name: String,
        similarity: f32,
        required: f32,
    },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::NoEnrolledMatch => {
                write!(f, "No enrolled-student match above threshold")
            }
            RejectionReason::BelowThreshold {
                name,
                similarity,
                required,
            } => write!(
                f,
                "Best candidate {} at similarity {:.2}%, required >= {:.2}%",
                name, similarity, required
            ),
        }
    }
}

/// Outcome of the decision policy for one face
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Accepted(CandidateMatch),
    Rejected(RejectionReason),
}

/// Drop the probe face's match against its own temporary registration
///
/// A freshly indexed face matches itself at 100% similarity; that hit is an
/// artifact of registering it for search, never evidence.
pub fn exclude_self(matches: Vec<SimilarFace>, own_ref: &str) -> Vec<SimilarFace> {
    matches
        .into_iter()
        .filter(|m| m.face_ref != own_ref)
        .collect()
}

/// Rank candidates by similarity, best first
pub fn rank(mut candidates: Vec<CandidateMatch>) -> Vec<CandidateMatch> {
    candidates.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    candidates
}

/// Apply the accept threshold to ranked candidates
///
/// The comparison is `>=`: a best candidate at exactly the threshold is
/// accepted. Candidates must already be ranked best-first.
pub fn select_best(candidates: &[CandidateMatch], threshold: f32) -> MatchOutcome {
    match candidates.first() {
        None => MatchOutcome::Rejected(RejectionReason::NoEnrolledMatch),
        Some(best) if best.similarity >= threshold => MatchOutcome::Accepted(best.clone()),
        Some(best) => MatchOutcome::Rejected(RejectionReason::BelowThreshold {
            name: best.name.clone(),
            similarity: best.similarity,
            required: threshold,
        }),
    }
}

/// Top candidates for the diagnostic trace
pub fn top_candidates(candidates: &[CandidateMatch]) -> Vec<RankedCandidate> {
    candidates
        .iter()
        .take(TRACE_CANDIDATE_LIMIT)
        .map(|c| RankedCandidate {
            student_id: c.student_id,
            name: c.name.clone(),
            similarity: c.similarity,
        })
        .collect()
}

/// Merge one accepted detection into the cross-photo aggregation map
///
/// Keeps at most one detection per student: the one with the highest
/// confidence seen anywhere in the batch, independent of photo order.
pub fn merge_detection(
    detections: &mut HashMap<Uuid, StudentDetection>,
    detection: StudentDetection,
) {
    match detections.get(&detection.student_id) {
        Some(existing) if existing.confidence >= detection.confidence => {}
        _ => {
            detections.insert(detection.student_id, detection);
        }
    }
}
