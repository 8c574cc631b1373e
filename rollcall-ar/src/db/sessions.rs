//! Attendance session and record persistence
//!
//! One row per session, one row per (session, student) decision. Sessions
//! are written once, after resolution completes; they are never updated by
//! the engine afterward.

use chrono::{DateTime, Utc};
use rollcall_common::api::{AttendanceDecision, AttendanceStatus};
use rollcall_common::{Error, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::engine::models::AttendanceSession;

/// Persisted session row, as returned by the audit endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub session_id: Uuid,
    pub class_id: Uuid,
    pub teacher_id: Uuid,
    pub taken_at: DateTime<Utc>,
    pub state: String,
    pub photo_count: usize,
    pub expected_count: usize,
    pub present_count: usize,
    pub absent_count: usize,
    pub total_faces_detected: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Save a completed session with its summary counts
pub async fn save_session(
    pool: &SqlitePool,
    session: &AttendanceSession,
    present_count: usize,
    absent_count: usize,
    total_faces_detected: usize,
) -> Result<()> {
    let session_id = session.session_id.to_string();
    let class_id = session.class_id.to_string();
    let teacher_id = session.teacher_id.to_string();
    let taken_at = session.taken_at.to_rfc3339();
    let state = serde_json::to_string(&session.state)
        .map_err(|e| Error::Internal(format!("Failed to serialize state: {}", e)))?
        .trim_matches('"')
        .to_string();
    let started_at = session.started_at.to_rfc3339();
    let completed_at = session.completed_at.map(|dt| dt.to_rfc3339());

    sqlx::query(
        r#"
        INSERT INTO attendance_sessions (
            session_id, class_id, teacher_id, taken_at, state,
            photo_count, expected_count, present_count, absent_count,
            total_faces_detected, started_at, completed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(session_id) DO UPDATE SET
            state = excluded.state,
            present_count = excluded.present_count,
            absent_count = excluded.absent_count,
            total_faces_detected = excluded.total_faces_detected,
            completed_at = excluded.completed_at
        "#,
    )
    .bind(&session_id)
    .bind(&class_id)
    .bind(&teacher_id)
    .bind(&taken_at)
    .bind(&state)
    .bind(session.photo_count as i64)
    .bind(session.expected_count as i64)
    .bind(present_count as i64)
    .bind(absent_count as i64)
    .bind(total_faces_detected as i64)
    .bind(&started_at)
    .bind(&completed_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Save one attendance record per roster student
pub async fn save_decisions(
    pool: &SqlitePool,
    session_id: Uuid,
    decisions: &[AttendanceDecision],
) -> Result<()> {
    let session_id_str = session_id.to_string();

    for decision in decisions {
        let status = match decision.status {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
        };

        sqlx::query(
            r#"
            INSERT INTO attendance_records (
                session_id, student_id, status, confidence, evidence_face_ref
            ) VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(session_id, student_id) DO UPDATE SET
                status = excluded.status,
                confidence = excluded.confidence,
                evidence_face_ref = excluded.evidence_face_ref
            "#,
        )
        .bind(&session_id_str)
        .bind(decision.student_id.to_string())
        .bind(status)
        .bind(decision.confidence.map(f64::from))
        .bind(&decision.evidence_face_ref)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Load a persisted session by id
pub async fn load_session(pool: &SqlitePool, session_id: Uuid) -> Result<Option<StoredSession>> {
    let row = sqlx::query(
        r#"
        SELECT session_id, class_id, teacher_id, taken_at, state,
               photo_count, expected_count, present_count, absent_count,
               total_faces_detected, started_at, completed_at
        FROM attendance_sessions
        WHERE session_id = ?
        "#,
    )
    .bind(session_id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let parse_uuid = |field: &str| -> Result<Uuid> {
        let value: String = row.get(field);
        Uuid::parse_str(&value)
            .map_err(|e| Error::Internal(format!("Corrupt {} in session row: {}", field, e)))
    };
    let parse_time = |value: String, field: &str| -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::Internal(format!("Corrupt {} in session row: {}", field, e)))
    };

    let completed_at = match row.get::<Option<String>, _>("completed_at") {
        Some(value) => Some(parse_time(value, "completed_at")?),
        None => None,
    };

    Ok(Some(StoredSession {
        session_id: parse_uuid("session_id")?,
        class_id: parse_uuid("class_id")?,
        teacher_id: parse_uuid("teacher_id")?,
        taken_at: parse_time(row.get("taken_at"), "taken_at")?,
        state: row.get("state"),
        photo_count: row.get::<i64, _>("photo_count") as usize,
        expected_count: row.get::<i64, _>("expected_count") as usize,
        present_count: row.get::<i64, _>("present_count") as usize,
        absent_count: row.get::<i64, _>("absent_count") as usize,
        total_faces_detected: row.get::<i64, _>("total_faces_detected") as usize,
        started_at: parse_time(row.get("started_at"), "started_at")?,
        completed_at,
    }))
}

/// Load the decisions recorded for a session
pub async fn load_decisions(
    pool: &SqlitePool,
    session_id: Uuid,
) -> Result<Vec<AttendanceDecision>> {
    let rows = sqlx::query(
        r#"
        SELECT student_id, status, confidence, evidence_face_ref
        FROM attendance_records
        WHERE session_id = ?
        ORDER BY student_id
        "#,
    )
    .bind(session_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let student_id: String = row.get("student_id");
            let student_id = Uuid::parse_str(&student_id)
                .map_err(|e| Error::Internal(format!("Corrupt student_id: {}", e)))?;
            let status: String = row.get("status");
            let status = match status.as_str() {
                "present" => AttendanceStatus::Present,
                "absent" => AttendanceStatus::Absent,
                other => {
                    return Err(Error::Internal(format!(
                        "Unknown attendance status: {}",
                        other
                    )))
                }
            };

            Ok(AttendanceDecision {
                student_id,
                status,
                confidence: row.get::<Option<f64>, _>("confidence").map(|c| c as f32),
                evidence_face_ref: row.get("evidence_face_ref"),
            })
        })
        .collect()
}
