//! Attendance resolution endpoints
//!
//! `POST /attendance/resolve` runs the engine for one photo batch and
//! persists the resulting record set. `GET /attendance/sessions/:id` serves
//! the persisted roster for audit.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::db;
use crate::db::sessions::StoredSession;
use crate::engine::{EngineError, ResolutionEngine, ResolutionRequest};
use crate::error::{ApiError, ApiResult};
use crate::roster::SqlDirectory;
use crate::AppState;
use rollcall_common::api::{
    AttendanceDecision, ResolveAttendanceRequest, ResolveAttendanceResponse,
};

/// Response for `GET /attendance/sessions/:id`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session: StoredSession,
    pub decisions: Vec<AttendanceDecision>,
}

/// POST /attendance/resolve
pub async fn resolve_attendance(
    State(state): State<AppState>,
    Json(request): Json<ResolveAttendanceRequest>,
) -> ApiResult<Json<ResolveAttendanceResponse>> {
    let max_photos = state.config.engine.max_photos_per_session;
    if request.photos.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one photo is required".to_string(),
        ));
    }
    if request.photos.len() > max_photos {
        return Err(ApiError::BadRequest(format!(
            "At most {} photos per session, got {}",
            max_photos,
            request.photos.len()
        )));
    }

    let match_threshold = request
        .match_threshold
        .unwrap_or(state.config.engine.match_threshold);
    if !(0.0..=100.0).contains(&match_threshold) {
        return Err(ApiError::BadRequest(format!(
            "matchThreshold must be within 0..=100, got {}",
            match_threshold
        )));
    }

    let photos = request
        .photos
        .iter()
        .enumerate()
        .map(|(i, encoded)| {
            BASE64.decode(encoded).map_err(|e| {
                ApiError::BadRequest(format!("Photo {} is not valid base64: {}", i + 1, e))
            })
        })
        .collect::<Result<Vec<Vec<u8>>, ApiError>>()?;

    let directory = Arc::new(SqlDirectory::new(state.db.clone()));
    let engine = ResolutionEngine::new(
        state.recognition.clone(),
        directory.clone(),
        directory,
        state.config.engine.clone(),
    );

    let outcome = match engine
        .resolve(ResolutionRequest {
            class_id: request.class_id,
            teacher_id: request.teacher_id,
            photos,
            taken_at: request.timestamp.unwrap_or_else(Utc::now),
            match_threshold,
            diagnostics: request.diagnostics,
        })
        .await
    {
        Ok(outcome) => outcome,
        Err(EngineError::RosterNotFound(class_id)) => {
            return Err(ApiError::NotFound(format!("Class not found: {}", class_id)));
        }
        Err(EngineError::Infrastructure(msg)) => {
            *state.last_error.write().await = Some(msg.clone());
            return Err(ApiError::Internal(msg));
        }
    };

    // Durability: the decision set is the attendance roster of record
    db::sessions::save_session(
        &state.db,
        &outcome.session,
        outcome.present_count,
        outcome.absent_count,
        outcome.total_faces_detected,
    )
    .await?;
    db::sessions::save_decisions(&state.db, outcome.session.session_id, &outcome.decisions)
        .await?;

    Ok(Json(ResolveAttendanceResponse {
        session_id: outcome.session.session_id,
        expected_count: outcome.session.expected_count,
        present_count: outcome.present_count,
        absent_count: outcome.absent_count,
        total_faces_detected: outcome.total_faces_detected,
        decisions: outcome.decisions,
        trace: outcome.trace,
    }))
}

/// GET /attendance/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionResponse>> {
    let session = db::sessions::load_session(&state.db, session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Session not found: {}", session_id)))?;

    let decisions = db::sessions::load_decisions(&state.db, session_id).await?;

    Ok(Json(SessionResponse { session, decisions }))
}

/// Build attendance routes
pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route("/attendance/resolve", post(resolve_attendance))
        .route("/attendance/sessions/:session_id", get(get_session))
}
