//! Attendance store round-trip tests

mod support;

use chrono::Utc;
use uuid::Uuid;

use rollcall_ar::db::sessions::{load_decisions, load_session, save_decisions, save_session};
use rollcall_ar::engine::models::{AttendanceSession, ResolutionState};
use rollcall_common::api::{AttendanceDecision, AttendanceStatus};
use support::test_pool;

#[tokio::test]
async fn session_round_trip() {
    let (_dir, pool) = test_pool().await;

    let mut session =
        AttendanceSession::new(Uuid::new_v4(), Uuid::new_v4(), Utc::now(), 2, 24);
    session.transition_to(ResolutionState::ProcessingPhotos);
    session.transition_to(ResolutionState::Aggregating);
    session.transition_to(ResolutionState::Completed);

    save_session(&pool, &session, 20, 4, 31).await.unwrap();

    let loaded = load_session(&pool, session.session_id)
        .await
        .unwrap()
        .expect("session was saved");

    assert_eq!(loaded.session_id, session.session_id);
    assert_eq!(loaded.class_id, session.class_id);
    assert_eq!(loaded.state, "COMPLETED");
    assert_eq!(loaded.photo_count, 2);
    assert_eq!(loaded.expected_count, 24);
    assert_eq!(loaded.present_count, 20);
    assert_eq!(loaded.absent_count, 4);
    assert_eq!(loaded.total_faces_detected, 31);
    assert!(loaded.completed_at.is_some());
}

#[tokio::test]
async fn decisions_round_trip() {
    let (_dir, pool) = test_pool().await;
    let session_id = Uuid::new_v4();
    let (present, absent) = (Uuid::new_v4(), Uuid::new_v4());

    let decisions = vec![
        AttendanceDecision {
            student_id: present,
            status: AttendanceStatus::Present,
            confidence: Some(97.25),
            evidence_face_ref: Some("tmp-p1-f1".to_string()),
        },
        AttendanceDecision {
            student_id: absent,
            status: AttendanceStatus::Absent,
            confidence: None,
            evidence_face_ref: None,
        },
    ];

    save_decisions(&pool, session_id, &decisions).await.unwrap();

    let loaded = load_decisions(&pool, session_id).await.unwrap();
    assert_eq!(loaded.len(), 2);

    let loaded_present = loaded.iter().find(|d| d.student_id == present).unwrap();
    assert_eq!(loaded_present.status, AttendanceStatus::Present);
    assert_eq!(loaded_present.confidence, Some(97.25));
    assert_eq!(loaded_present.evidence_face_ref.as_deref(), Some("tmp-p1-f1"));

    let loaded_absent = loaded.iter().find(|d| d.student_id == absent).unwrap();
    assert_eq!(loaded_absent.status, AttendanceStatus::Absent);
    assert_eq!(loaded_absent.confidence, None);
}

#[tokio::test]
async fn missing_session_loads_as_none() {
    let (_dir, pool) = test_pool().await;
    let loaded = load_session(&pool, Uuid::new_v4()).await.unwrap();
    assert!(loaded.is_none());
}
