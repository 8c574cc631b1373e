//! Database access for rollcall-ar
//!
//! Shared portal SQLite database. Enrollment owns the roster and gallery
//! tables; this service creates them if missing so a fresh install starts
//! clean, and owns the attendance session/record tables.

pub mod sessions;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS classes (
            class_id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            student_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            identification TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS class_enrollments (
            class_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (class_id, student_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Persistent face gallery index, maintained by the enrollment flow
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS gallery_faces (
            face_ref TEXT PRIMARY KEY,
            student_id TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance_sessions (
            session_id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            teacher_id TEXT NOT NULL,
            taken_at TEXT NOT NULL,
            state TEXT NOT NULL,
            photo_count INTEGER NOT NULL,
            expected_count INTEGER NOT NULL,
            present_count INTEGER NOT NULL DEFAULT 0,
            absent_count INTEGER NOT NULL DEFAULT 0,
            total_faces_detected INTEGER NOT NULL DEFAULT 0,
            started_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance_records (
            session_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            status TEXT NOT NULL,
            confidence REAL,
            evidence_face_ref TEXT,
            PRIMARY KEY (session_id, student_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
