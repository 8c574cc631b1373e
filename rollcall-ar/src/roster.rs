//! Roster provider and gallery identity index
//!
//! Both are read-only views of data maintained elsewhere in the portal:
//! class enrollment keeps the roster tables and the `gallery_faces` mapping
//! current; attendance resolution only consumes them.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

/// Roster entry snapshot for one student
#[derive(Debug, Clone)]
pub struct EnrolledStudent {
    pub student_id: Uuid,
    pub name: String,
    /// School-issued identification (admission number, badge id)
    pub identification: String,
}

/// Roster lookup failures
#[derive(Debug, Error)]
pub enum RosterError {
    /// Class does not exist. Fatal: no partial session is created.
    #[error("Class not found: {0}")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt roster row: {0}")]
    Corrupt(String),
}

/// Provides the list of students actively enrolled in a class
#[async_trait]
pub trait RosterProvider: Send + Sync {
    async fn enrolled_students(&self, class_id: Uuid)
        -> Result<Vec<EnrolledStudent>, RosterError>;
}

/// Maps persistent gallery face references to student identities
#[async_trait]
pub trait GalleryIndex: Send + Sync {
    /// Resolve a gallery face to a student, `None` for faces the enrollment
    /// flow never registered (including this session's own temporary faces)
    async fn resolve_student(&self, face_ref: &str) -> Result<Option<Uuid>, RosterError>;
}

/// SQLite-backed roster provider and gallery index
#[derive(Clone)]
pub struct SqlDirectory {
    pool: SqlitePool,
}

impl SqlDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RosterProvider for SqlDirectory {
    async fn enrolled_students(
        &self,
        class_id: Uuid,
    ) -> Result<Vec<EnrolledStudent>, RosterError> {
        let class_id_str = class_id.to_string();

        // Distinguish "unknown class" from "empty roster"
        let class_exists: Option<String> =
            sqlx::query_scalar("SELECT class_id FROM classes WHERE class_id = ?")
                .bind(&class_id_str)
                .fetch_optional(&self.pool)
                .await?;

        if class_exists.is_none() {
            return Err(RosterError::NotFound(class_id));
        }

        let rows = sqlx::query(
            r#"
            SELECT s.student_id, s.name, s.identification
            FROM students s
            JOIN class_enrollments e ON e.student_id = s.student_id
            WHERE e.class_id = ? AND e.active = 1
            ORDER BY s.name
            "#,
        )
        .bind(&class_id_str)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.get("student_id");
                let student_id = Uuid::parse_str(&id)
                    .map_err(|e| RosterError::Corrupt(format!("student_id {}: {}", id, e)))?;
                Ok(EnrolledStudent {
                    student_id,
                    name: row.get("name"),
                    identification: row.get("identification"),
                })
            })
            .collect()
    }
}

#[async_trait]
impl GalleryIndex for SqlDirectory {
    async fn resolve_student(&self, face_ref: &str) -> Result<Option<Uuid>, RosterError> {
        let student_id: Option<String> =
            sqlx::query_scalar("SELECT student_id FROM gallery_faces WHERE face_ref = ?")
                .bind(face_ref)
                .fetch_optional(&self.pool)
                .await?;

        match student_id {
            Some(id) => {
                let parsed = Uuid::parse_str(&id)
                    .map_err(|e| RosterError::Corrupt(format!("student_id {}: {}", id, e)))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }
}
