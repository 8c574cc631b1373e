//! Shared test support: scripted face recognition fake and database seeding
#![allow(dead_code)]

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tempfile::TempDir;
use uuid::Uuid;

use rollcall_ar::recognition::{FaceRecognitionPort, IndexedFace, RecognitionError, SimilarFace};
use rollcall_common::api::BoundingBox;

/// Scripted face: what indexing one photo yields and what its search returns
#[derive(Debug, Clone)]
pub struct FakeFace {
    pub face_ref: String,
    /// Gallery hits (face_ref, similarity) returned when this face is
    /// searched; the 100% self-match is added automatically
    pub matches: Vec<(String, f32)>,
}

impl FakeFace {
    pub fn new(face_ref: &str, matches: &[(&str, f32)]) -> Self {
        Self {
            face_ref: face_ref.to_string(),
            matches: matches
                .iter()
                .map(|(r, s)| (r.to_string(), *s))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
enum PhotoScript {
    Faces(Vec<FakeFace>),
    IndexFailure,
}

#[derive(Debug, Default)]
struct FakeState {
    /// Scripts keyed by raw photo bytes
    photos: HashMap<Vec<u8>, PhotoScript>,
    /// Temporary registrations currently present in the fake gallery
    registered: HashSet<String>,
    /// Face refs whose search call fails
    failing_searches: HashSet<String>,
    delete_calls: Vec<Vec<String>>,
}

/// In-memory Face Recognition Port with scripted behavior per photo
#[derive(Default)]
pub struct FakeRecognition {
    state: Mutex<FakeState>,
}

impl FakeRecognition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_photo(&self, image: &[u8], faces: Vec<FakeFace>) {
        self.state
            .lock()
            .unwrap()
            .photos
            .insert(image.to_vec(), PhotoScript::Faces(faces));
    }

    pub fn script_index_failure(&self, image: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .photos
            .insert(image.to_vec(), PhotoScript::IndexFailure);
    }

    pub fn fail_search_for(&self, face_ref: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_searches
            .insert(face_ref.to_string());
    }

    /// Temporary registrations still present; empty means no leaks
    pub fn registered_faces(&self) -> Vec<String> {
        let mut faces: Vec<String> = self
            .state
            .lock()
            .unwrap()
            .registered
            .iter()
            .cloned()
            .collect();
        faces.sort();
        faces
    }

    pub fn delete_call_count(&self) -> usize {
        self.state.lock().unwrap().delete_calls.len()
    }
}

#[async_trait]
impl FaceRecognitionPort for FakeRecognition {
    async fn index_faces(
        &self,
        image: &[u8],
        temp_label: &str,
    ) -> Result<Vec<IndexedFace>, RecognitionError> {
        assert!(
            temp_label.starts_with("session-") && temp_label.contains("-photo-"),
            "temporary label must be session-and-photo scoped, got {}",
            temp_label
        );

        let mut state = self.state.lock().unwrap();
        match state.photos.get(image).cloned() {
            Some(PhotoScript::IndexFailure) => Err(RecognitionError::Detection(
                "unsupported image format".to_string(),
            )),
            Some(PhotoScript::Faces(faces)) => {
                for face in &faces {
                    state.registered.insert(face.face_ref.clone());
                }
                Ok(faces
                    .iter()
                    .map(|face| IndexedFace {
                        face_ref: face.face_ref.clone(),
                        bounding_box: BoundingBox {
                            left: 0.1,
                            top: 0.1,
                            width: 0.2,
                            height: 0.3,
                        },
                        detector_confidence: 99.0,
                    })
                    .collect())
            }
            None => Ok(Vec::new()),
        }
    }

    async fn search_similar(
        &self,
        face_ref: &str,
        threshold: f32,
        max_results: u32,
    ) -> Result<Vec<SimilarFace>, RecognitionError> {
        let state = self.state.lock().unwrap();

        if state.failing_searches.contains(face_ref) {
            return Err(RecognitionError::Search(
                "search backend unavailable".to_string(),
            ));
        }

        let script = state.photos.values().find_map(|script| match script {
            PhotoScript::Faces(faces) => faces.iter().find(|f| f.face_ref == face_ref),
            PhotoScript::IndexFailure => None,
        });

        let mut hits = vec![SimilarFace {
            face_ref: face_ref.to_string(),
            similarity: 100.0,
        }];
        if let Some(face) = script {
            hits.extend(face.matches.iter().map(|(r, s)| SimilarFace {
                face_ref: r.clone(),
                similarity: *s,
            }));
        }

        hits.retain(|h| h.similarity >= threshold);
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(max_results as usize);

        Ok(hits)
    }

    async fn delete_faces(&self, face_refs: &[String]) -> Result<usize, RecognitionError> {
        let mut state = self.state.lock().unwrap();
        state.delete_calls.push(face_refs.to_vec());

        let mut deleted = 0;
        for face_ref in face_refs {
            if state.registered.remove(face_ref) {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

/// Temp-file-backed database with all tables created
pub async fn test_pool() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let pool = rollcall_ar::db::init_database_pool(&dir.path().join("rollcall.db"))
        .await
        .unwrap();
    (dir, pool)
}

pub async fn seed_class(pool: &SqlitePool, class_id: Uuid, name: &str) {
    sqlx::query("INSERT INTO classes (class_id, name) VALUES (?, ?)")
        .bind(class_id.to_string())
        .bind(name)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_student(pool: &SqlitePool, class_id: Uuid, student_id: Uuid, name: &str) {
    sqlx::query("INSERT INTO students (student_id, name, identification) VALUES (?, ?, ?)")
        .bind(student_id.to_string())
        .bind(name)
        .bind(format!("ID-{}", &student_id.to_string()[..8]))
        .execute(pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO class_enrollments (class_id, student_id, active) VALUES (?, ?, 1)")
        .bind(class_id.to_string())
        .bind(student_id.to_string())
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_gallery_face(pool: &SqlitePool, face_ref: &str, student_id: Uuid) {
    sqlx::query("INSERT INTO gallery_faces (face_ref, student_id) VALUES (?, ?)")
        .bind(face_ref)
        .bind(student_id.to_string())
        .execute(pool)
        .await
        .unwrap();
}
