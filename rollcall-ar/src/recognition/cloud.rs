//! Cloud face API client
//!
//! HTTP implementation of [`FaceRecognitionPort`] against a collection-based
//! face recognition service (index / search-by-face / delete).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{FaceRecognitionPort, IndexedFace, RecognitionError, SimilarFace};
use crate::config::FaceApiConfig;
use async_trait::async_trait;
use rollcall_common::api::BoundingBox;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Index request: image plus the temporary external label
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexRequest<'a> {
    image: String,
    external_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexResponse {
    faces: Vec<ApiFace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFace {
    face_id: String,
    bounding_box: ApiBoundingBox,
    confidence: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiBoundingBox {
    left: f32,
    top: f32,
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    face_id: &'a str,
    min_similarity: f32,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    matches: Vec<ApiMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMatch {
    face_id: String,
    similarity: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    face_ids: &'a [String],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResponse {
    deleted: usize,
}

/// Cloud face API client
pub struct CloudFaceClient {
    http_client: reqwest::Client,
    endpoint: String,
    collection_id: String,
}

impl CloudFaceClient {
    pub fn new(config: &FaceApiConfig) -> Result<Self, RecognitionError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let mut key_value = reqwest::header::HeaderValue::from_str(&config.api_key)
            .map_err(|e| RecognitionError::Detection(format!("Invalid API key: {}", e)))?;
        key_value.set_sensitive(true);
        headers.insert("x-api-key", key_value);

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RecognitionError::Detection(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            collection_id: config.collection_id.clone(),
        })
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!(
            "{}/collections/{}/{}",
            self.endpoint, self.collection_id, suffix
        )
    }
}

#[async_trait]
impl FaceRecognitionPort for CloudFaceClient {
    async fn index_faces(
        &self,
        image: &[u8],
        temp_label: &str,
    ) -> Result<Vec<IndexedFace>, RecognitionError> {
        let url = self.collection_url("faces");
        let request = IndexRequest {
            image: BASE64.encode(image),
            external_id: temp_label,
        };

        tracing::debug!(label = %temp_label, bytes = image.len(), "Indexing photo faces");

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RecognitionError::Detection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RecognitionError::Detection(format!(
                "API error {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let parsed: IndexResponse = response
            .json()
            .await
            .map_err(|e| RecognitionError::Detection(format!("Parse error: {}", e)))?;

        Ok(parsed
            .faces
            .into_iter()
            .map(|f| IndexedFace {
                face_ref: f.face_id,
                bounding_box: BoundingBox {
                    left: f.bounding_box.left,
                    top: f.bounding_box.top,
                    width: f.bounding_box.width,
                    height: f.bounding_box.height,
                },
                detector_confidence: f.confidence,
            })
            .collect())
    }

    async fn search_similar(
        &self,
        face_ref: &str,
        threshold: f32,
        max_results: u32,
    ) -> Result<Vec<SimilarFace>, RecognitionError> {
        let url = self.collection_url("search");
        let request = SearchRequest {
            face_id: face_ref,
            min_similarity: threshold,
            max_results,
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RecognitionError::Search(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RecognitionError::Search(format!(
                "API error {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| RecognitionError::Search(format!("Parse error: {}", e)))?;

        Ok(parsed
            .matches
            .into_iter()
            .map(|m| SimilarFace {
                face_ref: m.face_id,
                similarity: m.similarity,
            })
            .collect())
    }

    async fn delete_faces(&self, face_refs: &[String]) -> Result<usize, RecognitionError> {
        if face_refs.is_empty() {
            return Ok(0);
        }

        let url = self.collection_url("faces/delete");
        let request = DeleteRequest {
            face_ids: face_refs,
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RecognitionError::Cleanup(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RecognitionError::Cleanup(format!(
                "API error {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let parsed: DeleteResponse = response
            .json()
            .await
            .map_err(|e| RecognitionError::Cleanup(format!("Parse error: {}", e)))?;

        tracing::debug!(requested = face_refs.len(), deleted = parsed.deleted, "Deleted gallery faces");

        Ok(parsed.deleted)
    }
}
