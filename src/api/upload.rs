//! Upload API endpoint
//!
//! POST /api/v1/upload accepts multipart/form-data with:
//! - `file`: the file content
//! - `context`, `subContext`: storage grouping, e.g. `college` / `gallery`
//! - `fieldName`: echoed back so the caller can route the URL to a form field

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState};

/// Response for successful upload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    pub size: u64,
    pub content_type: String,
}

struct UploadedFile {
    filename: String,
    content_type: String,
    data: axum::body::Bytes,
}

/// Room for multipart boundaries and the text fields around the file
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// The body limit follows `upload.max_file_size` instead of axum's 2 MB default
pub fn router(max_file_size: u64) -> Router<AppState> {
    Router::new()
        .route("/", post(upload_file))
        .layer(DefaultBodyLimit::max(body_limit(max_file_size)))
}

fn body_limit(max_file_size: u64) -> usize {
    usize::try_from(max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD)
}

/// POST /api/v1/upload
async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let config = &state.upload_config;

    let mut file = None;
    let mut context = None;
    let mut sub_context = None;
    let mut field_name = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                if !config.is_type_allowed(&content_type) {
                    return Err(ApiError::validation_error(format!(
                        "Invalid file type: {}. Allowed types: {:?}",
                        content_type, config.allowed_types
                    )));
                }

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;
                file = Some(UploadedFile {
                    filename,
                    content_type,
                    data,
                });
            }
            "context" | "subContext" | "fieldName" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation_error(format!("Failed to read {}: {}", name, e)))?;
                match name.as_str() {
                    "context" => context = Some(value),
                    "subContext" => sub_context = Some(value),
                    _ => field_name = Some(value),
                }
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::validation_error("No file provided"))?;
    if file.data.len() as u64 > config.max_file_size {
        return Err(ApiError::validation_error(format!(
            "File too large. Maximum size: {} bytes ({} MB)",
            config.max_file_size,
            config.max_file_size / 1024 / 1024
        )));
    }

    let segments: Vec<String> = [context, sub_context]
        .into_iter()
        .flatten()
        .map(|s| sanitize_segment(&s))
        .filter(|s| !s.is_empty())
        .collect();

    let dir = segments.iter().fold(config.path.clone(), |dir, s| dir.join(s));
    ensure_upload_dir(&dir).await?;

    let ext = file_extension(&file.filename)
        .unwrap_or_else(|| config.get_extension(&file.content_type).to_string());
    let new_filename = format!("{}.{}", Uuid::new_v4(), ext);
    fs::write(dir.join(&new_filename), &file.data)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to save file: {}", e)))?;

    let mut url = config.public_prefix.trim_end_matches('/').to_string();
    for segment in &segments {
        url.push('/');
        url.push_str(segment);
    }
    url.push('/');
    url.push_str(&new_filename);

    tracing::info!(url = %url, size = file.data.len(), "Stored upload");
    Ok(Json(UploadResponse {
        url,
        field_name,
        size: file.data.len() as u64,
        content_type: file.content_type,
    }))
}

/// Ensure upload directory exists
async fn ensure_upload_dir(path: &Path) -> Result<(), ApiError> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create upload dir: {}", e)))
}

/// Keep a path segment to lowercase alphanumerics, `-` and `_`
fn sanitize_segment(segment: &str) -> String {
    segment
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

fn file_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    (!ext.is_empty() && ext.len() < 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .then(|| ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(sanitize_segment("College"), "college");
        assert_eq!(sanitize_segment("../../etc"), "etc");
        assert_eq!(sanitize_segment("sub_context-1"), "sub_context-1");
        assert_eq!(sanitize_segment("///"), "");
    }

    #[test]
    fn test_body_limit_leaves_room_for_fields() {
        assert_eq!(body_limit(10 * 1024 * 1024), 10 * 1024 * 1024 + MULTIPART_OVERHEAD);
        assert_eq!(body_limit(u64::MAX), usize::MAX);
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("photo.JPG"), Some("jpg".to_string()));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension("weird.p/ng"), None);
    }
}
