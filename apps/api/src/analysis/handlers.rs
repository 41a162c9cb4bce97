//! Axum route handler for the analysis API.

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::analysis::pipeline::{AnalysisResponse, UploadedDocument};
use crate::errors::AppError;
use crate::state::AppState;

/// Multipart field carrying the résumé file.
const FILE_FIELD: &str = "resume";
/// Fallback name when a filename sanitizes down to nothing.
const FALLBACK_FILENAME: &str = "upload.pdf";

/// POST /analyze
///
/// Multipart form: `resume` (file) and optional `profession` (or `role`) text.
pub async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResponse>, AppError> {
    let mut document: Option<UploadedDocument> = None;
    let mut role: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Input(format!("Malformed upload: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let raw_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Input(format!("Malformed upload: {e}")))?;
                let filename = if raw_name.trim().is_empty() {
                    String::new()
                } else {
                    secure_filename(&raw_name)
                };
                document = Some(UploadedDocument {
                    bytes,
                    filename,
                    content_type,
                });
            }
            Some("profession") | Some("role") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Input(format!("Malformed upload: {e}")))?;
                role = Some(value);
            }
            _ => {}
        }
    }

    let response = state.analyzer.analyze(document, role.as_deref()).await?;
    Ok(Json(response))
}

/// Reduces a client-supplied filename to a safe ASCII basename.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let cleaned = cleaned.trim_start_matches(['.', '_']).to_string();

    if cleaned.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned
    }
}
