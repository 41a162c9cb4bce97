//! Résumé analysis pipeline — sequences every stage for one uploaded document.
//!
//! Flow: validate input → extract text (sentinel on failure) → build prompt →
//!       one completion call (fallback message on failure, if declared) →
//!       parse (default record on failure) → best-effort audit row → result.
//!
//! Only missing input and, without a declared fallback, completion failures
//! reach the caller. Every other failure degrades to a well-formed result.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::analysis::models::{AnalysisResult, OutputMode, DEFAULT_ROLE, MAX_ROLE_CHARS};
use crate::analysis::parser::ResultParser;
use crate::analysis::prompts::build_prompt;
use crate::audit::AuditLogger;
use crate::errors::AppError;
use crate::extraction::{DocumentTextExtractor, ExtractedText};
use crate::llm_client::{CompletionService, ModelParams};
use crate::text::truncate_chars;

/// A document as received from the caller. Dropped once its text is extracted.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub bytes: Bytes,
    pub filename: String,
    pub content_type: Option<String>,
}

/// Per-request inputs to the completion stage.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub text: ExtractedText,
    pub role: String,
    pub params: ModelParams,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub request_id: Uuid,
    pub filename: String,
    pub role: String,
    pub result: AnalysisResult,
}

/// Static pipeline settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub output_mode: OutputMode,
    pub params: ModelParams,
    /// Substituted for the completion when the service fails. `None` means
    /// failures are reported to the caller.
    pub fallback_message: Option<String>,
}

/// The orchestrator. Owns no per-request state, so one instance is shared
/// by every concurrent request.
pub struct Analyzer {
    extractor: DocumentTextExtractor,
    completions: Arc<dyn CompletionService>,
    parser: ResultParser,
    audit: AuditLogger,
    settings: PipelineSettings,
}

impl Analyzer {
    pub fn new(
        extractor: DocumentTextExtractor,
        completions: Arc<dyn CompletionService>,
        audit: AuditLogger,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            extractor,
            completions,
            parser: ResultParser::new(settings.output_mode),
            audit,
            settings,
        }
    }

    pub fn output_mode(&self) -> OutputMode {
        self.settings.output_mode
    }

    pub fn audit_enabled(&self) -> bool {
        self.audit.is_enabled()
    }

    /// Runs the full pipeline for one document.
    pub async fn analyze(
        &self,
        document: Option<UploadedDocument>,
        role: Option<&str>,
    ) -> Result<AnalysisResponse, AppError> {
        let document = validate_input(document)?;
        let role = normalize_role(role);
        let request_id = Uuid::new_v4();

        let span = info_span!("analyze", %request_id, filename = %document.filename);
        self.run(request_id, document, role).instrument(span).await
    }

    async fn run(
        &self,
        request_id: Uuid,
        document: UploadedDocument,
        role: String,
    ) -> Result<AnalysisResponse, AppError> {
        info!(
            "Analyzing {} ({} bytes, {}) for role '{}'",
            document.filename,
            document.bytes.len(),
            document.content_type.as_deref().unwrap_or("unknown type"),
            role
        );
        let UploadedDocument {
            bytes, filename, ..
        } = document;

        // Step 1: Extract (sentinel on failure)
        let text = self.extract(bytes).await;
        debug!(
            "Extracted {} characters (sentinel: {})",
            text.as_str().chars().count(),
            text.is_sentinel()
        );

        // Step 2: Prompt
        let request = AnalysisRequest {
            text,
            role,
            params: self.settings.params.clone(),
        };
        let prompt = build_prompt(
            self.settings.output_mode,
            request.text.as_str(),
            &request.role,
        );

        // Step 3: Single completion attempt
        let raw = match self.completions.complete(&prompt, &request.params).await {
            Ok(raw) => raw,
            Err(e) => match &self.settings.fallback_message {
                Some(message) => {
                    warn!("Completion failed, using fallback message: {e}");
                    message.clone()
                }
                None => {
                    warn!("Completion failed with no fallback declared: {e}");
                    return Err(AppError::AnalysisService(e));
                }
            },
        };

        // Step 4: Parse (default record on failure)
        let result = self.parser.parse(&raw);

        // Step 5: Audit (best-effort, never alters the result)
        self.audit.record(&filename, &request.role, &result).await;

        info!("Analysis complete");
        Ok(AnalysisResponse {
            request_id,
            filename,
            role: request.role,
            result,
        })
    }

    async fn extract(&self, bytes: Bytes) -> ExtractedText {
        let extractor = self.extractor;
        let char_limit = extractor.char_limit();
        // PDF parsing is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || extractor.extract_or_sentinel(&bytes))
            .await
            .unwrap_or_else(|e| {
                warn!("Extraction task failed: {e}");
                ExtractedText::sentinel(char_limit)
            })
    }
}

fn validate_input(document: Option<UploadedDocument>) -> Result<UploadedDocument, AppError> {
    let document = document.ok_or_else(|| AppError::Input("No file uploaded".to_string()))?;
    if document.filename.trim().is_empty() {
        return Err(AppError::Input("No selected file".to_string()));
    }
    if document.bytes.is_empty() {
        return Err(AppError::Input("No file uploaded".to_string()));
    }
    Ok(document)
}

fn normalize_role(role: Option<&str>) -> String {
    role.map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| truncate_chars(r, MAX_ROLE_CHARS).trim_end())
        .unwrap_or(DEFAULT_ROLE)
        .to_string()
}
