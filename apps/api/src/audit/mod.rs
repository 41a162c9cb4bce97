// Audit trail: one spreadsheet row per analyzed document.
// Appends are best-effort; nothing in here can fail a request.

pub mod sheets;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::models::{AnalysisResult, OutputMode};
use crate::capability::Capability;
use crate::config::{AuditConfig, DeploymentMode};
use crate::text::truncate_chars;
use sheets::SheetsClient;

/// Per-cell character limit enforced by the spreadsheet store.
pub const MAX_CELL_CHARS: usize = 40_000;

/// Delimiter used to flatten multi-valued result fields into one cell.
pub const LIST_DELIMITER: &str = "; ";

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Invalid service account credentials: {0}")]
    Credentials(String),

    #[error("Token exchange failed: {0}")]
    Token(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sheets API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// One row of the audit trail. Append-only, never deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    pub role: String,
    /// Result flattened to one string per cell, each already length-capped.
    pub result_fields: Vec<String>,
    pub mode: &'static str,
}

impl AuditRecord {
    pub fn new(filename: &str, role: &str, result: &AnalysisResult) -> Self {
        let mode = match result.mode() {
            OutputMode::Structured => "structured",
            OutputMode::FreeText => "text",
        };
        Self {
            timestamp: Utc::now(),
            filename: cap_cell(filename),
            role: cap_cell(role),
            result_fields: flatten_result(result),
            mode,
        }
    }

    /// Cells in column order: timestamp, filename, role, mode, result fields.
    pub fn to_row(&self) -> Vec<String> {
        let mut row = vec![
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.filename.clone(),
            self.role.clone(),
            self.mode.to_string(),
        ];
        row.extend(self.result_fields.iter().cloned());
        row
    }
}

fn flatten_result(result: &AnalysisResult) -> Vec<String> {
    match result {
        AnalysisResult::Structured { analysis } => analysis
            .fields()
            .iter()
            .map(|(_, values)| cap_cell(&values.join(LIST_DELIMITER)))
            .collect(),
        AnalysisResult::FreeText { text } => vec![cap_cell(text)],
    }
}

fn cap_cell(value: &str) -> String {
    truncate_chars(value, MAX_CELL_CHARS).to_string()
}

/// Destination for audit rows. Implementations must tolerate concurrent,
/// unordered appends; no lock is taken around them.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Wraps an optional sink and swallows every failure.
pub struct AuditLogger {
    sink: Capability<Arc<dyn AuditSink>>,
}

impl AuditLogger {
    pub fn new(sink: Capability<Arc<dyn AuditSink>>) -> Self {
        Self { sink }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_present()
    }

    /// Appends one row if a sink is configured. Errors are logged and dropped.
    pub async fn record(&self, filename: &str, role: &str, result: &AnalysisResult) {
        let sink = match &self.sink {
            Capability::Present(sink) => sink,
            Capability::Absent => return,
        };

        let record = AuditRecord::new(filename, role, result);
        match sink.append(&record).await {
            Ok(()) => info!("Audit row appended for {}", record.filename),
            Err(e) => warn!("Audit append failed, continuing without it: {e}"),
        }
    }
}

/// Resolves the audit capability once at startup. Strict deployments refuse
/// to start without a working sink; safe deployments run with it disabled.
pub fn build_audit_sink(
    audit_config: Option<&AuditConfig>,
    mode: DeploymentMode,
) -> anyhow::Result<Capability<Arc<dyn AuditSink>>> {
    let Some(audit_config) = audit_config else {
        warn!("Spreadsheet settings not provided, audit logging disabled");
        return Ok(Capability::Absent);
    };

    match SheetsClient::new(audit_config) {
        Ok(client) => {
            let sink: Arc<dyn AuditSink> = Arc::new(client);
            info!(
                "Audit logging to spreadsheet {} ({})",
                audit_config.spreadsheet_id, audit_config.range
            );
            Ok(Capability::Present(sink))
        }
        Err(e) if mode == DeploymentMode::Safe => {
            warn!("Audit client unavailable, audit logging disabled: {e}");
            Ok(Capability::Absent)
        }
        Err(e) => Err(anyhow::Error::new(e)
            .context("Failed to initialize audit client (DEPLOYMENT_MODE=strict)")),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::analysis::models::CareerAnalysis;
    use std::sync::Mutex;

    /// In-memory sink that records rows, or fails every append when `fail` is set.
    #[derive(Default)]
    pub(crate) struct MemorySink {
        pub rows: Mutex<Vec<AuditRecord>>,
        pub fail: bool,
    }

    impl MemorySink {
        pub(crate) fn failing() -> Self {
            Self {
                rows: Mutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl AuditSink for MemorySink {
        async fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
            if self.fail {
                return Err(AuditError::Api {
                    status: 403,
                    message: "The caller does not have permission".to_string(),
                });
            }
            self.rows.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn sample_structured() -> AnalysisResult {
        AnalysisResult::Structured {
            analysis: CareerAnalysis {
                strengths: vec!["Python".to_string(), "SQL".to_string()],
                tools: vec!["Git".to_string()],
                ..CareerAnalysis::default()
            },
        }
    }

    #[test]
    fn test_structured_row_layout() {
        let record = AuditRecord::new("cv.pdf", "Data Analyst", &sample_structured());
        let row = record.to_row();
        assert_eq!(row.len(), 4 + 7);
        assert_eq!(&row[1..4], ["cv.pdf", "Data Analyst", "structured"]);
        assert_eq!(row[4], ""); // skills_identified
        assert_eq!(row[5], "Python; SQL");
        assert_eq!(row[9], "Git");
        assert!(row[0].ends_with('Z'));
    }

    #[test]
    fn test_free_text_row_layout() {
        let result = AnalysisResult::FreeText {
            text: "1. Strengths".to_string(),
        };
        let row = AuditRecord::new("cv.pdf", "Not specified", &result).to_row();
        assert_eq!(&row[1..], ["cv.pdf", "Not specified", "text", "1. Strengths"]);
    }

    #[test]
    fn test_cells_are_capped() {
        let result = AnalysisResult::FreeText {
            text: "é".repeat(MAX_CELL_CHARS + 50),
        };
        let record = AuditRecord::new("cv.pdf", "r", &result);
        assert_eq!(record.result_fields[0].chars().count(), MAX_CELL_CHARS);
    }

    #[tokio::test]
    async fn test_logger_appends_one_row() {
        let sink = Arc::new(MemorySink::default());
        let logger = AuditLogger::new(Capability::Present(sink.clone() as Arc<dyn AuditSink>));
        logger.record("cv.pdf", "Analyst", &sample_structured()).await;
        let rows = sink.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].filename, "cv.pdf");
    }

    #[tokio::test]
    async fn test_logger_swallows_failures() {
        let sink = Arc::new(MemorySink::failing());
        let logger = AuditLogger::new(Capability::Present(sink.clone() as Arc<dyn AuditSink>));
        logger.record("cv.pdf", "Analyst", &sample_structured()).await;
        assert!(sink.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_logger_is_a_no_op() {
        let logger = AuditLogger::new(Capability::Absent);
        assert!(!logger.is_enabled());
        logger.record("cv.pdf", "Analyst", &sample_structured()).await;
    }

    fn audit_config(service_account_json: String) -> AuditConfig {
        AuditConfig {
            spreadsheet_id: "sheet-123".to_string(),
            range: "Sheet1!A1".to_string(),
            service_account_json,
            sheets_api_url: "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
        }
    }

    #[test]
    fn test_no_settings_disables_audit() {
        let sink = build_audit_sink(None, DeploymentMode::Safe).unwrap();
        assert!(!sink.is_present());
    }

    #[test]
    fn test_unparseable_credentials_disable_audit_in_safe_mode() {
        let config = audit_config("{not json".to_string());
        let sink = build_audit_sink(Some(&config), DeploymentMode::Safe).unwrap();
        assert!(!sink.is_present());
    }

    #[test]
    fn test_unparseable_credentials_abort_startup_in_strict_mode() {
        let config = audit_config("{not json".to_string());
        let err = build_audit_sink(Some(&config), DeploymentMode::Strict).err().expect("expected startup error");
        assert!(err.to_string().contains("DEPLOYMENT_MODE=strict"), "got: {err}");
    }

    #[test]
    fn test_valid_credentials_enable_audit() {
        let blob = serde_json::json!({
            "type": "service_account",
            "client_email": "audit@example.iam.gserviceaccount.com",
            "private_key": include_str!("testdata/service_account_key.pem"),
        })
        .to_string();
        let config = audit_config(blob);
        let sink = build_audit_sink(Some(&config), DeploymentMode::Strict).unwrap();
        assert!(sink.is_present());
    }
}
