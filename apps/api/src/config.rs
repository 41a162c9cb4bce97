use anyhow::{bail, Context, Result};

use crate::analysis::models::OutputMode;

const DEFAULT_COMPLETION_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
const DEFAULT_MAX_TOKENS: u32 = 700;
const DEFAULT_TEXT_CHAR_LIMIT: usize = 6000;
const DEFAULT_SHEET_RANGE: &str = "Sheet1!A1";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "AI analysis is temporarily unavailable. Please try again in a few minutes.";

/// How the service reacts to missing collaborators and completion failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    /// Every external credential is required; completion failures reach the caller.
    Strict,
    /// Audit logging is optional; completion failures degrade to a fallback message.
    Safe,
}

impl std::str::FromStr for DeploymentMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "safe" => Ok(Self::Safe),
            other => bail!("DEPLOYMENT_MODE must be 'strict' or 'safe', got '{other}'"),
        }
    }
}

/// Spreadsheet settings for the audit trail. Only present when both the
/// spreadsheet id and the service-account blob were supplied.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub spreadsheet_id: String,
    pub range: String,
    pub service_account_json: String,
    pub sheets_api_url: String,
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing for the deployment mode.
#[derive(Debug, Clone)]
pub struct Config {
    pub groq_api_key: String,
    pub completion_url: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub output_mode: OutputMode,
    pub deployment_mode: DeploymentMode,
    pub fallback_message: String,
    pub max_pages: Option<usize>,
    pub text_char_limit: usize,
    pub audit: Option<AuditConfig>,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let deployment_mode = match get("DEPLOYMENT_MODE") {
            Some(v) => v.parse()?,
            None => DeploymentMode::Safe,
        };

        let output_mode = match get("OUTPUT_MODE") {
            Some(v) => v.parse()?,
            None => OutputMode::Structured,
        };

        let temperature = get("ANALYSIS_TEMPERATURE")
            .map(|v| v.parse::<f32>())
            .transpose()
            .context("ANALYSIS_TEMPERATURE must be a number")?;
        if let Some(t) = temperature {
            if !(0.0..=2.0).contains(&t) {
                bail!("ANALYSIS_TEMPERATURE must be between 0.0 and 2.0, got {t}");
            }
        }

        let max_tokens = match get("ANALYSIS_MAX_TOKENS") {
            Some(v) => {
                let n = v
                    .parse::<u32>()
                    .context("ANALYSIS_MAX_TOKENS must be a non-negative integer")?;
                (n > 0).then_some(n)
            }
            None => Some(DEFAULT_MAX_TOKENS),
        };

        let max_pages = get("MAX_PAGES")
            .map(|v| v.parse::<usize>())
            .transpose()
            .context("MAX_PAGES must be a non-negative integer")?
            .filter(|n| *n > 0);

        let text_char_limit = get("TEXT_CHAR_LIMIT")
            .map(|v| v.parse::<usize>())
            .transpose()
            .context("TEXT_CHAR_LIMIT must be a positive integer")?
            .unwrap_or(DEFAULT_TEXT_CHAR_LIMIT);
        if text_char_limit == 0 {
            bail!("TEXT_CHAR_LIMIT must be greater than zero");
        }

        let audit = match (get("SPREADSHEET_ID"), get("GOOGLE_SERVICE_ACCOUNT_JSON")) {
            (Some(spreadsheet_id), Some(service_account_json)) => Some(AuditConfig {
                spreadsheet_id,
                range: get("SPREADSHEET_RANGE").unwrap_or_else(|| DEFAULT_SHEET_RANGE.to_string()),
                service_account_json,
                sheets_api_url: get("SHEETS_API_URL")
                    .unwrap_or_else(|| DEFAULT_SHEETS_URL.to_string()),
            }),
            (spreadsheet_id, _) => {
                if deployment_mode == DeploymentMode::Strict {
                    let missing = if spreadsheet_id.is_none() {
                        "SPREADSHEET_ID"
                    } else {
                        "GOOGLE_SERVICE_ACCOUNT_JSON"
                    };
                    bail!("Required environment variable '{missing}' is not set (DEPLOYMENT_MODE=strict)");
                }
                None
            }
        };

        Ok(Config {
            groq_api_key: get("GROQ_API_KEY")
                .context("Required environment variable 'GROQ_API_KEY' is not set")?,
            completion_url: get("GROQ_API_URL").unwrap_or_else(|| DEFAULT_COMPLETION_URL.to_string()),
            model: get("ANALYSIS_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature,
            max_tokens,
            output_mode,
            deployment_mode,
            fallback_message: get("ANALYSIS_FALLBACK_MESSAGE")
                .unwrap_or_else(|| DEFAULT_FALLBACK_MESSAGE.to_string()),
            max_pages,
            text_char_limit,
            audit,
            max_upload_bytes: get("MAX_UPLOAD_BYTES")
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("MAX_UPLOAD_BYTES must be a positive integer")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            port: get("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// The message substituted for a failed completion call, if the mode declares one.
    pub fn declared_fallback(&self) -> Option<String> {
        match self.deployment_mode {
            DeploymentMode::Safe => Some(self.fallback_message.clone()),
            DeploymentMode::Strict => None,
        }
    }
}
