use serde::{Deserialize, Deserializer, Serialize};

/// Role used when the caller did not name a target profession.
pub const DEFAULT_ROLE: &str = "Not specified";

/// Longest role, in characters, that is forwarded into a prompt.
pub const MAX_ROLE_CHARS: usize = 100;

/// Shape of the analysis the model is asked for. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Human-readable numbered sections, passed through untouched.
    FreeText,
    /// JSON object of named string arrays, decoded into [`CareerAnalysis`].
    Structured,
}

impl std::str::FromStr for OutputMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "free_text" | "freetext" => Ok(Self::FreeText),
            "structured" | "json" => Ok(Self::Structured),
            other => anyhow::bail!("OUTPUT_MODE must be 'structured' or 'text', got '{other}'"),
        }
    }
}

/// Structured career analysis. Every field is an ordered list of short
/// statements; fields the model omitted or set to `null` decode as empty lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CareerAnalysis {
    #[serde(deserialize_with = "null_as_empty")]
    pub skills_identified: Vec<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub strengths: Vec<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub weaknesses: Vec<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub skill_gaps: Vec<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub learning_suggestions: Vec<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub tools: Vec<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub internship_recommendations: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl CareerAnalysis {
    /// Field names paired with their values, in schema order.
    pub fn fields(&self) -> [(&'static str, &[String]); 7] {
        [
            ("skills_identified", self.skills_identified.as_slice()),
            ("strengths", self.strengths.as_slice()),
            ("weaknesses", self.weaknesses.as_slice()),
            ("skill_gaps", self.skill_gaps.as_slice()),
            ("learning_suggestions", self.learning_suggestions.as_slice()),
            ("tools", self.tools.as_slice()),
            ("internship_recommendations", self.internship_recommendations.as_slice()),
        ]
    }

    /// The placeholder returned whenever structured output cannot be decoded.
    pub fn placeholder() -> Self {
        fn list(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            skills_identified: list(&["Python"]),
            strengths: list(&["Basic programming knowledge"]),
            weaknesses: list(&["Limited real-world project experience"]),
            skill_gaps: list(&["Version control workflows", "Data structures and algorithms"]),
            learning_suggestions: list(&[
                "Build and publish two portfolio projects",
                "Complete an introductory SQL course",
            ]),
            tools: list(&["Git", "VS Code"]),
            internship_recommendations: list(&["Software Development Intern"]),
        }
    }
}

/// The result handed back to callers. Always well-formed: degraded paths
/// substitute a declared value instead of leaving it absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AnalysisResult {
    Structured { analysis: CareerAnalysis },
    #[serde(rename = "text")]
    FreeText { text: String },
}

impl AnalysisResult {
    pub fn mode(&self) -> OutputMode {
        match self {
            Self::Structured { .. } => OutputMode::Structured,
            Self::FreeText { .. } => OutputMode::FreeText,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_mode_parsing() {
        assert_eq!("text".parse::<OutputMode>().unwrap(), OutputMode::FreeText);
        assert_eq!(" JSON ".parse::<OutputMode>().unwrap(), OutputMode::Structured);
        assert!("yaml".parse::<OutputMode>().is_err());
    }

    #[test]
    fn test_placeholder_has_no_empty_field() {
        let placeholder = CareerAnalysis::placeholder();
        for (name, values) in placeholder.fields() {
            assert!(!values.is_empty(), "{name} should carry a placeholder value");
        }
        assert_eq!(placeholder.skills_identified, vec!["Python"]);
        assert_eq!(placeholder.strengths, vec!["Basic programming knowledge"]);
    }

    #[test]
    fn test_result_serializes_with_mode_tag() {
        let text = AnalysisResult::FreeText {
            text: "1. Strengths".to_string(),
        };
        let value = serde_json::to_value(&text).unwrap();
        assert_eq!(value["mode"], "text");
        assert_eq!(value["text"], "1. Strengths");

        let structured = AnalysisResult::Structured {
            analysis: CareerAnalysis::default(),
        };
        let value = serde_json::to_value(&structured).unwrap();
        assert_eq!(value["mode"], "structured");
        assert!(value["analysis"]["strengths"].as_array().unwrap().is_empty());
        assert_eq!(structured.mode(), OutputMode::Structured);
    }
}
