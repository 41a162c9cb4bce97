// Analysis prompt templates.
// Each template is filled with `{role}` and `{resume_text}` and nothing else.

use crate::analysis::models::OutputMode;

pub const FREE_TEXT_PROMPT_TEMPLATE: &str = "\
You are an experienced career counselor reviewing a resume.
Target role: {role}

Analyze the resume below and respond with these numbered sections, in this order:
1. Strengths
2. Weaknesses
3. Skill Gaps
4. Learning Suggestions
5. Recommended Roles
6. Internship Suggestions

Use plain text only. Do NOT use markdown, bold, italics, tables or code fences.

Resume:
{resume_text}
";

pub const STRUCTURED_PROMPT_TEMPLATE: &str = r#"You are an experienced career counselor reviewing a resume.
Target role: {role}

Return ONLY a valid JSON object with exactly this schema:
{
  "skills_identified": ["string"],
  "strengths": ["string"],
  "weaknesses": ["string"],
  "skill_gaps": ["string"],
  "learning_suggestions": ["string"],
  "tools": ["string"],
  "internship_recommendations": ["string"]
}

RULES:
1. Every value is an array of short strings.
2. Do NOT add scores, ratings or any numeric fields.
3. Do NOT wrap the JSON in prose, markdown or code fences.

Resume:
{resume_text}
"#;

/// Renders the instruction prompt for the configured output mode.
/// Deterministic: the same inputs always produce the same prompt.
pub fn build_prompt(mode: OutputMode, resume_text: &str, role: &str) -> String {
    let template = match mode {
        OutputMode::FreeText => FREE_TEXT_PROMPT_TEMPLATE,
        OutputMode::Structured => STRUCTURED_PROMPT_TEMPLATE,
    };
    // Split on the text placeholder first so neither substituted value is
    // ever scanned for the other placeholder.
    let fill = |part: &str| part.replace("{role}", role);
    match template.split_once("{resume_text}") {
        Some((head, tail)) => {
            let mut prompt = fill(head);
            prompt.push_str(resume_text);
            prompt.push_str(&fill(tail));
            prompt
        }
        None => fill(template),
    }
}
