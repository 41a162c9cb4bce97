// Résumé analysis: prompt construction, result parsing and the pipeline
// that ties extraction, completion and audit logging together.
// All completion calls go through llm_client.

pub mod handlers;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod prompts;
