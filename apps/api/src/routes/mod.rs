pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/analyze", post(handlers::handle_analyze))
        .route("/api/v1/analyze", post(handlers::handle_analyze))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::analysis::models::OutputMode;
    use crate::analysis::pipeline::{Analyzer, PipelineSettings};
    use crate::audit::AuditLogger;
    use crate::capability::Capability;
    use crate::extraction::tests::make_test_pdf;
    use crate::extraction::DocumentTextExtractor;
    use crate::llm_client::{AnalysisServiceError, CompletionService, ModelParams};

    const BOUNDARY: &str = "X-RESUME-BOUNDARY";

    struct FixedCompletions(&'static str);

    #[async_trait]
    impl CompletionService for FixedCompletions {
        async fn complete(
            &self,
            _prompt: &str,
            _params: &ModelParams,
        ) -> Result<String, AnalysisServiceError> {
            Ok(self.0.to_string())
        }
    }

    fn app() -> Router {
        let analyzer = Analyzer::new(
            DocumentTextExtractor::new(None, 6000),
            Arc::new(FixedCompletions(r#"{"strengths": ["SQL"]}"#)),
            AuditLogger::new(Capability::Absent),
            PipelineSettings {
                output_mode: OutputMode::Structured,
                params: ModelParams {
                    model: "llama-3.1-8b-instant".to_string(),
                    temperature: None,
                    max_tokens: Some(700),
                },
                fallback_message: None,
            },
        );
        build_router(
            AppState {
                analyzer: Arc::new(analyzer),
            },
            1024 * 1024,
        )
    }

    fn multipart_body(file: Option<(&str, &[u8])>, profession: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some((filename, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        if let Some(profession) = profession {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"profession\"\r\n\r\n{profession}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn analyze_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["output_mode"], "structured");
        assert_eq!(body["audit_enabled"], false);
    }

    #[tokio::test]
    async fn test_analyze_upload() {
        let pdf = make_test_pdf(&["Jane Roe", "Python"]);
        let body = multipart_body(Some(("My CV.pdf", &pdf)), Some("Data Analyst"));
        let response = app().oneshot(analyze_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["filename"], "My_CV.pdf");
        assert_eq!(body["role"], "Data Analyst");
        assert_eq!(body["result"]["mode"], "structured");
        assert_eq!(body["result"]["analysis"]["strengths"][0], "SQL");
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let body = multipart_body(None, Some("Data Analyst"));
        let response = app().oneshot(analyze_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["message"], "No file uploaded");
    }

    #[tokio::test]
    async fn test_empty_filename() {
        let body = multipart_body(Some(("", b"%PDF-1.4")), None);
        let response = app().oneshot(analyze_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["message"], "No selected file");
    }

    #[tokio::test]
    async fn test_empty_file() {
        let body = multipart_body(Some(("cv.pdf", b"")), None);
        let response = app().oneshot(analyze_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "INPUT_ERROR");
        assert_eq!(body["error"]["message"], "No file uploaded");
    }
}
