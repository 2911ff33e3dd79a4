use std::cell::Cell;
use std::time::{Duration, Instant};

use reqwest::blocking::multipart::{Form, Part};
use serde_json::Value;

use super::types::{ExtractionClient, ImageUpload, RawExtraction};
use super::ExtractionError;
use crate::config::ExtractionConfig;

/// HTTP client for the remote document-extraction function.
///
/// Sends every image of a batch as a part of one multipart request and
/// never retries; a retry is a fresh call by the caller.
pub struct HttpExtractionClient {
    config: ExtractionConfig,
    client: reqwest::blocking::Client,
}

impl HttpExtractionClient {
    pub fn new(config: ExtractionConfig) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExtractionError::Transport(format!("HTTP client setup failed: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    fn build_form(&self, images: &[ImageUpload]) -> Result<Form, ExtractionError> {
        let mut form = Form::new();
        for image in images {
            let part = Part::bytes(image.bytes.clone())
                .file_name(image.file_name.clone())
                .mime_str(&image.mime_type)
                .map_err(|e| {
                    ExtractionError::Transport(format!(
                        "Invalid MIME type {} for {}: {e}",
                        image.mime_type, image.file_name
                    ))
                })?;
            form = form.part(self.config.image_field.clone(), part);
        }
        Ok(form)
    }

    fn map_send_error(&self, e: reqwest::Error) -> ExtractionError {
        if e.is_timeout() {
            ExtractionError::Transport(format!(
                "Request timed out after {}s",
                self.config.timeout_secs
            ))
        } else if e.is_connect() {
            ExtractionError::Transport(format!("Cannot connect to {}", self.config.endpoint))
        } else {
            ExtractionError::Transport(e.to_string())
        }
    }
}

impl ExtractionClient for HttpExtractionClient {
    fn extract(&self, images: &[ImageUpload]) -> Result<RawExtraction, ExtractionError> {
        if images.is_empty() {
            return Err(ExtractionError::EmptyUpload);
        }

        let started = Instant::now();
        let form = self.build_form(images)?;

        let mut request = self.client.post(&self.config.endpoint).multipart(form);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        tracing::info!(images = images.len(), "Sending images for extraction");

        let response = request.send().map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Extraction service rejected upload");
            return Err(ExtractionError::Http {
                status: status.as_u16(),
                body: error_message(&body),
            });
        }

        let body = response.text().map_err(|e| self.map_send_error(e))?;
        let raw = parse_extraction_body(&body).inspect_err(|e| {
            tracing::warn!(error = %e, "Extraction response failed validation");
        })?;

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Extraction completed"
        );
        Ok(raw)
    }
}

/// Parse a success body into a `RawExtraction`.
///
/// Accepts the function's `{success, extractedData, originalFileName}`
/// envelope as well as a bare extraction object.
pub fn parse_extraction_body(body: &str) -> Result<RawExtraction, ExtractionError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ExtractionError::Schema(format!("response is not JSON: {e}")))?;
    RawExtraction::from_value(unwrap_envelope(value)?)
}

fn unwrap_envelope(mut value: Value) -> Result<Value, ExtractionError> {
    let Some(obj) = value.as_object_mut() else {
        return Ok(value);
    };

    if obj.get("success") == Some(&Value::Bool(false)) {
        let reason = obj
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("extraction reported failure")
            .to_string();
        return Err(ExtractionError::Schema(reason));
    }

    match obj.remove("extractedData") {
        Some(inner) => Ok(inner),
        None => Ok(value),
    }
}

/// Prefer the `error` field of a JSON error body over the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Canned outcome for `MockExtractionClient`.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Success(RawExtraction),
    HttpStatus(u16),
    Transport,
    Schema,
}

/// Mock extraction client for testing: returns a configurable outcome.
pub struct MockExtractionClient {
    outcome: MockOutcome,
    calls: Cell<usize>,
}

impl MockExtractionClient {
    pub fn new(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            calls: Cell::new(0),
        }
    }

    pub fn returning(raw: RawExtraction) -> Self {
        Self::new(MockOutcome::Success(raw))
    }

    pub fn failing_with_status(status: u16) -> Self {
        Self::new(MockOutcome::HttpStatus(status))
    }

    /// Number of `extract` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ExtractionClient for MockExtractionClient {
    fn extract(&self, images: &[ImageUpload]) -> Result<RawExtraction, ExtractionError> {
        self.calls.set(self.calls.get() + 1);
        if images.is_empty() {
            return Err(ExtractionError::EmptyUpload);
        }
        match &self.outcome {
            MockOutcome::Success(raw) => Ok(raw.clone()),
            MockOutcome::HttpStatus(status) => Err(ExtractionError::Http {
                status: *status,
                body: String::new(),
            }),
            MockOutcome::Transport => Err(ExtractionError::Transport("mock transport".into())),
            MockOutcome::Schema => Err(ExtractionError::Schema("mock schema".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::mpsc;

    use axum::extract::Multipart;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;

    /// Spawn an axum server on its own runtime thread, return its address.
    fn spawn_server() -> SocketAddr {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let app = Router::new()
                    .route("/extract", post(count_images))
                    .route("/envelope", post(envelope))
                    .route("/envelope-failed", post(envelope_failed))
                    .route("/fail", post(server_error))
                    .route("/missing", post(missing_document_type))
                    .route("/not-json", post(|| async { "the document says hello" }))
                    .route("/slow", post(slow));
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });
        rx.recv().unwrap()
    }

    async fn count_images(mut multipart: Multipart) -> impl IntoResponse {
        let mut names = Vec::new();
        while let Ok(Some(field)) = multipart.next_field().await {
            if field.name() == Some("image") {
                names.push(field.file_name().unwrap_or("").to_string());
                let _ = field.bytes().await;
            }
        }
        Json(json!({
            "documentType": "Lab Report",
            "extractedText": format!("parts={}", names.len()),
            "keyFindings": names,
        }))
    }

    async fn envelope() -> impl IntoResponse {
        Json(json!({
            "success": true,
            "extractedData": {"documentType": "Prescription", "medications": ["Metformin 500mg"]},
            "originalFileName": "rx.jpg"
        }))
    }

    async fn envelope_failed() -> impl IntoResponse {
        Json(json!({"success": false, "error": "vision model refused"}))
    }

    async fn server_error() -> impl IntoResponse {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": "OpenAI API error: 429"})),
        )
    }

    async fn missing_document_type() -> impl IntoResponse {
        Json(json!({"doctorName": "Dr. Chen"}))
    }

    async fn slow() -> impl IntoResponse {
        tokio::time::sleep(Duration::from_secs(3)).await;
        Json(json!({"documentType": "Late"}))
    }

    fn client_for(addr: SocketAddr, path: &str) -> HttpExtractionClient {
        HttpExtractionClient::new(ExtractionConfig::with_endpoint(format!("http://{addr}{path}")))
            .unwrap()
    }

    fn images(n: usize) -> Vec<ImageUpload> {
        (0..n)
            .map(|i| ImageUpload::new(format!("page{i}.jpg"), "image/jpeg", vec![0xFF, 0xD8, i as u8]))
            .collect()
    }

    #[test]
    fn uploads_all_images_in_one_request() {
        let addr = spawn_server();
        let raw = client_for(addr, "/extract").extract(&images(3)).unwrap();
        assert_eq!(raw.document_type, Some(json!("Lab Report")));
        assert_eq!(raw.extracted_text, Some(json!("parts=3")));
        assert_eq!(
            raw.key_findings,
            Some(json!(["page0.jpg", "page1.jpg", "page2.jpg"]))
        );
    }

    #[test]
    fn unwraps_response_envelope() {
        let addr = spawn_server();
        let raw = client_for(addr, "/envelope").extract(&images(1)).unwrap();
        assert_eq!(raw.document_type, Some(json!("Prescription")));
        assert_eq!(raw.medications, Some(json!(["Metformin 500mg"])));
    }

    #[test]
    fn failed_envelope_is_schema_error() {
        let addr = spawn_server();
        let err = client_for(addr, "/envelope-failed")
            .extract(&images(1))
            .unwrap_err();
        match err {
            ExtractionError::Schema(msg) => assert_eq!(msg, "vision model refused"),
            other => panic!("expected Schema, got {other:?}"),
        }
    }

    #[test]
    fn server_error_is_http_error() {
        let addr = spawn_server();
        let err = client_for(addr, "/fail").extract(&images(1)).unwrap_err();
        assert_eq!(err.status(), Some(500));
        match err {
            ExtractionError::Http { body, .. } => assert_eq!(body, "OpenAI API error: 429"),
            other => panic!("expected Http, got {other:?}"),
        }
    }

    #[test]
    fn missing_document_type_is_schema_error() {
        let addr = spawn_server();
        let err = client_for(addr, "/missing").extract(&images(1)).unwrap_err();
        assert!(matches!(err, ExtractionError::Schema(_)));
    }

    #[test]
    fn non_json_body_is_schema_error() {
        let addr = spawn_server();
        let err = client_for(addr, "/not-json").extract(&images(1)).unwrap_err();
        assert!(matches!(err, ExtractionError::Schema(_)));
    }

    #[test]
    fn timeout_is_transport_error() {
        let addr = spawn_server();
        let config = ExtractionConfig {
            timeout_secs: 1,
            ..ExtractionConfig::with_endpoint(format!("http://{addr}/slow"))
        };
        let err = HttpExtractionClient::new(config)
            .unwrap()
            .extract(&images(1))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Transport(_)));
    }

    #[test]
    fn unreachable_endpoint_is_transport_error() {
        let client =
            HttpExtractionClient::new(ExtractionConfig::with_endpoint("http://127.0.0.1:1/extract"))
                .unwrap();
        let err = client.extract(&images(1)).unwrap_err();
        assert!(matches!(err, ExtractionError::Transport(_)));
    }

    #[test]
    fn empty_upload_rejected_before_network() {
        let client =
            HttpExtractionClient::new(ExtractionConfig::with_endpoint("http://127.0.0.1:1/extract"))
                .unwrap();
        assert!(matches!(
            client.extract(&[]).unwrap_err(),
            ExtractionError::EmptyUpload
        ));
    }

    #[test]
    fn parse_body_accepts_bare_object() {
        let raw = parse_extraction_body(r#"{"documentType": "X-Ray Report"}"#).unwrap();
        assert_eq!(raw.document_type, Some(json!("X-Ray Report")));
    }

    #[test]
    fn error_message_falls_back_to_raw_body() {
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message(r#"{"error": "quota"}"#), "quota");
    }

    #[test]
    fn mock_counts_calls_and_fails_on_request() {
        let mock = MockExtractionClient::failing_with_status(503);
        assert_eq!(mock.extract(&images(1)).unwrap_err().status(), Some(503));
        assert_eq!(mock.calls(), 1);
    }
}
