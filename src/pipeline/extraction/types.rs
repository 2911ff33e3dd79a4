use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ExtractionError;

/// One document photo queued for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read an image from disk, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        if mime.type_() != mime_guess::mime::IMAGE {
            tracing::warn!(file = %file_name, mime = %mime, "Uploading non-image file");
        }
        Ok(Self {
            file_name,
            mime_type: mime.essence_str().to_string(),
            bytes,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Unvalidated output of the extraction service.
///
/// Fields are kept as raw JSON so that a wrong shape (a number where a
/// string belongs, a string where a list belongs) survives deserialization
/// and is only judged by the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawExtraction {
    pub document_type: Option<Value>,
    pub doctor_name: Option<Value>,
    pub clinic_name: Option<Value>,
    pub document_date: Option<Value>,
    pub extracted_text: Option<Value>,
    pub medications: Option<Value>,
    pub diagnosis: Option<Value>,
    pub key_findings: Option<Value>,
    pub recommendations: Option<Value>,
}

impl RawExtraction {
    /// Validate a response payload: it must be a JSON object whose
    /// `documentType` is a string.
    pub fn from_value(value: Value) -> Result<Self, ExtractionError> {
        let Value::Object(ref obj) = value else {
            return Err(ExtractionError::Schema(
                "response is not a JSON object".into(),
            ));
        };
        match obj.get("documentType") {
            Some(Value::String(_)) => {}
            Some(_) => {
                return Err(ExtractionError::Schema(
                    "documentType is not a string".into(),
                ))
            }
            None => {
                return Err(ExtractionError::Schema(
                    "response is missing documentType".into(),
                ))
            }
        }
        serde_json::from_value(value).map_err(|e| ExtractionError::Schema(e.to_string()))
    }
}

/// Remote image-to-structured-data service (allows mocking).
pub trait ExtractionClient {
    /// Upload one or more images as a single request.
    fn extract(&self, images: &[ImageUpload]) -> Result<RawExtraction, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_extraction_requires_document_type() {
        let err = RawExtraction::from_value(json!({"doctorName": "Dr. Chen"})).unwrap_err();
        assert!(matches!(err, ExtractionError::Schema(_)));
    }

    #[test]
    fn raw_extraction_rejects_non_string_document_type() {
        let err = RawExtraction::from_value(json!({"documentType": 7})).unwrap_err();
        assert!(matches!(err, ExtractionError::Schema(_)));
    }

    #[test]
    fn raw_extraction_rejects_non_object() {
        let err = RawExtraction::from_value(json!(["Lab Report"])).unwrap_err();
        assert!(matches!(err, ExtractionError::Schema(_)));
    }

    #[test]
    fn raw_extraction_keeps_malformed_fields_for_normalizer() {
        let raw = RawExtraction::from_value(json!({
            "documentType": "Prescription",
            "medications": "Metformin 500mg",
            "doctorName": 42,
            "unexpected": true
        }))
        .unwrap();
        assert_eq!(raw.document_type, Some(json!("Prescription")));
        assert_eq!(raw.medications, Some(json!("Metformin 500mg")));
        assert_eq!(raw.doctor_name, Some(json!(42)));
        assert!(raw.key_findings.is_none());
    }

    #[test]
    fn image_from_path_guesses_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let image = ImageUpload::from_path(&path).unwrap();
        assert_eq!(image.file_name, "scan.png");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.len(), 4);
    }

    #[test]
    fn image_from_missing_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageUpload::from_path(&dir.path().join("nope.jpg")).unwrap_err();
        assert!(matches!(err, ExtractionError::Io(_)));
    }
}
