use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "MediBuddy";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Multipart field name the extraction function reads image parts from.
pub const DEFAULT_IMAGE_FIELD: &str = "image";

/// Default request timeout for the extraction endpoint. Vision models on a
/// cold start regularly take over a minute.
pub const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_EXTRACTION_ENDPOINT: &str =
    "http://localhost:54321/functions/v1/process-medical-image";

/// Get the application data directory (~/MediBuddy/).
///
/// Falls back to the current directory when no home directory is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Location of the local records database.
pub fn records_db_path() -> PathBuf {
    app_data_dir().join("records.db")
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "medibuddy=info,warn"
}

/// Settings for the remote extraction endpoint.
///
/// Every field has a default, so a partial JSON document only needs to
/// name the values it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub image_field: String,
    /// Sent as `Authorization: Bearer <token>` when present.
    pub bearer_token: Option<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_EXTRACTION_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_EXTRACTION_TIMEOUT_SECS,
            image_field: DEFAULT_IMAGE_FIELD.to_string(),
            bearer_token: None,
        }
    }
}

impl ExtractionConfig {
    /// Config pointing at a specific endpoint, defaults elsewhere.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON config document; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_db_under_app_data() {
        let db = records_db_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("records.db"));
    }

    #[test]
    fn app_data_dir_named_after_app() {
        assert!(app_data_dir().ends_with("MediBuddy"));
    }

    #[test]
    fn default_extraction_config() {
        let config = ExtractionConfig::default();
        assert_eq!(config.image_field, "image");
        assert_eq!(config.timeout_secs, 120);
        assert!(config.bearer_token.is_none());
        assert!(config.endpoint.ends_with("/process-medical-image"));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            ExtractionConfig::from_json(r#"{"endpoint": "https://example.test/extract"}"#)
                .unwrap();
        assert_eq!(config.endpoint, "https://example.test/extract");
        assert_eq!(config.timeout_secs, DEFAULT_EXTRACTION_TIMEOUT_SECS);
        assert_eq!(config.image_field, DEFAULT_IMAGE_FIELD);
    }

    #[test]
    fn with_endpoint_overrides_only_endpoint() {
        let config = ExtractionConfig::with_endpoint("http://127.0.0.1:9/x");
        assert_eq!(config.endpoint, "http://127.0.0.1:9/x");
        assert_eq!(config.timeout_secs, DEFAULT_EXTRACTION_TIMEOUT_SECS);
    }
}
