use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::UserId;

/// A medical record as held by the storage collaborator.
///
/// Immutable once written. `embedded_extraction` is kept exactly as stored;
/// read it through [`StoredRecord::extraction`], which understands both the
/// JSON form and legacy plain-text rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub title: String,
    pub record_date: NaiveDate,
    pub doctor_name: String,
    pub embedded_extraction: String,
    pub diagnosis: String,
    pub medications: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredRecord {
    pub fn extraction(&self) -> EmbeddedExtraction {
        EmbeddedExtraction::parse(&self.embedded_extraction)
    }
}

/// Record contents before storage assigns identity and creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    pub title: String,
    pub record_date: NaiveDate,
    pub doctor_name: String,
    pub embedded_extraction: String,
    pub diagnosis: String,
    pub medications: Vec<String>,
}

/// The sub-document nested inside a record: the parts of an extraction
/// that are not promoted to top-level columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedExtraction {
    pub original_text: String,
    pub clinic_name: String,
    pub key_findings: Vec<String>,
    pub recommendations: String,
}

impl EmbeddedExtraction {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a stored payload. Never fails.
    ///
    /// Older rows hold the bare OCR text instead of JSON; anything that is not
    /// a JSON object is taken whole as `original_text`. Within an object,
    /// missing or wrongly-typed keys fall back to empty values.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(obj)) => Self {
                original_text: str_value(obj.get("originalText")),
                clinic_name: str_value(obj.get("clinicName")),
                key_findings: obj
                    .get("keyFindings")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
                recommendations: str_value(obj.get("recommendations")),
            },
            _ => Self {
                original_text: raw.to_string(),
                ..Self::default()
            },
        }
    }
}

fn str_value(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}
