//! Boundary validation for extraction results.
//!
//! `normalize_extraction` turns whatever the extraction service produced into
//! a fully-defaulted `NormalizedExtraction`. It never fails: a missing or
//! wrongly-shaped field degrades to its default.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::RawExtraction;

/// Document type used when the service did not classify the document.
pub const DEFAULT_DOCUMENT_TYPE: &str = "Medical Record";

/// Canonical extraction: every field present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedExtraction {
    pub document_type: String,
    pub doctor_name: String,
    pub clinic_name: String,
    /// ISO `YYYY-MM-DD`.
    pub document_date: String,
    pub extracted_text: String,
    pub medications: Vec<String>,
    pub diagnosis: String,
    pub key_findings: Vec<String>,
    pub recommendations: String,
}

/// Normalize against today's local date.
pub fn normalize_extraction(raw: &RawExtraction) -> NormalizedExtraction {
    normalize_extraction_on(raw, Local::now().date_naive())
}

/// Normalize with an explicit "today" for the `documentDate` default.
pub fn normalize_extraction_on(raw: &RawExtraction, today: NaiveDate) -> NormalizedExtraction {
    let document_type = string_field(raw.document_type.as_ref())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DOCUMENT_TYPE.to_string());

    let document_date = string_field(raw.document_date.as_ref())
        .and_then(|s| parse_document_date(&s))
        .unwrap_or(today)
        .format("%Y-%m-%d")
        .to_string();

    NormalizedExtraction {
        document_type,
        doctor_name: string_field(raw.doctor_name.as_ref()).unwrap_or_default(),
        clinic_name: string_field(raw.clinic_name.as_ref()).unwrap_or_default(),
        document_date,
        extracted_text: string_field(raw.extracted_text.as_ref()).unwrap_or_default(),
        medications: string_list(raw.medications.as_ref()),
        diagnosis: string_field(raw.diagnosis.as_ref()).unwrap_or_default(),
        key_findings: string_list(raw.key_findings.as_ref()),
        recommendations: string_field(raw.recommendations.as_ref()).unwrap_or_default(),
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

/// Keep the string items of an array, skipping anything else.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d/%m/%y",
    "%d-%m-%y",
    "%d.%m.%y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// chrono's `%Y` also matches one- and two-digit years.
const MIN_YEAR: i32 = 1000;

/// Parse a free-form document date. Day-first for slash/dash/dot dates.
pub fn parse_document_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive()).filter(has_full_year);
    }
    DATETIME_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
        .chain(
            DATE_FORMATS
                .iter()
                .filter_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok()),
        )
        .find(has_full_year)
}

fn has_full_year(date: &NaiveDate) -> bool {
    date.year() >= MIN_YEAR
}
