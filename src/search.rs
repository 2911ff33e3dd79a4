//! Free-text filter over a user's records.
//!
//! A record matches when the trimmed query occurs, case-insensitively, in its
//! title, doctor, diagnosis or any medication, or in the embedded
//! extraction's text, clinic, recommendations or any key finding. Legacy
//! plain-text payloads are searched as original text.

use crate::models::record::StoredRecord;

/// Records matching `query`, in input order. An empty query matches all.
pub fn filter_records<'a>(records: &'a [StoredRecord], query: &str) -> Vec<&'a StoredRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.iter().collect();
    }
    records
        .iter()
        .filter(|record| record_matches(record, &needle))
        .collect()
}

/// `needle` must already be trimmed and lowercased.
fn record_matches(record: &StoredRecord, needle: &str) -> bool {
    let contains = |haystack: &str| haystack.to_lowercase().contains(needle);

    if contains(&record.title)
        || contains(&record.doctor_name)
        || contains(&record.diagnosis)
        || record.medications.iter().any(|m| contains(m))
    {
        return true;
    }

    let extraction = record.extraction();
    contains(&extraction.original_text)
        || contains(&extraction.clinic_name)
        || contains(&extraction.recommendations)
        || extraction.key_findings.iter().any(|f| contains(f))
}
