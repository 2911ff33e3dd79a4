//! Commit or drop a reviewed draft.
//!
//! `medications` and `diagnosis` become top-level record columns; the
//! remaining extraction content travels as the embedded JSON payload.

use chrono::{Local, NaiveDate};

use crate::auth::UserId;
use crate::db::{PersistenceError, RecordStore};
use crate::models::record::{EmbeddedExtraction, NewRecord, StoredRecord};
use crate::pipeline::extraction::parse_document_date;
use crate::review::ExtractionDraft;

/// The embedded payload for a draft.
pub fn embedded_extraction(draft: &ExtractionDraft) -> EmbeddedExtraction {
    let data = draft.data();
    EmbeddedExtraction {
        original_text: data.extracted_text.clone(),
        clinic_name: data.clinic_name.clone(),
        key_findings: data.key_findings.clone(),
        recommendations: data.recommendations.clone(),
    }
}

/// Shape a draft into the storage record. An empty or unparseable
/// `documentDate` is replaced by `today`.
pub fn build_record(draft: &ExtractionDraft, today: NaiveDate) -> Result<NewRecord, PersistenceError> {
    let data = draft.data();
    let embedded = embedded_extraction(draft)
        .to_json()
        .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

    Ok(NewRecord {
        title: data.document_type.clone(),
        record_date: parse_document_date(&data.document_date).unwrap_or(today),
        doctor_name: data.doctor_name.clone(),
        embedded_extraction: embedded,
        diagnosis: data.diagnosis.clone(),
        medications: data.medications.clone(),
    })
}

/// Write the draft as a new record owned by `user_id`.
///
/// The draft is only borrowed: on failure it is untouched and the caller may
/// retry. Clearing it after success is the caller's job.
pub fn save(
    store: &dyn RecordStore,
    user_id: &UserId,
    draft: &ExtractionDraft,
) -> Result<StoredRecord, PersistenceError> {
    let record = build_record(draft, Local::now().date_naive())?;
    store.create(user_id, &record).inspect_err(|e| {
        tracing::warn!(user_id = %user_id, error = %e, "Saving medical record failed");
    })
}

/// Drop a draft without storing anything.
pub fn discard(draft: ExtractionDraft) {
    tracing::debug!(
        medications = draft.data().medications.len(),
        "Extraction draft discarded"
    );
}
