//! Home & profile header: aggregates derived from the record list.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::record::StoredRecord;

/// Summary numbers shown above the record feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsOverview {
    pub total_records: usize,
    /// Distinct medications, newest record first, first spelling wins.
    pub active_medications: Vec<String>,
    pub latest_diagnosis: Option<String>,
    pub last_record_date: Option<NaiveDate>,
}

/// Build the overview from records listed newest first.
pub fn overview(records: &[StoredRecord]) -> RecordsOverview {
    let mut seen = HashSet::new();
    let mut active_medications = Vec::new();
    for med in records.iter().flat_map(|r| r.medications.iter()) {
        let trimmed = med.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            active_medications.push(trimmed.to_string());
        }
    }

    RecordsOverview {
        total_records: records.len(),
        active_medications,
        latest_diagnosis: records
            .iter()
            .map(|r| r.diagnosis.trim())
            .find(|d| !d.is_empty())
            .map(str::to_string),
        last_record_date: records.iter().map(|r| r.record_date).max(),
    }
}
