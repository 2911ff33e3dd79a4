//! Review draft: the editable copy of a normalized extraction.
//!
//! The review form binds each input to a field name; list inputs
//! (medications, key findings) are addressed by position. Edits apply
//! immediately and are visible to the next read.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::extraction::NormalizedExtraction;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReviewError {
    #[error("Index {index} out of range for {list} (length {len})")]
    IndexOutOfRange {
        list: ListField,
        index: usize,
        len: usize,
    },

    #[error("Unknown draft field: {0}")]
    UnknownField(String),
}

/// Single-valued draft fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalarField {
    DocumentType,
    DoctorName,
    ClinicName,
    DocumentDate,
    ExtractedText,
    Diagnosis,
    Recommendations,
}

impl ScalarField {
    pub const ALL: [ScalarField; 7] = [
        Self::DocumentType,
        Self::DoctorName,
        Self::ClinicName,
        Self::DocumentDate,
        Self::ExtractedText,
        Self::Diagnosis,
        Self::Recommendations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocumentType => "documentType",
            Self::DoctorName => "doctorName",
            Self::ClinicName => "clinicName",
            Self::DocumentDate => "documentDate",
            Self::ExtractedText => "extractedText",
            Self::Diagnosis => "diagnosis",
            Self::Recommendations => "recommendations",
        }
    }
}

impl FromStr for ScalarField {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| ReviewError::UnknownField(s.to_string()))
    }
}

impl fmt::Display for ScalarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repeated draft fields, edited by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListField {
    Medications,
    KeyFindings,
}

impl ListField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medications => "medications",
            Self::KeyFindings => "keyFindings",
        }
    }
}

impl FromStr for ListField {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "medications" => Ok(Self::Medications),
            "keyFindings" => Ok(Self::KeyFindings),
            other => Err(ReviewError::UnknownField(other.to_string())),
        }
    }
}

impl fmt::Display for ListField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable copy of a `NormalizedExtraction` owned by one review session.
///
/// List items have no stable identity: an index always refers to the
/// current position, so after a removal the following items shift left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionDraft {
    data: NormalizedExtraction,
}

impl ExtractionDraft {
    pub fn new(data: NormalizedExtraction) -> Self {
        Self { data }
    }

    /// Current values.
    pub fn data(&self) -> &NormalizedExtraction {
        &self.data
    }

    pub fn into_inner(self) -> NormalizedExtraction {
        self.data
    }

    pub fn field(&self, field: ScalarField) -> &str {
        match field {
            ScalarField::DocumentType => &self.data.document_type,
            ScalarField::DoctorName => &self.data.doctor_name,
            ScalarField::ClinicName => &self.data.clinic_name,
            ScalarField::DocumentDate => &self.data.document_date,
            ScalarField::ExtractedText => &self.data.extracted_text,
            ScalarField::Diagnosis => &self.data.diagnosis,
            ScalarField::Recommendations => &self.data.recommendations,
        }
    }

    pub fn list(&self, list: ListField) -> &[String] {
        match list {
            ListField::Medications => &self.data.medications,
            ListField::KeyFindings => &self.data.key_findings,
        }
    }

    fn field_mut(&mut self, field: ScalarField) -> &mut String {
        match field {
            ScalarField::DocumentType => &mut self.data.document_type,
            ScalarField::DoctorName => &mut self.data.doctor_name,
            ScalarField::ClinicName => &mut self.data.clinic_name,
            ScalarField::DocumentDate => &mut self.data.document_date,
            ScalarField::ExtractedText => &mut self.data.extracted_text,
            ScalarField::Diagnosis => &mut self.data.diagnosis,
            ScalarField::Recommendations => &mut self.data.recommendations,
        }
    }

    fn list_mut(&mut self, list: ListField) -> &mut Vec<String> {
        match list {
            ListField::Medications => &mut self.data.medications,
            ListField::KeyFindings => &mut self.data.key_findings,
        }
    }

    /// Replace a scalar field.
    pub fn set_field(&mut self, field: ScalarField, value: impl Into<String>) -> &mut Self {
        tracing::debug!(field = %field, "Draft field updated");
        *self.field_mut(field) = value.into();
        self
    }

    /// Replace the element at `index`.
    pub fn update_list_item(
        &mut self,
        list: ListField,
        index: usize,
        value: impl Into<String>,
    ) -> Result<&mut Self, ReviewError> {
        let items = self.list_mut(list);
        let len = items.len();
        let slot = items
            .get_mut(index)
            .ok_or(ReviewError::IndexOutOfRange { list, index, len })?;
        *slot = value.into();
        tracing::debug!(list = %list, index, "Draft list item updated");
        Ok(self)
    }

    /// Append to the end of a list.
    pub fn append_list_item(&mut self, list: ListField, value: impl Into<String>) -> &mut Self {
        self.list_mut(list).push(value.into());
        tracing::debug!(list = %list, "Draft list item appended");
        self
    }

    /// Remove the element at `index`, shifting later elements left.
    pub fn remove_list_item(&mut self, list: ListField, index: usize) -> Result<String, ReviewError> {
        let items = self.list_mut(list);
        if index >= items.len() {
            return Err(ReviewError::IndexOutOfRange {
                list,
                index,
                len: items.len(),
            });
        }
        let removed = items.remove(index);
        tracing::debug!(list = %list, index, "Draft list item removed");
        Ok(removed)
    }

    /// Name-addressed variant of `set_field` for form bindings.
    pub fn set_field_by_name(&mut self, name: &str, value: impl Into<String>) -> Result<&mut Self, ReviewError> {
        let field: ScalarField = name.parse()?;
        Ok(self.set_field(field, value))
    }
}

impl From<NormalizedExtraction> for ExtractionDraft {
    fn from(data: NormalizedExtraction) -> Self {
        Self::new(data)
    }
}
