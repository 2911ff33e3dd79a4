//! Review session state: who is signed in, which photos are selected, and
//! the draft under review.
//!
//! One session per user interaction, owned by a single thread. Operations
//! take the session explicitly instead of reaching for global state.

use thiserror::Error;

use crate::auth::{AuthProvider, UserId};
use crate::db::{PersistenceError, RecordStore};
use crate::home::{overview, RecordsOverview};
use crate::models::record::StoredRecord;
use crate::persister;
use crate::pipeline::extraction::{
    normalize_extraction, ExtractionClient, ExtractionError, ImageUpload, RawExtraction,
};
use crate::review::{ExtractionDraft, ReviewError};
use crate::search::filter_records;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No signed-in user")]
    NotAuthenticated,

    #[error("No images selected for upload")]
    NoFilesSelected,

    #[error("No extraction draft under review")]
    NoDraft,

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Draft edit failed: {0}")]
    Review(#[from] ReviewError),

    #[error("Storage failed: {0}")]
    Persistence(#[from] PersistenceError),
}

/// What happened to a finished extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// A new draft is ready for review.
    DraftReady,
    /// The session moved on while the request was in flight; result dropped.
    Stale,
}

/// Snapshot of the selection handed to an in-flight upload.
///
/// The ticket can be moved to a worker thread; its result is fed back
/// through [`ReviewSession::complete_extraction`].
#[derive(Debug, Clone)]
pub struct ExtractionTicket {
    generation: u64,
    images: Vec<ImageUpload>,
}

impl ExtractionTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn images(&self) -> &[ImageUpload] {
        &self.images
    }

    pub fn run(&self, client: &dyn ExtractionClient) -> Result<RawExtraction, ExtractionError> {
        client.extract(&self.images)
    }
}

pub struct ReviewSession {
    user_id: UserId,
    selected: Vec<ImageUpload>,
    draft: Option<ExtractionDraft>,
    /// Bumped whenever an outstanding upload result would no longer apply.
    generation: u64,
}

impl ReviewSession {
    /// Start a session for the signed-in user.
    pub fn start(auth: &dyn AuthProvider) -> Result<Self, SessionError> {
        let user_id = auth.current_user().ok_or(SessionError::NotAuthenticated)?;
        Ok(Self {
            user_id,
            selected: Vec::new(),
            draft: None,
            generation: 0,
        })
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Replace the selected images.
    pub fn select_files(&mut self, images: Vec<ImageUpload>) {
        self.selected = images;
        self.generation += 1;
    }

    pub fn add_file(&mut self, image: ImageUpload) {
        self.selected.push(image);
        self.generation += 1;
    }

    pub fn selected_files(&self) -> &[ImageUpload] {
        &self.selected
    }

    /// Hand the current selection to an upload. Any earlier ticket becomes
    /// stale. The selection itself is kept for retries.
    pub fn begin_extraction(&mut self) -> Result<ExtractionTicket, SessionError> {
        if self.selected.is_empty() {
            return Err(SessionError::NoFilesSelected);
        }
        self.generation += 1;
        Ok(ExtractionTicket {
            generation: self.generation,
            images: self.selected.clone(),
        })
    }

    /// Apply the result of a ticket's upload.
    ///
    /// Results for stale tickets are dropped, failures included. A failure
    /// for the current ticket is returned and leaves the session as it was.
    pub fn complete_extraction(
        &mut self,
        ticket: &ExtractionTicket,
        result: Result<RawExtraction, ExtractionError>,
    ) -> Result<ExtractionOutcome, SessionError> {
        if ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale extraction result"
            );
            return Ok(ExtractionOutcome::Stale);
        }

        let raw = result?;
        self.draft = Some(ExtractionDraft::new(normalize_extraction(&raw)));
        Ok(ExtractionOutcome::DraftReady)
    }

    /// Upload the selection and wait for the draft.
    pub fn extract(&mut self, client: &dyn ExtractionClient) -> Result<&ExtractionDraft, SessionError> {
        let ticket = self.begin_extraction()?;
        let result = ticket.run(client);
        self.complete_extraction(&ticket, result)?;
        self.draft.as_ref().ok_or(SessionError::NoDraft)
    }

    pub fn draft(&self) -> Option<&ExtractionDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Result<&mut ExtractionDraft, SessionError> {
        self.draft.as_mut().ok_or(SessionError::NoDraft)
    }

    /// Save the draft, then reset the session. On failure nothing is cleared.
    pub fn confirm(&mut self, store: &dyn RecordStore) -> Result<StoredRecord, SessionError> {
        let draft = self.draft.as_ref().ok_or(SessionError::NoDraft)?;
        let record = persister::save(store, &self.user_id, draft)?;
        self.reset();
        Ok(record)
    }

    /// Throw the draft away and reset the session.
    pub fn reject(&mut self) {
        if let Some(draft) = self.draft.take() {
            persister::discard(draft);
        }
        self.reset();
    }

    /// Clear the draft and selection; outstanding uploads become stale.
    pub fn reset(&mut self) {
        self.draft = None;
        self.selected.clear();
        self.generation += 1;
    }

    /// The user's records, newest first.
    pub fn records(&self, store: &dyn RecordStore) -> Result<Vec<StoredRecord>, SessionError> {
        Ok(store.list(&self.user_id)?)
    }

    /// Re-fetch the user's records and filter them by `query`.
    pub fn search(
        &self,
        store: &dyn RecordStore,
        query: &str,
    ) -> Result<Vec<StoredRecord>, SessionError> {
        let records = self.records(store)?;
        Ok(filter_records(&records, query).into_iter().cloned().collect())
    }

    pub fn overview(&self, store: &dyn RecordStore) -> Result<RecordsOverview, SessionError> {
        Ok(overview(&self.records(store)?))
    }
}
